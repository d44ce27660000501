use std::fs::File;
use std::path::{Path, PathBuf};

use seq_transport::AudioArc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Resolve a sample reference to an existing file.
/// Accepts paths that exist as given (absolute, or relative to the working
/// directory) and paths relative to `samples_root` (e.g. `kick.wav`).
pub fn resolve_sample_path(path: &Path, samples_root: &Path) -> Option<PathBuf> {
    if path.exists() {
        return Some(path.to_path_buf());
    }

    let with_root = samples_root.join(path);
    if with_root.exists() {
        return Some(with_root);
    }

    None
}

pub fn decode_file(path: &Path, samples_root: &Path) -> anyhow::Result<AudioArc> {
    let resolved = resolve_sample_path(path, samples_root)
        .ok_or_else(|| anyhow::anyhow!("sample not found: {}", path.display()))?;
    decode_file_direct(&resolved)
}

pub fn decode_file_direct(path: &Path) -> anyhow::Result<AudioArc> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| anyhow::anyhow!("no default track in {}", path.display()))?;

    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);
    let track_id = track.id;

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // a corrupt packet is skipped, the rest of the file is still usable
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!(path = %path.display(), "skipping undecodable packet: {msg}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        channels.get_or_insert(spec.channels.count() as u16);

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    let sample_rate =
        sample_rate.ok_or_else(|| anyhow::anyhow!("unknown sample rate: {}", path.display()))?;
    let channels = channels
        .filter(|&c| c > 0)
        .ok_or_else(|| anyhow::anyhow!("unknown channel layout: {}", path.display()))?;

    let audio = AudioArc::new(samples, sample_rate, channels);
    debug!(path = %path.display(), ?audio, "decoded sample");
    Ok(audio)
}
