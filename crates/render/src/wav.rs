use std::fs;
use std::path::Path;

use crate::RenderError;

pub const HEADER_LEN: usize = 44;
const BYTES_PER_SAMPLE: usize = 2;
const PCM_FORMAT: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

/// Float sample to signed 16-bit PCM.
///
/// Clamps to [-1, 1] and scales negatives by 32768 and positives by 32767,
/// truncating toward zero, so both ends of the range are reachable.
#[inline]
pub fn pcm16(sample: f32) -> i16 {
    let sample = sample.clamp(-1.0, 1.0);
    if sample < 0.0 {
        (sample * 32768.0) as i16
    } else {
        (sample * 32767.0) as i16
    }
}

/// Serialize planar float channels into a canonical 44-byte-header PCM16 WAV.
///
/// Every channel must hold the same number of frames. The output is a pure
/// function of the input.
pub fn encode_wav<C: AsRef<[f32]>>(sample_rate: u32, channels: &[C]) -> Result<Vec<u8>, RenderError> {
    let channel_count = channels.len();
    if channel_count == 0 {
        return Err(RenderError::InvalidBuffer("no channels".to_string()));
    }
    let channel_count_u16 = u16::try_from(channel_count)
        .map_err(|_| RenderError::InvalidBuffer(format!("{channel_count} channels")))?;

    let frames = channels[0].as_ref().len();
    if let Some((index, channel)) = channels
        .iter()
        .enumerate()
        .find(|(_, channel)| channel.as_ref().len() != frames)
    {
        return Err(RenderError::InvalidBuffer(format!(
            "channel {index} has {} frames, channel 0 has {frames}",
            channel.as_ref().len()
        )));
    }

    let block_align = channel_count * BYTES_PER_SAMPLE;
    let data_size = frames
        .checked_mul(block_align)
        .and_then(|size| u32::try_from(size).ok())
        .filter(|size| size.checked_add(36).is_some())
        .ok_or_else(|| {
            RenderError::InvalidBuffer(format!("{frames} frames do not fit a RIFF container"))
        })?;
    let byte_rate = sample_rate
        .checked_mul(block_align as u32)
        .ok_or_else(|| RenderError::InvalidBuffer(format!("byte rate overflows at {sample_rate} Hz")))?;

    let mut out = Vec::with_capacity(HEADER_LEN + data_size as usize);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_size).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    out.extend_from_slice(&PCM_FORMAT.to_le_bytes());
    out.extend_from_slice(&channel_count_u16.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&(block_align as u16).to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());

    for frame in 0..frames {
        for channel in channels {
            out.extend_from_slice(&pcm16(channel.as_ref()[frame]).to_le_bytes());
        }
    }

    Ok(out)
}

/// Write finished WAV bytes. The file appears at `path` only once complete.
pub fn write_wav(bytes: &[u8], path: &Path) -> Result<(), RenderError> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = Path::new(&partial);

    if let Err(e) = fs::write(partial, bytes).and_then(|_| fs::rename(partial, path)) {
        let _ = fs::remove_file(partial);
        return Err(e.into());
    }
    Ok(())
}
