mod player;

use std::sync::Arc;

use basedrop::{Collector, Handle, Shared, SharedCell};
use cpal::{
    FromSample, SizedSample,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use seq_transport::{Command, Pattern, SampleBank, Status, Tempo};
use tracing::{error, info};

pub use player::{LivePlayer, MAX_VOICES};

/// Largest device block the scratch buffer covers without reallocating.
const SCRATCH_FRAMES: usize = 8192;
pub const COMMAND_QUEUE: usize = 64;
const STATUS_QUEUE: usize = 256;

pub struct AudioEngineHandle {
    pub commands: rtrb::Producer<Command>,
    pub status: rtrb::Consumer<Status>,
    pub collector: Collector,
    handle: Handle,
    pattern: Arc<SharedCell<Pattern>>,
    bank: Arc<SharedCell<SampleBank>>,
    sample_rate: u32,
    channels: u16,
    _stream: Option<cpal::Stream>,
}

impl AudioEngineHandle {
    /// Output device sample rate; the live bank is kept at this rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Queue a transport command. Returns `false` if the queue is full.
    pub fn send(&mut self, command: Command) -> bool {
        self.commands.push(command).is_ok()
    }

    /// Replace the pattern the next tick will read.
    pub fn publish_pattern(&self, pattern: Pattern) {
        self.pattern.set(Shared::new(&self.handle, pattern));
    }

    /// Replace the sample bank, converted to the device rate first.
    pub fn publish_bank(&self, bank: &SampleBank) -> anyhow::Result<()> {
        let bank = bank.resampled(self.sample_rate)?;
        self.bank.set(Shared::new(&self.handle, bank));
        Ok(())
    }

    pub fn drain_status(&mut self) -> Vec<Status> {
        let mut statuses = Vec::new();
        while let Ok(status) = self.status.pop() {
            statuses.push(status);
        }
        statuses
    }

    /// Free pattern and bank snapshots the audio thread has let go of.
    pub fn collect(&mut self) {
        self.collector.collect();
    }
}

/// Build a handle and the player it controls without opening a device.
///
/// The caller drives `LivePlayer::process` itself; `start` hands the player
/// to a cpal stream instead.
pub fn detached(
    pattern: Pattern,
    bank: &SampleBank,
    tempo: Tempo,
    sample_rate: u32,
    channels: u16,
) -> anyhow::Result<(AudioEngineHandle, LivePlayer)> {
    let collector = Collector::new();
    let handle = collector.handle();

    let (command_tx, command_rx) = rtrb::RingBuffer::<Command>::new(COMMAND_QUEUE);
    let (status_tx, status_rx) = rtrb::RingBuffer::<Status>::new(STATUS_QUEUE);

    let pattern = Arc::new(SharedCell::new(Shared::new(&handle, pattern)));
    let bank = Arc::new(SharedCell::new(Shared::new(
        &handle,
        bank.resampled(sample_rate)?,
    )));

    let player = LivePlayer::new(
        sample_rate,
        channels as usize,
        tempo,
        pattern.clone(),
        bank.clone(),
        command_rx,
        status_tx,
    );

    let engine = AudioEngineHandle {
        commands: command_tx,
        status: status_rx,
        collector,
        handle,
        pattern,
        bank,
        sample_rate,
        channels,
        _stream: None,
    };
    Ok((engine, player))
}

pub fn start(pattern: Pattern, bank: &SampleBank, tempo: Tempo) -> anyhow::Result<AudioEngineHandle> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow::anyhow!("no output device found"))?;

    let config = device.default_output_config()?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels();

    let (mut engine, player) = detached(pattern, bank, tempo, sample_rate, channels)?;

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), player)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), player)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), player)?,
        sample_format => anyhow::bail!("unsupported sample format '{sample_format}'"),
    };

    stream.play()?;
    info!(sample_rate, channels, "audio output started");

    engine._stream = Some(stream);
    Ok(engine)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut player: LivePlayer,
) -> anyhow::Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let mut scratch = vec![0.0f32; SCRATCH_FRAMES * config.channels as usize];

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if scratch.len() < data.len() {
                // only when the device hands over an unusually large block
                scratch.resize(data.len(), 0.0);
            }
            let block = &mut scratch[..data.len()];
            player.process(block);
            for (out, &sample) in data.iter_mut().zip(block.iter()) {
                *out = T::from_sample(sample.clamp(-1.0, 1.0));
            }
        },
        |err| error!("stream error: {err}"),
        None,
    )?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use seq_transport::{AudioArc, TrackId, default_kit};

    #[test]
    fn test_detached_engine_drives_player() {
        let kit = default_kit();
        let bank = SampleBank::new(&kit).with_sample(TrackId(0), AudioArc::mono(vec![0.5; 8], 1000));
        let (mut engine, mut player) =
            detached(Pattern::new(kit.len()), &bank, Tempo::new(120.0), 1000, 1).unwrap();

        let mut pattern = Pattern::new(kit.len());
        pattern.set(TrackId(0), 1, true).unwrap();
        engine.publish_pattern(pattern);
        assert!(engine.send(Command::Play { lead_frames: 0 }));

        let mut out = vec![0.0f32; 250];
        player.process(&mut out);

        assert_eq!(out[124], 0.0);
        assert_eq!(out[125], 0.5 * kit[0].gain());
        assert_eq!(
            engine.drain_status(),
            vec![Status::Cursor(Some(0)), Status::Cursor(Some(1))]
        );
        engine.collect();
    }

    #[test]
    fn test_command_queue_fills_up() {
        let kit = default_kit();
        let (mut engine, _player) =
            detached(Pattern::new(kit.len()), &SampleBank::new(&kit), Tempo::default(), 1000, 2)
                .unwrap();

        for _ in 0..COMMAND_QUEUE {
            assert!(engine.send(Command::Stop));
        }
        assert!(!engine.send(Command::Stop));
    }
}
