//! Plays two bars of a synthesized four-on-the-floor on the default output device.

use std::time::Duration;

use seq_transport::{AudioArc, Command, Pattern, SampleBank, Tempo, TrackId, default_kit};

fn click(sample_rate: u32, frequency: f32) -> AudioArc {
    let frames = sample_rate as usize / 20;
    let samples = (0..frames)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let envelope = 1.0 - i as f32 / frames as f32;
            (std::f32::consts::TAU * frequency * t).sin() * envelope * 0.8
        })
        .collect();
    AudioArc::mono(samples, sample_rate)
}

fn main() -> anyhow::Result<()> {
    let kit = default_kit();
    let mut pattern = Pattern::new(kit.len());
    for step in [0, 4, 8, 12] {
        pattern.set(TrackId(0), step, true)?;
    }
    for step in [4, 12] {
        pattern.set(TrackId(1), step, true)?;
    }
    for step in (2..16).step_by(4) {
        pattern.set(TrackId(2), step, true)?;
    }

    let bank = SampleBank::new(&kit)
        .with_sample(TrackId(0), click(44100, 60.0))
        .with_sample(TrackId(1), click(44100, 220.0))
        .with_sample(TrackId(2), click(44100, 3000.0));

    let tempo = Tempo::new(110.0);
    let mut engine = seq_engine::start(pattern, &bank, tempo)?;
    let lead_frames = engine.sample_rate() as u64 / 20;
    engine.send(Command::Play { lead_frames });

    let deadline = std::time::Instant::now() + Duration::from_secs_f64(tempo.bar_secs() * 2.0);
    while std::time::Instant::now() < deadline {
        for status in engine.drain_status() {
            println!("{status:?}");
        }
        engine.collect();
        std::thread::sleep(Duration::from_millis(20));
    }

    engine.send(Command::Stop);
    std::thread::sleep(Duration::from_millis(200));
    Ok(())
}
