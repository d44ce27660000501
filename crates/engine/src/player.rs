use std::sync::Arc;

use basedrop::SharedCell;
use seq_transport::{Clock, Command, Pattern, SampleBank, Status, Tempo, TrackId, firing_tracks};

/// Voices that may ring at once across all tracks. Fixed so the audio thread
/// never allocates.
pub const MAX_VOICES: usize = 32;

#[derive(Debug, Clone, Copy)]
struct Voice {
    track: TrackId,
    frame: usize,
    active: bool,
}

impl Voice {
    const IDLE: Voice = Voice {
        track: TrackId(0),
        frame: 0,
        active: false,
    };
}

/// The live sequencer, independent of any audio device.
///
/// Fed interleaved output blocks by the device callback. Reads the pattern
/// and sample bank through lock-free cells at the instant each tick fires.
pub struct LivePlayer {
    sample_rate: u32,
    channels: usize,
    position: u64,
    tempo: Tempo,
    clock: Option<Clock>,
    cursor: Option<usize>,
    voices: [Voice; MAX_VOICES],
    pattern: Arc<SharedCell<Pattern>>,
    bank: Arc<SharedCell<SampleBank>>,
    commands: rtrb::Consumer<Command>,
    status: rtrb::Producer<Status>,
}

impl LivePlayer {
    pub fn new(
        sample_rate: u32,
        channels: usize,
        tempo: Tempo,
        pattern: Arc<SharedCell<Pattern>>,
        bank: Arc<SharedCell<SampleBank>>,
        commands: rtrb::Consumer<Command>,
        status: rtrb::Producer<Status>,
    ) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
            position: 0,
            tempo,
            clock: None,
            cursor: None,
            voices: [Voice::IDLE; MAX_VOICES],
            pattern,
            bank,
            commands,
            status,
        }
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_some()
    }

    /// Frames rendered since the player was created.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    /// Fill one interleaved block, overwriting its contents.
    pub fn process(&mut self, out: &mut [f32]) {
        self.drain_commands();

        let mut bank = self.bank.get();
        for frame in out.chunks_mut(self.channels) {
            frame.fill(0.0);

            while self
                .clock
                .as_ref()
                .is_some_and(|clock| clock.next_frame() <= self.position)
            {
                bank = self.bank.get();
                self.fire_tick(&bank);
            }

            self.mix_frame(&bank, frame);
            self.position += 1;
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                Command::Play { lead_frames } => {
                    if self.clock.is_none() {
                        self.cursor = None;
                        self.clock = Some(Clock::new(
                            self.tempo,
                            self.sample_rate,
                            self.position + lead_frames,
                        ));
                    }
                }
                Command::Stop => {
                    self.clock = None;
                    self.cursor = None;
                    let _ = self.status.push(Status::Cursor(None));
                }
                Command::SetTempo(tempo) => {
                    self.tempo = tempo;
                    if let Some(clock) = self.clock.as_mut() {
                        clock.set_tempo(tempo);
                    }
                }
            }
        }
    }

    fn fire_tick(&mut self, bank: &SampleBank) {
        let tick = match self.clock.as_mut() {
            Some(clock) => clock.advance(),
            None => return,
        };

        let pattern = self.pattern.get();
        for track in firing_tracks(&pattern, &tick) {
            if bank.is_loaded(track) {
                self.start_voice(track);
            } else {
                let _ = self.status.push(Status::SampleSkipped(track));
            }
        }

        self.cursor = Some(tick.step);
        let _ = self.status.push(Status::Cursor(self.cursor));
    }

    fn start_voice(&mut self, track: TrackId) {
        // steal the voice that has played longest when the pool is full
        let slot = match self.voices.iter().position(|v| !v.active) {
            Some(slot) => slot,
            None => self
                .voices
                .iter()
                .enumerate()
                .max_by_key(|(_, v)| v.frame)
                .map_or(0, |(slot, _)| slot),
        };
        self.voices[slot] = Voice {
            track,
            frame: 0,
            active: true,
        };
    }

    fn mix_frame(&mut self, bank: &SampleBank, frame: &mut [f32]) {
        for voice in self.voices.iter_mut().filter(|v| v.active) {
            let Some(audio) = bank.sample(voice.track) else {
                voice.active = false;
                continue;
            };
            if voice.frame >= audio.frames() {
                voice.active = false;
                continue;
            }

            let gain = bank.gain(voice.track);
            for (ch, out) in frame.iter_mut().enumerate() {
                *out += audio.frame_sample(voice.frame, ch) * gain;
            }
            voice.frame += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basedrop::{Collector, Handle, Shared};
    use seq_transport::{AudioArc, STEP_COUNT, Track};

    // 120 BPM at 1 kHz: 125 frames per step, 2000 per bar
    const RATE: u32 = 1000;
    const STEP: usize = 125;

    // the collector is declared last so it outlives every `Shared`
    struct Rig {
        handle: Handle,
        player: LivePlayer,
        commands: rtrb::Producer<Command>,
        status: rtrb::Consumer<Status>,
        pattern: Arc<SharedCell<Pattern>>,
        bank: Arc<SharedCell<SampleBank>>,
        _collector: Collector,
    }

    impl Rig {
        fn new(pattern: Pattern, bank: SampleBank) -> Self {
            let collector = Collector::new();
            let handle = collector.handle();
            let pattern = Arc::new(SharedCell::new(Shared::new(&handle, pattern)));
            let bank = Arc::new(SharedCell::new(Shared::new(&handle, bank)));
            let (commands, command_rx) = rtrb::RingBuffer::new(16);
            let (status_tx, status) = rtrb::RingBuffer::new(1024);
            let player = LivePlayer::new(
                RATE,
                1,
                Tempo::new(120.0),
                pattern.clone(),
                bank.clone(),
                command_rx,
                status_tx,
            );
            Self {
                handle,
                player,
                commands,
                status,
                pattern,
                bank,
                _collector: collector,
            }
        }

        fn send(&mut self, command: Command) {
            self.commands.push(command).expect("command queue full");
        }

        fn run(&mut self, frames: usize) -> Vec<f32> {
            let mut out = vec![0.0; frames];
            for block in out.chunks_mut(64) {
                self.player.process(block);
            }
            out
        }

        fn statuses(&mut self) -> Vec<Status> {
            let mut all = Vec::new();
            while let Ok(status) = self.status.pop() {
                all.push(status);
            }
            all
        }

        fn cursors(&mut self) -> Vec<Option<usize>> {
            self.statuses()
                .into_iter()
                .filter_map(|s| match s {
                    Status::Cursor(c) => Some(c),
                    _ => None,
                })
                .collect()
        }
    }

    fn unity_tracks() -> Vec<Track> {
        (0..3)
            .map(|i| Track::new(TrackId(i), format!("t{i}"), format!("t{i}.wav"), 0.0))
            .collect()
    }

    fn loaded_bank(len: usize) -> SampleBank {
        let mut bank = SampleBank::new(&unity_tracks());
        for i in 0..3 {
            bank.insert(TrackId(i), AudioArc::mono(vec![1.0; len], RATE));
        }
        bank
    }

    #[test]
    fn test_stopped_player_is_silent() {
        let mut rig = Rig::new(Pattern::new(3), loaded_bank(10));
        let out = rig.run(1000);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(rig.player.cursor(), None);
        assert!(rig.statuses().is_empty());
    }

    #[test]
    fn test_cursor_wraps_after_a_bar() {
        let mut rig = Rig::new(Pattern::new(3), loaded_bank(10));
        rig.send(Command::Play { lead_frames: 0 });
        rig.run(STEP * STEP_COUNT * 2);

        let expected: Vec<Option<usize>> =
            (0..STEP_COUNT).chain(0..STEP_COUNT).map(Some).collect();
        assert_eq!(rig.cursors(), expected);
    }

    #[test]
    fn test_single_cell_fires_once_per_bar() {
        let mut pattern = Pattern::new(3);
        pattern.set(TrackId(0), 4, true).unwrap();
        let mut rig = Rig::new(pattern, loaded_bank(10));
        rig.send(Command::Play { lead_frames: 0 });

        let out = rig.run(STEP * STEP_COUNT);
        let sounding: Vec<usize> = (0..out.len()).filter(|&i| out[i] != 0.0).collect();
        let expected: Vec<usize> = (4 * STEP..4 * STEP + 10).collect();
        assert_eq!(sounding, expected);
    }

    #[test]
    fn test_lead_delays_first_tick() {
        let mut pattern = Pattern::new(3);
        pattern.set(TrackId(1), 0, true).unwrap();
        let mut rig = Rig::new(pattern, loaded_bank(5));
        rig.send(Command::Play { lead_frames: 50 });

        let out = rig.run(100);
        assert_eq!(out[49], 0.0);
        assert_eq!(out[50], 1.0);
        assert_eq!(out[54], 1.0);
        assert_eq!(out[55], 0.0);
    }

    #[test]
    fn test_toggle_is_heard_on_next_tick() {
        let mut rig = Rig::new(Pattern::new(3), loaded_bank(5));
        rig.send(Command::Play { lead_frames: 0 });
        // ticks 0, 1 and 2 have fired
        rig.run(3 * STEP - 10);

        let toggled = rig.pattern.get().toggled(TrackId(2), 3).unwrap();
        rig.pattern.set(Shared::new(&rig.handle, toggled));

        let out = rig.run(STEP + 20);
        // tick 3 lands 10 frames into this block
        assert_eq!(out[9], 0.0);
        assert_eq!(out[10], 1.0);
    }

    #[test]
    fn test_missing_sample_is_skipped() {
        let mut pattern = Pattern::new(3);
        pattern.set(TrackId(0), 0, true).unwrap();
        pattern.set(TrackId(1), 1, true).unwrap();
        let mut bank = SampleBank::new(&unity_tracks());
        bank.insert(TrackId(1), AudioArc::mono(vec![0.5; 4], RATE));
        let mut rig = Rig::new(pattern, bank);
        rig.send(Command::Play { lead_frames: 0 });

        let out = rig.run(2 * STEP);
        assert!(out[..STEP].iter().all(|&s| s == 0.0));
        assert_eq!(out[STEP], 0.5);

        let statuses = rig.statuses();
        assert!(statuses.contains(&Status::SampleSkipped(TrackId(0))));
        assert!(statuses.contains(&Status::Cursor(Some(1))));
        assert!(rig.player.is_playing());
    }

    #[test]
    fn test_sample_loaded_mid_playback_becomes_audible() {
        let mut pattern = Pattern::new(3);
        pattern.set(TrackId(0), 0, true).unwrap();
        let mut rig = Rig::new(pattern, SampleBank::new(&unity_tracks()));
        rig.send(Command::Play { lead_frames: 0 });
        assert!(rig.run(STEP * STEP_COUNT).iter().all(|&s| s == 0.0));

        let loaded = rig
            .bank
            .get()
            .with_sample(TrackId(0), AudioArc::mono(vec![1.0; 3], RATE));
        rig.bank.set(Shared::new(&rig.handle, loaded));

        let out = rig.run(10);
        assert_eq!(&out[..4], &[1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_stop_resets_cursor_and_lets_tails_ring() {
        let mut pattern = Pattern::new(3);
        pattern.set(TrackId(0), 0, true).unwrap();
        let mut rig = Rig::new(pattern, loaded_bank(200));
        rig.send(Command::Play { lead_frames: 0 });
        rig.run(50);
        rig.statuses();

        rig.send(Command::Stop);
        let out = rig.run(STEP * STEP_COUNT);
        assert!(out[..150].iter().all(|&s| s == 1.0));
        assert!(out[150..].iter().all(|&s| s == 0.0));

        assert_eq!(rig.player.cursor(), None);
        assert!(!rig.player.is_playing());
        assert_eq!(rig.cursors(), vec![None]);
    }

    #[test]
    fn test_restart_begins_at_step_zero() {
        let mut rig = Rig::new(Pattern::new(3), loaded_bank(1));
        rig.send(Command::Play { lead_frames: 0 });
        rig.run(5 * STEP + 1);
        rig.send(Command::Stop);
        rig.run(10);
        rig.statuses();

        rig.send(Command::Play { lead_frames: 0 });
        rig.run(1);
        assert_eq!(rig.cursors(), vec![Some(0)]);
    }

    #[test]
    fn test_tempo_change_applies_from_next_tick() {
        let mut rig = Rig::new(Pattern::new(3), loaded_bank(1));
        rig.send(Command::Play { lead_frames: 0 });
        rig.run(STEP + 1); // ticks 0 and 1
        rig.send(Command::SetTempo(Tempo::new(60.0)));

        // tick 2 keeps its slot at 250, tick 3 follows at 250 + 250
        rig.run(2 * STEP - 1);
        assert_eq!(rig.player.cursor(), Some(2));
        rig.run(2 * STEP);
        assert_eq!(rig.player.cursor(), Some(3));
        assert_eq!(rig.player.tempo().bpm(), 60.0);
    }

    #[test]
    fn test_mono_sample_fills_every_channel() {
        let collector = Collector::new();
        let handle = collector.handle();
        let mut pattern = Pattern::new(3);
        pattern.set(TrackId(0), 0, true).unwrap();
        let pattern = Arc::new(SharedCell::new(Shared::new(&handle, pattern)));
        let bank = Arc::new(SharedCell::new(Shared::new(&handle, loaded_bank(2))));
        let (mut commands, command_rx) = rtrb::RingBuffer::new(4);
        let (status_tx, _status) = rtrb::RingBuffer::new(64);
        let mut player =
            LivePlayer::new(RATE, 2, Tempo::new(120.0), pattern, bank, command_rx, status_tx);

        commands.push(Command::Play { lead_frames: 0 }).unwrap();
        let mut out = vec![0.0; 8];
        player.process(&mut out);
        assert_eq!(out, vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
    }
}
