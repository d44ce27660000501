use crate::{AudioArc, Track, TrackId};

/// Readiness of one track's sample.
#[derive(Debug, Clone, Default)]
pub enum SampleSlot {
    #[default]
    NotLoaded,
    Loaded(AudioArc),
}

impl SampleSlot {
    pub fn audio(&self) -> Option<&AudioArc> {
        match self {
            SampleSlot::Loaded(audio) => Some(audio),
            SampleSlot::NotLoaded => None,
        }
    }
}

#[derive(Debug, Clone)]
struct BankEntry {
    gain: f32,
    slot: SampleSlot,
}

/// Two loaded tracks disagree on their native sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateMismatch {
    pub track: TrackId,
    pub expected: u32,
    pub found: u32,
}

/// Decoded sample data and linear gain per track, in track order.
///
/// Samples arrive asynchronously; until a track's slot is `Loaded` any trigger
/// for it is dropped. Cloning the bank shares the sample data.
#[derive(Debug, Clone, Default)]
pub struct SampleBank {
    entries: Vec<BankEntry>,
}

impl SampleBank {
    /// A bank with every slot `NotLoaded` and gains taken from the tracks.
    pub fn new(tracks: &[Track]) -> Self {
        Self {
            entries: tracks
                .iter()
                .map(|track| BankEntry {
                    gain: track.gain(),
                    slot: SampleSlot::NotLoaded,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Install a sample in place. Unknown tracks are ignored and reported as `false`.
    pub fn insert(&mut self, track: TrackId, audio: AudioArc) -> bool {
        match self.entries.get_mut(track.0) {
            Some(entry) => {
                entry.slot = SampleSlot::Loaded(audio);
                true
            }
            None => false,
        }
    }

    /// Copy of this bank with one more sample installed.
    pub fn with_sample(&self, track: TrackId, audio: AudioArc) -> Self {
        let mut next = self.clone();
        next.insert(track, audio);
        next
    }

    pub fn slot(&self, track: TrackId) -> Option<&SampleSlot> {
        self.entries.get(track.0).map(|entry| &entry.slot)
    }

    pub fn sample(&self, track: TrackId) -> Option<&AudioArc> {
        self.slot(track).and_then(SampleSlot::audio)
    }

    pub fn is_loaded(&self, track: TrackId) -> bool {
        self.sample(track).is_some()
    }

    pub fn loaded_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.slot.audio().is_some())
            .count()
    }

    pub fn gain(&self, track: TrackId) -> f32 {
        self.entries.get(track.0).map_or(0.0, |entry| entry.gain)
    }

    /// The sample rate shared by every loaded sample, `None` if nothing is loaded.
    pub fn common_sample_rate(&self) -> Result<Option<u32>, RateMismatch> {
        let mut rate = None;
        for (index, entry) in self.entries.iter().enumerate() {
            let Some(audio) = entry.slot.audio() else {
                continue;
            };
            match rate {
                None => rate = Some(audio.sample_rate()),
                Some(expected) if expected != audio.sample_rate() => {
                    return Err(RateMismatch {
                        track: TrackId(index),
                        expected,
                        found: audio.sample_rate(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(rate)
    }

    /// Copy of this bank with every loaded sample converted to `sample_rate`.
    pub fn resampled(&self, sample_rate: u32) -> anyhow::Result<Self> {
        let entries = self
            .entries
            .iter()
            .map(|entry| {
                let slot = match &entry.slot {
                    SampleSlot::Loaded(audio) => SampleSlot::Loaded(audio.resample(sample_rate)?),
                    SampleSlot::NotLoaded => SampleSlot::NotLoaded,
                };
                Ok(BankEntry {
                    gain: entry.gain,
                    slot,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_kit;
    use std::sync::Arc;

    #[test]
    fn test_new_bank_not_loaded() {
        let bank = SampleBank::new(&default_kit());
        assert_eq!(bank.len(), 3);
        assert_eq!(bank.loaded_count(), 0);
        assert!(matches!(bank.slot(TrackId(0)), Some(SampleSlot::NotLoaded)));
        assert!(bank.sample(TrackId(5)).is_none());
        assert_eq!(bank.common_sample_rate(), Ok(None));
    }

    #[test]
    fn test_gain_from_track_db() {
        let bank = SampleBank::new(&default_kit());
        assert!((bank.gain(TrackId(0)) - 0.707_946).abs() < 1e-5);
        assert_eq!(bank.gain(TrackId(7)), 0.0);
    }

    #[test]
    fn test_with_sample_copy_on_write() {
        let bank = SampleBank::new(&default_kit());
        let audio = AudioArc::mono(vec![0.5; 10], 44100);
        let loaded = bank.with_sample(TrackId(1), audio.clone());

        assert!(!bank.is_loaded(TrackId(1)));
        assert!(loaded.is_loaded(TrackId(1)));
        // the bank holds a reference, not a copy
        assert_eq!(Arc::strong_count(audio.samples_arc()), 2);
    }

    #[test]
    fn test_insert_unknown_track() {
        let mut bank = SampleBank::new(&default_kit());
        assert!(!bank.insert(TrackId(3), AudioArc::mono(vec![0.0], 44100)));
    }

    #[test]
    fn test_common_sample_rate_mismatch() {
        let mut bank = SampleBank::new(&default_kit());
        bank.insert(TrackId(0), AudioArc::mono(vec![0.0; 4], 44100));
        bank.insert(TrackId(2), AudioArc::mono(vec![0.0; 4], 44100));
        assert_eq!(bank.common_sample_rate(), Ok(Some(44100)));

        bank.insert(TrackId(1), AudioArc::mono(vec![0.0; 4], 48000));
        assert_eq!(
            bank.common_sample_rate(),
            Err(RateMismatch {
                track: TrackId(1),
                expected: 44100,
                found: 48000,
            })
        );
    }

    #[test]
    fn test_resampled_keeps_gains_and_slots() {
        let mut bank = SampleBank::new(&default_kit());
        bank.insert(TrackId(0), AudioArc::mono(vec![0.0; 441], 44100));
        let resampled = bank.resampled(48000).unwrap();

        assert_eq!(resampled.common_sample_rate(), Ok(Some(48000)));
        assert!(!resampled.is_loaded(TrackId(1)));
        assert_eq!(resampled.gain(TrackId(2)), bank.gain(TrackId(2)));
    }
}
