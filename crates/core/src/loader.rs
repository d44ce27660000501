use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use rayon::prelude::*;
use seq_decode::decode_file;
use seq_transport::{AudioArc, Track, TrackId};

/// Outcome of decoding one track's sample.
#[derive(Debug)]
pub struct SampleLoad {
    pub track: TrackId,
    pub result: anyhow::Result<AudioArc>,
}

/// Decode every track's sample in parallel, in track order.
pub fn decode_tracks(tracks: &[Track], samples_root: &Path) -> Vec<SampleLoad> {
    tracks
        .par_iter()
        .map(|track| SampleLoad {
            track: track.id,
            result: decode_file(&track.sample, samples_root),
        })
        .collect()
}

/// Sample decoding running off the calling thread.
pub struct BackgroundLoader {
    receiver: mpsc::Receiver<SampleLoad>,
    pending: usize,
}

impl BackgroundLoader {
    pub fn spawn(tracks: Vec<Track>, samples_root: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel();
        let pending = tracks.len();

        thread::spawn(move || {
            tracks.par_iter().for_each_with(tx, |tx, track| {
                let _ = tx.send(SampleLoad {
                    track: track.id,
                    result: decode_file(&track.sample, &samples_root),
                });
            });
        });

        Self {
            receiver: rx,
            pending,
        }
    }

    /// Results that arrived since the last call. Never blocks.
    pub fn drain(&mut self) -> Vec<SampleLoad> {
        let mut loads = Vec::new();
        while let Ok(load) = self.receiver.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            loads.push(load);
        }
        loads
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn is_finished(&self) -> bool {
        self.pending == 0
    }
}
