// K-gram engine: owns the transition table and exposes record / sample.
//
// `record` takes `&mut self` and `sample` takes `&self`, so once training is
// done and the engine is shared by reference with a generator, the borrow
// checker keeps the table frozen for the rest of the run.
//
// Sampling is exact-match only. A fingerprint with no recorded successors
// is `UnseenWindow`; there is no back-off to shorter windows and no default
// distribution.

use crate::chord::Chord;
use crate::codec::{
    Fingerprint, Successor, SuccessorKey, decode_successor, encode_successor, encode_window,
};
use crate::error::{KgramError, Result};
use crate::sampler::sample_weighted;
use crate::table::TransitionTable;
use chorale_prng::ChoraleRng;

#[derive(Debug, Clone)]
pub struct KgramEngine {
    window_len: usize,
    voices: usize,
    table: TransitionTable,
}

impl KgramEngine {
    pub fn new(window_len: usize, voices: usize) -> Result<Self> {
        if window_len == 0 {
            return Err(KgramError::InvalidConfig {
                field: "window_len",
                reason: "must be at least 1".into(),
            });
        }
        if voices == 0 {
            return Err(KgramError::InvalidConfig {
                field: "voices",
                reason: "must be at least 1".into(),
            });
        }
        Ok(KgramEngine {
            window_len,
            voices,
            table: TransitionTable::new(),
        })
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn voices(&self) -> usize {
        self.voices
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Count one observation of `successor` following `window`.
    pub fn record(&mut self, window: &[Chord], successor: &Successor) -> Result<()> {
        self.check_window(window)?;
        if successor.deltas.len() != self.voices || successor.durations.len() != self.voices {
            return Err(KgramError::invalid_window(format!(
                "successor has {} deltas and {} durations, expected {}",
                successor.deltas.len(),
                successor.durations.len(),
                self.voices
            )));
        }
        let fingerprint = encode_window(window)?;
        self.table.increment(fingerprint, encode_successor(successor));
        Ok(())
    }

    /// Count an already-encoded pair. Callers have validated the shape.
    pub(crate) fn record_encoded(&mut self, fingerprint: Fingerprint, successor: SuccessorKey) {
        self.table.increment(fingerprint, successor);
    }

    /// Draw a successor for `window`, weighted by recorded counts.
    pub fn sample(&self, window: &[Chord], rng: &mut ChoraleRng) -> Result<Successor> {
        self.check_window(window)?;
        let fingerprint = encode_window(window)?;
        let counts = self
            .table
            .successors(&fingerprint)
            .ok_or(KgramError::UnseenWindow)?;
        let key = sample_weighted(counts, rng).ok_or(KgramError::UnseenWindow)?;
        Ok(decode_successor(key))
    }

    /// Fold another engine's table into this one. Both must share K and the
    /// voice count.
    pub fn merge(&mut self, other: KgramEngine) -> Result<()> {
        if other.window_len != self.window_len || other.voices != self.voices {
            return Err(KgramError::InvalidConfig {
                field: "window_len",
                reason: format!(
                    "cannot merge a K={} {}-voice table into a K={} {}-voice table",
                    other.window_len, other.voices, self.window_len, self.voices
                ),
            });
        }
        self.table.merge(other.table);
        Ok(())
    }

    /// Shape checks beyond what the codec enforces: K chords of this
    /// engine's voice count.
    fn check_window(&self, window: &[Chord]) -> Result<()> {
        if window.len() != self.window_len {
            return Err(KgramError::invalid_window(format!(
                "window has {} chords, engine uses K={}",
                window.len(),
                self.window_len
            )));
        }
        if let Some(chord) = window.iter().find(|c| c.voices() != self.voices) {
            return Err(KgramError::invalid_window(format!(
                "chord has {} voices, engine uses {}",
                chord.voices(),
                self.voices
            )));
        }
        Ok(())
    }
}
