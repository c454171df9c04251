// Training corpus: parsed pieces on disk, hold resolution, seed choice.
//
// A corpus file is the JSON hand-off from the notation parser: one entry per
// piece, one `{ pitches, durations }` pair per voice, with Humdrum-style
// pitch tokens (integer, `"."` hold, `"r"` rest). Example:
//
//   { "pieces": [ { "name": "chor001",
//       "voices": [ { "pitches": [67, ".", 72], "durations": [1.0, 0.0, 2.0] },
//                   ... ] } ] }
//
// `resolve` turns each piece into the `ChordSequence` the Markov core
// consumes.

use crate::chord::{Beats, Chord, ChordSequence, RawPitch, resolve_voice, voice_label};
use crate::error::{KgramError, Result};
use chorale_prng::ChoraleRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVoice {
    pub pitches: Vec<RawPitch>,
    pub durations: Vec<Beats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPiece {
    #[serde(default)]
    pub name: String,
    pub voices: Vec<RawVoice>,
}

impl RawPiece {
    /// Resolve holds and check that every voice covers the same slots.
    pub fn resolve(&self) -> Result<ChordSequence> {
        let mut sequence = ChordSequence::new(0);
        for (index, voice) in self.voices.iter().enumerate() {
            if voice.pitches.len() != voice.durations.len() {
                return Err(KgramError::malformed(format!(
                    "{} of `{}` has {} pitches but {} durations",
                    voice_label(index),
                    self.name,
                    voice.pitches.len(),
                    voice.durations.len()
                )));
            }
            let pitches = resolve_voice(&voice.pitches).map_err(|e| {
                KgramError::malformed(format!("{} of `{}`: {e}", voice_label(index), self.name))
            })?;
            sequence.pitches.push(pitches);
            sequence.durations.push(voice.durations.clone());
        }
        if let Some(len) = self.voices.first().map(|v| v.pitches.len()) {
            if let Some((index, voice)) = self
                .voices
                .iter()
                .enumerate()
                .find(|(_, v)| v.pitches.len() != len)
            {
                return Err(KgramError::malformed(format!(
                    "{} of `{}` has {} slots, Soprano has {len}",
                    voice_label(index),
                    self.name,
                    voice.pitches.len()
                )));
            }
        }
        sequence.validate()?;
        Ok(sequence)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    pub pieces: Vec<RawPiece>,
}

impl Corpus {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let corpus = Self::from_json(&data)?;
        debug!(path = %path.display(), pieces = corpus.pieces.len(), "loaded corpus");
        Ok(corpus)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Resolve every piece; the first malformed piece fails the whole call.
    pub fn resolve_all(&self) -> Result<Vec<ChordSequence>> {
        self.pieces.iter().map(RawPiece::resolve).collect()
    }
}

/// Opening K chords of a uniformly chosen piece, for seeding generation.
///
/// Pieces shorter than K, or whose opening contains a rest, cannot seed and
/// are passed over.
pub fn choose_seed(
    pieces: &[ChordSequence],
    window_len: usize,
    rng: &mut ChoraleRng,
) -> Result<Vec<Chord>> {
    let usable: Vec<&ChordSequence> = pieces
        .iter()
        .filter(|p| p.len() >= window_len && p.chords().take(window_len).all(|c| !c.has_rest()))
        .collect();
    if usable.is_empty() {
        return Err(KgramError::malformed(format!(
            "no piece has a rest-free opening of {window_len} chords"
        )));
    }
    let piece = usable[rng.range_usize(0, usable.len())];
    Ok(piece.chords().take(window_len).collect())
}
