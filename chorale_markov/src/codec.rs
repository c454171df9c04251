// Fingerprint codec: windows and successors to structured table keys.
//
// A window of K chords is keyed by its intra-chord shape, not its register:
// each chord contributes the intervals between adjacent voices, followed by
// the exact durations of every voice in every chord. Transposing the whole
// window leaves the fingerprint unchanged; changing any interval or any
// duration changes it.
//
// A successor is keyed by the per-voice pitch delta from the last chord of
// the window plus the new chord's durations, so the output side of the
// table is transposition-invariant too.
//
// Both keys are typed records rather than concatenated strings. Digit
// concatenation would let intervals `1, 23` and `12, 3` collide; separate
// vectors cannot.

use crate::chord::{Beats, Chord, Pitch};
use crate::error::{KgramError, Result};
use serde::{Deserialize, Serialize};

/// Translation-invariant key for a window of chords.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint {
    /// `voices - 1` adjacent-voice intervals per chord, chord-major.
    intervals: Vec<i32>,
    /// `voices` durations per chord, chord-major.
    durations: Vec<Beats>,
}

/// Table value key: what happens to each voice on the next chord.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SuccessorKey {
    deltas: Vec<i32>,
    durations: Vec<Beats>,
}

/// Decoded successor: per-voice pitch deltas and new durations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Successor {
    pub deltas: Vec<i32>,
    pub durations: Vec<Beats>,
}

impl Successor {
    /// The motion from `previous` to `next`. `None` when either chord has a
    /// rest, since a delta into or out of silence is undefined, or when a
    /// delta does not fit in an `i32`.
    pub fn between(previous: &Chord, next: &Chord) -> Option<Successor> {
        let deltas = previous
            .pitches
            .iter()
            .zip(&next.pitches)
            .map(|(a, b)| match (a, b) {
                (Pitch::Note(a), Pitch::Note(b)) => b.checked_sub(*a),
                _ => None,
            })
            .collect::<Option<Vec<i32>>>()?;
        Some(Successor {
            deltas,
            durations: next.durations.clone(),
        })
    }
}

/// Encode a window of chords.
///
/// Fails with `InvalidWindow` on an empty window, a chord whose pitch and
/// duration counts differ or disagree with the first chord, or any rest.
pub fn encode_window(window: &[Chord]) -> Result<Fingerprint> {
    let Some(first) = window.first() else {
        return Err(KgramError::invalid_window("window is empty"));
    };
    let voices = first.voices();
    if voices == 0 {
        return Err(KgramError::invalid_window("chord has no voices"));
    }

    let mut intervals = Vec::with_capacity(window.len() * (voices - 1));
    let mut durations = Vec::with_capacity(window.len() * voices);
    for (slot, chord) in window.iter().enumerate() {
        if chord.pitches.len() != voices || chord.durations.len() != voices {
            return Err(KgramError::invalid_window(format!(
                "chord {slot} has {} pitches and {} durations, expected {voices}",
                chord.pitches.len(),
                chord.durations.len()
            )));
        }
        let notes = chord
            .pitches
            .iter()
            .map(|p| p.note())
            .collect::<Option<Vec<i32>>>()
            .ok_or_else(|| KgramError::invalid_window(format!("chord {slot} contains a rest")))?;
        for pair in notes.windows(2) {
            let interval = pair[1].checked_sub(pair[0]).ok_or_else(|| {
                KgramError::invalid_window(format!(
                    "chord {slot} spans {} to {}, beyond any interval",
                    pair[0], pair[1]
                ))
            })?;
            intervals.push(interval);
        }
        durations.extend_from_slice(&chord.durations);
    }

    Ok(Fingerprint {
        intervals,
        durations,
    })
}

pub fn encode_successor(successor: &Successor) -> SuccessorKey {
    SuccessorKey {
        deltas: successor.deltas.clone(),
        durations: successor.durations.clone(),
    }
}

pub fn decode_successor(key: &SuccessorKey) -> Successor {
    Successor {
        deltas: key.deltas.clone(),
        durations: key.durations.clone(),
    }
}
