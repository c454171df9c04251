// Chord data model: voices, pitches, durations, and chord sequences.
//
// A piece is a voice-major matrix: `pitches[voice][slot]` and
// `durations[voice][slot]`, index-aligned so that one slot across all voices
// is one `Chord`. Raw notation output carries three kinds of voice value
// (`RawPitch`: a note, a hold, or a rest); hold resolution collapses holds
// into the previous value so the Markov core only ever sees `Pitch::Note` or
// `Pitch::Rest`.
//
// The voice count is data, not a constant. `DEFAULT_VOICES` (SATB) is only
// the default for configs and the CLI.
//
// See also: `codec.rs` which turns windows of chords into table keys,
// `corpus.rs` which deserializes raw pieces and resolves them.

use crate::error::{KgramError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};
use std::ops::RangeInclusive;

/// Voice count of a four-part chorale.
pub const DEFAULT_VOICES: usize = 4;

/// Pitches accepted from training data: the MIDI note range.
pub const PITCH_RANGE: RangeInclusive<i32> = 0..=127;

/// Voice index in SATB order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Voice {
    Soprano = 0,
    Alto = 1,
    Tenor = 2,
    Bass = 3,
}

impl Voice {
    pub const ALL: [Voice; 4] = [Voice::Soprano, Voice::Alto, Voice::Tenor, Voice::Bass];

    pub fn from_index(index: usize) -> Option<Voice> {
        Voice::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Voice::Soprano => "Soprano",
            Voice::Alto => "Alto",
            Voice::Tenor => "Tenor",
            Voice::Bass => "Bass",
        }
    }
}

/// Display label for voice `index`, falling back to a numbered label
/// beyond the four SATB parts.
pub fn voice_label(index: usize) -> String {
    match Voice::from_index(index) {
        Some(voice) => voice.name().to_string(),
        None => format!("Voice {}", index + 1),
    }
}

/// A resolved voice value.
///
/// Serialized as a bare integer for a note and `null` for a rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pitch {
    /// Absolute pitch in semitones (MIDI numbering, C4 = 60).
    Note(i32),
    /// The voice is silent.
    Rest,
}

impl Pitch {
    pub fn is_rest(self) -> bool {
        matches!(self, Pitch::Rest)
    }

    pub fn note(self) -> Option<i32> {
        match self {
            Pitch::Note(p) => Some(p),
            Pitch::Rest => None,
        }
    }

    /// Shift a note by `semitones`, saturating at the `i32` bounds. A rest
    /// stays a rest.
    pub fn offset(self, semitones: i32) -> Pitch {
        match self {
            Pitch::Note(p) => Pitch::Note(p.saturating_add(semitones)),
            Pitch::Rest => Pitch::Rest,
        }
    }
}

/// A voice value as produced by the notation parser, before hold resolution.
///
/// JSON form follows the Humdrum convention: an integer for a note, `"."`
/// for a continuation of the previous value, `"r"` for a rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawToken", into = "RawToken")]
pub enum RawPitch {
    Note(i32),
    Hold,
    Rest,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawToken {
    Number(i32),
    Mark(String),
}

impl TryFrom<RawToken> for RawPitch {
    type Error = String;

    fn try_from(token: RawToken) -> std::result::Result<Self, Self::Error> {
        match token {
            RawToken::Number(p) => Ok(RawPitch::Note(p)),
            RawToken::Mark(mark) => match mark.as_str() {
                "." => Ok(RawPitch::Hold),
                "r" => Ok(RawPitch::Rest),
                other => Err(format!("unknown pitch token `{other}`")),
            },
        }
    }
}

impl From<RawPitch> for RawToken {
    fn from(raw: RawPitch) -> Self {
        match raw {
            RawPitch::Note(p) => RawToken::Number(p),
            RawPitch::Hold => RawToken::Mark(".".to_string()),
            RawPitch::Rest => RawToken::Mark("r".to_string()),
        }
    }
}

/// Replace every `Hold` with the previous resolved value of the same voice.
///
/// A hold after a rest continues the silence. A hold in the first slot has
/// nothing to continue and is rejected, as is a note outside `PITCH_RANGE`.
pub fn resolve_voice(raw: &[RawPitch]) -> Result<Vec<Pitch>> {
    let mut resolved = Vec::with_capacity(raw.len());
    let mut previous: Option<Pitch> = None;
    for (slot, &value) in raw.iter().enumerate() {
        let pitch = match value {
            RawPitch::Note(p) if PITCH_RANGE.contains(&p) => Pitch::Note(p),
            RawPitch::Note(p) => {
                return Err(KgramError::malformed(format!(
                    "pitch {p} in slot {slot} is outside {}..={}",
                    PITCH_RANGE.start(),
                    PITCH_RANGE.end()
                )));
            }
            RawPitch::Rest => Pitch::Rest,
            RawPitch::Hold => previous.ok_or_else(|| {
                KgramError::malformed(format!("hold in slot {slot} has no preceding value"))
            })?,
        };
        previous = Some(pitch);
        resolved.push(pitch);
    }
    Ok(resolved)
}

/// A duration in quarter-note beats.
///
/// Always finite and non-negative. Zero marks a slot in which the voice
/// sustains instead of re-attacking. Equality, ordering and hashing are
/// exact over the bit pattern, so durations can be key components.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Beats(f64);

impl Beats {
    pub const ZERO: Beats = Beats(0.0);

    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(KgramError::malformed(format!(
                "duration must be finite and non-negative, got {value}"
            )));
        }
        // Adding +0.0 folds -0.0 into 0.0.
        Ok(Beats(value + 0.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

impl TryFrom<f64> for Beats {
    type Error = KgramError;

    fn try_from(value: f64) -> Result<Self> {
        Beats::new(value)
    }
}

impl From<Beats> for f64 {
    fn from(beats: Beats) -> f64 {
        beats.0
    }
}

impl PartialEq for Beats {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Beats {}

impl Hash for Beats {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for Beats {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Beats {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// One time slot across all voices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chord {
    pub pitches: Vec<Pitch>,
    pub durations: Vec<Beats>,
}

impl Chord {
    pub fn new(pitches: Vec<Pitch>, durations: Vec<Beats>) -> Self {
        Chord { pitches, durations }
    }

    /// All-note chord with one shared duration. Mostly a test convenience.
    pub fn notes(pitches: &[i32], duration: Beats) -> Self {
        Chord {
            pitches: pitches.iter().map(|&p| Pitch::Note(p)).collect(),
            durations: vec![duration; pitches.len()],
        }
    }

    pub fn voices(&self) -> usize {
        self.pitches.len()
    }

    pub fn has_rest(&self) -> bool {
        self.pitches.iter().any(|p| p.is_rest())
    }

    pub fn transposed(&self, semitones: i32) -> Chord {
        Chord {
            pitches: self.pitches.iter().map(|p| p.offset(semitones)).collect(),
            durations: self.durations.clone(),
        }
    }
}

/// Voice-major pitch and duration matrices for a whole piece.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordSequence {
    pub pitches: Vec<Vec<Pitch>>,
    pub durations: Vec<Vec<Beats>>,
}

impl ChordSequence {
    /// An empty sequence with `voices` parts.
    pub fn new(voices: usize) -> Self {
        ChordSequence {
            pitches: vec![Vec::new(); voices],
            durations: vec![Vec::new(); voices],
        }
    }

    pub fn from_chords(voices: usize, chords: &[Chord]) -> Result<Self> {
        let mut sequence = ChordSequence::new(voices);
        for chord in chords {
            sequence.push(chord)?;
        }
        Ok(sequence)
    }

    pub fn voices(&self) -> usize {
        self.pitches.len()
    }

    /// Number of slots (chords).
    pub fn len(&self) -> usize {
        self.pitches.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that every voice has the same number of pitches and durations,
    /// and that every note lies in `PITCH_RANGE`.
    pub fn validate(&self) -> Result<()> {
        if self.pitches.len() != self.durations.len() {
            return Err(KgramError::malformed(format!(
                "{} pitch voices but {} duration voices",
                self.pitches.len(),
                self.durations.len()
            )));
        }
        let len = self.len();
        for (voice, (pitches, durations)) in self.pitches.iter().zip(&self.durations).enumerate() {
            if pitches.len() != len || durations.len() != len {
                return Err(KgramError::malformed(format!(
                    "{} has {} pitches and {} durations, expected {len} of each",
                    voice_label(voice),
                    pitches.len(),
                    durations.len()
                )));
            }
            let stray = pitches.iter().enumerate().find_map(|(slot, p)| {
                p.note()
                    .filter(|n| !PITCH_RANGE.contains(n))
                    .map(|n| (slot, n))
            });
            if let Some((slot, note)) = stray {
                return Err(KgramError::malformed(format!(
                    "{} has pitch {note} in slot {slot}, outside {}..={}",
                    voice_label(voice),
                    PITCH_RANGE.start(),
                    PITCH_RANGE.end()
                )));
            }
        }
        Ok(())
    }

    /// The chord at `slot`, or `None` past the end.
    pub fn chord(&self, slot: usize) -> Option<Chord> {
        if slot >= self.len() {
            return None;
        }
        Some(Chord {
            pitches: self.pitches.iter().map(|v| v[slot]).collect(),
            durations: self.durations.iter().map(|v| v[slot]).collect(),
        })
    }

    pub fn chords(&self) -> impl Iterator<Item = Chord> + '_ {
        (0..self.len()).filter_map(|slot| self.chord(slot))
    }

    pub fn push(&mut self, chord: &Chord) -> Result<()> {
        if chord.pitches.len() != self.voices() || chord.durations.len() != self.voices() {
            return Err(KgramError::malformed(format!(
                "chord has {} pitches and {} durations, sequence has {} voices",
                chord.pitches.len(),
                chord.durations.len(),
                self.voices()
            )));
        }
        for (voice, (&pitch, &duration)) in chord.pitches.iter().zip(&chord.durations).enumerate() {
            self.pitches[voice].push(pitch);
            self.durations[voice].push(duration);
        }
        Ok(())
    }

    /// Compact per-voice rendering: `name:beats` per attack, `r:beats` per
    /// rest, `~` for a sustained (zero-duration) slot.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for voice in 0..self.voices() {
            let _ = write!(out, "{:>8}:", voice_label(voice));
            for (pitch, duration) in self.pitches[voice].iter().zip(&self.durations[voice]) {
                if duration.is_zero() {
                    out.push_str(" ~");
                    continue;
                }
                let label = match pitch {
                    Pitch::Note(p) => pitch_name(*p),
                    Pitch::Rest => "r".to_string(),
                };
                let _ = write!(out, " {label}:{}", duration.value());
            }
            out.push('\n');
        }
        out
    }
}

/// Note name with octave, C4 = 60.
pub fn pitch_name(pitch: i32) -> String {
    const NAMES: [&str; 12] = [
        "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
    ];
    let octave = pitch.div_euclid(12) - 1;
    format!("{}{octave}", NAMES[pitch.rem_euclid(12) as usize])
}
