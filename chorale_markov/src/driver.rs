// Generation driver: rolls a K-chord window forward through the model.
//
// Each `advance` samples a successor for the current window, applies its
// per-voice deltas to the newest chord, pulls the result back into the
// register band an octave at a time, then slides the window and appends the
// chord to the output.
//
// Register correction walks the voices in order and may shift the whole
// chord once per voice. A shift triggered by one voice is visible to the
// checks of the voices after it, so a chord spanning more than the band can
// move twice (or move and move back) in one step. That sequential behaviour
// is kept deliberately; `correct` reports how many shifts it made.
//
// See also: `engine.rs` for sampling, `ingest.rs` for how the deltas being
// replayed here were recorded.

use crate::chord::{Chord, ChordSequence, Pitch};
use crate::codec::{Successor, encode_window};
use crate::engine::KgramEngine;
use crate::error::{KgramError, Result};
use chorale_prng::ChoraleRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, trace};

pub const OCTAVE: i32 = 12;

/// Pitches below `lower` or above `upper` trigger an octave shift.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterBand {
    pub lower: i32,
    pub upper: i32,
}

impl Default for RegisterBand {
    fn default() -> Self {
        RegisterBand {
            lower: 30,
            upper: 80,
        }
    }
}

impl RegisterBand {
    /// Octave-correct `pitches` in place, checking voices in order. Rests
    /// neither trigger nor receive a shift. Returns the number of shifts.
    pub fn correct(&self, pitches: &mut [Pitch]) -> u32 {
        let mut shifts = 0;
        for voice in 0..pitches.len() {
            let Pitch::Note(p) = pitches[voice] else {
                continue;
            };
            let shift = if p < self.lower {
                OCTAVE
            } else if p > self.upper {
                -OCTAVE
            } else {
                continue;
            };
            trace!(voice, pitch = p, shift, "register correction");
            for pitch in pitches.iter_mut() {
                *pitch = pitch.offset(shift);
            }
            shifts += 1;
        }
        shifts
    }
}

/// Apply `successor` to `last`: each note moves by its delta, rests stay
/// rests, durations come from the successor.
pub fn next_chord(last: &Chord, successor: &Successor) -> Chord {
    Chord {
        pitches: last
            .pitches
            .iter()
            .zip(&successor.deltas)
            .map(|(&pitch, &delta)| pitch.offset(delta))
            .collect(),
        durations: successor.durations.clone(),
    }
}

/// Stateful generator over a frozen engine.
pub struct Generator<'e> {
    engine: &'e KgramEngine,
    band: RegisterBand,
    window: VecDeque<Chord>,
    output: ChordSequence,
}

impl<'e> Generator<'e> {
    /// Start from `seed`, which must be exactly K rest-free chords of the
    /// engine's voice count. The seed chords open the output.
    pub fn new(engine: &'e KgramEngine, seed: &[Chord], band: RegisterBand) -> Result<Self> {
        if seed.len() != engine.window_len() {
            return Err(KgramError::invalid_window(format!(
                "seed has {} chords, engine uses K={}",
                seed.len(),
                engine.window_len()
            )));
        }
        encode_window(seed)?;
        let output = ChordSequence::from_chords(engine.voices(), seed)
            .map_err(|e| KgramError::invalid_window(e.to_string()))?;
        Ok(Generator {
            engine,
            band,
            window: seed.iter().cloned().collect(),
            output,
        })
    }

    /// Generate one chord. `UnseenWindow` ends the run; the generator is
    /// left as it was before the call.
    pub fn advance(&mut self, rng: &mut ChoraleRng) -> Result<&Chord> {
        let window = self.window.make_contiguous();
        let successor = self.engine.sample(window, rng)?;
        let Some(last) = window.last() else {
            return Err(KgramError::invalid_window("rolling window is empty"));
        };

        let mut chord = next_chord(last, &successor);
        let shifts = self.band.correct(&mut chord.pitches);
        trace!(pitches = ?chord.pitches, shifts, "advanced");

        self.output.push(&chord)?;
        self.window.pop_front();
        self.window.push_back(chord);
        self.window
            .back()
            .ok_or_else(|| KgramError::invalid_window("rolling window is empty"))
    }

    /// The current K-chord context, oldest first.
    pub fn window(&self) -> impl Iterator<Item = &Chord> {
        self.window.iter()
    }

    pub fn output(&self) -> &ChordSequence {
        &self.output
    }

    pub fn into_output(self) -> ChordSequence {
        self.output
    }
}

/// Seed a generator, advance it `length` times, and return all K + length
/// chords.
pub fn generate(
    engine: &KgramEngine,
    seed: &[Chord],
    length: usize,
    band: RegisterBand,
    rng: &mut ChoraleRng,
) -> Result<ChordSequence> {
    let mut generator = Generator::new(engine, seed, band)?;
    for step in 0..length {
        if let Err(e) = generator.advance(rng) {
            debug!(step, error = %e, "generation stopped");
            return Err(e);
        }
    }
    debug!(chords = generator.output().len(), "generation complete");
    Ok(generator.into_output())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::Beats;

    fn beats(v: f64) -> Beats {
        Beats::new(v).unwrap()
    }

    fn notes(pitches: &[i32]) -> Vec<Pitch> {
        pitches.iter().map(|&p| Pitch::Note(p)).collect()
    }

    fn step(deltas: [i32; 4]) -> Successor {
        Successor {
            deltas: deltas.to_vec(),
            durations: vec![beats(1.0); 4],
        }
    }

    #[test]
    fn in_band_chord_unchanged() {
        let band = RegisterBand::default();
        let mut chord = notes(&[72, 64, 55, 36]);
        assert_eq!(band.correct(&mut chord), 0);
        assert_eq!(chord, notes(&[72, 64, 55, 36]));
    }

    #[test]
    fn low_voice_lifts_chord_an_octave() {
        let band = RegisterBand::default();
        let mut chord = notes(&[50, 45, 38, band.lower - 1]);
        assert_eq!(band.correct(&mut chord), 1);
        assert_eq!(chord, notes(&[62, 57, 50, 41]));
        let bass = chord[3].note().unwrap();
        assert!((band.lower..band.lower + OCTAVE).contains(&bass));
    }

    #[test]
    fn high_voice_drops_chord_an_octave() {
        let band = RegisterBand::default();
        let mut chord = notes(&[81, 76, 69, 60]);
        assert_eq!(band.correct(&mut chord), 1);
        assert_eq!(chord, notes(&[69, 64, 57, 48]));
    }

    #[test]
    fn sequential_check_can_shift_twice() {
        // Soprano trips the upper bound; after dropping, alto and bass are
        // below the lower bound and each lift the chord again.
        let band = RegisterBand {
            lower: 40,
            upper: 60,
        };
        let mut chord = notes(&[65, 50, 45, 35]);
        assert_eq!(band.correct(&mut chord), 3);
        assert_eq!(chord, notes(&[77, 62, 57, 47]));
    }

    #[test]
    fn rests_never_trigger_or_shift() {
        let band = RegisterBand::default();
        let mut chord = vec![Pitch::Note(60), Pitch::Rest, Pitch::Note(50), Pitch::Note(20)];
        assert_eq!(band.correct(&mut chord), 1);
        assert_eq!(
            chord,
            vec![Pitch::Note(72), Pitch::Rest, Pitch::Note(62), Pitch::Note(32)]
        );

        let mut silent = vec![Pitch::Rest; 4];
        assert_eq!(band.correct(&mut silent), 0);
        assert_eq!(silent, vec![Pitch::Rest; 4]);
    }

    #[test]
    fn next_chord_skips_rest_voices() {
        let last = Chord::new(
            vec![Pitch::Note(60), Pitch::Rest, Pitch::Note(52), Pitch::Note(48)],
            vec![beats(1.0); 4],
        );
        let next = next_chord(&last, &step([2, 5, -1, 0]));
        assert_eq!(
            next.pitches,
            vec![Pitch::Note(62), Pitch::Rest, Pitch::Note(51), Pitch::Note(48)]
        );
    }

    fn engine_with_loop(window_len: usize) -> (KgramEngine, Vec<Chord>) {
        // A two-chord oscillation, recorded in both directions.
        let a = Chord::notes(&[60, 55, 52, 48], beats(1.0));
        let b = Chord::notes(&[62, 57, 53, 50], beats(1.0));
        let mut engine = KgramEngine::new(window_len, 4).unwrap();
        let cycle = [a.clone(), b.clone(), a.clone(), b.clone(), a.clone()];
        for start in 0..2 {
            let window = &cycle[start..start + window_len];
            let next = &cycle[start + window_len];
            let successor = Successor::between(&window[window_len - 1], next).unwrap();
            engine.record(window, &successor).unwrap();
        }
        (engine, cycle[..window_len].to_vec())
    }

    #[test]
    fn generate_appends_length_chords_after_seed() {
        let (engine, seed) = engine_with_loop(2);
        let mut rng = ChoraleRng::new(11);
        let out = generate(&engine, &seed, 6, RegisterBand::default(), &mut rng).unwrap();
        assert_eq!(out.len(), 8);
        assert_eq!(out.chord(0).unwrap(), seed[0]);
        assert_eq!(out.chord(1).unwrap(), seed[1]);
        assert_eq!(out.pitches[0], notes(&[60, 62, 60, 62, 60, 62, 60, 62]));
    }

    #[test]
    fn window_len_one_rolls_in_place() {
        let (engine, seed) = engine_with_loop(1);
        let mut generator = Generator::new(&engine, &seed, RegisterBand::default()).unwrap();
        let mut rng = ChoraleRng::new(3);
        let first = generator.advance(&mut rng).unwrap().clone();
        assert_eq!(first.pitches, notes(&[62, 57, 53, 50]));
        assert_eq!(generator.window().count(), 1);
        assert_eq!(generator.window().next(), Some(&first));
        generator.advance(&mut rng).unwrap();
        assert_eq!(generator.output().len(), 3);
    }

    #[test]
    fn unseen_window_aborts_run() {
        let (engine, _) = engine_with_loop(2);
        let stranger = [
            Chord::notes(&[60, 60, 60, 60], beats(1.0)),
            Chord::notes(&[60, 60, 60, 60], beats(1.0)),
        ];
        let mut rng = ChoraleRng::new(0);
        let err = generate(&engine, &stranger, 4, RegisterBand::default(), &mut rng).unwrap_err();
        assert!(matches!(err, KgramError::UnseenWindow));
    }

    #[test]
    fn failed_advance_leaves_state() {
        let (engine, _) = engine_with_loop(2);
        let chord = Chord::notes(&[70, 60, 50, 40], beats(2.0));
        let stranger = [chord.clone(), chord];
        let mut generator = Generator::new(&engine, &stranger, RegisterBand::default()).unwrap();
        assert!(generator.advance(&mut ChoraleRng::new(1)).is_err());
        assert_eq!(generator.output().len(), 2);
        assert_eq!(generator.window().count(), 2);
    }

    #[test]
    fn seed_must_be_k_rest_free_chords() {
        let (engine, seed) = engine_with_loop(2);
        assert!(Generator::new(&engine, &seed[..1], RegisterBand::default()).is_err());

        let mut resting = seed.clone();
        resting[0].pitches[2] = Pitch::Rest;
        let err = Generator::new(&engine, &resting, RegisterBand::default())
            .err()
            .unwrap();
        assert!(matches!(err, KgramError::InvalidWindow { .. }));
    }

    #[test]
    fn drifting_model_is_held_in_band() {
        // Every step climbs a fifth in all voices; correction keeps it bounded.
        let a = Chord::notes(&[60, 55, 52, 48], beats(1.0));
        let mut engine = KgramEngine::new(1, 4).unwrap();
        engine.record(&[a.clone()], &step([7, 7, 7, 7])).unwrap();
        let band = RegisterBand::default();
        let out = generate(&engine, &[a], 50, band, &mut ChoraleRng::new(9)).unwrap();
        for voice in &out.pitches {
            for pitch in voice {
                let p = pitch.note().unwrap();
                assert!(p >= band.lower - OCTAVE && p <= band.upper + OCTAVE, "pitch {p}");
            }
        }
        let soprano_top = out.pitches[0].iter().filter_map(|p| p.note()).max().unwrap();
        assert!(soprano_top <= band.upper);
    }
}
