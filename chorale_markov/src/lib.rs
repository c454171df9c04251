// Chorale Markov: K-gram model of four-voice chorale harmony.
//
// Trains a frequency table over windows of K consecutive chords drawn from a
// corpus of parsed chorales, then generates new chord sequences by sampling
// successors one chord at a time. Windows are keyed by their voicing shape
// (adjacent-voice intervals plus exact durations), so a progression learned
// in one key is available in every key.
//
// Architecture:
// - chord.rs:   Voice, Pitch / RawPitch, Beats, Chord, ChordSequence; hold resolution
// - codec.rs:   Window fingerprints and successor keys (structured, collision-free)
// - table.rs:   Fingerprint -> successor -> count table, with additive merge
// - sampler.rs: Count-weighted draw of one successor
// - engine.rs:  KgramEngine (record / sample over the table)
// - ingest.rs:  Circular windowing of training pieces, sequential + rayon training
// - driver.rs:  Rolling-window generator with octave register correction
// - corpus.rs:  JSON corpus loading and seed-window selection
// - config.rs:  GeneratorConfig (JSON, defaults, validation)
// - midi.rs:    Standard MIDI File output
// - error.rs:   KgramError
//
// The generator is deterministic given a corpus and a seed: all randomness
// comes from a caller-supplied `ChoraleRng`, and every map is ordered.

pub mod chord;
pub mod codec;
pub mod config;
pub mod corpus;
pub mod driver;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod midi;
pub mod sampler;
pub mod table;

pub use chorale_prng as prng;
pub use error::{KgramError, Result};
