// Data-driven generator configuration.
//
// All tunable parameters live in `GeneratorConfig`, loaded from JSON (any
// field may be omitted and falls back to its default). The library never
// reads the environment or the clock; `seed: None` is resolved by the
// binary.

use crate::chord::DEFAULT_VOICES;
use crate::driver::RegisterBand;
use crate::error::{KgramError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Longest K-gram the generator accepts. Beyond this almost no window of a
/// chorale-sized corpus recurs, so generation stalls on the first step.
pub const MAX_WINDOW_LEN: usize = 40;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// K: chords of context per transition.
    pub window_len: usize,
    pub voices: usize,
    /// Octave-correction band for generated pitches.
    pub register: RegisterBand,
    /// Chords to generate after the seed window.
    pub length: usize,
    pub seed: Option<u64>,
    /// MIDI tempo, quarter notes per minute.
    pub tempo_bpm: u16,
    /// General MIDI program for every voice (6 = harpsichord).
    pub program: u8,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            window_len: 3,
            voices: DEFAULT_VOICES,
            register: RegisterBand::default(),
            length: 32,
            seed: None,
            tempo_bpm: 80,
            program: 6,
        }
    }
}

impl GeneratorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let config: GeneratorConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_len == 0 || self.window_len > MAX_WINDOW_LEN {
            return Err(KgramError::InvalidConfig {
                field: "window_len",
                reason: format!("must be in 1..={MAX_WINDOW_LEN}, got {}", self.window_len),
            });
        }
        if self.voices == 0 {
            return Err(KgramError::InvalidConfig {
                field: "voices",
                reason: "must be at least 1".into(),
            });
        }
        if self.register.lower > self.register.upper {
            return Err(KgramError::InvalidConfig {
                field: "register",
                reason: format!(
                    "lower ({}) is above upper ({})",
                    self.register.lower, self.register.upper
                ),
            });
        }
        if self.tempo_bpm == 0 {
            return Err(KgramError::InvalidConfig {
                field: "tempo_bpm",
                reason: "must be positive".into(),
            });
        }
        if self.program > 127 {
            return Err(KgramError::InvalidConfig {
                field: "program",
                reason: format!("General MIDI programs are 0..=127, got {}", self.program),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = GeneratorConfig::default();
        config.validate().unwrap();
        assert_eq!(config.voices, 4);
        assert_eq!(config.register, RegisterBand { lower: 30, upper: 80 });
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = GeneratorConfig::from_json(r#"{ "window_len": 2, "seed": 7 }"#).unwrap();
        assert_eq!(config.window_len, 2);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.length, GeneratorConfig::default().length);
    }

    #[test]
    fn register_band_from_json() {
        let config =
            GeneratorConfig::from_json(r#"{ "register": { "lower": 40, "upper": 76 } }"#).unwrap();
        assert_eq!(config.register, RegisterBand { lower: 40, upper: 76 });
    }

    #[test]
    fn oversized_window_rejected() {
        let err = GeneratorConfig::from_json(r#"{ "window_len": 41 }"#).unwrap_err();
        assert!(matches!(err, KgramError::InvalidConfig { field: "window_len", .. }));
    }

    #[test]
    fn inverted_register_rejected() {
        let config = GeneratorConfig {
            register: RegisterBand { lower: 80, upper: 30 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_json_is_json_error() {
        assert!(matches!(
            GeneratorConfig::from_json("{ window_len: }").unwrap_err(),
            KgramError::Json(_)
        ));
    }
}
