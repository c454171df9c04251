// Error taxonomy for training and generation.
//
// Every variant is a caller contract violation or a data-sparsity limit of
// the model. None of them is transient, so nothing in this crate retries:
// the caller decides whether to re-seed and run again.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KgramError {
    /// A window handed to the codec contains a rest or has the wrong shape.
    #[error("invalid window: {reason}")]
    InvalidWindow { reason: String },

    /// No transitions were ever recorded for this window's fingerprint.
    /// Terminal for the generation run in progress.
    #[error("window never observed in training; no continuation exists")]
    UnseenWindow,

    /// A training piece was rejected before any of its windows were recorded.
    #[error("malformed training data: {reason}")]
    MalformedTrainingData { reason: String },

    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The sequence cannot be laid out as a Standard MIDI File.
    #[error("cannot render MIDI: {reason}")]
    Render { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KgramError {
    pub(crate) fn invalid_window(reason: impl Into<String>) -> Self {
        KgramError::InvalidWindow {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        KgramError::MalformedTrainingData {
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = KgramError> = std::result::Result<T, E>;
