//! Error types for password derivation.

use thiserror::Error;

/// Errors produced while reducing motion samples or deriving a password.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The settings cannot produce a password (empty alphabet, length out
    /// of range, or categories that can never all appear together).
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// The seed has the wrong length or encoding.
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    /// Every selected category could not be covered within the retry budget.
    #[error("Could not cover every selected category after {attempts} attempts")]
    CoverageUnsatisfiable { attempts: usize },

    /// A motion sample could not be serialized.
    #[error("Malformed motion sample at index {index}: {reason}")]
    MalformedSample { index: usize, reason: String },

    /// The number of motion samples does not match the collection threshold.
    #[error("Expected {expected} motion samples, got {actual}")]
    SampleCount { expected: usize, actual: usize },

    /// A sample was recorded while no collection session was active.
    #[error("Collector is not collecting")]
    NotCollecting,

    /// The expander block counter ran out of encodable values.
    #[error("Expander block counter exhausted")]
    ExpanderExhausted,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_invalid_settings() {
        let err = Error::InvalidSettings("alphabet is empty".into());
        assert_eq!(err.to_string(), "Invalid settings: alphabet is empty");
    }

    #[test]
    fn test_display_coverage_unsatisfiable() {
        let err = Error::CoverageUnsatisfiable { attempts: 1000 };
        assert_eq!(
            err.to_string(),
            "Could not cover every selected category after 1000 attempts"
        );
    }

    #[test]
    fn test_display_sample_count() {
        let err = Error::SampleCount {
            expected: 100,
            actual: 42,
        };
        assert_eq!(err.to_string(), "Expected 100 motion samples, got 42");
    }
}
