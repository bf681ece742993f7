//! Unified error handling for the pre-annotation engine.
//!
//! Absent or degenerate data never produces an error: the engine narrows its
//! output instead. The variants here cover caller contract violations and the
//! annotation follow-up operations.

use std::fmt;

/// Unified error type for pre-annotation operations.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotateError {
    /// A method trajectory contains a non-finite or out-of-range coordinate
    InvalidCoordinates {
        method: String,
        index: usize,
        message: String,
    },
    /// The same matching method was supplied more than once
    DuplicateMethod { method: String },
    /// Configuration error
    ConfigError { message: String },
    /// A mismatched area has no selected candidate
    UnresolvedArea { id: u32 },
    /// A selection points past the candidates of a mismatched area
    InvalidSelection {
        id: u32,
        selected: usize,
        candidate_count: usize,
    },
    /// An owner's index range runs backwards
    InvalidOwner {
        method: String,
        start_index: u32,
        end_index: u32,
    },
    /// JSON (de)serialization failed at the host boundary
    Serialization { message: String },
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for AnnotateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotateError::InvalidCoordinates {
                method,
                index,
                message,
            } => {
                write!(
                    f,
                    "Method '{}' has an invalid coordinate at index {}: {}",
                    method, index, message
                )
            }
            AnnotateError::DuplicateMethod { method } => {
                write!(f, "Method '{}' was supplied more than once", method)
            }
            AnnotateError::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            AnnotateError::UnresolvedArea { id } => {
                write!(f, "Mismatched area {} has no selected trajectory", id)
            }
            AnnotateError::InvalidSelection {
                id,
                selected,
                candidate_count,
            } => {
                write!(
                    f,
                    "Mismatched area {} has {} candidates, selection {} is out of range",
                    id, candidate_count, selected
                )
            }
            AnnotateError::InvalidOwner {
                method,
                start_index,
                end_index,
            } => {
                write!(
                    f,
                    "Owner '{}' ends at index {} before it starts at {}",
                    method, end_index, start_index
                )
            }
            AnnotateError::Serialization { message } => {
                write!(f, "Serialization error: {}", message)
            }
            AnnotateError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for AnnotateError {}

impl From<serde_json::Error> for AnnotateError {
    fn from(err: serde_json::Error) -> Self {
        AnnotateError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for pre-annotation operations.
pub type Result<T> = std::result::Result<T, AnnotateError>;

/// Extension trait for converting Option to AnnotateError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an unresolved area error.
    fn ok_or_unresolved(self, id: u32) -> Result<T>;

    /// Convert Option to Result with generic internal error.
    fn ok_or_internal(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_unresolved(self, id: u32) -> Result<T> {
        self.ok_or(AnnotateError::UnresolvedArea { id })
    }

    fn ok_or_internal(self, message: &str) -> Result<T> {
        self.ok_or_else(|| AnnotateError::Internal {
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnnotateError::InvalidCoordinates {
            method: "STMatching".to_string(),
            index: 3,
            message: "latitude is NaN".to_string(),
        };
        assert!(err.to_string().contains("STMatching"));
        assert!(err.to_string().contains("index 3"));

        let err = AnnotateError::InvalidSelection {
            id: 7,
            selected: 4,
            candidate_count: 2,
        };
        assert!(err.to_string().contains("area 7"));

        let err = AnnotateError::InvalidOwner {
            method: "GHMapMatching".to_string(),
            start_index: 5,
            end_index: 2,
        };
        assert!(err.to_string().contains("GHMapMatching"));
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        assert!(matches!(
            none.ok_or_unresolved(12),
            Err(AnnotateError::UnresolvedArea { id: 12 })
        ));
        assert!(matches!(
            none.ok_or_internal("missing track"),
            Err(AnnotateError::Internal { .. })
        ));
        assert_eq!(Some(5).ok_or_internal("unused"), Ok(5));
    }

    #[test]
    fn test_from_serde_json() {
        let err: AnnotateError = serde_json::from_str::<Vec<u32>>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, AnnotateError::Serialization { .. }));
    }
}
