//! Error types and result aliases for strata.
//!
//! Failures in an archive pass are local by design: one bad record, one
//! conflicted window, or one rejected persist must never abort sibling
//! entities or sibling windows. These types carry enough structure for the
//! coordinator to aggregate outcomes instead of failing fast.

use std::fmt;

/// The result type used throughout strata.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while archiving.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input was provided (empty planner input, non-positive window
    /// duration, or an unparseable record timestamp).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The record source failed (transport or query failure).
    #[error("source error: {message}")]
    Source {
        /// Description of the source failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The artifact sink failed (unreachable, quota, permission).
    #[error("sink error: {message}")]
    Sink {
        /// Description of the sink failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An artifact could not be serialized.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a source error wrapping an underlying cause.
    #[must_use]
    pub fn source_with(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Source {
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    /// Creates a new sink error with the given message.
    #[must_use]
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a sink error wrapping an underlying cause.
    #[must_use]
    pub fn sink_with(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Sink {
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// A compact single-line rendering used in aggregated results.
///
/// Unlike `Display`, this includes the first-level cause so reports stay
/// useful without the full source chain.
pub fn render_brief(error: &Error) -> String {
    struct Brief<'a>(&'a Error);
    impl fmt::Display for Brief<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)?;
            if let Error::Source {
                source: Some(cause),
                ..
            }
            | Error::Sink {
                source: Some(cause),
                ..
            } = self.0
            {
                write!(f, ": {cause}")?;
            }
            Ok(())
        }
    }
    Brief(error).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_error_preserves_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let err = Error::sink_with("put failed", cause);
        assert!(err.to_string().contains("put failed"));
        assert!(render_brief(&err).contains("connection reset"));
    }

    #[test]
    fn render_brief_matches_display_without_a_cause() {
        let err = Error::InvalidInput("window duration must be positive".into());
        assert_eq!(render_brief(&err), err.to_string());
    }
}
