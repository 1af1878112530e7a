//! Error types for connection-string construction.
//!
//! Every configuration problem is reported as [`UriError::InvalidArgument`],
//! whatever stage detected it. The [`InvalidArgumentKind`] tag records which
//! stage that was, for callers (and tests) that care, but it never changes the
//! rendered message.
//!
//! ```rust
//! use mongo_uri_core::{InvalidArgumentKind, UriError};
//!
//! let err = UriError::domain("heartbeatFrequencyMS must be at least 500, got 10");
//! assert!(err.is_invalid_argument());
//! assert_eq!(err.invalid_argument_kind(), Some(InvalidArgumentKind::Domain));
//! assert_eq!(
//!     err.to_string(),
//!     "invalid argument: heartbeatFrequencyMS must be at least 500, got 10"
//! );
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for connection-string operations.
pub type UriResult<T> = Result<T, UriError>;

/// Which stage rejected an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidArgumentKind {
    /// The URI does not follow the connection-string grammar.
    Grammar,
    /// A value is of the wrong type or outside its allowed range.
    Domain,
    /// Two or more individually valid options contradict each other.
    Conflict,
}

impl InvalidArgumentKind {
    /// Short lowercase name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grammar => "grammar",
            Self::Domain => "domain",
            Self::Conflict => "conflict",
        }
    }
}

impl fmt::Display for InvalidArgumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while building a [`ConnectionString`](crate::ConnectionString).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    /// The URI or an override is not an acceptable configuration.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Stage that rejected the input.
        kind: InvalidArgumentKind,
        /// Human-readable description naming the offending option, host or combination.
        message: String,
    },

    /// The SRV lookup failed or returned an unusable record set.
    #[error("SRV resolution failed for '{host}': {message}")]
    Resolution {
        /// SRV host that was being resolved.
        host: String,
        /// Description of the failure.
        message: String,
    },

    /// The SRV lookup did not complete in time.
    #[error("SRV resolution for '{host}' timed out after {timeout_ms}ms")]
    ResolutionTimeout {
        /// SRV host that was being resolved.
        host: String,
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// A URI was requested from an environment variable that is not set.
    #[error("environment variable not found: {0}")]
    EnvNotFound(String),
}

impl UriError {
    /// Create a grammar error.
    pub fn grammar(message: impl Into<String>) -> Self {
        Self::invalid_argument(InvalidArgumentKind::Grammar, message)
    }

    /// Create a value-domain error.
    pub fn domain(message: impl Into<String>) -> Self {
        Self::invalid_argument(InvalidArgumentKind::Domain, message)
    }

    /// Create a cross-option conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::invalid_argument(InvalidArgumentKind::Conflict, message)
    }

    /// Create an invalid-argument error of the given kind.
    pub fn invalid_argument(kind: InvalidArgumentKind, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            kind,
            message: message.into(),
        }
    }

    /// Create an SRV resolution error.
    pub fn resolution(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Check if this is an invalid-argument error.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// The invalid-argument kind, if this is an invalid-argument error.
    pub fn invalid_argument_kind(&self) -> Option<InvalidArgumentKind> {
        match self {
            Self::InvalidArgument { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Check if this error came from SRV resolution (including timeouts).
    pub fn is_resolution_error(&self) -> bool {
        matches!(self, Self::Resolution { .. } | Self::ResolutionTimeout { .. })
    }

    /// Check if this is an SRV resolution timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ResolutionTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = UriError::grammar("missing scheme");
        assert_eq!(err.invalid_argument_kind(), Some(InvalidArgumentKind::Grammar));

        let err = UriError::conflict("loadBalanced with replicaSet");
        assert_eq!(err.invalid_argument_kind(), Some(InvalidArgumentKind::Conflict));
        assert!(!err.is_resolution_error());

        let err = UriError::resolution("cluster0.example.com", "no records");
        assert!(err.is_resolution_error());
        assert!(!err.is_invalid_argument());
        assert!(!err.is_timeout());

        let err = UriError::ResolutionTimeout {
            host: "cluster0.example.com".to_string(),
            timeout_ms: 250,
        };
        assert!(err.is_timeout());
        assert!(err.is_resolution_error());
    }

    #[test]
    fn test_error_display_is_uniform_across_kinds() {
        for kind in [
            InvalidArgumentKind::Grammar,
            InvalidArgumentKind::Domain,
            InvalidArgumentKind::Conflict,
        ] {
            let err = UriError::invalid_argument(kind, "bad thing");
            assert_eq!(err.to_string(), "invalid argument: bad thing");
        }
    }

    #[test]
    fn test_resolution_display() {
        let err = UriError::ResolutionTimeout {
            host: "db.example.com".to_string(),
            timeout_ms: 1500,
        };
        assert_eq!(
            err.to_string(),
            "SRV resolution for 'db.example.com' timed out after 1500ms"
        );
        assert_eq!(
            UriError::EnvNotFound("MONGODB_URI".into()).to_string(),
            "environment variable not found: MONGODB_URI"
        );
    }
}
