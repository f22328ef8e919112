//! Error types for SoilScope.
//!
//! Library crates use [`SoilScopeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Knowledge-base loading has its own narrower taxonomy: [`PatternError`] is
//! produced only by the pattern compiler, [`LoadError`] only by a load or
//! reload. Neither is ever produced while resolving a reply.

use std::path::PathBuf;

/// Top-level error type for all SoilScope operations.
#[derive(Debug, thiserror::Error)]
pub enum SoilScopeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (missing field, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A rule pattern failed to compile.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// A knowledge-base load or reload failed.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Credential check failed.
    #[error("authentication error: {message}")]
    Auth { message: String },

    /// The record already exists.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Password hashing or verification could not run.
    #[error("password hashing error: {message}")]
    PasswordHash { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SoilScopeError>;

impl SoilScopeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an authentication error from any displayable message.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth {
            message: msg.into(),
        }
    }

    /// Create a conflict error from any displayable message.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict {
            message: msg.into(),
        }
    }

    /// Create a password-hashing error from any displayable message.
    pub fn password_hash(msg: impl Into<String>) -> Self {
        Self::PasswordHash {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Knowledge-base load errors
// ---------------------------------------------------------------------------

/// A pattern source did not form a valid expression, or exceeded the
/// complexity limits enforced at load time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid pattern `{pattern}`: {cause}")]
pub struct PatternError {
    /// The offending pattern source.
    pub pattern: String,
    /// Human-readable reason from the regex engine or the limit check.
    pub cause: String,
}

impl PatternError {
    pub fn new(pattern: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            cause: cause.into(),
        }
    }
}

/// Why a single rule descriptor was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleFault {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("reply text is empty")]
    EmptyReply,
}

/// A load or reload attempt failed. The previously installed knowledge base,
/// if any, is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The configuration source could not be read or was malformed.
    #[error("rule source {origin} unavailable: {message}")]
    Source { origin: String, message: String },

    /// The rule at `index` (0-based, in source order) was rejected.
    #[error("rule #{index}: {cause}")]
    Rule { index: usize, cause: RuleFault },
}

impl LoadError {
    pub fn source_unavailable(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// Index of the rejected rule, when the failure is rule-specific.
    pub fn rule_index(&self) -> Option<usize> {
        match self {
            Self::Rule { index, .. } => Some(*index),
            Self::Source { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = SoilScopeError::config("missing admin token");
        assert_eq!(err.to_string(), "config error: missing admin token");

        let err = SoilScopeError::validation("email is required");
        assert!(err.to_string().contains("email is required"));
    }

    #[test]
    fn load_error_names_rule_index() {
        let err = LoadError::Rule {
            index: 3,
            cause: RuleFault::Pattern(PatternError::new("(ph", "unclosed group")),
        };
        assert_eq!(err.rule_index(), Some(3));
        let msg = err.to_string();
        assert!(msg.starts_with("rule #3"));
        assert!(msg.contains("(ph"));

        let wrapped: SoilScopeError = err.into();
        assert!(wrapped.to_string().contains("rule #3"));
    }

    #[test]
    fn source_error_has_no_rule_index() {
        let err = LoadError::source_unavailable("knowledge-base.json", "missing field");
        assert_eq!(err.rule_index(), None);
        assert!(err.to_string().contains("knowledge-base.json"));
    }
}
