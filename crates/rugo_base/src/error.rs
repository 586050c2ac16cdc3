//! Error types with source position tracking.
//!
//! Every user-facing error in rugo carries the file and the 1-based line of
//! the *original* source that produced it, even when the offending text only
//! exists after preprocessing. The display format is `file:line: message`,
//! which editors and CI log scrapers already understand.
//!
//! # Example
//!
//! ```
//! use rugo_base::{RugoError, Result};
//!
//! fn parse_count(s: &str) -> Result<i64> {
//!     s.parse()
//!         .map_err(|_| RugoError::at(format!("invalid count '{}'", s), "main.rugo", 3))
//! }
//!
//! let err = parse_count("abc").unwrap_err();
//! assert!(err.to_string().starts_with("main.rugo:3:"));
//! ```

use std::fmt;

/// A diagnostic annotated with its original source position.
///
/// Implements [`std::error::Error`] and [`fmt::Display`]. Errors without a
/// position (internal failures, toolchain problems outside any source line)
/// use line 0 and render without the `file:line:` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RugoError {
    /// Human-readable error description.
    pub message: String,
    /// Path of the source file, as the user spelled it.
    pub file: String,
    /// 1-based line in the original source; 0 when no position applies.
    pub line: u32,
}

impl RugoError {
    /// Creates a positionless error (internal failures, IO, toolchain).
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            file: String::new(),
            line: 0,
        }
    }

    /// Creates an internal error: a compiler bug rather than a user
    /// mistake. The CLI maps these to exit code 2.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(format!("internal: {}", message.into()))
    }

    /// Returns `true` for errors created with [`RugoError::internal`].
    pub fn is_internal(&self) -> bool {
        self.message.starts_with("internal: ")
    }

    /// Creates an error pinned to `file:line`.
    pub fn at(message: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            file: file.into(),
            line,
        }
    }

    /// Returns a copy of this error re-pinned to another position.
    ///
    /// Used when a lower layer reports a position-free error and the caller
    /// knows which source line it was processing.
    pub fn with_position(mut self, file: impl Into<String>, line: u32) -> Self {
        if self.line == 0 {
            self.file = file.into();
            self.line = line;
        }
        self
    }

    /// Returns `true` if the error carries a usable source position.
    pub fn has_position(&self) -> bool {
        self.line > 0 && !self.file.is_empty()
    }
}

impl fmt::Display for RugoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_position() {
            write!(f, "{}:{}: {}", self.file, self.line, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for RugoError {}

impl From<std::io::Error> for RugoError {
    fn from(err: std::io::Error) -> Self {
        RugoError::new(err.to_string())
    }
}

/// Alias for `std::result::Result<T, RugoError>`.
pub type Result<T> = std::result::Result<T, RugoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positioned_error_renders_prefix() {
        let err = RugoError::at("boom", "app.rugo", 12);
        assert_eq!(err.to_string(), "app.rugo:12: boom");
    }

    #[test]
    fn positionless_error_renders_bare() {
        let err = RugoError::new("go toolchain not found");
        assert_eq!(err.to_string(), "go toolchain not found");
        assert!(!err.has_position());
    }

    #[test]
    fn with_position_only_fills_empty() {
        let err = RugoError::new("late").with_position("a.rugo", 7);
        assert_eq!(err.line, 7);

        let pinned = RugoError::at("early", "b.rugo", 2).with_position("a.rugo", 7);
        assert_eq!(pinned.file, "b.rugo");
        assert_eq!(pinned.line, 2);
    }
}
