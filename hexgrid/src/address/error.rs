//! Addressing error types.

use thiserror::Error;

/// Errors raised by cell address parsing and arithmetic.
///
/// These are input or programming errors: they are never retried and are
/// always surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The result needs more digits than the requested resolution allows.
    #[error("Resolution overflow: result needs {resolution} digits (max: {max})")]
    ResolutionOverflow { resolution: usize, max: usize },

    /// The operands live on different faces or vertices.
    #[error("Cross-face operation between '{left}' and '{right}'")]
    CrossFaceOperation { left: String, right: String },

    /// The child is not below the parent in the hierarchy.
    #[error("'{child}' is not a descendant of '{parent}'")]
    NotADescendant { parent: String, child: String },

    /// A digit outside 0..=6.
    #[error("Invalid digit: {0}")]
    InvalidDigit(u8),

    /// A direction outside 0..=6.
    #[error("Invalid direction: {0}")]
    InvalidDirection(u8),

    /// Malformed address text or digit pattern.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}
