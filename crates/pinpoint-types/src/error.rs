//! Parse errors for Pinpoint types.

use thiserror::Error;

/// Errors that can occur when parsing Pinpoint types from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A coordinate string was not a valid `lat,lon` pair.
    #[error("invalid coordinate (expected \"lat,lon\" in decimal degrees): {0}")]
    InvalidCoordinate(String),

    /// A category name did not match any known category.
    #[error("unknown device category: {0}")]
    InvalidCategory(String),
}

/// Result type alias for parse operations.
pub type ParseResult<T> = Result<T, ParseError>;
