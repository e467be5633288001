//! Error types shared across the text primitives.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure modes of rope and changeset operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
	/// A character, byte, line, UTF-16, or grapheme index outside its valid
	/// range.
	#[error("index {index} is out of bounds (limit {len})")]
	OutOfBounds { index: usize, len: usize },

	/// A range whose start lies after its end.
	#[error("invalid range: start {start} is after end {end}")]
	InvalidRange { start: usize, end: usize },

	/// A changeset applied to or composed with a document of the wrong
	/// length.
	#[error("length mismatch: expected {expected}, got {actual}")]
	LengthMismatch { expected: usize, actual: usize },

	/// A byte stream that is not valid UTF-8 once reassembled.
	#[error("byte stream is not valid UTF-8")]
	InvalidUtf8,

	/// An internal structural check failed. Only produced by the
	/// debug-oriented `validate` paths.
	#[error("internal invariant violated: {0}")]
	InvariantViolation(&'static str),
}
