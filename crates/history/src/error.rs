//! History-layer errors.

use thiserror::Error;

use crate::history::RevisionId;
use crate::savepoint::SavepointId;

pub type Result<T> = std::result::Result<T, HistoryError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HistoryError {
	/// A failure bubbled up from the text layer.
	#[error(transparent)]
	Text(#[from] weft_text::Error),

	/// A before-hook rejected the operation; nothing was applied.
	#[error("hook '{hook}' vetoed the operation: {reason}")]
	HookVeto { hook: String, reason: String },

	/// A savepoint id that is not (or no longer) registered.
	#[error("unknown savepoint {0}")]
	UnknownSavepoint(SavepointId),

	/// A revision id outside the retained history.
	#[error("unknown revision {0}")]
	UnknownRevision(RevisionId),
}
