//! Branched edit history over persistent documents.
//!
//! Built on the `weft-text` rope and changesets: revisions store forward
//! and inverse transactions instead of snapshots, savepoints retain whole
//! documents for free thanks to structural sharing, and a hook bus lets an
//! embedding application observe or veto lifecycle events.

/// History-layer errors.
pub mod error;
/// The revision tree.
pub mod history;
/// The lifecycle hook bus.
pub mod hooks;
/// Reference-counted snapshots.
pub mod savepoint;
/// Lock-guarded sharing.
pub mod shared;

pub use error::{HistoryError, Result};
pub use history::{History, HistoryConfig, Revision, RevisionId};
pub use hooks::{EditKind, HookContext, HookHandle, HookId, HookPoint, HookRegistry};
pub use savepoint::{
	DuplicateMode, SavepointConfig, SavepointId, SavepointManager, SavepointMetadata,
	SavepointQuery,
};
pub use shared::SharedHistory;
