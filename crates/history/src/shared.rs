//! Thread-shared history façade.
//!
//! A [`History`] is a plain mutable value. [`SharedHistory`] puts it behind
//! an `Arc<RwLock>` so many threads can read while writers serialize: a
//! commit happens-before any undo or redo that observes it, and two
//! concurrent commits land in whichever order they take the write lock.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use weft_text::{Rope, Transaction};

use crate::error::Result;
use crate::history::{History, RevisionId};

/// Clonable handle to a lock-guarded [`History`].
#[derive(Clone, Debug)]
pub struct SharedHistory {
	inner: Arc<RwLock<History>>,
}

impl SharedHistory {
	pub fn new(history: History) -> Self {
		Self {
			inner: Arc::new(RwLock::new(history)),
		}
	}

	pub fn commit(&self, transaction: Transaction, before: &Rope) -> Result<RevisionId> {
		self.inner.write().commit(transaction, before)
	}

	pub fn undo(&self) -> Result<Option<Arc<Transaction>>> {
		self.inner.write().undo()
	}

	pub fn redo(&self) -> Result<Option<Arc<Transaction>>> {
		self.inner.write().redo()
	}

	pub fn earlier(&self, steps: usize) -> Result<Option<Transaction>> {
		self.inner.write().earlier(steps)
	}

	pub fn later(&self, steps: usize) -> Result<Option<Transaction>> {
		self.inner.write().later(steps)
	}

	pub fn earlier_by_time(&self, delta: Duration) -> Result<Option<Transaction>> {
		self.inner.write().earlier_by_time(delta)
	}

	pub fn later_by_time(&self, delta: Duration) -> Result<Option<Transaction>> {
		self.inner.write().later_by_time(delta)
	}

	pub fn current_revision(&self) -> RevisionId {
		self.inner.read().current_revision()
	}

	pub fn at_root(&self) -> bool {
		self.inner.read().at_root()
	}

	pub fn at_tip(&self) -> bool {
		self.inner.read().at_tip()
	}

	pub fn len(&self) -> usize {
		self.inner.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.read().is_empty()
	}

	/// Runs `f` with read access to the underlying history.
	pub fn with_read<T>(&self, f: impl FnOnce(&History) -> T) -> T {
		f(&self.inner.read())
	}
}

impl From<History> for SharedHistory {
	fn from(history: History) -> Self {
		Self::new(history)
	}
}
