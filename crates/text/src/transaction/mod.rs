//! Operational-transform primitives for document editing.
//!
//! [`ChangeSet`] is the low-level representation: a sequence of
//! retain/delete/insert operations between two document states.
//! [`Transaction`] wraps a changeset with an optional selection, providing
//! the high-level API for building edits from `(start, end, replacement)`
//! descriptions, inverting them for undo, and mapping selections through
//! them.

mod changeset;

#[cfg(test)]
mod tests;

pub use changeset::{
	Assoc, ChangeIterator, ChangeSet, ChangeSetBuilder, Operation, Tendril,
};

use crate::error::{Error, Result};
use crate::range::CharIdx;
use crate::rope::Rope;
use crate::selection::Selection;

/// A single replacement of the characters `[start, end)`. `None` as the
/// replacement is a plain deletion; `start == end` is a plain insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
	pub start: CharIdx,
	pub end: CharIdx,
	pub replacement: Option<Tendril>,
}

/// A document transformation combining changes with an optional selection
/// update.
///
/// Transactions can be inverted for undo/redo and composed for batching.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transaction {
	changes: ChangeSet,
	selection: Option<Selection>,
}

impl Transaction {
	/// An identity transaction for the given document.
	pub fn new(doc: &Rope) -> Self {
		Self {
			changes: ChangeSet::identity(doc.len_chars()),
			selection: None,
		}
	}

	/// Builds a transaction from non-overlapping changes sorted by start
	/// position.
	///
	/// # Errors
	/// `InvalidRange` for a change with `start > end` or one that begins
	/// before the previous change's end; `OutOfBounds` for a change past the
	/// end of the document.
	pub fn change<I>(doc: &Rope, changes: I) -> Result<Self>
	where
		I: IntoIterator<Item = Change>,
	{
		let len = doc.len_chars();
		let changes = changes.into_iter();
		let (lower, upper) = changes.size_hint();
		let mut changeset = ChangeSet::with_capacity(2 * upper.unwrap_or(lower) + 1);

		let mut last = 0;
		for change in changes {
			let Change {
				start,
				end,
				replacement,
			} = change;
			if start > end {
				return Err(Error::InvalidRange { start, end });
			}
			if end > len {
				return Err(Error::OutOfBounds { index: end, len });
			}
			if start < last {
				// Overlap with the previous change; reported as the
				// out-of-order boundary pair.
				return Err(Error::InvalidRange { start: last, end: start });
			}

			changeset.retain(start - last);
			changeset.delete(end - start);
			if let Some(text) = replacement {
				changeset.insert(text);
			}
			last = end;
		}
		changeset.retain(len - last);

		Ok(Self {
			changes: changeset,
			selection: None,
		})
	}

	/// Builds a transaction inserting `text` in place of every selection
	/// range.
	pub fn insert(doc: &Rope, selection: &Selection, text: Tendril) -> Result<Self> {
		Self::change(
			doc,
			selection.iter().map(|range| Change {
				start: range.min(),
				end: range.max(),
				replacement: Some(text.clone()),
			}),
		)
	}

	/// Builds a transaction deleting every selection range.
	pub fn delete_selection(doc: &Rope, selection: &Selection) -> Result<Self> {
		Self::change(
			doc,
			selection.iter().map(|range| Change {
				start: range.min(),
				end: range.max(),
				replacement: None,
			}),
		)
	}

	/// Attaches a selection to restore when the transaction is applied.
	#[must_use]
	pub fn with_selection(mut self, selection: Selection) -> Self {
		self.selection = Some(selection);
		self
	}

	pub fn changes(&self) -> &ChangeSet {
		&self.changes
	}

	pub fn operations(&self) -> &[Operation] {
		self.changes.operations()
	}

	pub fn selection(&self) -> Option<&Selection> {
		self.selection.as_ref()
	}

	pub fn is_empty(&self) -> bool {
		self.changes.is_empty()
	}

	/// Applies the transaction, producing a new document.
	pub fn apply(&self, doc: &Rope) -> Result<Rope> {
		self.changes.apply(doc)
	}

	/// Builds the transaction that undoes this one. `original` is the
	/// document this transaction applies to.
	pub fn invert(&self, original: &Rope) -> Result<Self> {
		Ok(Self {
			changes: self.changes.invert(original)?,
			selection: None,
		})
	}

	/// Chains another transaction onto this one. The other selection takes
	/// precedence.
	pub fn compose(mut self, other: Self) -> Result<Self> {
		self.changes = self.changes.compose(other.changes)?;
		self.selection = other.selection;
		Ok(self)
	}

	/// Maps a selection through this transaction's changes.
	pub fn map_selection(&self, selection: &Selection) -> Result<Selection> {
		selection.map(&self.changes)
	}

	/// Iterates the transaction as coalesced `(start, end, replacement)`
	/// changes.
	pub fn changes_iter(&self) -> ChangeIterator<'_> {
		self.changes.changes_iter()
	}
}

impl From<ChangeSet> for Transaction {
	fn from(changes: ChangeSet) -> Self {
		Self {
			changes,
			selection: None,
		}
	}
}
