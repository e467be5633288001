//! Text range types.
//!
//! Positions are gap indices on the character metric: a position sits
//! *between* characters, so a document of `n` characters has `n + 1` valid
//! positions. A [`Range`] keeps its anchor and head separately, which
//! preserves directionality across edits.

use crate::error::Result;
use crate::rope::Rope;
use crate::transaction::{Assoc, ChangeSet};

/// A character index into a document.
pub type CharIdx = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	Forward,
	Backward,
}

/// An anchor/head pair of gap positions.
///
/// `anchor` is the stationary end, `head` the moving end; `head < anchor`
/// makes the range backward. A range with `anchor == head` is a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
	pub anchor: CharIdx,
	pub head: CharIdx,
}

impl Range {
	pub fn new(anchor: CharIdx, head: CharIdx) -> Self {
		Self { anchor, head }
	}

	/// A zero-width range (a cursor) at `pos`.
	pub fn point(pos: CharIdx) -> Self {
		Self::new(pos, pos)
	}

	/// The smaller of the two ends.
	pub fn from(&self) -> CharIdx {
		self.anchor.min(self.head)
	}

	/// The larger of the two ends.
	pub fn to(&self) -> CharIdx {
		self.anchor.max(self.head)
	}

	pub fn min(&self) -> CharIdx {
		self.from()
	}

	pub fn max(&self) -> CharIdx {
		self.to()
	}

	pub fn len(&self) -> usize {
		self.to() - self.from()
	}

	pub fn is_empty(&self) -> bool {
		self.anchor == self.head
	}

	pub fn direction(&self) -> Direction {
		if self.head < self.anchor {
			Direction::Backward
		} else {
			Direction::Forward
		}
	}

	/// Returns this range with the requested direction, keeping its extent.
	pub fn with_direction(self, direction: Direction) -> Self {
		if self.direction() == direction || self.is_empty() {
			self
		} else {
			Self::new(self.head, self.anchor)
		}
	}

	/// The cursor position of this range: its head.
	pub fn cursor(&self) -> CharIdx {
		self.head
	}

	pub fn contains(&self, pos: CharIdx) -> bool {
		self.from() <= pos && pos < self.to()
	}

	pub fn contains_range(&self, other: &Range) -> bool {
		self.from() <= other.from() && other.to() <= self.to()
	}

	/// Whether two ranges share at least one position. Zero-width ranges
	/// overlap a range they touch.
	pub fn overlaps(&self, other: &Range) -> bool {
		self.from() == other.from() || (self.to() > other.from() && other.to() > self.from())
	}

	/// The smallest range covering both, keeping `self`'s direction.
	pub fn merge(&self, other: &Range) -> Self {
		let from = self.from().min(other.from());
		let to = self.to().max(other.to());
		match self.direction() {
			Direction::Forward => Self::new(from, to),
			Direction::Backward => Self::new(to, from),
		}
	}

	/// The overlap of two ranges, forward-directed, or `None` when they are
	/// disjoint.
	pub fn intersect(&self, other: &Range) -> Option<Self> {
		if !self.overlaps(other) {
			return None;
		}
		Some(Self::new(
			self.from().max(other.from()),
			self.to().min(other.to()),
		))
	}

	/// Maps this range through a changeset.
	///
	/// The anchor maps with [`Assoc::Before`] and the head with the supplied
	/// association; both go through their own mapping pass and the range is
	/// reassembled from the results.
	pub fn map(&self, changes: &ChangeSet, head_assoc: Assoc) -> Result<Self> {
		let anchor = changes.map_pos(self.anchor, Assoc::Before)?;
		let head = changes.map_pos(self.head, head_assoc)?;
		Ok(Self::new(anchor, head))
	}

	/// Snaps both ends down to grapheme cluster boundaries of `text`.
	pub fn grapheme_aligned(&self, text: &Rope) -> Result<Self> {
		let anchor = text.floor_grapheme_boundary(self.anchor.min(text.len_chars()))?;
		let head = text.floor_grapheme_boundary(self.head.min(text.len_chars()))?;
		Ok(Self::new(anchor, head))
	}
}

impl From<CharIdx> for Range {
	fn from(pos: CharIdx) -> Self {
		Self::point(pos)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn direction_and_extent() {
		let forward = Range::new(2, 6);
		let backward = Range::new(6, 2);
		assert_eq!(forward.direction(), Direction::Forward);
		assert_eq!(backward.direction(), Direction::Backward);
		assert_eq!(forward.from(), 2);
		assert_eq!(forward.to(), 6);
		assert_eq!(backward.from(), 2);
		assert_eq!(backward.to(), 6);
		assert_eq!(backward.with_direction(Direction::Forward), forward);
	}

	#[test]
	fn overlap_rules() {
		let a = Range::new(0, 5);
		let b = Range::new(5, 10);
		let c = Range::new(4, 6);
		assert!(!a.overlaps(&b));
		assert!(a.overlaps(&c));
		assert!(b.overlaps(&c));
		// Identical cursors overlap.
		assert!(Range::point(3).overlaps(&Range::point(3)));
	}

	#[test]
	fn merge_keeps_direction() {
		let backward = Range::new(6, 2);
		let merged = backward.merge(&Range::new(8, 9));
		assert_eq!(merged, Range::new(9, 2));
	}

	#[test]
	fn intersect_disjoint_is_none() {
		assert_eq!(Range::new(0, 2).intersect(&Range::new(4, 6)), None);
		assert_eq!(
			Range::new(0, 5).intersect(&Range::new(3, 8)),
			Some(Range::new(3, 5))
		);
	}
}
