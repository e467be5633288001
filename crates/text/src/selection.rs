//! Selections: ordered sets of ranges with a primary.

use smallvec::{SmallVec, smallvec};

use crate::error::Result;
use crate::range::{CharIdx, Direction, Range};
use crate::rope::Rope;
use crate::transaction::{Assoc, ChangeSet};

/// A non-empty ordered set of [`Range`]s plus the index of the primary one.
///
/// The primary range is the one most operations act on (scrolling,
/// single-cursor motions). Ranges are kept sorted by their start and
/// overlapping ranges are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
	ranges: SmallVec<[Range; 1]>,
	primary_index: usize,
}

impl Selection {
	/// Creates a selection from a primary range plus any number of others.
	pub fn new(primary: Range, others: impl IntoIterator<Item = Range>) -> Self {
		let mut ranges: SmallVec<[Range; 1]> = smallvec![primary];
		ranges.extend(others);

		let mut selection = Self {
			ranges,
			primary_index: 0,
		};
		selection.normalize();
		selection
	}

	/// Creates a selection from a range vector and a primary index.
	///
	/// The index must be in bounds; it clamps to 0 otherwise.
	pub fn from_vec(ranges: Vec<Range>, primary_index: usize) -> Self {
		assert!(!ranges.is_empty(), "Selection cannot be empty");
		let primary_index = if primary_index < ranges.len() {
			primary_index
		} else {
			0
		};

		let mut selection = Self {
			ranges: ranges.into_iter().collect(),
			primary_index,
		};
		selection.normalize();
		selection
	}

	pub fn single(anchor: CharIdx, head: CharIdx) -> Self {
		Self {
			ranges: smallvec![Range::new(anchor, head)],
			primary_index: 0,
		}
	}

	/// A single cursor at `pos`.
	pub fn point(pos: CharIdx) -> Self {
		Self::single(pos, pos)
	}

	pub fn primary(&self) -> Range {
		self.ranges[self.primary_index]
	}

	pub fn primary_index(&self) -> usize {
		self.primary_index
	}

	pub fn set_primary(&mut self, index: usize) {
		debug_assert!(index < self.ranges.len());
		self.primary_index = index.min(self.ranges.len() - 1);
	}

	pub fn ranges(&self) -> &[Range] {
		&self.ranges
	}

	/// Number of ranges; always at least 1.
	#[allow(clippy::len_without_is_empty)]
	pub fn len(&self) -> usize {
		self.ranges.len()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Range> {
		self.ranges.iter()
	}

	pub fn push(&mut self, range: Range) {
		self.ranges.push(range);
		self.normalize();
	}

	pub fn contains(&self, pos: CharIdx) -> bool {
		self.ranges.iter().any(|range| range.contains(pos))
	}

	pub fn direction(&self) -> Direction {
		self.primary().direction()
	}

	/// Applies `f` to every range and renormalizes.
	pub fn transform<F>(&self, mut f: F) -> Self
	where
		F: FnMut(&Range) -> Range,
	{
		let primary = f(&self.primary());
		let others = self
			.ranges
			.iter()
			.enumerate()
			.filter(|&(i, _)| i != self.primary_index)
			.map(|(_, range)| f(range));

		Self::new(primary, others)
	}

	/// Maps every range through a changeset.
	///
	/// Each range's anchor maps with [`Assoc::Before`] and its head with
	/// [`Assoc::After`]; direction is preserved by the mapping. The primary
	/// index is kept unless normalization merged it away, in which case it
	/// clamps to 0.
	pub fn map(&self, changes: &ChangeSet) -> Result<Self> {
		let mut mapped = Vec::with_capacity(self.ranges.len());
		for range in &self.ranges {
			mapped.push(range.map(changes, Assoc::After)?);
		}
		Ok(Self::from_vec(mapped, self.primary_index))
	}

	/// Snaps every range to grapheme cluster boundaries of `text`.
	pub fn grapheme_aligned(&self, text: &Rope) -> Result<Self> {
		let mut aligned = Vec::with_capacity(self.ranges.len());
		for range in &self.ranges {
			aligned.push(range.grapheme_aligned(text)?);
		}
		Ok(Self::from_vec(aligned, self.primary_index))
	}

	pub fn rotate_forward(&mut self) {
		if self.ranges.len() > 1 {
			self.primary_index = (self.primary_index + 1) % self.ranges.len();
		}
	}

	pub fn rotate_backward(&mut self) {
		if self.ranges.len() > 1 {
			self.primary_index =
				(self.primary_index + self.ranges.len() - 1) % self.ranges.len();
		}
	}

	/// Merges ranges that overlap or touch, combining all contiguous
	/// selections into single ranges.
	pub fn merge_overlaps_and_adjacent(&mut self) {
		self.merge_ranges(true);
	}

	/// Sorts ranges and merges overlapping ones. Adjacent (touching but not
	/// overlapping) ranges stay separate.
	fn normalize(&mut self) {
		self.merge_ranges(false);
	}

	fn merge_ranges(&mut self, include_adjacent: bool) {
		if self.ranges.len() <= 1 {
			return;
		}

		let primary = self.ranges[self.primary_index];
		self.ranges.sort_by_key(Range::min);

		let mut merged: SmallVec<[Range; 1]> = SmallVec::new();
		let mut primary_index = 0;

		for range in &self.ranges {
			if let Some(last) = merged.last_mut()
				&& (last.overlaps(range) || (include_adjacent && last.max() == range.min()))
			{
				let old_last = *last;
				*last = last.merge(range);
				if *range == primary || old_last == primary || last.contains(primary.min()) {
					primary_index = merged.len() - 1;
				}
				continue;
			}

			if *range == primary {
				primary_index = merged.len();
			}
			merged.push(*range);
		}

		self.ranges = merged;
		self.primary_index = primary_index.min(self.ranges.len().saturating_sub(1));
	}
}

impl Default for Selection {
	fn default() -> Self {
		Self::point(0)
	}
}

impl From<Range> for Selection {
	fn from(range: Range) -> Self {
		Self {
			ranges: smallvec![range],
			primary_index: 0,
		}
	}
}
