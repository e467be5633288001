//! Grapheme cluster segmentation.
//!
//! Segmentation follows UAX #29 via `unicode-segmentation` and is performed
//! eagerly over the materialized document text: clusters may span chunk
//! boundaries, so lazy per-chunk segmentation would need cross-chunk repair.
//! The translation helpers below therefore cost O(n); callers that need many
//! lookups should collect [`Rope::graphemes`] once.

use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};
use crate::range::CharIdx;

use super::Rope;

/// One user-perceived character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphemeCluster {
	pub text: String,
	pub start_char: CharIdx,
	pub char_len: usize,
	pub byte_len: usize,
}

/// Iterator over the grapheme clusters of a rope, in document order.
#[derive(Debug)]
pub struct Graphemes {
	inner: std::vec::IntoIter<GraphemeCluster>,
}

impl Iterator for Graphemes {
	type Item = GraphemeCluster;

	fn next(&mut self) -> Option<GraphemeCluster> {
		self.inner.next()
	}
}

impl Rope {
	/// Segments the whole document into grapheme clusters.
	pub fn graphemes(&self) -> Graphemes {
		let text = String::from(self);
		let mut clusters = Vec::new();
		let mut start_char = 0;
		for cluster in text.graphemes(true) {
			let char_len = cluster.chars().count();
			clusters.push(GraphemeCluster {
				text: cluster.to_owned(),
				start_char,
				char_len,
				byte_len: cluster.len(),
			});
			start_char += char_len;
		}
		Graphemes {
			inner: clusters.into_iter(),
		}
	}

	/// Number of grapheme clusters in the document. O(n).
	pub fn len_graphemes(&self) -> usize {
		String::from(self).graphemes(true).count()
	}

	/// Index of the grapheme cluster containing character `i`.
	pub fn char_to_grapheme(&self, i: CharIdx) -> Result<usize> {
		if i > self.len_chars() {
			return Err(Error::OutOfBounds {
				index: i,
				len: self.len_chars(),
			});
		}
		let text = String::from(self);
		let mut start = 0;
		for (idx, cluster) in text.graphemes(true).enumerate() {
			let len = cluster.chars().count();
			if i < start + len {
				return Ok(idx);
			}
			start += len;
		}
		// One past the end maps to the cluster count.
		Ok(self.grapheme_count_of(&text))
	}

	/// Character position of the start of grapheme cluster `g`.
	pub fn grapheme_to_char(&self, g: usize) -> Result<CharIdx> {
		let text = String::from(self);
		let mut start = 0;
		for (idx, cluster) in text.graphemes(true).enumerate() {
			if idx == g {
				return Ok(start);
			}
			start += cluster.chars().count();
		}
		if g == self.grapheme_count_of(&text) {
			return Ok(self.len_chars());
		}
		Err(Error::OutOfBounds {
			index: g,
			len: self.grapheme_count_of(&text),
		})
	}

	/// Whether character position `i` falls on a grapheme cluster boundary.
	pub fn is_grapheme_boundary(&self, i: CharIdx) -> Result<bool> {
		if i > self.len_chars() {
			return Err(Error::OutOfBounds {
				index: i,
				len: self.len_chars(),
			});
		}
		if i == 0 || i == self.len_chars() {
			return Ok(true);
		}
		let text = String::from(self);
		let mut start = 0;
		for cluster in text.graphemes(true) {
			if start == i {
				return Ok(true);
			}
			if start > i {
				break;
			}
			start += cluster.chars().count();
		}
		Ok(false)
	}

	/// Greatest grapheme boundary strictly before `i`, floored at 0.
	pub fn prev_grapheme_boundary(&self, i: CharIdx) -> Result<CharIdx> {
		if i > self.len_chars() {
			return Err(Error::OutOfBounds {
				index: i,
				len: self.len_chars(),
			});
		}
		let text = String::from(self);
		let mut prev = 0;
		let mut start = 0;
		for cluster in text.graphemes(true) {
			if start >= i {
				break;
			}
			prev = start;
			start += cluster.chars().count();
		}
		Ok(prev)
	}

	/// Smallest grapheme boundary strictly after `i`, capped at `len_chars`.
	pub fn next_grapheme_boundary(&self, i: CharIdx) -> Result<CharIdx> {
		if i > self.len_chars() {
			return Err(Error::OutOfBounds {
				index: i,
				len: self.len_chars(),
			});
		}
		let text = String::from(self);
		let mut start = 0;
		for cluster in text.graphemes(true) {
			start += cluster.chars().count();
			if start > i {
				return Ok(start);
			}
		}
		Ok(self.len_chars())
	}

	/// Largest grapheme boundary at or before `i`.
	pub(crate) fn floor_grapheme_boundary(&self, i: CharIdx) -> Result<CharIdx> {
		if self.is_grapheme_boundary(i)? {
			Ok(i)
		} else {
			self.prev_grapheme_boundary(i)
		}
	}

	fn grapheme_count_of(&self, text: &str) -> usize {
		text.graphemes(true).count()
	}
}
