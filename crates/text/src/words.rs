//! Word boundary capability.
//!
//! The position mapper's word associations and any word-wise motion consume
//! this capability. The default implementation treats alphanumerics and `_`
//! as word characters and relies on the Unicode `White_Space` property for
//! whitespace; callers with language-specific needs can supply their own
//! [`WordBoundaries`] implementation.

use crate::range::CharIdx;
use crate::rope::Rope;

/// Whether `ch` belongs to a word.
pub fn char_is_word(ch: char) -> bool {
	ch.is_alphanumeric() || ch == '_'
}

/// Whether `ch` is whitespace per the Unicode `White_Space` property.
pub fn char_is_whitespace(ch: char) -> bool {
	ch.is_whitespace()
}

/// Word boundary queries over a document.
pub trait WordBoundaries {
	/// Start of the word at or before `pos`, or `None` when no word starts
	/// earlier.
	fn prev_word_start(&self, pos: CharIdx) -> Option<CharIdx>;

	/// Start of the next word strictly after the word containing `pos` (or
	/// after `pos` itself when it is not inside a word).
	fn next_word_start(&self, pos: CharIdx) -> Option<CharIdx>;

	/// The word containing `pos` as `(text, start, end)`.
	fn word_at(&self, pos: CharIdx) -> Option<(String, CharIdx, CharIdx)>;
}

/// Default word boundary implementation over a [`Rope`].
pub struct RopeWords<'a> {
	rope: &'a Rope,
}

impl<'a> RopeWords<'a> {
	pub fn new(rope: &'a Rope) -> Self {
		Self { rope }
	}

	fn char_before(&self, pos: CharIdx) -> Option<char> {
		if pos == 0 {
			return None;
		}
		self.rope.char_at(pos - 1).ok()
	}

	fn char_after(&self, pos: CharIdx) -> Option<char> {
		self.rope.char_at(pos).ok()
	}
}

impl WordBoundaries for RopeWords<'_> {
	fn prev_word_start(&self, pos: CharIdx) -> Option<CharIdx> {
		let mut idx = pos.min(self.rope.len_chars());
		while let Some(ch) = self.char_before(idx) {
			if char_is_word(ch) {
				break;
			}
			idx -= 1;
		}
		let word_end = idx;
		while let Some(ch) = self.char_before(idx) {
			if !char_is_word(ch) {
				break;
			}
			idx -= 1;
		}
		if idx == word_end && self.char_after(idx).map(char_is_word) != Some(true) {
			return None;
		}
		Some(idx)
	}

	fn next_word_start(&self, pos: CharIdx) -> Option<CharIdx> {
		let len = self.rope.len_chars();
		let mut idx = pos.min(len);
		while idx < len && self.char_after(idx).map(char_is_word) == Some(true) {
			idx += 1;
		}
		while idx < len && self.char_after(idx).map(char_is_word) != Some(true) {
			idx += 1;
		}
		if idx < len { Some(idx) } else { None }
	}

	fn word_at(&self, pos: CharIdx) -> Option<(String, CharIdx, CharIdx)> {
		if self.char_after(pos).map(char_is_word) != Some(true) {
			return None;
		}
		let mut start = pos;
		while self.char_before(start).map(char_is_word) == Some(true) {
			start -= 1;
		}
		let mut end = pos + 1;
		while self.char_after(end).map(char_is_word) == Some(true) {
			end += 1;
		}
		let text = self.rope.slice(start, end).ok()?;
		Some((text, start, end))
	}
}
