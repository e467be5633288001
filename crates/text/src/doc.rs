//! Document abstraction.
//!
//! The OT layer only needs length, slicing, and materialization from its
//! backing store. [`Document`] captures that surface so the changeset
//! machinery can be reused over storage other than [`Rope`].

use crate::error::Result;
use crate::range::CharIdx;
use crate::rope::Rope;

/// A read-only view of an editable text document.
pub trait Document {
	/// Character count of the document.
	fn len_chars(&self) -> usize;

	/// The text of the characters `[start, end)`.
	fn slice(&self, start: CharIdx, end: CharIdx) -> Result<String>;

	/// The whole document as a `String`.
	fn to_text(&self) -> String;

	/// The whole document as UTF-8 bytes.
	fn to_bytes(&self) -> Vec<u8>;

	/// An owned handle to the same content.
	fn clone_doc(&self) -> Box<dyn Document>;
}

impl Document for Rope {
	fn len_chars(&self) -> usize {
		Rope::len_chars(self)
	}

	fn slice(&self, start: CharIdx, end: CharIdx) -> Result<String> {
		Rope::slice(self, start, end)
	}

	fn to_text(&self) -> String {
		String::from(self)
	}

	fn to_bytes(&self) -> Vec<u8> {
		self.to_text().into_bytes()
	}

	fn clone_doc(&self) -> Box<dyn Document> {
		// Ropes are persistent, so a clone is an alias.
		Box::new(self.clone())
	}
}
