//! A persistent rope over UTF-8 text.
//!
//! The rope is an immutable balanced binary tree of text chunks. Every edit
//! returns a new [`Rope`] that shares all untouched subtrees with its input,
//! which makes clones, snapshots, and historical versions cheap to keep
//! around. Character, byte, line, UTF-16, and grapheme indices are all
//! translatable into one another in O(log n) (graphemes excepted, see
//! [`graphemes`]).
//!
//! # Index conventions
//!
//! Positions are gap indices: they sit between characters and range over
//! `[0, len_chars]`. All `*_to_*` conversions accept the one-past-the-end
//! position; element accessors like [`Rope::char_at`] do not.

mod builder;
mod graphemes;
mod iter;
pub(crate) mod node;


pub use builder::RopeBuilder;
pub use graphemes::{GraphemeCluster, Graphemes};
pub use iter::{Bytes, Chars, ChunkPosition, Chunks, RevChars, Utf16Units};

use std::sync::Arc;

use str_indices::{chars, lines_lf, utf16};

use crate::error::{Error, Result};
use crate::range::CharIdx;

use node::{Node, TextInfo, concat_nodes, max_depth_for, node_from_str, rebalance, split_node};

/// An immutable rope of UTF-8 text.
///
/// Total character and byte counts are cached on the handle, so
/// [`len_chars`](Rope::len_chars) and friends are O(1). All edits are
/// persistent: the receiver is left untouched and the result shares
/// structure with it.
#[derive(Clone)]
pub struct Rope {
	root: Arc<Node>,
	info: TextInfo,
}

impl Rope {
	/// Creates an empty rope (a single empty leaf).
	pub fn new() -> Self {
		Self {
			root: node::new_leaf(""),
			info: TextInfo::default(),
		}
	}

	/// Creates a rope from a string, chunking it into leaves.
	pub fn from_str(text: &str) -> Self {
		Self {
			root: node_from_str(text),
			info: TextInfo::from_str(text),
		}
	}

	fn from_root(root: Arc<Node>) -> Self {
		let info = root.info();
		Self { root, info }
	}

	/// Number of characters (Unicode scalar values). O(1).
	pub fn len_chars(&self) -> usize {
		self.info.chars
	}

	/// Number of UTF-8 bytes. O(1).
	pub fn len_bytes(&self) -> usize {
		self.info.bytes
	}

	/// Number of UTF-16 code units the text would occupy. O(1).
	pub fn len_utf16(&self) -> usize {
		self.info.utf16
	}

	/// Number of lines. One more than the number of `\n` in the text. O(1).
	pub fn len_lines(&self) -> usize {
		self.info.line_breaks + 1
	}

	pub fn is_empty(&self) -> bool {
		self.info.chars == 0
	}

	/// The character at position `i`.
	///
	/// # Errors
	/// `OutOfBounds` unless `i < len_chars`.
	pub fn char_at(&self, i: CharIdx) -> Result<char> {
		if i >= self.info.chars {
			return Err(Error::OutOfBounds {
				index: i,
				len: self.info.chars,
			});
		}
		let (leaf, _, local) = self.leaf_for_char(i);
		let byte = chars::to_byte_idx(leaf, local);
		leaf[byte..]
			.chars()
			.next()
			.ok_or(Error::InvariantViolation("char lookup ran past its chunk"))
	}

	/// Extracts the characters `[start, end)` as a `String`.
	///
	/// O(log n + (end − start)).
	pub fn slice(&self, start: CharIdx, end: CharIdx) -> Result<String> {
		self.check_range(start, end)?;
		let from_byte = self.char_to_byte(start)?;
		let to_byte = self.char_to_byte(end)?;
		let mut out = String::with_capacity(to_byte - from_byte);
		let (chunks, _) = Chunks::from_char(&self.root, start);
		for (chunk, pos) in chunks {
			if pos.bytes >= to_byte {
				break;
			}
			let s = from_byte.saturating_sub(pos.bytes);
			let e = (to_byte - pos.bytes).min(chunk.len());
			out.push_str(&chunk[s..e]);
		}
		Ok(out)
	}

	/// Extracts the characters `[start, end)` as a rope sharing structure
	/// with `self`.
	pub fn slice_rope(&self, start: CharIdx, end: CharIdx) -> Result<Rope> {
		self.check_range(start, end)?;
		let (_, tail) = split_node(&self.root, start);
		let (mid, _) = split_node(&tail, end - start);
		Ok(Self::from_root(mid))
	}

	/// Returns a new rope with `text` inserted at character position `i`.
	///
	/// O(log n + |text|). `self` is unchanged.
	///
	/// # Errors
	/// `OutOfBounds` unless `i <= len_chars`.
	pub fn insert(&self, i: CharIdx, text: &str) -> Result<Rope> {
		if i > self.info.chars {
			return Err(Error::OutOfBounds {
				index: i,
				len: self.info.chars,
			});
		}
		if text.is_empty() {
			return Ok(self.clone());
		}

		// Small documents stay a single leaf.
		if let Node::Leaf(existing) = &*self.root
			&& existing.len() + text.len() <= node::MAX_LEAF_BYTES
		{
			let byte = chars::to_byte_idx(existing, i);
			let mut spliced = String::with_capacity(existing.len() + text.len());
			spliced.push_str(&existing[..byte]);
			spliced.push_str(text);
			spliced.push_str(&existing[byte..]);
			return Ok(Self {
				info: TextInfo::from_str(&spliced),
				root: Arc::new(Node::Leaf(spliced)),
			});
		}

		let (left, right) = split_node(&self.root, i);
		let middle = node_from_str(text);
		let root = concat_nodes(&concat_nodes(&left, &middle), &right);
		Ok(Self::from_root(Self::maybe_rebalance(root)))
	}

	/// Returns a new rope with the characters `[start, end)` removed.
	pub fn delete(&self, start: CharIdx, end: CharIdx) -> Result<Rope> {
		self.check_range(start, end)?;
		if start == end {
			return Ok(self.clone());
		}

		if let Node::Leaf(existing) = &*self.root {
			let from = chars::to_byte_idx(existing, start);
			let to = chars::to_byte_idx(existing, end);
			let mut spliced = String::with_capacity(existing.len() - (to - from));
			spliced.push_str(&existing[..from]);
			spliced.push_str(&existing[to..]);
			return Ok(Self {
				info: TextInfo::from_str(&spliced),
				root: Arc::new(Node::Leaf(spliced)),
			});
		}

		let (left, tail) = split_node(&self.root, start);
		let (_, right) = split_node(&tail, end - start);
		let root = concat_nodes(&left, &right);
		Ok(Self::from_root(Self::maybe_rebalance(root)))
	}

	/// Replaces the characters `[start, end)` with `text`. Defined as delete
	/// followed by insert.
	pub fn replace(&self, start: CharIdx, end: CharIdx, text: &str) -> Result<Rope> {
		self.delete(start, end)?.insert(start, text)
	}

	/// Splits the rope at `i`, returning the two halves.
	///
	/// Concatenating the halves yields a rope content-equal to `self`.
	pub fn split(&self, i: CharIdx) -> Result<(Rope, Rope)> {
		if i > self.info.chars {
			return Err(Error::OutOfBounds {
				index: i,
				len: self.info.chars,
			});
		}
		let (left, right) = split_node(&self.root, i);
		Ok((Self::from_root(left), Self::from_root(right)))
	}

	/// Returns the concatenation `self ++ other`. O(1) tree join, not
	/// counting an occasional rebalance.
	pub fn concat(&self, other: &Rope) -> Rope {
		let root = concat_nodes(&self.root, &other.root);
		Self::from_root(Self::maybe_rebalance(root))
	}

	// Index translation.
	//
	// Every conversion accepts the one-past-the-end position of its input
	// metric and reports `OutOfBounds` beyond that.

	/// Whether every byte of the document is ASCII, making char, byte, and
	/// UTF-16 offsets coincide.
	fn is_ascii(&self) -> bool {
		self.info.bytes == self.info.chars
	}

	/// Converts a character position to its byte offset.
	pub fn char_to_byte(&self, i: CharIdx) -> Result<usize> {
		if i > self.info.chars {
			return Err(Error::OutOfBounds {
				index: i,
				len: self.info.chars,
			});
		}
		if self.is_ascii() {
			return Ok(i);
		}
		let (leaf, acc, local) = self.leaf_for_char(i);
		Ok(acc.bytes + chars::to_byte_idx(leaf, local))
	}

	/// Converts a byte offset to the index of the character containing it.
	pub fn byte_to_char(&self, byte: usize) -> Result<CharIdx> {
		if byte > self.info.bytes {
			return Err(Error::OutOfBounds {
				index: byte,
				len: self.info.bytes,
			});
		}
		if self.is_ascii() {
			return Ok(byte);
		}
		let (leaf, acc, local) = self.leaf_for_byte(byte);
		Ok(acc.chars + chars::from_byte_idx(leaf, local))
	}

	/// Line index of the character at `i` (the number of `\n` before it).
	pub fn char_to_line(&self, i: CharIdx) -> Result<usize> {
		if i > self.info.chars {
			return Err(Error::OutOfBounds {
				index: i,
				len: self.info.chars,
			});
		}
		let (leaf, acc, local) = self.leaf_for_char(i);
		let byte = chars::to_byte_idx(leaf, local);
		Ok(acc.line_breaks + lines_lf::from_byte_idx(leaf, byte))
	}

	/// Character position of the start of line `line`.
	pub fn line_to_char(&self, line: usize) -> Result<CharIdx> {
		let len_lines = self.len_lines();
		if line > len_lines {
			return Err(Error::OutOfBounds {
				index: line,
				len: len_lines,
			});
		}
		if line == 0 {
			return Ok(0);
		}
		if line == len_lines {
			return Ok(self.info.chars);
		}
		let (leaf, acc, local) = self.leaf_for_line(line);
		let byte = lines_lf::to_byte_idx(leaf, local);
		Ok(acc.chars + chars::from_byte_idx(leaf, byte))
	}

	/// Byte offset of the start of line `line`.
	pub fn line_to_byte(&self, line: usize) -> Result<usize> {
		let len_lines = self.len_lines();
		if line > len_lines {
			return Err(Error::OutOfBounds {
				index: line,
				len: len_lines,
			});
		}
		if line == 0 {
			return Ok(0);
		}
		if line == len_lines {
			return Ok(self.info.bytes);
		}
		let (leaf, acc, local) = self.leaf_for_line(line);
		Ok(acc.bytes + lines_lf::to_byte_idx(leaf, local))
	}

	/// Converts a character position to its UTF-16 code-unit offset.
	pub fn char_to_utf16(&self, i: CharIdx) -> Result<usize> {
		if i > self.info.chars {
			return Err(Error::OutOfBounds {
				index: i,
				len: self.info.chars,
			});
		}
		if self.is_ascii() {
			return Ok(i);
		}
		let (leaf, acc, local) = self.leaf_for_char(i);
		let byte = chars::to_byte_idx(leaf, local);
		Ok(acc.utf16 + utf16::count(&leaf[..byte]))
	}

	/// Converts a UTF-16 code-unit offset to a character position.
	pub fn utf16_to_char(&self, unit: usize) -> Result<CharIdx> {
		if unit > self.info.utf16 {
			return Err(Error::OutOfBounds {
				index: unit,
				len: self.info.utf16,
			});
		}
		if self.is_ascii() {
			return Ok(unit);
		}
		let (leaf, acc, local) = self.leaf_for_utf16(unit);
		let byte = utf16::to_byte_idx(leaf, local);
		Ok(acc.chars + chars::from_byte_idx(leaf, byte))
	}

	// Chunk-bounded queries.

	/// The chunk containing character position `i`, along with the
	/// char/byte/line position of the chunk's first element. Tolerates the
	/// one-past-the-end position.
	pub fn chunk_at_char(&self, i: CharIdx) -> Result<(&str, ChunkPosition)> {
		if i > self.info.chars {
			return Err(Error::OutOfBounds {
				index: i,
				len: self.info.chars,
			});
		}
		let (leaf, acc, _) = self.leaf_for_char(i);
		Ok((leaf, ChunkPosition::from_info(acc)))
	}

	/// The chunk containing byte offset `byte`.
	pub fn chunk_at_byte(&self, byte: usize) -> Result<(&str, ChunkPosition)> {
		if byte > self.info.bytes {
			return Err(Error::OutOfBounds {
				index: byte,
				len: self.info.bytes,
			});
		}
		let (leaf, acc, _) = self.leaf_for_byte(byte);
		Ok((leaf, ChunkPosition::from_info(acc)))
	}

	/// The chunk containing the start of line `line`.
	pub fn chunk_at_line(&self, line: usize) -> Result<(&str, ChunkPosition)> {
		let i = self.line_to_char(line)?;
		self.chunk_at_char(i)
	}

	/// Character position of the first occurrence of `needle` at or after
	/// `from`, or `None`. Zero-based.
	pub fn index_of_char(&self, needle: char, from: CharIdx) -> Result<Option<CharIdx>> {
		let mut it = self.chars_at(from)?;
		Ok(it.position(|c| c == needle).map(|off| from + off))
	}

	// Iterators.

	/// Iterates leaf chunks in document order with their start positions.
	pub fn chunks(&self) -> Chunks<'_> {
		Chunks::new(&self.root)
	}

	/// Iterates chunks starting with the one containing character `i`.
	pub fn chunks_at_char(&self, i: CharIdx) -> Result<Chunks<'_>> {
		if i > self.info.chars {
			return Err(Error::OutOfBounds {
				index: i,
				len: self.info.chars,
			});
		}
		Ok(Chunks::from_char(&self.root, i).0)
	}

	/// Iterates the characters of the rope.
	pub fn chars(&self) -> Chars<'_> {
		Chars::new(&self.root)
	}

	/// Iterates characters starting at position `i`: the first `next()`
	/// returns the character at `i`.
	pub fn chars_at(&self, i: CharIdx) -> Result<Chars<'_>> {
		if i > self.info.chars {
			return Err(Error::OutOfBounds {
				index: i,
				len: self.info.chars,
			});
		}
		Ok(Chars::from_char(&self.root, i))
	}

	/// Iterates the characters from the end towards the start.
	pub fn rev_chars(&self) -> RevChars<'_> {
		RevChars::new(&self.root, self.info.chars)
	}

	/// Iterates the bytes of the rope.
	pub fn bytes(&self) -> Bytes<'_> {
		Bytes::new(&self.root, self.info.bytes)
	}

	/// Iterates bytes starting at byte offset `byte`.
	pub fn bytes_at(&self, byte: usize) -> Result<Bytes<'_>> {
		let mut bytes = self.bytes();
		bytes.seek(byte)?;
		Ok(bytes)
	}

	/// Iterates the UTF-16 code units of the rope.
	pub fn utf16_units(&self) -> Utf16Units<'_> {
		Utf16Units::new(self.chars())
	}

	/// Checks the cached metrics of every internal node against its
	/// children. Intended for debug builds and tests.
	pub fn validate(&self) -> Result<()> {
		let info = node::validate_node(&self.root).map_err(Error::InvariantViolation)?;
		if info != self.info {
			return Err(Error::InvariantViolation(
				"rope handle caches stale totals",
			));
		}
		Ok(())
	}

	// Internal helpers.

	fn check_range(&self, start: CharIdx, end: CharIdx) -> Result<()> {
		if start > end {
			return Err(Error::InvalidRange { start, end });
		}
		if end > self.info.chars {
			return Err(Error::OutOfBounds {
				index: end,
				len: self.info.chars,
			});
		}
		Ok(())
	}

	fn maybe_rebalance(root: Arc<Node>) -> Arc<Node> {
		let info = root.info();
		if root.depth() > max_depth_for(info.chars) {
			log::debug!(
				"rebalancing rope: depth {} exceeds bound for {} chars",
				root.depth(),
				info.chars
			);
			rebalance(&root)
		} else {
			root
		}
	}

	/// Descends to the leaf containing character `i` (`i <= len_chars`),
	/// returning the chunk, the metrics of everything before it, and the
	/// chunk-local character index.
	fn leaf_for_char(&self, mut i: usize) -> (&str, TextInfo, usize) {
		let mut node = &*self.root;
		let mut acc = TextInfo::default();
		loop {
			match node {
				Node::Internal {
					left,
					right,
					left_info,
					..
				} => {
					if i < left_info.chars {
						node = left;
					} else {
						i -= left_info.chars;
						acc += *left_info;
						node = right;
					}
				}
				Node::Leaf(text) => return (text, acc, i),
			}
		}
	}

	fn leaf_for_byte(&self, mut byte: usize) -> (&str, TextInfo, usize) {
		let mut node = &*self.root;
		let mut acc = TextInfo::default();
		loop {
			match node {
				Node::Internal {
					left,
					right,
					left_info,
					..
				} => {
					if byte < left_info.bytes {
						node = left;
					} else {
						byte -= left_info.bytes;
						acc += *left_info;
						node = right;
					}
				}
				Node::Leaf(text) => return (text, acc, byte),
			}
		}
	}

	fn leaf_for_utf16(&self, mut unit: usize) -> (&str, TextInfo, usize) {
		let mut node = &*self.root;
		let mut acc = TextInfo::default();
		loop {
			match node {
				Node::Internal {
					left,
					right,
					left_info,
					..
				} => {
					if unit < left_info.utf16 {
						node = left;
					} else {
						unit -= left_info.utf16;
						acc += *left_info;
						node = right;
					}
				}
				Node::Leaf(text) => return (text, acc, unit),
			}
		}
	}

	/// Descends to the leaf containing the `line`-th line break
	/// (`1 <= line <= line_breaks`), returning the chunk, the metrics before
	/// it, and the chunk-local line number.
	fn leaf_for_line(&self, mut line: usize) -> (&str, TextInfo, usize) {
		let mut node = &*self.root;
		let mut acc = TextInfo::default();
		loop {
			match node {
				Node::Internal {
					left,
					right,
					left_info,
					..
				} => {
					if line <= left_info.line_breaks {
						node = left;
					} else {
						line -= left_info.line_breaks;
						acc += *left_info;
						node = right;
					}
				}
				Node::Leaf(text) => return (text, acc, line),
			}
		}
	}
}

impl Default for Rope {
	fn default() -> Self {
		Self::new()
	}
}

impl From<&str> for Rope {
	fn from(text: &str) -> Self {
		Self::from_str(text)
	}
}

impl From<String> for Rope {
	fn from(text: String) -> Self {
		Self::from_str(&text)
	}
}

impl From<&Rope> for String {
	/// Materializes the rope into one buffer preallocated to `len_bytes`.
	fn from(rope: &Rope) -> Self {
		let mut out = String::with_capacity(rope.len_bytes());
		for (chunk, _) in rope.chunks() {
			out.push_str(chunk);
		}
		out
	}
}

impl std::fmt::Display for Rope {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		for (chunk, _) in self.chunks() {
			f.write_str(chunk)?;
		}
		Ok(())
	}
}

impl std::fmt::Debug for Rope {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Rope({:?})", String::from(self))
	}
}

impl PartialEq for Rope {
	/// Content equality, independent of chunk boundaries.
	fn eq(&self, other: &Self) -> bool {
		self.info.bytes == other.info.bytes && self.bytes().eq(other.bytes())
	}
}

impl Eq for Rope {}

impl PartialEq<str> for Rope {
	fn eq(&self, other: &str) -> bool {
		if self.info.bytes != other.len() {
			return false;
		}
		let mut offset = 0;
		for (chunk, _) in self.chunks() {
			if chunk.as_bytes() != &other.as_bytes()[offset..offset + chunk.len()] {
				return false;
			}
			offset += chunk.len();
		}
		true
	}
}

impl PartialEq<&str> for Rope {
	fn eq(&self, other: &&str) -> bool {
		*self == **other
	}
}

impl PartialEq<String> for Rope {
	fn eq(&self, other: &String) -> bool {
		*self == *other.as_str()
	}
}

impl PartialEq<Rope> for str {
	fn eq(&self, other: &Rope) -> bool {
		*other == *self
	}
}
