//! Rope iterators.
//!
//! All iterators walk the tree with a small node stack held in a
//! [`SmallVec`]; a balanced tree's depth fits on the stack, pathological
//! trees spill to the heap. Iteration ends with `None`, never an error.
//!
//! Position conventions: forward iterators report via `pos()` the index of
//! the *next* element they will return; [`RevChars::position_from_start`]
//! reports the index of the element *just* returned.

use smallvec::SmallVec;

use str_indices::chars;

use crate::error::{Error, Result};
use crate::range::CharIdx;

use super::node::{Node, TextInfo};

type NodeStack<'a> = SmallVec<[&'a Node; 16]>;

/// Char/byte/line position of a chunk's first element within the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkPosition {
	pub chars: usize,
	pub bytes: usize,
	pub lines: usize,
}

impl ChunkPosition {
	pub(crate) fn from_info(info: TextInfo) -> Self {
		Self {
			chars: info.chars,
			bytes: info.bytes,
			lines: info.line_breaks,
		}
	}

	fn advance(&mut self, info: TextInfo) {
		self.chars += info.chars;
		self.bytes += info.bytes;
		self.lines += info.line_breaks;
	}
}

/// Forward iterator over leaf chunks, yielding each chunk together with the
/// position of its first element.
#[derive(Clone)]
pub struct Chunks<'a> {
	stack: NodeStack<'a>,
	pos: ChunkPosition,
}

impl<'a> Chunks<'a> {
	pub(crate) fn new(root: &'a Node) -> Self {
		let mut stack = NodeStack::new();
		stack.push(root);
		Self {
			stack,
			pos: ChunkPosition::default(),
		}
	}

	/// Positions the iterator so that the first yielded chunk is the one
	/// containing character `char_idx`. Also returns the chunk-local
	/// character index.
	pub(crate) fn from_char(root: &'a Node, mut char_idx: usize) -> (Self, usize) {
		let mut stack = NodeStack::new();
		let mut pos = ChunkPosition::default();
		let mut node = root;
		loop {
			match node {
				Node::Internal {
					left,
					right,
					left_info,
					..
				} => {
					if char_idx < left_info.chars {
						stack.push(right);
						node = left;
					} else {
						char_idx -= left_info.chars;
						pos.advance(*left_info);
						node = right;
					}
				}
				Node::Leaf(_) => {
					stack.push(node);
					return (Self { stack, pos }, char_idx);
				}
			}
		}
	}

	/// As [`Chunks::from_char`] but positioned by byte offset.
	pub(crate) fn from_byte(root: &'a Node, mut byte_idx: usize) -> (Self, usize) {
		let mut stack = NodeStack::new();
		let mut pos = ChunkPosition::default();
		let mut node = root;
		loop {
			match node {
				Node::Internal {
					left,
					right,
					left_info,
					..
				} => {
					if byte_idx < left_info.bytes {
						stack.push(right);
						node = left;
					} else {
						byte_idx -= left_info.bytes;
						pos.advance(*left_info);
						node = right;
					}
				}
				Node::Leaf(_) => {
					stack.push(node);
					return (Self { stack, pos }, byte_idx);
				}
			}
		}
	}
}

impl<'a> Iterator for Chunks<'a> {
	type Item = (&'a str, ChunkPosition);

	fn next(&mut self) -> Option<Self::Item> {
		while let Some(node) = self.stack.pop() {
			match node {
				Node::Internal { left, right, .. } => {
					self.stack.push(right);
					self.stack.push(left);
				}
				Node::Leaf(text) => {
					if text.is_empty() {
						continue;
					}
					let start = self.pos;
					self.pos.advance(TextInfo::from_str(text));
					return Some((text.as_str(), start));
				}
			}
		}
		None
	}
}

/// Forward iterator over characters.
#[derive(Clone)]
pub struct Chars<'a> {
	chunks: Chunks<'a>,
	current: std::str::Chars<'a>,
	pos: CharIdx,
}

impl<'a> Chars<'a> {
	pub(crate) fn new(root: &'a Node) -> Self {
		Self {
			chunks: Chunks::new(root),
			current: "".chars(),
			pos: 0,
		}
	}

	pub(crate) fn from_char(root: &'a Node, char_idx: usize) -> Self {
		let (mut chunks, local) = Chunks::from_char(root, char_idx);
		let mut current = "".chars();
		if let Some((chunk, _)) = chunks.next() {
			let byte = chars::to_byte_idx(chunk, local);
			current = chunk[byte..].chars();
		}
		Self {
			chunks,
			current,
			pos: char_idx,
		}
	}

	/// Character index of the next value to be returned.
	pub fn pos(&self) -> CharIdx {
		self.pos
	}

	/// The next character without advancing.
	pub fn peek(&self) -> Option<char> {
		self.clone().next()
	}

	/// Advances past up to `n` characters.
	pub fn skip_chars(&mut self, n: usize) {
		for _ in 0..n {
			if self.next().is_none() {
				break;
			}
		}
	}
}

impl Iterator for Chars<'_> {
	type Item = char;

	fn next(&mut self) -> Option<char> {
		loop {
			if let Some(c) = self.current.next() {
				self.pos += 1;
				return Some(c);
			}
			let (chunk, _) = self.chunks.next()?;
			self.current = chunk.chars();
		}
	}
}

/// Reverse iterator over leaf chunks, yielding each chunk with the character
/// index of its first element.
#[derive(Clone)]
struct RevChunks<'a> {
	stack: NodeStack<'a>,
	end_chars: usize,
}

impl<'a> RevChunks<'a> {
	fn new(root: &'a Node, len_chars: usize) -> Self {
		let mut stack = NodeStack::new();
		stack.push(root);
		Self {
			stack,
			end_chars: len_chars,
		}
	}
}

impl<'a> Iterator for RevChunks<'a> {
	type Item = (&'a str, usize);

	fn next(&mut self) -> Option<Self::Item> {
		while let Some(node) = self.stack.pop() {
			match node {
				Node::Internal { left, right, .. } => {
					self.stack.push(left);
					self.stack.push(right);
				}
				Node::Leaf(text) => {
					if text.is_empty() {
						continue;
					}
					let count = chars::count(text);
					self.end_chars -= count;
					return Some((text.as_str(), self.end_chars));
				}
			}
		}
		None
	}
}

/// Reverse iterator over characters, from the end of the rope towards the
/// start.
#[derive(Clone)]
pub struct RevChars<'a> {
	root: &'a Node,
	len_chars: usize,
	chunks: RevChunks<'a>,
	current: std::iter::Rev<std::str::Chars<'a>>,
	/// Character index one past the next value to be returned.
	pos: CharIdx,
	returned: Option<CharIdx>,
}

impl<'a> RevChars<'a> {
	pub(crate) fn new(root: &'a Node, len_chars: usize) -> Self {
		Self {
			root,
			len_chars,
			chunks: RevChunks::new(root, len_chars),
			current: "".chars().rev(),
			pos: len_chars,
			returned: None,
		}
	}

	/// Character index of the value most recently returned, or `None` before
	/// the first call to `next`.
	pub fn position_from_start(&self) -> Option<CharIdx> {
		self.returned
	}

	/// Repositions the iterator so that the next call to `next` returns the
	/// character at `i`.
	pub fn seek_from_start(&mut self, i: CharIdx) -> Result<()> {
		if i >= self.len_chars {
			return Err(Error::OutOfBounds {
				index: i,
				len: self.len_chars,
			});
		}

		// Walk down to the leaf containing `i`, keeping every passed left
		// subtree on the stack for later.
		let mut stack = NodeStack::new();
		let mut end = i + 1;
		let mut base = 0;
		let mut node = self.root;
		loop {
			match node {
				Node::Internal {
					left,
					right,
					left_info,
					..
				} => {
					if end > left_info.chars {
						stack.push(left);
						end -= left_info.chars;
						base += left_info.chars;
						node = right;
					} else {
						node = left;
					}
				}
				Node::Leaf(text) => {
					let byte = chars::to_byte_idx(text, end);
					self.current = text[..byte].chars().rev();
					self.chunks = RevChunks {
						stack,
						end_chars: base,
					};
					self.pos = i + 1;
					self.returned = None;
					return Ok(());
				}
			}
		}
	}
}

impl Iterator for RevChars<'_> {
	type Item = char;

	fn next(&mut self) -> Option<char> {
		loop {
			if let Some(c) = self.current.next() {
				self.pos -= 1;
				self.returned = Some(self.pos);
				return Some(c);
			}
			let (chunk, _) = self.chunks.next()?;
			self.current = chunk.chars().rev();
		}
	}
}

/// Forward iterator over bytes.
#[derive(Clone)]
pub struct Bytes<'a> {
	root: &'a Node,
	len_bytes: usize,
	chunks: Chunks<'a>,
	current: &'a [u8],
	idx: usize,
	pos: usize,
}

impl<'a> Bytes<'a> {
	pub(crate) fn new(root: &'a Node, len_bytes: usize) -> Self {
		Self {
			root,
			len_bytes,
			chunks: Chunks::new(root),
			current: b"",
			idx: 0,
			pos: 0,
		}
	}

	/// Byte offset of the next byte to be returned.
	pub fn pos(&self) -> usize {
		self.pos
	}

	/// Repositions the iterator so that the next byte returned is the one at
	/// offset `byte`. Seeking to `len_bytes` leaves the iterator exhausted.
	pub fn seek(&mut self, byte: usize) -> Result<()> {
		if byte > self.len_bytes {
			return Err(Error::OutOfBounds {
				index: byte,
				len: self.len_bytes,
			});
		}
		let (mut chunks, local) = Chunks::from_byte(self.root, byte);
		self.current = b"";
		self.idx = 0;
		if let Some((chunk, _)) = chunks.next() {
			self.current = chunk.as_bytes();
			self.idx = local;
		}
		self.chunks = chunks;
		self.pos = byte;
		Ok(())
	}
}

impl Iterator for Bytes<'_> {
	type Item = u8;

	fn next(&mut self) -> Option<u8> {
		loop {
			if self.idx < self.current.len() {
				let b = self.current[self.idx];
				self.idx += 1;
				self.pos += 1;
				return Some(b);
			}
			let (chunk, _) = self.chunks.next()?;
			self.current = chunk.as_bytes();
			self.idx = 0;
		}
	}
}

/// Iterator over UTF-16 code units. Scalar values above U+FFFF yield a
/// surrogate pair.
#[derive(Clone)]
pub struct Utf16Units<'a> {
	chars: Chars<'a>,
	pending: Option<u16>,
}

impl<'a> Utf16Units<'a> {
	pub(crate) fn new(chars: Chars<'a>) -> Self {
		Self {
			chars,
			pending: None,
		}
	}
}

impl Iterator for Utf16Units<'_> {
	type Item = u16;

	fn next(&mut self) -> Option<u16> {
		if let Some(unit) = self.pending.take() {
			return Some(unit);
		}
		let c = self.chars.next()?;
		let mut buf = [0u16; 2];
		let encoded = c.encode_utf16(&mut buf);
		if encoded.len() == 2 {
			self.pending = Some(encoded[1]);
		}
		Some(encoded[0])
	}
}
