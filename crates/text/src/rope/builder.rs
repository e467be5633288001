//! Incremental rope construction and the byte-stream bridge.

use std::io;
use std::sync::Arc;

use crate::error::Error;

use super::Rope;
use super::node::{self, MAX_LEAF_BYTES, Node, build_balanced, floor_char_boundary, new_leaf};

/// Block size for [`Rope::from_reader`].
const READ_BLOCK_BYTES: usize = 4096;

/// Builds a rope from a stream of appended text fragments.
///
/// Appended text accumulates in a pending buffer and is flushed into leaves
/// of at most [`MAX_LEAF_BYTES`]. A flush never splits a code point and never
/// ends a chunk on a `\r` whose `\n` follows in the pending text, so CRLF
/// pairs stay within one chunk.
#[derive(Debug, Default)]
pub struct RopeBuilder {
	leaves: Vec<Arc<Node>>,
	pending: String,
}

impl RopeBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends `text` to the end of the rope being built.
	pub fn append(&mut self, text: &str) {
		self.pending.push_str(text);
		while self.pending.len() >= MAX_LEAF_BYTES * 2 {
			self.flush_chunk();
		}
	}

	/// Moves one full chunk out of the pending buffer.
	fn flush_chunk(&mut self) {
		let mut split = floor_char_boundary(&self.pending, MAX_LEAF_BYTES);
		if self.pending.as_bytes()[split - 1] == b'\r' && self.pending.as_bytes()[split] == b'\n' {
			split -= 1;
		}
		debug_assert!(split > 0);
		let rest = self.pending.split_off(split);
		let chunk = std::mem::replace(&mut self.pending, rest);
		self.leaves.push(new_leaf(&chunk));
	}

	/// Finishes the build and returns the rope.
	pub fn finish(mut self) -> Rope {
		if !self.pending.is_empty() {
			node::push_leaves(&self.pending, &mut self.leaves);
		}
		let root = build_balanced(&self.leaves);
		let info = root.info();
		Rope { root, info }
	}
}

impl Rope {
	/// Reads an entire UTF-8 byte stream into a rope.
	///
	/// Reads in fixed-size blocks and buffers any partial trailing code point
	/// between reads, so multi-byte sequences may straddle block boundaries.
	///
	/// # Errors
	/// Any reader error is passed through; bytes that do not reassemble into
	/// valid UTF-8 produce an [`io::ErrorKind::InvalidData`] error wrapping
	/// [`Error::InvalidUtf8`].
	pub fn from_reader<R: io::Read>(mut reader: R) -> io::Result<Rope> {
		let mut builder = RopeBuilder::new();
		let mut block = [0u8; READ_BLOCK_BYTES];
		// Holds an incomplete trailing code point between reads; never more
		// than three bytes.
		let mut carry: Vec<u8> = Vec::new();

		loop {
			let read = reader.read(&mut block)?;
			if read == 0 {
				if !carry.is_empty() {
					return Err(io::Error::new(
						io::ErrorKind::InvalidData,
						Error::InvalidUtf8,
					));
				}
				return Ok(builder.finish());
			}

			carry.extend_from_slice(&block[..read]);
			match std::str::from_utf8(&carry) {
				Ok(text) => {
					builder.append(text);
					carry.clear();
				}
				Err(err) => {
					if err.error_len().is_some() {
						return Err(io::Error::new(
							io::ErrorKind::InvalidData,
							Error::InvalidUtf8,
						));
					}
					let valid = err.valid_up_to();
					// The prefix is known-valid UTF-8.
					builder.append(
						std::str::from_utf8(&carry[..valid]).map_err(|_| {
							io::Error::new(io::ErrorKind::InvalidData, Error::InvalidUtf8)
						})?,
					);
					carry.drain(..valid);
				}
			}
		}
	}

	/// Writes the rope's chunks to `writer`. The total number of bytes
	/// written equals [`len_bytes`](Rope::len_bytes).
	pub fn write_to<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
		for (chunk, _) in self.chunks() {
			writer.write_all(chunk.as_bytes())?;
		}
		Ok(())
	}
}
