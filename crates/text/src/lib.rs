//! Core text primitives: a persistent rope, changesets, and selections.
//!
//! The rope is an immutable balanced tree over UTF-8 text; every edit
//! returns a new rope sharing unchanged subtrees with its input. Changesets
//! describe edits as retain/delete/insert operation lists and support
//! apply, invert, compose, and operational transform. Selections are sets
//! of anchor/head ranges that can be mapped through changesets.

/// Document abstraction over the rope.
pub mod doc;
/// Error and result types.
pub mod error;
/// Character ranges with directionality.
pub mod range;
/// The persistent rope.
pub mod rope;
/// Multi-range selections.
pub mod selection;
/// Changesets, transactions, and position mapping.
pub mod transaction;
/// Word boundary capability.
pub mod words;

pub use doc::Document;
pub use error::{Error, Result};
pub use range::{CharIdx, Direction, Range};
pub use rope::{
	Bytes, Chars, ChunkPosition, Chunks, GraphemeCluster, Graphemes, RevChars, Rope,
	RopeBuilder, Utf16Units,
};
pub use selection::Selection;
pub use transaction::{
	Assoc, Change, ChangeIterator, ChangeSet, ChangeSetBuilder, Operation, Tendril, Transaction,
};
pub use words::{RopeWords, WordBoundaries, char_is_word, char_is_whitespace};
