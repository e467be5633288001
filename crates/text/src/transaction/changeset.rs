//! Changesets: ordered `Retain`/`Delete`/`Insert` operation lists.
//!
//! A [`ChangeSet`] describes the transformation between two document states.
//! Operation counts are in characters. Two structural invariants hold for
//! every changeset that leaves this module: adjacent operations of the same
//! kind are coalesced (an insert directly followed by a delete is the
//! canonical form of a replacement), and no operation is zero-length.

use std::iter::once;

use smartstring::{LazyCompact, SmartString};
use str_indices::chars;

use crate::error::{Error, Result};
use crate::range::CharIdx;
use crate::rope::Rope;
use crate::words::char_is_word;

use super::Change;

/// Compact owned text fragment carried by insert operations.
pub type Tendril = SmartString<LazyCompact>;

/// A single document operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
	/// Keep the next n characters.
	Retain(usize),
	/// Remove the next n characters.
	Delete(usize),
	/// Insert text at the current position.
	Insert(Tendril),
}

impl Operation {
	/// Character count of this operation on the side it touches.
	pub fn len_chars(&self) -> usize {
		match self {
			Operation::Retain(n) | Operation::Delete(n) => *n,
			Operation::Insert(s) => s.chars().count(),
		}
	}
}

/// How a mapped position resolves an edit that lands exactly on it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Assoc {
	/// Stay on the old side of insertions and deletions at the position.
	Before,
	/// Move past insertions at the position.
	After,
	/// Acts like `Before`, except the position follows word characters at
	/// the end of an insertion.
	BeforeWord,
	/// Acts like `After`, except the position only follows the leading word
	/// characters of an insertion.
	AfterWord,
	/// Acts like `Before`, but inside an exact-size replacement the offset
	/// from the replacement start is preserved.
	BeforeSticky,
	/// Acts like `After`, but inside an exact-size replacement the offset
	/// from the replacement start is preserved.
	AfterSticky,
}

impl Assoc {
	/// Whether the association pins positions to gap boundaries.
	fn stays_at_gaps(self) -> bool {
		!matches!(self, Self::BeforeWord | Self::AfterWord)
	}

	/// Where inside an inserted fragment the position lands.
	fn insert_offset(self, s: &str) -> usize {
		let chars = s.chars().count();
		match self {
			Assoc::After | Assoc::AfterSticky => chars,
			Assoc::AfterWord => s.chars().take_while(|&c| char_is_word(c)).count(),
			Assoc::Before | Assoc::BeforeSticky => 0,
			Assoc::BeforeWord => chars - s.chars().rev().take_while(|&c| char_is_word(c)).count(),
		}
	}

	pub fn sticky(self) -> bool {
		matches!(self, Assoc::BeforeSticky | Assoc::AfterSticky)
	}
}

/// An ordered list of operations transforming a document of `len_before`
/// characters into one of `len_after` characters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
	operations: Vec<Operation>,
	len_before: usize,
	len_after: usize,
}

impl ChangeSet {
	pub(crate) fn with_capacity(capacity: usize) -> Self {
		Self {
			operations: Vec::with_capacity(capacity),
			len_before: 0,
			len_after: 0,
		}
	}

	/// The identity changeset over a document of `len` characters.
	pub fn identity(len: usize) -> Self {
		let operations = if len > 0 {
			vec![Operation::Retain(len)]
		} else {
			Vec::new()
		};
		Self {
			operations,
			len_before: len,
			len_after: len,
		}
	}

	pub fn operations(&self) -> &[Operation] {
		&self.operations
	}

	/// Character count of the document this changeset consumes.
	pub fn len_before(&self) -> usize {
		self.len_before
	}

	/// Character count of the document this changeset produces.
	pub fn len_after(&self) -> usize {
		self.len_after
	}

	/// Whether applying this changeset leaves any document unchanged.
	pub fn is_empty(&self) -> bool {
		self.operations.is_empty() || self.operations == [Operation::Retain(self.len_before)]
	}

	// Accumulating mutators used by the builder and the combinators. Each
	// coalesces with the tail of the operation list and keeps the length
	// fields consistent.

	pub(crate) fn retain(&mut self, n: usize) {
		use Operation::*;

		if n == 0 {
			return;
		}

		self.len_before += n;
		self.len_after += n;

		if let Some(Retain(count)) = self.operations.last_mut() {
			*count += n;
		} else {
			self.operations.push(Retain(n));
		}
	}

	pub(crate) fn delete(&mut self, n: usize) {
		use Operation::*;

		if n == 0 {
			return;
		}

		self.len_before += n;

		if let Some(Delete(count)) = self.operations.last_mut() {
			*count += n;
		} else {
			self.operations.push(Delete(n));
		}
	}

	pub(crate) fn insert(&mut self, fragment: Tendril) {
		use Operation::*;

		if fragment.is_empty() {
			return;
		}

		self.len_after += fragment.chars().count();

		// An insert adjacent to another insert merges into it, including
		// through the canonical insert-then-delete replacement form.
		let new_last = match self.operations.as_mut_slice() {
			[.., Insert(prev)] | [.., Insert(prev), Delete(_)] => {
				prev.push_str(&fragment);
				return;
			}
			[.., last @ Delete(_)] => std::mem::replace(last, Insert(fragment)),
			_ => Insert(fragment),
		};

		self.operations.push(new_last);
	}

	fn ensure_len(&self, text_len: usize) -> Result<()> {
		if text_len != self.len_before {
			return Err(Error::LengthMismatch {
				expected: self.len_before,
				actual: text_len,
			});
		}
		Ok(())
	}

	/// Applies the changeset, producing a new rope.
	///
	/// The input rope is untouched; retained spans are shared between the
	/// input and the result.
	///
	/// # Errors
	/// `LengthMismatch` when `doc.len_chars() != len_before`.
	pub fn apply(&self, doc: &Rope) -> Result<Rope> {
		self.ensure_len(doc.len_chars())?;
		if self.is_empty() {
			return Ok(doc.clone());
		}

		let mut output = Rope::new();
		let mut rest = doc.clone();
		for op in &self.operations {
			match op {
				Operation::Retain(n) => {
					let (kept, tail) = rest.split(*n)?;
					output = output.concat(&kept);
					rest = tail;
				}
				Operation::Delete(n) => {
					let (_, tail) = rest.split(*n)?;
					rest = tail;
				}
				Operation::Insert(s) => {
					output = output.concat(&Rope::from_str(s));
				}
			}
		}
		Ok(output.concat(&rest))
	}

	/// Returns the changeset that undoes this one. `original` must be the
	/// document this changeset consumes; the inverse reads deleted text out
	/// of it.
	pub fn invert(&self, original: &Rope) -> Result<ChangeSet> {
		self.ensure_len(original.len_chars())?;

		let mut inverted = Self::with_capacity(self.operations.len());
		let mut pos = 0;

		for op in &self.operations {
			match op {
				Operation::Retain(n) => {
					inverted.retain(*n);
					pos += n;
				}
				Operation::Delete(n) => {
					let deleted = original.slice(pos, pos + n)?;
					inverted.insert(Tendril::from(deleted.as_str()));
					pos += n;
				}
				Operation::Insert(_) => {
					inverted.delete(op.len_chars());
				}
			}
		}

		Ok(inverted)
	}

	/// Combines two changesets into one: if `self` takes `docA` to `docB`
	/// and `other` takes `docB` to `docC`, the result takes `docA` to
	/// `docC`.
	///
	/// # Errors
	/// `LengthMismatch` when `self.len_after != other.len_before`.
	pub fn compose(self, other: Self) -> Result<Self> {
		if self.len_after != other.len_before {
			return Err(Error::LengthMismatch {
				expected: self.len_after,
				actual: other.len_before,
			});
		}

		// A zero-length side has no operations to merge with.
		if self.operations.is_empty() {
			return Ok(other);
		}
		if other.operations.is_empty() {
			return Ok(self);
		}

		let len_before = self.len_before;
		let capacity = self.operations.len().max(other.operations.len());

		let mut ops_a = self.operations.into_iter();
		let mut ops_b = other.operations.into_iter();
		let mut head_a = ops_a.next();
		let mut head_b = ops_b.next();

		let mut composed = Self::with_capacity(capacity);

		loop {
			use std::cmp::Ordering;

			use Operation::*;
			match (head_a, head_b) {
				(None, None) => break,
				// A deletion in `self` happens before `other` sees the text.
				(Some(Delete(i)), b) => {
					composed.delete(i);
					head_a = ops_a.next();
					head_b = b;
				}
				// An insertion in `other` is unaffected by `self`.
				(a, Some(Insert(fragment))) => {
					composed.insert(fragment);
					head_a = a;
					head_b = ops_b.next();
				}
				(None, val) | (val, None) => {
					unreachable!("compose: unbalanced operation streams ({val:?})")
				}
				(Some(Retain(i)), Some(Retain(j))) => match i.cmp(&j) {
					Ordering::Less => {
						composed.retain(i);
						head_a = ops_a.next();
						head_b = Some(Retain(j - i));
					}
					Ordering::Equal => {
						composed.retain(i);
						head_a = ops_a.next();
						head_b = ops_b.next();
					}
					Ordering::Greater => {
						composed.retain(j);
						head_a = Some(Retain(i - j));
						head_b = ops_b.next();
					}
				},
				(Some(Insert(s)), Some(Delete(j))) => {
					let len = s.chars().count();
					match len.cmp(&j) {
						Ordering::Less => {
							head_a = ops_a.next();
							head_b = Some(Delete(j - len));
						}
						Ordering::Equal => {
							head_a = ops_a.next();
							head_b = ops_b.next();
						}
						Ordering::Greater => {
							let byte = chars::to_byte_idx(&s, j);
							head_a = Some(Insert(Tendril::from(&s[byte..])));
							head_b = ops_b.next();
						}
					}
				}
				(Some(Insert(s)), Some(Retain(j))) => {
					let len = s.chars().count();
					match len.cmp(&j) {
						Ordering::Less => {
							composed.insert(s);
							head_a = ops_a.next();
							head_b = Some(Retain(j - len));
						}
						Ordering::Equal => {
							composed.insert(s);
							head_a = ops_a.next();
							head_b = ops_b.next();
						}
						Ordering::Greater => {
							let byte = chars::to_byte_idx(&s, j);
							composed.insert(Tendril::from(&s[..byte]));
							head_a = Some(Insert(Tendril::from(&s[byte..])));
							head_b = ops_b.next();
						}
					}
				}
				(Some(Retain(i)), Some(Delete(j))) => match i.cmp(&j) {
					Ordering::Less => {
						composed.delete(i);
						head_a = ops_a.next();
						head_b = Some(Delete(j - i));
					}
					Ordering::Equal => {
						composed.delete(j);
						head_a = ops_a.next();
						head_b = ops_b.next();
					}
					Ordering::Greater => {
						composed.delete(j);
						head_a = Some(Retain(i - j));
						head_b = ops_b.next();
					}
				},
			};
		}

		debug_assert_eq!(composed.len_before, len_before);
		Ok(composed)
	}

	/// Alias for [`compose`](ChangeSet::compose).
	pub fn merge(self, other: Self) -> Result<Self> {
		self.compose(other)
	}

	/// Rebases two changesets made concurrently against the same document.
	///
	/// Returns `(a', b')` such that `a.compose(b') == b.compose(a')`: either
	/// side can apply its own changeset followed by the transformed remote
	/// one and land on the same document. When both sides insert at the same
	/// position, the left operand's text ends up first.
	///
	/// # Errors
	/// `LengthMismatch` when the two sides consume documents of different
	/// lengths.
	pub fn transform(self, other: Self) -> Result<(Self, Self)> {
		if self.len_before != other.len_before {
			return Err(Error::LengthMismatch {
				expected: self.len_before,
				actual: other.len_before,
			});
		}

		let a_len_after = self.len_after;
		let b_len_after = other.len_after;
		let capacity = self.operations.len() + other.operations.len();

		let mut ops_a = self.operations.into_iter();
		let mut ops_b = other.operations.into_iter();
		let mut head_a = ops_a.next();
		let mut head_b = ops_b.next();

		let mut a_prime = Self::with_capacity(capacity);
		let mut b_prime = Self::with_capacity(capacity);

		loop {
			use std::cmp::Ordering;

			use Operation::*;
			match (head_a, head_b) {
				(None, None) => break,
				// Concurrent inserts at one position: the left operand's
				// text lands first.
				(Some(Insert(s)), b) => {
					let n = s.chars().count();
					a_prime.insert(s);
					b_prime.retain(n);
					head_a = ops_a.next();
					head_b = b;
				}
				(a, Some(Insert(s))) => {
					let n = s.chars().count();
					a_prime.retain(n);
					b_prime.insert(s);
					head_a = a;
					head_b = ops_b.next();
				}
				(None, val) | (val, None) => {
					unreachable!("transform: unbalanced operation streams ({val:?})")
				}
				(Some(Retain(i)), Some(Retain(j))) => match i.cmp(&j) {
					Ordering::Less => {
						a_prime.retain(i);
						b_prime.retain(i);
						head_a = ops_a.next();
						head_b = Some(Retain(j - i));
					}
					Ordering::Equal => {
						a_prime.retain(i);
						b_prime.retain(i);
						head_a = ops_a.next();
						head_b = ops_b.next();
					}
					Ordering::Greater => {
						a_prime.retain(j);
						b_prime.retain(j);
						head_a = Some(Retain(i - j));
						head_b = ops_b.next();
					}
				},
				// The side that deletes wins over a concurrent retain; the
				// other transformed side must skip the vanished text.
				(Some(Delete(i)), Some(Retain(j))) => match i.cmp(&j) {
					Ordering::Less => {
						a_prime.delete(i);
						head_a = ops_a.next();
						head_b = Some(Retain(j - i));
					}
					Ordering::Equal => {
						a_prime.delete(i);
						head_a = ops_a.next();
						head_b = ops_b.next();
					}
					Ordering::Greater => {
						a_prime.delete(j);
						head_a = Some(Delete(i - j));
						head_b = ops_b.next();
					}
				},
				(Some(Retain(i)), Some(Delete(j))) => match i.cmp(&j) {
					Ordering::Less => {
						b_prime.delete(i);
						head_a = ops_a.next();
						head_b = Some(Delete(j - i));
					}
					Ordering::Equal => {
						b_prime.delete(j);
						head_a = ops_a.next();
						head_b = ops_b.next();
					}
					Ordering::Greater => {
						b_prime.delete(j);
						head_a = Some(Retain(i - j));
						head_b = ops_b.next();
					}
				},
				// Both sides deleted the same text: neither transformed
				// side sees it.
				(Some(Delete(i)), Some(Delete(j))) => match i.cmp(&j) {
					Ordering::Less => {
						head_a = ops_a.next();
						head_b = Some(Delete(j - i));
					}
					Ordering::Equal => {
						head_a = ops_a.next();
						head_b = ops_b.next();
					}
					Ordering::Greater => {
						head_a = Some(Delete(i - j));
						head_b = ops_b.next();
					}
				},
			}
		}

		debug_assert_eq!(a_prime.len_before, b_len_after);
		debug_assert_eq!(b_prime.len_before, a_len_after);
		Ok((a_prime, b_prime))
	}

	/// Splits the changeset at position `at` of its *output* document.
	///
	/// The left half produces the first `at` characters of the output, the
	/// right half the rest; deletions pending exactly at the split point
	/// stay with the left half. Composing is not the inverse of splitting,
	/// but applying both halves in sequence to the split input documents
	/// reproduces `apply`.
	pub fn split_at(&self, at: usize) -> Result<(Self, Self)> {
		if at > self.len_after {
			return Err(Error::OutOfBounds {
				index: at,
				len: self.len_after,
			});
		}

		let mut left = Self::default();
		let mut right = Self::default();
		let mut new_pos = 0;

		for op in &self.operations {
			match op {
				Operation::Retain(n) => {
					if new_pos + n <= at {
						left.retain(*n);
					} else if new_pos >= at {
						right.retain(*n);
					} else {
						let k = at - new_pos;
						left.retain(k);
						right.retain(n - k);
					}
					new_pos += n;
				}
				Operation::Insert(s) => {
					let count = op.len_chars();
					if new_pos + count <= at {
						left.insert(s.clone());
					} else if new_pos >= at {
						right.insert(s.clone());
					} else {
						let byte = chars::to_byte_idx(s, at - new_pos);
						left.insert(Tendril::from(&s[..byte]));
						right.insert(Tendril::from(&s[byte..]));
					}
					new_pos += count;
				}
				Operation::Delete(n) => {
					if new_pos <= at {
						left.delete(*n);
					} else {
						right.delete(*n);
					}
				}
			}
		}

		Ok((left, right))
	}

	/// Maps a batch of positions through the changeset in place.
	///
	/// Sorted inputs map in a single `O(N + M)` pass; unsorted inputs are
	/// handled by rewinding, degrading towards `O(N · M)` in the worst
	/// case.
	///
	/// # Errors
	/// `OutOfBounds` when a position exceeds `len_before`. Positions before
	/// the first offending one are already mapped at that point.
	pub fn update_positions<'a>(
		&self,
		positions: impl Iterator<Item = (&'a mut CharIdx, Assoc)>,
	) -> Result<()> {
		use Operation::*;

		let mut positions = positions.peekable();

		let mut old_pos = 0;
		let mut new_pos = 0;
		let mut iter = self.operations.iter().enumerate().peekable();

		'outer: loop {
			macro_rules! map {
				($map:expr, $i:expr) => {
					loop {
						let Some((pos, assoc)) = positions.peek_mut() else {
							return Ok(());
						};
						if **pos < old_pos {
							// Unsorted input: rewind to an operation at or
							// before this position and continue from there.
							// The loop runs to the front so the restarted
							// enumeration keeps absolute indices.
							for (i, op) in self.operations[..$i].iter().enumerate().rev() {
								match op {
									Retain(n) => {
										old_pos -= n;
										new_pos -= n;
									}
									Delete(n) => {
										old_pos -= n;
									}
									Insert(s) => {
										new_pos -= s.chars().count();
									}
								}
								if old_pos <= **pos {
									iter = self.operations[i..].iter().enumerate().peekable();
								}
							}
							debug_assert!(old_pos <= **pos, "rewind reached the position");
							continue 'outer;
						}
						#[allow(clippy::redundant_closure_call)]
						let Some(mapped) = $map(**pos, *assoc) else {
							break;
						};
						**pos = mapped;
						positions.next();
					}
				};
			}

			let Some((i, op)) = iter.next() else {
				map!(
					|pos, _| (old_pos == pos).then_some(new_pos),
					self.operations.len()
				);
				break;
			};

			let len = match op {
				Delete(n) | Retain(n) => *n,
				Insert(_) => 0,
			};
			let mut old_end = old_pos + len;

			match op {
				Retain(_) => {
					map!(
						|pos, _| (old_end > pos).then_some(new_pos + (pos - old_pos)),
						i
					);
					new_pos += len;
				}
				Delete(_) => {
					// Positions inside deleted text collapse to its start.
					map!(|pos, _| (old_end > pos).then_some(new_pos), i);
				}
				Insert(s) => {
					// A subsequent delete makes this a replacement; consume
					// it so both are resolved together.
					if let Some((_, Delete(del))) = iter.peek() {
						let del_len = *del;
						iter.next();

						old_end = old_pos + del_len;
						map!(
							|pos, assoc: Assoc| {
								(old_end > pos).then(|| {
									if pos == old_pos && assoc.stays_at_gaps() {
										new_pos
									} else if assoc.sticky() && del_len == s.chars().count() {
										// Exact-size replacement: keep the
										// relative offset into the new text.
										new_pos + (pos - old_pos)
									} else {
										new_pos + assoc.insert_offset(s)
									}
								})
							},
							i
						);
					} else {
						map!(
							|pos, assoc: Assoc| {
								(old_pos == pos).then(|| new_pos + assoc.insert_offset(s))
							},
							i
						);
					}

					new_pos += s.chars().count();
				}
			}
			old_pos = old_end;
		}

		let mut leftover = positions.map(|(pos, _)| *pos);
		match leftover.next() {
			None => Ok(()),
			Some(first) => Err(Error::OutOfBounds {
				index: first,
				len: self.len_before,
			}),
		}
	}

	/// Maps a single position through the changeset.
	pub fn map_pos(&self, pos: CharIdx, assoc: Assoc) -> Result<CharIdx> {
		let mut pos = pos;
		self.update_positions(once((&mut pos, assoc)))?;
		Ok(pos)
	}

	/// Maps a batch of `(position, association)` pairs, returning the mapped
	/// positions in input order.
	pub fn map_positions(&self, positions: &[(CharIdx, Assoc)]) -> Result<Vec<CharIdx>> {
		let mut mapped: Vec<CharIdx> = positions.iter().map(|&(pos, _)| pos).collect();
		self.update_positions(
			mapped
				.iter_mut()
				.zip(positions.iter().map(|&(_, assoc)| assoc)),
		)?;
		Ok(mapped)
	}

	/// Iterates the changeset as coalesced `(start, end, replacement)`
	/// changes in old-document coordinates.
	pub fn changes_iter(&self) -> ChangeIterator<'_> {
		ChangeIterator::new(self)
	}
}

/// Fluent builder for [`ChangeSet`].
///
/// All methods take and return the builder by value, so a changeset is
/// assembled as a single expression. [`build`](ChangeSetBuilder::build)
/// checks that the operations consume exactly the declared input length.
#[derive(Debug)]
pub struct ChangeSetBuilder {
	changes: ChangeSet,
	expected_len: usize,
}

impl ChangeSetBuilder {
	/// Starts a changeset over a document of `len_before` characters.
	pub fn new(len_before: usize) -> Self {
		Self {
			changes: ChangeSet::with_capacity(4),
			expected_len: len_before,
		}
	}

	#[must_use]
	pub fn retain(mut self, n: usize) -> Self {
		self.changes.retain(n);
		self
	}

	#[must_use]
	pub fn delete(mut self, n: usize) -> Self {
		self.changes.delete(n);
		self
	}

	#[must_use]
	pub fn insert(mut self, text: impl Into<Tendril>) -> Self {
		self.changes.insert(text.into());
		self
	}

	/// Finishes the changeset.
	///
	/// # Errors
	/// `LengthMismatch` when the retains and deletes do not consume exactly
	/// the declared input length.
	pub fn build(self) -> Result<ChangeSet> {
		if self.changes.len_before != self.expected_len {
			return Err(Error::LengthMismatch {
				expected: self.expected_len,
				actual: self.changes.len_before,
			});
		}
		Ok(self.changes)
	}
}

/// Iterator over a changeset's coalesced changes.
pub struct ChangeIterator<'a> {
	iter: std::iter::Peekable<std::slice::Iter<'a, Operation>>,
	pos: CharIdx,
}

impl<'a> ChangeIterator<'a> {
	fn new(changeset: &'a ChangeSet) -> Self {
		Self {
			iter: changeset.operations.iter().peekable(),
			pos: 0,
		}
	}
}

impl Iterator for ChangeIterator<'_> {
	type Item = Change;

	fn next(&mut self) -> Option<Self::Item> {
		use Operation::*;

		loop {
			match self.iter.next()? {
				Retain(n) => {
					self.pos += n;
				}
				Delete(n) => {
					let start = self.pos;
					self.pos += n;
					return Some(Change {
						start,
						end: self.pos,
						replacement: None,
					});
				}
				Insert(s) => {
					let start = self.pos;
					// A subsequent delete means this is a replacement.
					if let Some(Delete(n)) = self.iter.peek() {
						let n = *n;
						self.iter.next();
						self.pos += n;
						return Some(Change {
							start,
							end: self.pos,
							replacement: Some(s.clone()),
						});
					}
					return Some(Change {
						start,
						end: start,
						replacement: Some(s.clone()),
					});
				}
			}
		}
	}
}
