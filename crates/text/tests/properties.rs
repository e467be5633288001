//! Property-based invariants of the rope and the OT layer.

use proptest::prelude::*;

use weft_text::{Assoc, Change, ChangeSet, Rope, Tendril, Transaction};

/// Turns arbitrary `(start, end, text)` triples into sorted, in-bounds,
/// non-overlapping changes over a document of `len` characters.
fn normalize_changes(len: usize, raw: &[(usize, usize, String)]) -> Vec<Change> {
	let mut edits: Vec<(usize, usize, &str)> = raw
		.iter()
		.map(|(a, b, text)| {
			let a = a % (len + 1);
			let b = b % (len + 1);
			(a.min(b), a.max(b), text.as_str())
		})
		.collect();
	edits.sort_by_key(|&(start, end, _)| (start, end));

	let mut last = 0;
	let mut changes = Vec::new();
	for (start, end, text) in edits {
		if start < last {
			continue;
		}
		changes.push(Change {
			start,
			end,
			replacement: if text.is_empty() {
				None
			} else {
				Some(Tendril::from(text))
			},
		});
		last = end;
	}
	changes
}

fn changeset_for(doc: &Rope, raw: &[(usize, usize, String)]) -> ChangeSet {
	let changes = normalize_changes(doc.len_chars(), raw);
	Transaction::change(doc, changes)
		.expect("normalized changes are valid")
		.changes()
		.clone()
}

proptest! {
	#[test]
	fn slice_roundtrip_identity(text in ".*", a in any::<usize>(), b in any::<usize>()) {
		let rope = Rope::from_str(&text);
		let len = rope.len_chars();
		let (a, b) = (a % (len + 1), b % (len + 1));
		let (a, b) = (a.min(b), a.max(b));

		let front = rope.slice_rope(0, a).unwrap();
		let mid = rope.slice_rope(a, b).unwrap();
		let back = rope.slice_rope(b, len).unwrap();
		prop_assert_eq!(front.concat(&mid.concat(&back)), rope);
	}

	#[test]
	fn insert_then_delete_is_identity(
		text in ".*",
		at in any::<usize>(),
		insertion in ".{1,32}",
	) {
		let rope = Rope::from_str(&text);
		let at = at % (rope.len_chars() + 1);
		let inserted = rope.insert(at, &insertion).unwrap();
		let count = insertion.chars().count();
		let restored = inserted.delete(at, at + count).unwrap();
		prop_assert_eq!(restored, rope);
	}

	#[test]
	fn split_concat_is_identity(text in ".*", at in any::<usize>()) {
		let rope = Rope::from_str(&text);
		let at = at % (rope.len_chars() + 1);
		let (left, right) = rope.split(at).unwrap();
		prop_assert_eq!(left.len_chars(), at);
		prop_assert_eq!(left.concat(&right), rope);
	}

	#[test]
	fn apply_is_well_typed(
		text in ".*",
		raw in proptest::collection::vec((any::<usize>(), any::<usize>(), ".{0,8}"), 0..6),
	) {
		let rope = Rope::from_str(&text);
		let changes = changeset_for(&rope, &raw);
		let updated = changes.apply(&rope).unwrap();
		prop_assert_eq!(updated.len_chars(), changes.len_after());
	}

	#[test]
	fn invert_is_an_inverse(
		text in ".*",
		raw in proptest::collection::vec((any::<usize>(), any::<usize>(), ".{0,8}"), 0..6),
	) {
		let rope = Rope::from_str(&text);
		let changes = changeset_for(&rope, &raw);
		let updated = changes.apply(&rope).unwrap();
		let inverse = changes.invert(&rope).unwrap();
		prop_assert_eq!(inverse.apply(&updated).unwrap(), rope);
	}

	#[test]
	fn compose_law(
		text in ".*",
		raw_a in proptest::collection::vec((any::<usize>(), any::<usize>(), ".{0,8}"), 0..5),
		raw_b in proptest::collection::vec((any::<usize>(), any::<usize>(), ".{0,8}"), 0..5),
	) {
		let rope = Rope::from_str(&text);
		let a = changeset_for(&rope, &raw_a);
		let mid = a.apply(&rope).unwrap();
		let b = changeset_for(&mid, &raw_b);
		let sequential = b.apply(&mid).unwrap();

		let composed = a.compose(b).unwrap();
		prop_assert_eq!(composed.apply(&rope).unwrap(), sequential);
	}

	#[test]
	fn transform_law(
		text in ".*",
		raw_a in proptest::collection::vec((any::<usize>(), any::<usize>(), ".{0,8}"), 0..5),
		raw_b in proptest::collection::vec((any::<usize>(), any::<usize>(), ".{0,8}"), 0..5),
	) {
		let rope = Rope::from_str(&text);
		let a = changeset_for(&rope, &raw_a);
		let b = changeset_for(&rope, &raw_b);

		let (a_prime, b_prime) = a.clone().transform(b.clone()).unwrap();
		let via_a = a.compose(b_prime).unwrap().apply(&rope).unwrap();
		let via_b = b.compose(a_prime).unwrap().apply(&rope).unwrap();
		prop_assert_eq!(via_a, via_b);
	}

	#[test]
	fn utf16_roundtrip(text in ".*") {
		let rope = Rope::from_str(&text);
		for i in 0..=rope.len_chars() {
			let unit = rope.char_to_utf16(i).unwrap();
			prop_assert_eq!(rope.utf16_to_char(unit).unwrap(), i);
		}
	}

	#[test]
	fn grapheme_coverage(text in ".*") {
		let rope = Rope::from_str(&text);
		let total: usize = rope.graphemes().map(|g| g.char_len).sum();
		prop_assert_eq!(total, rope.len_chars());
	}

	#[test]
	fn char_iterator_matches_string(text in ".*") {
		let rope = Rope::from_str(&text);
		let collected: String = rope.chars().collect();
		prop_assert_eq!(collected, text);
	}

	#[test]
	fn mapped_positions_stay_in_bounds(
		text in ".*",
		raw in proptest::collection::vec((any::<usize>(), any::<usize>(), ".{0,8}"), 0..5),
		pos in any::<usize>(),
	) {
		let rope = Rope::from_str(&text);
		let changes = changeset_for(&rope, &raw);
		let pos = pos % (rope.len_chars() + 1);
		for assoc in [Assoc::Before, Assoc::After, Assoc::BeforeSticky, Assoc::AfterSticky] {
			let mapped = changes.map_pos(pos, assoc).unwrap();
			prop_assert!(mapped <= changes.len_after());
		}
	}
}
