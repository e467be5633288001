use super::*;
use crate::error::Error;
use crate::rope::Rope;
use crate::selection::Selection;

fn build(len: usize, f: impl FnOnce(ChangeSetBuilder) -> ChangeSetBuilder) -> ChangeSet {
	f(ChangeSetBuilder::new(len)).build().unwrap()
}

#[test]
fn builder_validates_consumed_length() {
	let err = ChangeSetBuilder::new(10).retain(4).build().unwrap_err();
	assert_eq!(
		err,
		Error::LengthMismatch {
			expected: 10,
			actual: 4
		}
	);

	let set = build(3, |b| b.retain(1).delete(2).insert("xy"));
	assert_eq!(set.len_before(), 3);
	assert_eq!(set.len_after(), 3);
}

#[test]
fn builder_coalesces_adjacent_operations() {
	let set = build(6, |b| b.retain(2).retain(1).delete(1).delete(2).insert("a").insert("b"));
	assert_eq!(
		set.operations(),
		&[
			Operation::Retain(3),
			Operation::Insert("ab".into()),
			Operation::Delete(3),
		]
	);
}

#[test]
fn zero_length_operations_are_dropped() {
	let set = build(2, |b| b.retain(0).retain(2).delete(0).insert(""));
	assert_eq!(set.operations(), &[Operation::Retain(2)]);
}

#[test]
fn apply_produces_new_document() {
	let doc = Rope::from_str("hello world");
	let set = build(11, |b| b.retain(6).delete(5).insert("rust"));
	let updated = set.apply(&doc).unwrap();
	assert_eq!(updated.to_string(), "hello rust");
	assert_eq!(updated.len_chars(), set.len_after());
	// Persistent apply leaves the input untouched.
	assert_eq!(doc.to_string(), "hello world");
}

#[test]
fn apply_rejects_wrong_length() {
	let set = build(5, |b| b.retain(5));
	let err = set.apply(&Rope::from_str("nope")).unwrap_err();
	assert_eq!(
		err,
		Error::LengthMismatch {
			expected: 5,
			actual: 4
		}
	);
}

#[test]
fn composition() {
	let a = build(8, |b| {
		b.retain(5).insert(" test!").retain(1).delete(2).insert("abc")
	});
	let b = build(15, |b| b.delete(10).insert("世orld").retain(5));

	let composed = a.compose(b).unwrap();
	assert_eq!(composed.len_before(), 8);

	let text = Rope::from_str("hello xz");
	let updated = composed.apply(&text).unwrap();
	assert_eq!(updated.to_string(), "世orld! abc");
}

#[test]
fn compose_rejects_misaligned_lengths() {
	let a = build(4, |b| b.retain(4).insert("x"));
	let b = build(4, |b| b.retain(4));
	assert!(matches!(
		a.compose(b),
		Err(Error::LengthMismatch {
			expected: 5,
			actual: 4
		})
	));
}

#[test]
fn compose_equals_sequential_application() {
	let doc = Rope::from_str("The quick brown fox");
	let first = build(19, |b| b.retain(4).delete(5).insert("slow").retain(10));
	let mid = first.apply(&doc).unwrap();
	let second = build(mid.len_chars(), |b| b.retain(9).insert(" red").retain(9));
	let fin = second.apply(&mid).unwrap();

	let composed = first.compose(second).unwrap();
	assert_eq!(composed.apply(&doc).unwrap(), fin);
}

#[test]
fn invert_restores_the_original() {
	let doc = Rope::from_str("世界3 hello xz");
	let changes = build(12, |b| b.retain(4).insert("test").delete(5).retain(3));

	let reverted = changes.invert(&doc).unwrap();
	let updated = changes.apply(&doc).unwrap();
	assert_ne!(updated, doc);

	// Inverting the revert against the updated document round-trips.
	assert_eq!(changes, reverted.invert(&updated).unwrap());
	assert_eq!(reverted.apply(&updated).unwrap(), doc);
}

#[test]
fn invert_identity_swaps_lengths() {
	let doc = Rope::from_str("hello");
	let identity = ChangeSet::identity(5);
	let inverted = identity.invert(&doc).unwrap();
	assert_eq!(inverted.len_before(), 5);
	assert_eq!(inverted.apply(&doc).unwrap(), doc);
}

#[test]
fn map_pos_through_inserts() {
	let set = build(8, |b| b.retain(4).insert("!!").retain(4));
	assert_eq!(set.map_pos(0, Assoc::Before).unwrap(), 0);
	assert_eq!(set.map_pos(4, Assoc::Before).unwrap(), 4);
	assert_eq!(set.map_pos(4, Assoc::After).unwrap(), 6);
	assert_eq!(set.map_pos(5, Assoc::Before).unwrap(), 7);
	assert_eq!(set.map_pos(8, Assoc::Before).unwrap(), 10);
}

#[test]
fn map_pos_through_deletes() {
	let set = build(12, |b| b.retain(4).delete(4).retain(4));
	assert_eq!(set.map_pos(0, Assoc::Before).unwrap(), 0);
	assert_eq!(set.map_pos(4, Assoc::Before).unwrap(), 4);
	assert_eq!(set.map_pos(5, Assoc::Before).unwrap(), 4);
	assert_eq!(set.map_pos(5, Assoc::After).unwrap(), 4);
	assert_eq!(set.map_pos(12, Assoc::After).unwrap(), 8);
}

#[test]
fn map_pos_out_of_bounds() {
	let set = build(4, |b| b.retain(4));
	assert!(matches!(
		set.map_pos(5, Assoc::Before),
		Err(Error::OutOfBounds { index: 5, len: 4 })
	));
}

#[test]
fn map_pos_word_associations() {
	// "<space><space>cd" with " ab" inserted at 2 and "de " appended.
	let set = build(4, |b| b.retain(2).insert(" ab").retain(2).insert("de "));
	assert_eq!(set.map_pos(2, Assoc::BeforeWord).unwrap(), 3);
	assert_eq!(set.map_pos(4, Assoc::AfterWord).unwrap(), 9);

	let set = build(5, |b| {
		b.retain(1).insert(" b").delete(1).retain(1).insert("e ").delete(1)
	});
	assert_eq!(set.map_pos(1, Assoc::BeforeWord).unwrap(), 2);
	assert_eq!(set.map_pos(3, Assoc::AfterWord).unwrap(), 5);
}

#[test]
fn map_pos_sticky_in_exact_replacement() {
	// Replace "bc" of "abcd" with "XY": an exact-size replacement.
	let set = build(4, |b| b.retain(1).insert("XY").delete(2).retain(1));
	assert_eq!(set.map_pos(2, Assoc::Before).unwrap(), 1);
	assert_eq!(set.map_pos(2, Assoc::After).unwrap(), 3);
	// Sticky keeps the relative offset into the replacement on both sides.
	assert_eq!(set.map_pos(2, Assoc::BeforeSticky).unwrap(), 2);
	assert_eq!(set.map_pos(2, Assoc::AfterSticky).unwrap(), 2);
	// At the replacement start the gap rule still wins.
	assert_eq!(set.map_pos(1, Assoc::Before).unwrap(), 1);
	assert_eq!(set.map_pos(1, Assoc::AfterSticky).unwrap(), 1);
}

#[test]
fn map_positions_batch_and_unsorted() {
	// Retain(5), Insert(" X"), Retain(6): len 11 -> 13.
	let set = build(11, |b| b.retain(5).insert(" X").retain(6));
	let mapped = set
		.map_positions(&[(0, Assoc::Before), (5, Assoc::Before), (11, Assoc::Before)])
		.unwrap();
	assert_eq!(mapped, vec![0, 5, 13]);
	assert_eq!(set.map_pos(5, Assoc::After).unwrap(), 7);

	// Unsorted input falls back to rewinding.
	let mapped = set
		.map_positions(&[(9, Assoc::Before), (2, Assoc::Before), (7, Assoc::After)])
		.unwrap();
	assert_eq!(mapped, vec![11, 2, 9]);
}

#[test]
fn transform_concurrent_inserts_keep_left_first() {
	let base = Rope::from_str("ab");
	let a = build(2, |b| b.retain(1).insert("X").retain(1));
	let b = build(2, |b| b.retain(1).insert("Y").retain(1));

	let (a_prime, b_prime) = a.clone().transform(b.clone()).unwrap();

	let via_a = a.compose(b_prime).unwrap().apply(&base).unwrap();
	let via_b = b.compose(a_prime).unwrap().apply(&base).unwrap();
	assert_eq!(via_a, via_b);
	assert_eq!(via_a.to_string(), "aXYb");
}

#[test]
fn transform_insert_against_overlapping_delete() {
	let base = Rope::from_str("abc");
	let a = build(3, |b| b.retain(1).delete(2));
	let b = build(3, |b| b.retain(2).insert("Z").retain(1));

	let (a_prime, b_prime) = a.clone().transform(b.clone()).unwrap();
	let via_a = a.compose(b_prime).unwrap().apply(&base).unwrap();
	let via_b = b.compose(a_prime).unwrap().apply(&base).unwrap();
	assert_eq!(via_a, via_b);
	assert_eq!(via_a.to_string(), "aZ");
}

#[test]
fn transform_overlapping_deletes() {
	let base = Rope::from_str("abcdef");
	let a = build(6, |b| b.retain(1).delete(3).retain(2));
	let b = build(6, |b| b.retain(2).delete(3).retain(1));

	let (a_prime, b_prime) = a.clone().transform(b.clone()).unwrap();
	let via_a = a.compose(b_prime).unwrap().apply(&base).unwrap();
	let via_b = b.compose(a_prime).unwrap().apply(&base).unwrap();
	assert_eq!(via_a, via_b);
	assert_eq!(via_a.to_string(), "af");
}

#[test]
fn transform_rejects_different_bases() {
	let a = build(3, |b| b.retain(3));
	let b = build(4, |b| b.retain(4));
	assert!(matches!(a.transform(b), Err(Error::LengthMismatch { .. })));
}

#[test]
fn split_at_output_position() {
	let doc = Rope::from_str("0123456789");
	let set = build(10, |b| b.retain(2).delete(3).insert("xyz").retain(5));
	assert_eq!(set.len_after(), 10);

	let (left, right) = set.split_at(3).unwrap();
	assert_eq!(left.len_after(), 3);
	assert_eq!(right.len_after(), 7);
	assert_eq!(left.len_before() + right.len_before(), set.len_before());

	// Applying the halves to the split input reproduces the whole apply.
	let (doc_left, doc_right) = doc.split(left.len_before()).unwrap();
	let combined = left
		.apply(&doc_left)
		.unwrap()
		.concat(&right.apply(&doc_right).unwrap());
	assert_eq!(combined, set.apply(&doc).unwrap());

	assert!(set.split_at(11).is_err());
}

#[test]
fn split_at_boundaries() {
	let set = build(4, |b| b.insert("ab").retain(4));
	let (left, right) = set.split_at(0).unwrap();
	assert_eq!(left.len_after(), 0);
	assert_eq!(right.len_after(), 6);

	let (left, right) = set.split_at(6).unwrap();
	assert_eq!(left.len_after(), 6);
	assert!(right.is_empty() || right.len_after() == 0);
}

#[test]
fn merge_is_compose() {
	let a = build(3, |b| b.retain(3).insert("!"));
	let b = build(4, |b| b.retain(4).insert("?"));
	let doc = Rope::from_str("abc");
	let merged = a.merge(b).unwrap();
	assert_eq!(merged.apply(&doc).unwrap().to_string(), "abc!?");
}

#[test]
fn changes_iter_roundtrip() {
	let doc = Rope::from_str("hello world!\ntest 123");
	let changes = vec![
		Change {
			start: 6,
			end: 11,
			replacement: Some("void".into()),
		},
		Change {
			start: 12,
			end: 17,
			replacement: None,
		},
	];
	let tx = Transaction::change(&doc, changes.clone()).unwrap();
	assert_eq!(tx.changes_iter().collect::<Vec<_>>(), changes);
}

#[test]
fn transaction_change_applies() {
	let doc = Rope::from_str("hello world!\ntest 123");
	let tx = Transaction::change(
		&doc,
		vec![
			Change {
				start: 1,
				end: 1,
				replacement: None,
			},
			Change {
				start: 6,
				end: 11,
				replacement: Some("void".into()),
			},
			Change {
				start: 12,
				end: 17,
				replacement: None,
			},
		],
	)
	.unwrap();
	let updated = tx.apply(&doc).unwrap();
	assert_eq!(updated.to_string(), "hello void! 123");
}

#[test]
fn transaction_rejects_bad_changes() {
	let doc = Rope::from_str("hello");
	assert!(matches!(
		Transaction::change(
			&doc,
			vec![Change {
				start: 3,
				end: 2,
				replacement: None
			}]
		),
		Err(Error::InvalidRange { start: 3, end: 2 })
	));
	assert!(matches!(
		Transaction::change(
			&doc,
			vec![Change {
				start: 2,
				end: 9,
				replacement: None
			}]
		),
		Err(Error::OutOfBounds { index: 9, len: 5 })
	));
	// Overlapping changes are rejected.
	assert!(
		Transaction::change(
			&doc,
			vec![
				Change {
					start: 0,
					end: 3,
					replacement: None
				},
				Change {
					start: 2,
					end: 4,
					replacement: None
				},
			]
		)
		.is_err()
	);
}

#[test]
fn transaction_insert_at_selection() {
	let doc = Rope::from_str("one two");
	let selection = Selection::new(crate::range::Range::point(3), vec![
		crate::range::Range::point(7),
	]);
	let tx = Transaction::insert(&doc, &selection, ",".into()).unwrap();
	assert_eq!(tx.apply(&doc).unwrap().to_string(), "one, two,");
}

#[test]
fn transaction_invert_and_compose() {
	let doc = Rope::from_str("state zero");
	let tx1 = Transaction::change(
		&doc,
		vec![Change {
			start: 6,
			end: 10,
			replacement: Some("one".into()),
		}],
	)
	.unwrap();
	let doc1 = tx1.apply(&doc).unwrap();
	let tx2 = Transaction::change(
		&doc1,
		vec![Change {
			start: 0,
			end: 5,
			replacement: Some("phase".into()),
		}],
	)
	.unwrap();
	let doc2 = tx2.apply(&doc1).unwrap();
	assert_eq!(doc2.to_string(), "phase one");

	let inverse1 = tx1.invert(&doc).unwrap();
	assert_eq!(inverse1.apply(&doc1).unwrap(), doc);

	let both = tx1.compose(tx2).unwrap();
	assert_eq!(both.apply(&doc).unwrap(), doc2);
}

#[test]
fn transaction_selection_mapping() {
	let doc = Rope::from_str("abcdef");
	let selection = Selection::single(1, 4);
	let tx = Transaction::change(
		&doc,
		vec![Change {
			start: 2,
			end: 2,
			replacement: Some("..".into()),
		}],
	)
	.unwrap()
	.with_selection(Selection::point(0));

	let mapped = tx.map_selection(&selection).unwrap();
	assert_eq!(mapped.primary(), crate::range::Range::new(1, 6));
	assert_eq!(tx.selection(), Some(&Selection::point(0)));
}

#[test]
fn operation_lengths_count_characters() {
	assert_eq!(Operation::Retain(4).len_chars(), 4);
	assert_eq!(Operation::Delete(2).len_chars(), 2);
	assert_eq!(Operation::Insert("世界".into()).len_chars(), 2);
}

#[test]
fn identity_changeset_is_empty() {
	assert!(ChangeSet::identity(0).is_empty());
	assert!(ChangeSet::identity(7).is_empty());
	let set = build(2, |b| b.retain(1).insert("x").retain(1));
	assert!(!set.is_empty());
}
