use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use weft_text::{Assoc, Change, Rope, Transaction};

fn rope_edits(c: &mut Criterion) {
	let base = "The quick brown fox jumps over the lazy dog.\n".repeat(2000);

	c.bench_function("rope_from_str_90kb", |b| {
		b.iter(|| Rope::from_str(black_box(&base)));
	});

	let rope = Rope::from_str(&base);

	c.bench_function("rope_insert_middle", |b| {
		let at = rope.len_chars() / 2;
		b.iter(|| rope.insert(black_box(at), "inserted text").unwrap());
	});

	c.bench_function("rope_delete_span", |b| {
		let at = rope.len_chars() / 2;
		b.iter(|| rope.delete(black_box(at), at + 500).unwrap());
	});

	c.bench_function("rope_char_to_byte", |b| {
		let at = rope.len_chars() - 7;
		b.iter(|| rope.char_to_byte(black_box(at)).unwrap());
	});

	c.bench_function("rope_chars_collect", |b| {
		b.iter(|| rope.chars().count());
	});
}

fn changeset_ops(c: &mut Criterion) {
	let base = "word ".repeat(20_000);
	let rope = Rope::from_str(&base);

	let edits: Vec<Change> = (0..100)
		.map(|i| Change {
			start: i * 900,
			end: i * 900 + 4,
			replacement: Some("line".into()),
		})
		.collect();
	let tx = Transaction::change(&rope, edits).unwrap();

	c.bench_function("changeset_apply_100_edits", |b| {
		b.iter(|| tx.apply(black_box(&rope)).unwrap());
	});

	c.bench_function("changeset_invert", |b| {
		b.iter(|| tx.changes().invert(black_box(&rope)).unwrap());
	});

	let positions: Vec<(usize, Assoc)> = (0..1000).map(|i| (i * 90, Assoc::After)).collect();
	c.bench_function("changeset_map_1000_positions", |b| {
		b.iter(|| tx.changes().map_positions(black_box(&positions)).unwrap());
	});
}

criterion_group!(benches, rope_edits, changeset_ops);
criterion_main!(benches);
