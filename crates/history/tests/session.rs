//! A whole editing session: documents, history, savepoints, and threads.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use weft_history::{
	DuplicateMode, History, HookPoint, HookRegistry, SavepointConfig, SavepointManager,
	SavepointMetadata, SavepointQuery, SharedHistory,
};
use weft_text::{Change, Rope, Selection, Transaction};

fn replace_tx(doc: &Rope, start: usize, end: usize, text: &str) -> Transaction {
	Transaction::change(
		doc,
		vec![Change {
			start,
			end,
			replacement: Some(text.into()),
		}],
	)
	.unwrap()
}

#[test]
fn edit_undo_savepoint_session() {
	let hooks = Arc::new(HookRegistry::new());
	let mut history = History::new().with_hooks(hooks.clone());
	let savepoints =
		SavepointManager::new(SavepointConfig {
			duplicate_mode: DuplicateMode::Skip,
		})
		.with_hooks(hooks.clone());

	let mut doc = Rope::from_str("fn main() {}\n");

	// Keep a savepoint of the pristine state.
	let (pristine, _) = savepoints.create(
		&doc,
		history.current_revision(),
		SavepointMetadata {
			user_id: Some("ada".to_owned()),
			tags: vec!["pristine".to_owned()],
			..Default::default()
		},
	);

	// A few edits, each committed before application.
	let tx = replace_tx(&doc, 11, 11, " println!(\"hi\"); ");
	history.commit(tx.clone(), &doc).unwrap();
	doc = tx.apply(&doc).unwrap();
	assert_eq!(doc.to_string(), "fn main() { println!(\"hi\"); }\n");

	let tx = replace_tx(&doc, 23, 25, "there");
	history.commit(tx.clone(), &doc).unwrap();
	doc = tx.apply(&doc).unwrap();
	assert_eq!(doc.to_string(), "fn main() { println!(\"there\"); }\n");

	// Selections ride along through the committed changesets.
	let last = history.revision(history.current_revision()).unwrap();
	let mapped = Selection::point(0).map(last.transaction().changes()).unwrap();
	assert_eq!(mapped.primary().head, 0);

	// Undo everything and confirm the savepoint matches.
	while let Some(inversion) = history.undo().unwrap() {
		doc = inversion.apply(&doc).unwrap();
	}
	assert_eq!(doc, savepoints.restore(pristine).unwrap());

	// The savepoint index answers by user and tag.
	let found = savepoints.query(&SavepointQuery {
		user: Some("ada".to_owned()),
		tag: Some("pristine".to_owned()),
		..Default::default()
	});
	assert_eq!(found, vec![pristine]);
}

#[test]
fn savepoint_hook_notification() {
	let hooks = Arc::new(HookRegistry::new());
	let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
	{
		let seen = seen.clone();
		hooks.register(HookPoint::OnSavepoint, "recorder", 0, move |ctx| {
			if let weft_history::HookContext::Savepoint { id } = ctx {
				seen.lock().unwrap().push(*id);
			}
			Ok(())
		});
	}

	let savepoints = SavepointManager::new(SavepointConfig::default()).with_hooks(hooks);
	let (id, _) = savepoints.create(
		&Rope::from_str("snapshot me"),
		weft_history::RevisionId(0),
		SavepointMetadata::default(),
	);
	assert_eq!(*seen.lock().unwrap(), vec![id]);
}

#[test]
fn shared_history_serializes_commits() {
	let shared = SharedHistory::new(History::new());

	// Writer thread drives the document forward; readers poll concurrently.
	std::thread::scope(|scope| {
		let writer = {
			let shared = shared.clone();
			scope.spawn(move || {
				let mut doc = Rope::new();
				for i in 0..50 {
					let tx = replace_tx(&doc, doc.len_chars(), doc.len_chars(), &format!("{i} "));
					shared.commit(tx.clone(), &doc).unwrap();
					doc = tx.apply(&doc).unwrap();
				}
				doc
			})
		};

		for _ in 0..4 {
			let shared = shared.clone();
			scope.spawn(move || {
				for _ in 0..200 {
					// Reads may interleave anywhere in the commit stream.
					let len = shared.len();
					assert!(len >= 1 && len <= 51);
					let _ = shared.at_tip();
					std::thread::yield_now();
				}
			});
		}

		let final_doc = writer.join().unwrap();
		assert_eq!(shared.len(), 51);

		// The full undo chain reproduces the empty document.
		let inverse = shared.earlier(50).unwrap().unwrap();
		assert_eq!(inverse.apply(&final_doc).unwrap(), Rope::new());
		assert!(shared.at_root());
	});
}

#[test]
fn savepoints_are_shared_across_threads() {
	let savepoints = Arc::new(SavepointManager::new(SavepointConfig {
		duplicate_mode: DuplicateMode::Allow,
	}));

	std::thread::scope(|scope| {
		for worker in 0..4 {
			let savepoints = savepoints.clone();
			scope.spawn(move || {
				for i in 0..25 {
					let rope = Rope::from_str(&format!("worker {worker} state {i}"));
					let (id, _) = savepoints.create(
						&rope,
						weft_history::RevisionId(0),
						SavepointMetadata::default(),
					);
					assert_eq!(savepoints.restore(id).unwrap(), rope);
				}
			});
		}
	});

	assert_eq!(savepoints.len(), 100);
	assert_eq!(savepoints.clean_older_than(Duration::from_secs(3600)), 0);
}
