//! Reference-counted document snapshots.
//!
//! A savepoint retains a rope (cheap, thanks to structural sharing), the
//! revision it was taken at, and caller metadata. The manager deduplicates
//! by content hash, indexes by user and tag, and drops a savepoint once its
//! reference count reaches zero. All state sits behind a reader-writer
//! lock, so the manager is shared by reference across threads.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use weft_text::Rope;

use crate::error::{HistoryError, Result};
use crate::history::RevisionId;
use crate::hooks::{HookContext, HookPoint, HookRegistry};

/// Unique identifier of a savepoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SavepointId(pub u64);

impl std::fmt::Display for SavepointId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "sp{}", self.0)
	}
}

/// Caller-supplied savepoint metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavepointMetadata {
	pub user_id: Option<String>,
	pub view_id: Option<String>,
	pub tags: Vec<String>,
	pub description: Option<String>,
}

/// What `create` does when the content already has a savepoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicateMode {
	/// Store a second, independent savepoint.
	#[default]
	Allow,
	/// Return the existing savepoint's id and bump its reference count.
	Skip,
	/// Drop the existing savepoint and store the new one.
	Replace,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SavepointConfig {
	pub duplicate_mode: DuplicateMode,
}

/// Filter for savepoint queries. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct SavepointQuery {
	pub user: Option<String>,
	pub tag: Option<String>,
	pub hash: Option<u64>,
	pub since: Option<SystemTime>,
	pub until: Option<SystemTime>,
	pub limit: Option<usize>,
}

#[derive(Debug, Clone)]
struct Savepoint {
	rope: Rope,
	revision: RevisionId,
	hash: u64,
	created_at: SystemTime,
	metadata: SavepointMetadata,
	ref_count: usize,
}

#[derive(Default)]
struct Store {
	savepoints: FxHashMap<u64, Savepoint>,
	by_hash: FxHashMap<u64, SavepointId>,
	by_user: FxHashMap<String, Vec<SavepointId>>,
	by_tag: FxHashMap<String, Vec<SavepointId>>,
	next_id: u64,
}

/// Savepoint store with content dedup and user/tag/time queries.
pub struct SavepointManager {
	store: RwLock<Store>,
	config: SavepointConfig,
	hooks: Option<Arc<HookRegistry>>,
}

impl SavepointManager {
	pub fn new(config: SavepointConfig) -> Self {
		Self {
			store: RwLock::new(Store::default()),
			config,
			hooks: None,
		}
	}

	/// Attaches a hook registry notified on savepoint creation.
	#[must_use]
	pub fn with_hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
		self.hooks = Some(hooks);
		self
	}

	/// Stores a snapshot, returning its id and whether it duplicated
	/// existing content (resolved per the configured [`DuplicateMode`]).
	pub fn create(
		&self,
		rope: &Rope,
		revision: RevisionId,
		metadata: SavepointMetadata,
	) -> (SavepointId, bool) {
		let hash = content_hash(rope);
		let mut store = self.store.write();

		let existing = store.by_hash.get(&hash).copied().filter(|id| {
			// Guard against hash collisions: a duplicate must be
			// content-equal, not merely hash-equal.
			store
				.savepoints
				.get(&id.0)
				.is_some_and(|savepoint| savepoint.rope == *rope)
		});

		if let Some(existing) = existing {
			match self.config.duplicate_mode {
				DuplicateMode::Allow => {}
				DuplicateMode::Skip => {
					if let Some(savepoint) = store.savepoints.get_mut(&existing.0) {
						savepoint.ref_count += 1;
					}
					return (existing, true);
				}
				DuplicateMode::Replace => {
					purge(&mut store, existing);
					let id = insert(&mut store, rope, revision, hash, metadata);
					drop(store);
					self.notify(id);
					return (id, true);
				}
			}
		}

		let id = insert(&mut store, rope, revision, hash, metadata);
		drop(store);
		self.notify(id);
		(id, false)
	}

	fn notify(&self, id: SavepointId) {
		if let Some(hooks) = &self.hooks {
			hooks.dispatch_after(HookPoint::OnSavepoint, &HookContext::Savepoint { id });
		}
	}

	/// Takes an additional reference to a savepoint.
	pub fn acquire(&self, id: SavepointId) -> Result<()> {
		let mut store = self.store.write();
		let savepoint = store
			.savepoints
			.get_mut(&id.0)
			.ok_or(HistoryError::UnknownSavepoint(id))?;
		savepoint.ref_count += 1;
		Ok(())
	}

	/// Drops one reference. The savepoint and all its index entries are
	/// removed when the count reaches zero; returns whether that happened.
	pub fn release(&self, id: SavepointId) -> Result<bool> {
		let mut store = self.store.write();
		let savepoint = store
			.savepoints
			.get_mut(&id.0)
			.ok_or(HistoryError::UnknownSavepoint(id))?;
		savepoint.ref_count -= 1;
		if savepoint.ref_count == 0 {
			purge(&mut store, id);
			return Ok(true);
		}
		Ok(false)
	}

	/// A handle to the stored document. Ropes are persistent, so this is an
	/// alias, not a copy.
	pub fn restore(&self, id: SavepointId) -> Result<Rope> {
		let store = self.store.read();
		store
			.savepoints
			.get(&id.0)
			.map(|savepoint| savepoint.rope.clone())
			.ok_or(HistoryError::UnknownSavepoint(id))
	}

	pub fn revision_of(&self, id: SavepointId) -> Result<RevisionId> {
		let store = self.store.read();
		store
			.savepoints
			.get(&id.0)
			.map(|savepoint| savepoint.revision)
			.ok_or(HistoryError::UnknownSavepoint(id))
	}

	pub fn metadata(&self, id: SavepointId) -> Result<SavepointMetadata> {
		let store = self.store.read();
		store
			.savepoints
			.get(&id.0)
			.map(|savepoint| savepoint.metadata.clone())
			.ok_or(HistoryError::UnknownSavepoint(id))
	}

	pub fn ref_count(&self, id: SavepointId) -> Result<usize> {
		let store = self.store.read();
		store
			.savepoints
			.get(&id.0)
			.map(|savepoint| savepoint.ref_count)
			.ok_or(HistoryError::UnknownSavepoint(id))
	}

	pub fn contains(&self, id: SavepointId) -> bool {
		self.store.read().savepoints.contains_key(&id.0)
	}

	pub fn len(&self) -> usize {
		self.store.read().savepoints.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Matching savepoint ids, newest first.
	pub fn query(&self, query: &SavepointQuery) -> Vec<SavepointId> {
		let mut results = Vec::new();
		self.query_into(query, &mut results);
		results
	}

	/// As [`query`](SavepointManager::query), writing into a caller-owned
	/// buffer. The buffer is cleared first; its capacity is reused.
	pub fn query_into(&self, query: &SavepointQuery, results: &mut Vec<SavepointId>) {
		results.clear();
		let store = self.store.read();

		let mut matches: Vec<(&u64, &Savepoint)> = store
			.savepoints
			.iter()
			.filter(|(_, savepoint)| {
				if let Some(user) = &query.user
					&& savepoint.metadata.user_id.as_deref() != Some(user.as_str())
				{
					return false;
				}
				if let Some(tag) = &query.tag
					&& !savepoint.metadata.tags.iter().any(|t| t == tag)
				{
					return false;
				}
				if let Some(hash) = query.hash
					&& savepoint.hash != hash
				{
					return false;
				}
				if let Some(since) = query.since
					&& savepoint.created_at < since
				{
					return false;
				}
				if let Some(until) = query.until
					&& savepoint.created_at > until
				{
					return false;
				}
				true
			})
			.collect();

		// Newest first; ties broken by id for a stable order.
		matches.sort_by(|(id_a, a), (id_b, b)| {
			b.created_at
				.cmp(&a.created_at)
				.then_with(|| id_b.cmp(id_a))
		});

		let limit = query.limit.unwrap_or(usize::MAX);
		results.extend(matches.into_iter().take(limit).map(|(id, _)| SavepointId(*id)));
	}

	/// Content hash of a stored savepoint.
	pub fn hash_of(&self, id: SavepointId) -> Result<u64> {
		let store = self.store.read();
		store
			.savepoints
			.get(&id.0)
			.map(|savepoint| savepoint.hash)
			.ok_or(HistoryError::UnknownSavepoint(id))
	}

	/// Removes savepoints older than `max_age`, regardless of reference
	/// counts. Returns how many were dropped.
	pub fn clean_older_than(&self, max_age: Duration) -> usize {
		let Some(cutoff) = SystemTime::now().checked_sub(max_age) else {
			return 0;
		};
		let mut store = self.store.write();
		let stale: Vec<SavepointId> = store
			.savepoints
			.iter()
			.filter(|(_, savepoint)| savepoint.created_at < cutoff)
			.map(|(id, _)| SavepointId(*id))
			.collect();
		for id in &stale {
			purge(&mut store, *id);
		}
		stale.len()
	}

	/// Removes every savepoint bearing `tag`. Returns how many were
	/// dropped.
	pub fn clean_by_tag(&self, tag: &str) -> usize {
		let mut store = self.store.write();
		let Some(ids) = store.by_tag.get(tag).cloned() else {
			return 0;
		};
		for id in &ids {
			purge(&mut store, *id);
		}
		ids.len()
	}
}

impl std::fmt::Debug for SavepointManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SavepointManager")
			.field("savepoints", &self.len())
			.field("config", &self.config)
			.finish()
	}
}

fn insert(
	store: &mut Store,
	rope: &Rope,
	revision: RevisionId,
	hash: u64,
	metadata: SavepointMetadata,
) -> SavepointId {
	let id = SavepointId(store.next_id);
	store.next_id += 1;

	if let Some(user) = &metadata.user_id {
		store.by_user.entry(user.clone()).or_default().push(id);
	}
	for tag in &metadata.tags {
		store.by_tag.entry(tag.clone()).or_default().push(id);
	}
	store.by_hash.entry(hash).or_insert(id);

	store.savepoints.insert(
		id.0,
		Savepoint {
			rope: rope.clone(),
			revision,
			hash,
			created_at: SystemTime::now(),
			metadata,
			ref_count: 1,
		},
	);
	id
}

fn purge(store: &mut Store, id: SavepointId) {
	let Some(savepoint) = store.savepoints.remove(&id.0) else {
		return;
	};

	if store.by_hash.get(&savepoint.hash) == Some(&id) {
		store.by_hash.remove(&savepoint.hash);
		// Another savepoint with the same content may still exist; let it
		// take over the hash slot.
		if let Some((&other, _)) = store
			.savepoints
			.iter()
			.find(|(_, other)| other.hash == savepoint.hash)
		{
			store.by_hash.insert(savepoint.hash, SavepointId(other));
		}
	}
	if let Some(user) = &savepoint.metadata.user_id
		&& let Some(ids) = store.by_user.get_mut(user)
	{
		ids.retain(|other| *other != id);
		if ids.is_empty() {
			store.by_user.remove(user);
		}
	}
	for tag in &savepoint.metadata.tags {
		if let Some(ids) = store.by_tag.get_mut(tag) {
			ids.retain(|other| *other != id);
			if ids.is_empty() {
				store.by_tag.remove(tag);
			}
		}
	}
}

/// FNV-1a over the rope's chunk byte stream.
///
/// Byte-at-a-time, so the hash is independent of chunk boundaries: two
/// content-equal ropes hash equal no matter how they were built.
fn content_hash(rope: &Rope) -> u64 {
	const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
	const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

	let mut hash = FNV_OFFSET;
	for (chunk, _) in rope.chunks() {
		for &byte in chunk.as_bytes() {
			hash ^= u64::from(byte);
			hash = hash.wrapping_mul(FNV_PRIME);
		}
	}
	hash
}
