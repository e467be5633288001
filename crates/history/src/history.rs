//! Branched revision history.
//!
//! History is a tree, not a stack: committing while an older revision is
//! current starts a new branch instead of discarding the redo future. Each
//! revision stores the forward transaction and its precomputed inverse, so
//! undo never needs the deleted text. `last_child` records which branch
//! redo follows; abandoned branches stay reachable by revision id.
//!
//! Revisions live in a deque indexed by `id - base`; eviction of old
//! revisions advances `base` so ids handed out earlier stay valid. Parent
//! and child links are plain ids, never owning references.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use weft_text::{Change, Rope, Transaction};

use crate::error::Result;
use crate::hooks::{EditKind, HookContext, HookPoint, HookRegistry};

/// Stable identifier of a revision. The root revision of a fresh history is
/// id 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RevisionId(pub u64);

impl std::fmt::Display for RevisionId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "r{}", self.0)
	}
}

/// One point in the history tree.
#[derive(Debug, Clone)]
pub struct Revision {
	parent: Option<RevisionId>,
	last_child: Option<RevisionId>,
	transaction: Arc<Transaction>,
	inversion: Arc<Transaction>,
	timestamp: SystemTime,
}

impl Revision {
	pub fn parent(&self) -> Option<RevisionId> {
		self.parent
	}

	pub fn last_child(&self) -> Option<RevisionId> {
		self.last_child
	}

	pub fn transaction(&self) -> &Arc<Transaction> {
		&self.transaction
	}

	pub fn inversion(&self) -> &Arc<Transaction> {
		&self.inversion
	}

	pub fn timestamp(&self) -> SystemTime {
		self.timestamp
	}
}

/// Size policy for a history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryConfig {
	/// Oldest-first eviction begins once the retained revision count
	/// exceeds this. `None` keeps everything.
	pub max_revisions: Option<usize>,
}

/// The revision tree of one document.
pub struct History {
	revisions: VecDeque<Revision>,
	/// Id of the oldest retained revision.
	base: u64,
	current: RevisionId,
	config: HistoryConfig,
	hooks: Option<Arc<HookRegistry>>,
}

impl History {
	pub fn new() -> Self {
		Self::with_config(HistoryConfig::default())
	}

	pub fn with_config(config: HistoryConfig) -> Self {
		let mut revisions = VecDeque::new();
		revisions.push_back(Revision {
			parent: None,
			last_child: None,
			transaction: Arc::new(Transaction::default()),
			inversion: Arc::new(Transaction::default()),
			timestamp: SystemTime::now(),
		});
		Self {
			revisions,
			base: 0,
			current: RevisionId(0),
			config,
			hooks: None,
		}
	}

	/// Attaches a hook registry consulted by commit, undo, and redo.
	#[must_use]
	pub fn with_hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
		self.hooks = Some(hooks);
		self
	}

	pub fn current_revision(&self) -> RevisionId {
		self.current
	}

	/// Whether the current revision is the root.
	pub fn at_root(&self) -> bool {
		self.get(self.current).parent.is_none()
	}

	/// Whether the current revision has no redo continuation.
	pub fn at_tip(&self) -> bool {
		self.get(self.current).last_child.is_none()
	}

	/// Number of retained revisions, the root included.
	pub fn len(&self) -> usize {
		self.revisions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.revisions.len() <= 1
	}

	pub fn revision(&self, id: RevisionId) -> Option<&Revision> {
		let idx = id.0.checked_sub(self.base)? as usize;
		self.revisions.get(idx)
	}

	/// Ids of all retained children of `id`, oldest first.
	pub fn children_of(&self, id: RevisionId) -> Vec<RevisionId> {
		self.revisions
			.iter()
			.enumerate()
			.filter(|(_, rev)| rev.parent == Some(id))
			.map(|(idx, _)| RevisionId(self.base + idx as u64))
			.collect()
	}

	fn get(&self, id: RevisionId) -> &Revision {
		debug_assert!(id.0 >= self.base);
		&self.revisions[(id.0 - self.base) as usize]
	}

	fn get_mut(&mut self, id: RevisionId) -> &mut Revision {
		debug_assert!(id.0 >= self.base);
		&mut self.revisions[(id.0 - self.base) as usize]
	}

	/// Commits a transaction made against `before`, the document the
	/// current revision describes.
	///
	/// The new revision becomes the parent's `last_child` and the current
	/// revision. Committing while the current revision already has children
	/// starts a new branch; the old branch stays reachable by id.
	///
	/// Before-edit hooks run once per coalesced change of the transaction
	/// (multi-cursor edits carry one change per range), so a guard hook sees
	/// every touched span; after-edit hooks fire the same way once the
	/// revision is recorded.
	///
	/// # Errors
	/// `HookVeto` when a before-edit hook rejects any change of the commit
	/// (nothing is recorded), or a text-layer error when the transaction
	/// does not fit `before`.
	pub fn commit(&mut self, transaction: Transaction, before: &Rope) -> Result<RevisionId> {
		self.commit_at(transaction, before, SystemTime::now())
	}

	/// As [`commit`](History::commit) with an explicit timestamp. Mostly
	/// useful for tests of time-based navigation.
	pub fn commit_at(
		&mut self,
		transaction: Transaction,
		before: &Rope,
		timestamp: SystemTime,
	) -> Result<RevisionId> {
		let transaction = Arc::new(transaction);
		if let Some(hooks) = &self.hooks {
			for change in transaction.changes_iter() {
				hooks.dispatch_before(HookPoint::BeforeEdit, &edit_context(change))?;
			}
		}

		let inversion = transaction.invert(before)?;
		let branching = self.get(self.current).last_child.is_some();

		let new_id = RevisionId(self.base + self.revisions.len() as u64);
		self.get_mut(self.current).last_child = Some(new_id);
		self.revisions.push_back(Revision {
			parent: Some(self.current),
			last_child: None,
			transaction: transaction.clone(),
			inversion: Arc::new(inversion),
			timestamp,
		});
		self.current = new_id;

		if let Some(hooks) = &self.hooks {
			if branching {
				hooks.dispatch_after(HookPoint::OnBranch, &HookContext::Branch { doc: before });
			}
			for change in transaction.changes_iter() {
				hooks.dispatch_after(HookPoint::AfterEdit, &edit_context(change));
			}
		}

		self.enforce_limit();
		Ok(new_id)
	}

	/// Steps to the parent revision, returning the transaction that undoes
	/// the current one. `None` at the root.
	///
	/// # Errors
	/// `HookVeto` when a before-undo hook cancels; the current revision is
	/// unchanged in that case.
	pub fn undo(&mut self) -> Result<Option<Arc<Transaction>>> {
		let from = self.current;
		let revision = self.get(from);
		let Some(parent) = revision.parent else {
			return Ok(None);
		};
		let inversion = revision.inversion.clone();

		let ctx = HookContext::Undo {
			revision: from,
			from,
			to: parent,
		};
		if let Some(hooks) = &self.hooks {
			hooks.dispatch_before(HookPoint::BeforeUndo, &ctx)?;
		}

		self.current = parent;

		if let Some(hooks) = &self.hooks {
			hooks.dispatch_after(HookPoint::AfterUndo, &ctx);
		}
		Ok(Some(inversion))
	}

	/// Steps to the current revision's `last_child`, returning its forward
	/// transaction. `None` at a tip.
	pub fn redo(&mut self) -> Result<Option<Arc<Transaction>>> {
		let from = self.current;
		let Some(child) = self.get(from).last_child else {
			return Ok(None);
		};
		let forward = self.get(child).transaction.clone();

		let ctx = HookContext::Redo {
			revision: child,
			from,
			to: child,
		};
		if let Some(hooks) = &self.hooks {
			hooks.dispatch_before(HookPoint::BeforeRedo, &ctx)?;
		}

		self.current = child;

		if let Some(hooks) = &self.hooks {
			hooks.dispatch_after(HookPoint::AfterRedo, &ctx);
		}
		Ok(Some(forward))
	}

	/// Undoes up to `steps` revisions, returning the composed inverse.
	/// `None` when already at the root.
	pub fn earlier(&mut self, steps: usize) -> Result<Option<Transaction>> {
		let mut combined: Option<Transaction> = None;
		for _ in 0..steps {
			let Some(inversion) = self.undo()? else {
				break;
			};
			let step = (*inversion).clone();
			combined = Some(match combined {
				None => step,
				Some(acc) => acc.compose(step).map_err(crate::error::HistoryError::Text)?,
			});
		}
		Ok(combined)
	}

	/// Redoes up to `steps` revisions along the `last_child` chain,
	/// returning the composed forward transaction.
	pub fn later(&mut self, steps: usize) -> Result<Option<Transaction>> {
		let mut combined: Option<Transaction> = None;
		for _ in 0..steps {
			let Some(forward) = self.redo()? else {
				break;
			};
			let step = (*forward).clone();
			combined = Some(match combined {
				None => step,
				Some(acc) => acc.compose(step).map_err(crate::error::HistoryError::Text)?,
			});
		}
		Ok(combined)
	}

	/// Moves to the newest ancestor at least `delta` older than now and
	/// returns the composed inverse chain.
	pub fn earlier_by_time(&mut self, delta: Duration) -> Result<Option<Transaction>> {
		let target = SystemTime::now()
			.checked_sub(delta)
			.unwrap_or(SystemTime::UNIX_EPOCH);

		let mut steps = 0;
		let mut id = self.current;
		loop {
			let revision = self.get(id);
			let Some(parent) = revision.parent else {
				break;
			};
			if revision.timestamp <= target {
				break;
			}
			steps += 1;
			id = parent;
		}
		self.earlier(steps)
	}

	/// Moves down the `last_child` chain to the newest descendant not newer
	/// than the current revision's timestamp plus `delta`.
	pub fn later_by_time(&mut self, delta: Duration) -> Result<Option<Transaction>> {
		let Some(target) = self.get(self.current).timestamp.checked_add(delta) else {
			return self.later(usize::MAX);
		};

		let mut steps = 0;
		let mut id = self.current;
		while let Some(child) = self.get(id).last_child {
			if self.get(child).timestamp > target {
				break;
			}
			steps += 1;
			id = child;
		}
		self.later(steps)
	}

	/// Evicts oldest revisions down to the configured bound.
	///
	/// Eviction stops rather than invalidate the current revision or
	/// orphan a sibling branch still hanging off the root.
	fn enforce_limit(&mut self) {
		let Some(max) = self.config.max_revisions else {
			return;
		};
		while self.revisions.len() > max.max(1) {
			let root_id = RevisionId(self.base);
			if self.current == root_id {
				break;
			}
			let children = self.children_of(root_id);
			if children.len() != 1 {
				break;
			}

			self.revisions.pop_front();
			self.base += 1;
			let new_root = children[0];
			self.get_mut(new_root).parent = None;
			tracing::debug!(evicted = root_id.0, new_root = new_root.0, "evicted root revision");
		}
	}
}

impl Default for History {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for History {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("History")
			.field("revisions", &self.revisions.len())
			.field("base", &self.base)
			.field("current", &self.current)
			.finish()
	}
}

/// Builds the edit hook payload for one coalesced change.
fn edit_context(change: Change) -> HookContext<'static> {
	let operation = match (&change.replacement, change.start == change.end) {
		(None, _) => EditKind::Delete,
		(Some(_), true) => EditKind::Insert,
		(Some(_), false) => EditKind::Replace,
	};
	let length = match &change.replacement {
		Some(text) => text.chars().count(),
		None => change.end - change.start,
	};
	HookContext::Edit {
		operation,
		start: change.start,
		end: change.end,
		text: change.replacement,
		length,
	}
}
