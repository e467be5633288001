//! Lifecycle hook bus.
//!
//! Hooks are priority-ordered callbacks attached to edit, undo/redo,
//! branch, savepoint, and error events. Before-events may veto the
//! operation; after-events are observational, their failures are logged and
//! swallowed. Dispatch snapshots the hook list first, so a callback may
//! register or remove hooks without deadlocking the bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use weft_text::{CharIdx, Rope, Tendril};

use crate::error::{HistoryError, Result};
use crate::history::RevisionId;
use crate::savepoint::SavepointId;

/// The lifecycle events hooks can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
	BeforeEdit,
	AfterEdit,
	BeforeUndo,
	AfterUndo,
	BeforeRedo,
	AfterRedo,
	OnBranch,
	OnSavepoint,
	OnError,
}

/// The kind of edit a transaction performs, judged by its first change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
	Insert,
	Delete,
	Replace,
}

/// Event payload passed to hook callbacks.
#[derive(Debug)]
pub enum HookContext<'a> {
	Edit {
		operation: EditKind,
		start: CharIdx,
		end: CharIdx,
		text: Option<Tendril>,
		length: usize,
	},
	Undo {
		revision: RevisionId,
		from: RevisionId,
		to: RevisionId,
	},
	Redo {
		revision: RevisionId,
		from: RevisionId,
		to: RevisionId,
	},
	Branch {
		doc: &'a Rope,
	},
	Savepoint {
		id: SavepointId,
	},
	Error {
		doc: &'a Rope,
		message: &'a str,
	},
}

/// Unique identifier of a registered hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(pub u64);

impl std::fmt::Display for HookId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "hook-{}", self.0)
	}
}

type HookCallback = dyn Fn(&HookContext<'_>) -> std::result::Result<(), String> + Send + Sync;

#[derive(Clone)]
struct HookEntry {
	id: HookId,
	name: String,
	priority: i32,
	seq: u64,
	enabled: Arc<AtomicBool>,
	callback: Arc<HookCallback>,
}

/// Handle returned by registration; carries the hook's enabled flag.
#[derive(Debug, Clone)]
pub struct HookHandle {
	pub id: HookId,
	enabled: Arc<AtomicBool>,
}

impl HookHandle {
	pub fn is_enabled(&self) -> bool {
		self.enabled.load(Ordering::Relaxed)
	}

	pub fn enable(&self) {
		self.enabled.store(true, Ordering::Relaxed);
	}

	pub fn disable(&self) {
		self.enabled.store(false, Ordering::Relaxed);
	}
}

/// Priority-ordered hook registry.
///
/// Hooks fire in descending priority order; ties run in registration
/// order. The registry is internally locked and safe to share across
/// threads.
#[derive(Default)]
pub struct HookRegistry {
	hooks: RwLock<FxHashMap<HookPoint, Vec<HookEntry>>>,
	next_id: AtomicU64,
	next_seq: AtomicU64,
}

impl HookRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a callback for `point`.
	pub fn register<F>(&self, point: HookPoint, name: &str, priority: i32, callback: F) -> HookHandle
	where
		F: Fn(&HookContext<'_>) -> std::result::Result<(), String> + Send + Sync + 'static,
	{
		let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));
		let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
		let enabled = Arc::new(AtomicBool::new(true));
		let entry = HookEntry {
			id,
			name: name.to_owned(),
			priority,
			seq,
			enabled: enabled.clone(),
			callback: Arc::new(callback),
		};

		let mut hooks = self.hooks.write();
		let list = hooks.entry(point).or_default();
		list.push(entry);
		list.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));

		HookHandle { id, enabled }
	}

	/// Removes a hook by id. Returns whether anything was removed.
	pub fn unregister(&self, id: HookId) -> bool {
		let mut hooks = self.hooks.write();
		let mut removed = false;
		for list in hooks.values_mut() {
			let before = list.len();
			list.retain(|entry| entry.id != id);
			removed |= list.len() != before;
		}
		removed
	}

	/// Flips a hook's enabled flag by id. Returns whether the hook exists.
	pub fn set_enabled(&self, id: HookId, enabled: bool) -> bool {
		let hooks = self.hooks.read();
		for list in hooks.values() {
			if let Some(entry) = list.iter().find(|entry| entry.id == id) {
				entry.enabled.store(enabled, Ordering::Relaxed);
				return true;
			}
		}
		false
	}

	/// Number of hooks registered for `point`.
	pub fn len(&self, point: HookPoint) -> usize {
		self.hooks.read().get(&point).map_or(0, Vec::len)
	}

	fn snapshot(&self, point: HookPoint) -> Vec<HookEntry> {
		self.hooks.read().get(&point).cloned().unwrap_or_default()
	}

	/// Runs the hooks for a cancellable before-event.
	///
	/// The first callback returning an error cancels the operation: the
	/// error surfaces as [`HistoryError::HookVeto`] and later hooks do not
	/// run.
	pub fn dispatch_before(&self, point: HookPoint, ctx: &HookContext<'_>) -> Result<()> {
		for entry in self.snapshot(point) {
			if !entry.enabled.load(Ordering::Relaxed) {
				continue;
			}
			if let Err(reason) = (entry.callback)(ctx) {
				return Err(HistoryError::HookVeto {
					hook: entry.name,
					reason,
				});
			}
		}
		Ok(())
	}

	/// Runs the hooks for an after-event or notification.
	///
	/// Callback failures are logged and swallowed; the triggering operation
	/// is never rolled back.
	pub fn dispatch_after(&self, point: HookPoint, ctx: &HookContext<'_>) {
		for entry in self.snapshot(point) {
			if !entry.enabled.load(Ordering::Relaxed) {
				continue;
			}
			if let Err(reason) = (entry.callback)(ctx) {
				tracing::warn!(hook = %entry.name, %reason, ?point, "after-hook failed");
			}
		}
	}
}

impl std::fmt::Debug for HookRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let hooks = self.hooks.read();
		let count: usize = hooks.values().map(Vec::len).sum();
		f.debug_struct("HookRegistry").field("hooks", &count).finish()
	}
}
