//! Per-thread current-context tracking.
//!
//! # Role
//!
//! Records, for the calling thread, which context is current and therefore which vendor and
//! dynamic table serve its calls. Lookups touch only thread-local storage.
//!
//! # Invariants
//!
//! - A context is current on at most one thread. Binding it on a second thread fails with
//!   [`DispatchError::ContextCurrentElsewhere`].
//! - Ownership is released when the thread binds another context, clears its binding, or exits.
//! - A thread holds one binding at a time; binding through another tracker replaces it.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::ThreadId;

use glxmux_abi::{Handle, VendorId};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{DispatchError, Result};
use crate::table::DynamicDispatchTable;

static NEXT_TRACKER: AtomicU64 = AtomicU64::new(1);

thread_local! {
	static CURRENT: RefCell<Option<Binding>> = const { RefCell::new(None) };
}

/// The calling thread's active context.
#[derive(Debug, Clone)]
pub struct CurrentState {
	pub context: Handle,
	pub vendor: VendorId,
	pub table: Arc<DynamicDispatchTable>,
}

struct Owner {
	thread: ThreadId,
	vendor: VendorId,
	generation: u64,
}

type Owners = FxHashMap<Handle, Owner>;

struct Binding {
	tracker: u64,
	generation: u64,
	owners: Weak<Mutex<Owners>>,
	state: CurrentState,
}

impl Drop for Binding {
	fn drop(&mut self) {
		let Some(owners) = self.owners.upgrade() else {
			return;
		};
		let mut owners = owners.lock();
		if owners
			.get(&self.state.context)
			.is_some_and(|o| o.generation == self.generation)
		{
			owners.remove(&self.state.context);
		}
	}
}

/// Thread-local current-context state plus the cross-thread ownership check.
pub struct CurrentTracker {
	id: u64,
	generation: AtomicU64,
	owners: Arc<Mutex<Owners>>,
}

impl Default for CurrentTracker {
	fn default() -> Self {
		Self::new()
	}
}

impl CurrentTracker {
	pub fn new() -> Self {
		Self {
			id: NEXT_TRACKER.fetch_add(1, Ordering::Relaxed),
			generation: AtomicU64::new(0),
			owners: Arc::default(),
		}
	}

	/// Makes `context` current on the calling thread.
	pub fn set_current(
		&self,
		context: Handle,
		vendor: VendorId,
		table: Arc<DynamicDispatchTable>,
	) -> Result<()> {
		let thread = std::thread::current().id();
		let generation = self.generation.fetch_add(1, Ordering::Relaxed);
		{
			let mut owners = self.owners.lock();
			if let Some(owner) = owners.get(&context)
				&& owner.thread != thread
			{
				return Err(DispatchError::ContextCurrentElsewhere { context });
			}
			owners.insert(
				context,
				Owner {
					thread,
					vendor,
					generation,
				},
			);
		}

		let binding = Binding {
			tracker: self.id,
			generation,
			owners: Arc::downgrade(&self.owners),
			state: CurrentState {
				context,
				vendor,
				table,
			},
		};
		// Dropped outside the borrow: releases ownership of the previous context.
		let previous = CURRENT.with(|slot| slot.replace(Some(binding)));
		drop(previous);
		tracing::trace!(%context, %vendor, "Context made current");
		Ok(())
	}

	/// Releases the calling thread's current context, returning it.
	pub fn clear_current(&self) -> Option<CurrentState> {
		let binding = CURRENT
			.try_with(|slot| {
				let mut slot = slot.borrow_mut();
				if slot.as_ref().is_some_and(|b| b.tracker == self.id) {
					slot.take()
				} else {
					None
				}
			})
			.ok()
			.flatten()?;
		tracing::trace!(context = %binding.state.context, "Context released");
		Some(binding.state.clone())
	}

	/// Runs `f` against the calling thread's current state without cloning it.
	#[inline]
	pub fn with_current<R>(&self, f: impl FnOnce(&CurrentState) -> R) -> Option<R> {
		CURRENT
			.try_with(|slot| {
				slot.borrow()
					.as_ref()
					.filter(|b| b.tracker == self.id)
					.map(|b| f(&b.state))
			})
			.ok()
			.flatten()
	}

	pub fn current(&self) -> Option<CurrentState> {
		self.with_current(CurrentState::clone)
	}

	/// Current context handle, or `None` when no context is current.
	pub fn current_context(&self) -> Option<Handle> {
		self.with_current(|s| s.context)
	}

	/// Current dynamic dispatch table, or `None` when no context is current.
	pub fn current_dyn_dispatch(&self) -> Option<Arc<DynamicDispatchTable>> {
		self.with_current(|s| Arc::clone(&s.table))
	}

	pub fn current_vendor(&self) -> Option<VendorId> {
		self.with_current(|s| s.vendor)
	}

	/// Returns true when a context of a vendor other than `vendor` is current on any thread.
	pub fn others_current(&self, vendor: VendorId) -> bool {
		self.owners.lock().values().any(|o| o.vendor != vendor)
	}

	/// Thread that `context` is current on.
	pub fn owner_thread(&self, context: Handle) -> Option<ThreadId> {
		self.owners.lock().get(&context).map(|o| o.thread)
	}

	/// Number of contexts current across all threads.
	pub fn current_count(&self) -> usize {
		self.owners.lock().len()
	}
}
