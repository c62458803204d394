//! Handle → screen mapping registry.
//!
//! # Role
//!
//! Vendor wrappers record which screen owns every context, fbconfig and drawable they create, so
//! later calls that only carry a handle can be routed to the right vendor.
//!
//! # Concurrency
//!
//! - **Reads:** shared lock on one shard; readers never block each other.
//! - **Writes:** exclusive lock on one shard plus the short screen reference-count lock.
//!
//! # Invariants
//!
//! - A handle maps to at most one screen per kind; re-adding fails with
//!   [`DispatchError::DuplicateMapping`] and leaves the existing entry untouched.
//! - Removing an absent handle is a no-op.
//! - The per-screen reference count equals the number of live mappings on that screen.

use std::hash::{Hash, Hasher};

use glxmux_abi::{Handle, ObjectKind, Screen};
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHasher};

use crate::error::{DispatchError, Result};

const SHARD_BITS: u32 = 4;
const SHARDS: usize = 1 << SHARD_BITS;

/// Outcome of removing a mapping that existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removed {
	pub screen: Screen,
	/// No context, fbconfig or drawable references `screen` any more.
	pub last_on_screen: bool,
}

struct ShardedMap {
	shards: Box<[RwLock<FxHashMap<Handle, Screen>>]>,
}

impl ShardedMap {
	fn new() -> Self {
		Self {
			shards: (0..SHARDS).map(|_| RwLock::default()).collect(),
		}
	}

	fn shard(&self, handle: Handle) -> &RwLock<FxHashMap<Handle, Screen>> {
		let mut hasher = FxHasher::default();
		handle.hash(&mut hasher);
		// Handles are mostly aligned pointers, so the high bits carry the entropy.
		let idx = (hasher.finish() >> (u64::BITS - SHARD_BITS)) as usize;
		&self.shards[idx]
	}

	fn len(&self) -> usize {
		self.shards.iter().map(|s| s.read().len()).sum()
	}
}

/// Thread-safe store of handle → screen mappings for every [`ObjectKind`].
pub struct MappingRegistry {
	contexts: ShardedMap,
	fbconfigs: ShardedMap,
	drawables: ShardedMap,
	screen_refs: Mutex<FxHashMap<Screen, usize>>,
}

impl Default for MappingRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl MappingRegistry {
	pub fn new() -> Self {
		Self {
			contexts: ShardedMap::new(),
			fbconfigs: ShardedMap::new(),
			drawables: ShardedMap::new(),
			screen_refs: Mutex::default(),
		}
	}

	fn map(&self, kind: ObjectKind) -> &ShardedMap {
		match kind {
			ObjectKind::Context => &self.contexts,
			ObjectKind::FbConfig => &self.fbconfigs,
			ObjectKind::Drawable => &self.drawables,
		}
	}

	/// Records `handle → screen`.
	pub fn add(&self, handle: Handle, kind: ObjectKind, screen: Screen) -> Result<()> {
		let mut shard = self.map(kind).shard(handle).write();
		if let Some(&existing) = shard.get(&handle) {
			return Err(DispatchError::DuplicateMapping {
				kind,
				handle,
				existing,
			});
		}
		shard.insert(handle, screen);
		// Updated under the shard lock so a racing remove cannot observe the mapping first.
		*self.screen_refs.lock().entry(screen).or_default() += 1;
		Ok(())
	}

	/// Deletes the mapping for `handle`, returning `None` when there was none.
	pub fn remove(&self, handle: Handle, kind: ObjectKind) -> Option<Removed> {
		let mut shard = self.map(kind).shard(handle).write();
		let screen = shard.remove(&handle)?;

		let mut refs = self.screen_refs.lock();
		let last_on_screen = match refs.get_mut(&screen) {
			Some(count) if *count > 1 => {
				*count -= 1;
				false
			}
			_ => {
				refs.remove(&screen);
				true
			}
		};
		Some(Removed {
			screen,
			last_on_screen,
		})
	}

	/// Screen `handle` is mapped to, or `None` when unknown.
	pub fn screen_for(&self, handle: Handle, kind: ObjectKind) -> Option<Screen> {
		self.map(kind).shard(handle).read().get(&handle).copied()
	}

	/// Number of live mappings of `kind`.
	pub fn len(&self, kind: ObjectKind) -> usize {
		self.map(kind).len()
	}

	/// Returns true when any object of any kind is mapped to `screen`.
	pub fn is_screen_referenced(&self, screen: Screen) -> bool {
		self.screen_refs.lock().contains_key(&screen)
	}
}
