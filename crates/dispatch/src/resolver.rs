//! Entry-point resolution and global slot assignment.
//!
//! # Role
//!
//! Classifies a function name as a baseline entry (dispatched through the vendor's fixed table)
//! or an extension (dispatched through a global slot of the dynamic tables). Extension names get
//! a slot the first time they are seen; the assignment is then permanent.
//!
//! # Concurrency
//!
//! - **Reads:** wait-free (atomic load of the current [`SlotSnapshot`]).
//! - **Writes:** [`EntryPointResolver::assign`] publishes an extended snapshot. Callers hold the
//!   dispatcher write lock, which also covers the vendor broadcast and table growth that follow.
//!
//! # Invariants
//!
//! - A name resolves to the same slot for the lifetime of the process.
//! - Slots are handed out densely, starting at [`SlotIndex::FIRST`], in assignment order.

use std::sync::Arc;

use arc_swap::ArcSwap;
use glxmux_abi::{BaselineEntry, SlotIndex};
use rustc_hash::FxHashMap;

/// Where a function name is dispatched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
	/// Use the vendor's fixed baseline table; no slot needed.
	Baseline(BaselineEntry),
	/// Use this slot of the dynamic dispatch table.
	Slot(SlotIndex),
}

/// Immutable view of every slot assignment made so far.
#[derive(Debug, Default, Clone)]
pub struct SlotSnapshot {
	by_name: FxHashMap<Arc<str>, SlotIndex>,
	names: Vec<Arc<str>>,
}

impl SlotSnapshot {
	pub fn get(&self, name: &str) -> Option<SlotIndex> {
		self.by_name.get(name).copied()
	}

	/// Name assigned to the `offset`-th slot.
	pub fn name_at(&self, offset: usize) -> Option<&str> {
		self.names.get(offset).map(|n| &**n)
	}

	pub fn name(&self, slot: SlotIndex) -> Option<&str> {
		self.name_at(slot.offset()?)
	}

	/// Number of assigned slots.
	pub fn len(&self) -> usize {
		self.names.len()
	}

	pub fn is_empty(&self) -> bool {
		self.names.is_empty()
	}

	/// Assignments in the order they were made.
	pub fn iter(&self) -> impl Iterator<Item = (SlotIndex, &str)> {
		self.names
			.iter()
			.enumerate()
			.map(|(offset, name)| (SlotIndex::from_offset(offset), &**name))
	}
}

/// Result of [`EntryPointResolver::assign`].
#[derive(Debug, Clone)]
pub struct Assigned {
	pub slot: SlotIndex,
	/// The slot was created by this call rather than found.
	pub fresh: bool,
	pub snapshot: Arc<SlotSnapshot>,
}

/// Process-wide extension name → slot table.
#[derive(Default)]
pub struct EntryPointResolver {
	snap: ArcSwap<SlotSnapshot>,
}

impl EntryPointResolver {
	pub fn new() -> Self {
		Self::default()
	}

	/// Resolves `name` without assigning anything.
	///
	/// Returns `None` only for an extension name that has no slot yet.
	#[inline]
	pub fn lookup(&self, name: &str) -> Option<Resolution> {
		if let Some(entry) = BaselineEntry::from_name(name) {
			return Some(Resolution::Baseline(entry));
		}
		self.snap.load().get(name).map(Resolution::Slot)
	}

	/// Slot already assigned to `name`.
	pub fn slot_for(&self, name: &str) -> Option<SlotIndex> {
		self.snap.load().get(name)
	}

	/// Returns the slot for an extension `name`, assigning the next one if needed.
	///
	/// Callers hold the dispatcher write lock.
	pub(crate) fn assign(&self, name: &str) -> Assigned {
		let current = self.snap.load_full();
		if let Some(slot) = current.get(name) {
			return Assigned {
				slot,
				fresh: false,
				snapshot: current,
			};
		}

		let slot = SlotIndex::from_offset(current.len());
		let name: Arc<str> = Arc::from(name);
		let mut next = SlotSnapshot::clone(&current);
		next.by_name.insert(Arc::clone(&name), slot);
		next.names.push(name);

		let snapshot = Arc::new(next);
		self.snap.store(Arc::clone(&snapshot));
		Assigned {
			slot,
			fresh: true,
			snapshot,
		}
	}

	/// Current assignments.
	pub fn snapshot(&self) -> Arc<SlotSnapshot> {
		self.snap.load_full()
	}
}

#[cfg(test)]
mod tests;
