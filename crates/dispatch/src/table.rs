//! Dynamic dispatch tables and their allocator.
//!
//! # Role
//!
//! Every (vendor, screen) pair in use owns a [`DynamicDispatchTable`]: a slot array of extension
//! entry points indexed by the global [`SlotIndex`] numbering. The [`TableAllocator`] creates
//! tables on first use and grows every live table whenever a new slot is assigned.
//!
//! # Concurrency
//!
//! - **Reads:** wait-free (atomic load of the current slot array).
//! - **Writes:** copy-on-grow. A new array is filled and then published atomically, so a reader
//!   sees either the old array or the new one. Writers are serialized by the dispatcher's write
//!   lock; nothing in this module locks on its own.
//!
//! # Invariants
//!
//! - Growth never changes an already published slot.
//! - A table released from the allocator stays valid, and keeps growing, while anyone holds it.
//! - A key has at most one live table, either owned or retired; recreating it revives the retired one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use glxmux_abi::{EntryPoint, Screen, SlotIndex, VendorId};
use rustc_hash::FxHashMap;

use crate::resolver::SlotSnapshot;
use crate::vendor::VendorRecord;

/// Per-(vendor, screen) array of extension entry points.
pub struct DynamicDispatchTable {
	vendor: VendorId,
	screen: Screen,
	slots: ArcSwap<Vec<Option<EntryPoint>>>,
	ffi_pinned: AtomicBool,
}

impl std::fmt::Debug for DynamicDispatchTable {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DynamicDispatchTable")
			.field("vendor", &self.vendor)
			.field("screen", &self.screen)
			.field("len", &self.len())
			.finish()
	}
}

impl DynamicDispatchTable {
	pub(crate) fn new(vendor: VendorId, screen: Screen) -> Self {
		Self {
			vendor,
			screen,
			slots: ArcSwap::from_pointee(Vec::new()),
			ffi_pinned: AtomicBool::new(false),
		}
	}

	pub fn vendor(&self) -> VendorId {
		self.vendor
	}

	pub fn screen(&self) -> Screen {
		self.screen
	}

	/// Number of slots this table currently covers.
	pub fn len(&self) -> usize {
		self.slots.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Entry point at `index`, or `None` when out of range or unsupported by the vendor.
	///
	/// A slot assigned on another thread may read as `None` until this table has grown.
	#[inline]
	pub fn fetch(&self, index: SlotIndex) -> Option<EntryPoint> {
		let offset = index.offset()?;
		self.slots.load().get(offset).copied().flatten()
	}

	/// Extends the table to `slot_count` slots, filling each new slot with `fill(offset)`.
	///
	/// Callers hold the dispatcher write lock.
	pub(crate) fn grow_to(&self, slot_count: usize, mut fill: impl FnMut(usize) -> Option<EntryPoint>) {
		let old = self.slots.load_full();
		if old.len() >= slot_count {
			return;
		}
		let mut next = Vec::with_capacity(slot_count);
		next.extend_from_slice(&old);
		next.extend((old.len()..slot_count).map(&mut fill));
		self.slots.store(Arc::new(next));
	}

	/// Raw pointer handed across the C boundary.
	///
	/// The first call leaks one strong reference, so the pointer stays valid for the process
	/// lifetime even after the allocator releases the table.
	pub fn as_ffi_ptr(self: &Arc<Self>) -> *const Self {
		if !self.ffi_pinned.swap(true, Ordering::AcqRel) {
			std::mem::forget(Arc::clone(self));
		}
		Arc::as_ptr(self)
	}
}

/// Key of a dynamic table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableKey {
	pub vendor: VendorId,
	pub screen: Screen,
}

/// Owner of every live [`DynamicDispatchTable`].
#[derive(Default)]
pub struct TableAllocator {
	tables: ArcSwap<FxHashMap<TableKey, Arc<DynamicDispatchTable>>>,
	/// Released tables that may still be held by readers.
	retired: parking_lot::Mutex<Vec<Weak<DynamicDispatchTable>>>,
}

impl TableAllocator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Lock-free lookup of an existing table.
	#[inline]
	pub fn get(&self, key: TableKey) -> Option<Arc<DynamicDispatchTable>> {
		self.tables.load().get(&key).cloned()
	}

	/// Returns the table for `(vendor, screen)`, creating and filling it on first use.
	///
	/// A released table for the same key that is still alive is taken back instead of building a
	/// new one, so a pinned table is reused across release cycles. Already assigned slots are
	/// filled from the vendor's `get_dispatch_address`; names the vendor does not implement stay
	/// empty. Callers hold the dispatcher write lock.
	pub(crate) fn get_or_create(
		&self,
		vendor: &VendorRecord,
		screen: Screen,
		slots: &SlotSnapshot,
	) -> Arc<DynamicDispatchTable> {
		let key = TableKey {
			vendor: vendor.id(),
			screen,
		};
		if let Some(table) = self.get(key) {
			return table;
		}

		let revived = self.take_retired(key);
		let fresh = revived.is_none();
		let table = revived.unwrap_or_else(|| Arc::new(DynamicDispatchTable::new(vendor.id(), screen)));
		table.grow_to(slots.len(), |offset| fill_slot(vendor, slots, offset));

		// The vendor may have asked for this table while it was being filled.
		if let Some(existing) = self.get(key) {
			return existing;
		}
		let mut next = (**self.tables.load()).clone();
		next.insert(key, Arc::clone(&table));
		self.tables.store(Arc::new(next));

		tracing::debug!(vendor = %vendor.name(), %screen, slots = slots.len(), fresh, "Published dynamic dispatch table");
		table
	}

	/// Removes and returns a live retired table for `key`, pruning dead entries on the way.
	fn take_retired(&self, key: TableKey) -> Option<Arc<DynamicDispatchTable>> {
		let mut retired = self.retired.lock();
		let mut found = None;
		retired.retain(|weak| {
			let Some(table) = weak.upgrade() else {
				return false;
			};
			if found.is_none() && table.vendor() == key.vendor && table.screen() == key.screen {
				found = Some(table);
				return false;
			}
			true
		});
		found
	}

	/// Grows every live table to cover all assigned slots.
	///
	/// Callers hold the dispatcher write lock. Vendor callbacks run without the retired list
	/// locked.
	pub(crate) fn grow_all(&self, slots: &SlotSnapshot, vendor_of: impl Fn(VendorId) -> Option<Arc<VendorRecord>>) {
		let grow = |table: &DynamicDispatchTable| {
			if let Some(vendor) = vendor_of(table.vendor()) {
				table.grow_to(slots.len(), |offset| fill_slot(&vendor, slots, offset));
			}
		};

		for table in self.tables.load_full().values() {
			grow(table);
		}

		let retired: Vec<_> = {
			let mut retired = self.retired.lock();
			retired.retain(|weak| weak.strong_count() > 0);
			retired.iter().filter_map(Weak::upgrade).collect()
		};
		for table in &retired {
			grow(table);
		}
	}

	/// Drops ownership of every table on `screen`, returning how many were released.
	///
	/// Callers hold the dispatcher write lock.
	pub(crate) fn release_screen(&self, screen: Screen) -> usize {
		let current = self.tables.load_full();
		let (released, kept): (Vec<_>, Vec<_>) = current
			.iter()
			.map(|(key, table)| (*key, Arc::clone(table)))
			.partition(|(key, _)| key.screen == screen);
		if released.is_empty() {
			return 0;
		}

		self.tables.store(Arc::new(kept.into_iter().collect()));
		let mut retired = self.retired.lock();
		retired.retain(|weak| weak.strong_count() > 0);
		retired.extend(released.iter().map(|(_, table)| Arc::downgrade(table)));
		released.len()
	}

	/// Released tables still alive somewhere.
	pub fn retired_len(&self) -> usize {
		self.retired.lock().iter().filter(|weak| weak.strong_count() > 0).count()
	}

	/// Number of tables owned by the allocator.
	pub fn len(&self) -> usize {
		self.tables.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

fn fill_slot(vendor: &VendorRecord, slots: &SlotSnapshot, offset: usize) -> Option<EntryPoint> {
	let name = slots.name_at(offset)?;
	vendor.callbacks().get_dispatch_address(name)
}
