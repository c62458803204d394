//! Vendor handshake types and the registered vendor set.

use std::sync::Arc;

use arc_swap::ArcSwap;
use glxmux_abi::{BaselineEntry, BaselineTable, EntryPoint, SlotIndex, VENDOR_ABI_VERSION, VendorId};

use crate::exports::ApiExports;
use crate::patch::PatchCallbacks;

/// Callbacks a vendor supplies during the handshake.
///
/// [`VendorCallbacks::set_dispatch_index`] and [`VendorCallbacks::get_dispatch_address`] run
/// while the dispatcher's write lock is held. That lock is reentrant, so they may call any
/// [`ApiExports`] accessor on the same thread, but must not register vendors.
pub trait VendorCallbacks: Send + Sync {
	/// Real GLX or client API function. `is_client_api` is false for GLX names.
	fn get_proc_address(&self, name: &str, is_client_api: bool) -> Option<EntryPoint>;

	/// Vendor-neutral dispatch function for an extension name, if the vendor implements it.
	fn get_dispatch_address(&self, name: &str) -> Option<EntryPoint>;

	/// Notification of the global slot assigned to an extension name.
	fn set_dispatch_index(&self, name: &str, index: SlotIndex);

	/// Optional trampoline patching hooks.
	fn patch_callbacks(&self) -> Option<Arc<dyn PatchCallbacks>> {
		None
	}
}

/// What a vendor returns from a successful handshake.
pub struct VendorImports {
	pub baseline: BaselineTable,
	pub callbacks: Arc<dyn VendorCallbacks>,
}

/// A vendor module that can take part in the handshake.
pub trait VendorModule {
	/// ABI version the module was built against.
	fn abi_version(&self) -> u32 {
		VENDOR_ABI_VERSION
	}

	/// Handshake entry point.
	///
	/// Receives the negotiated ABI version and the core's exports; returns `None` on failure.
	fn main(
		&self,
		version: u32,
		exports: &ApiExports,
		vendor_name: &str,
		vendor_id: VendorId,
	) -> Option<VendorImports>;
}

/// A registered vendor. Immutable after registration.
pub struct VendorRecord {
	id: VendorId,
	name: Arc<str>,
	abi_version: u32,
	baseline: BaselineTable,
	callbacks: Arc<dyn VendorCallbacks>,
	patch: Option<Arc<dyn PatchCallbacks>>,
}

impl std::fmt::Debug for VendorRecord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("VendorRecord")
			.field("id", &self.id)
			.field("name", &self.name)
			.field("abi_version", &self.abi_version)
			.field("baseline", &self.baseline)
			.field("patch", &self.patch.is_some())
			.finish()
	}
}

impl VendorRecord {
	pub(crate) fn new(id: VendorId, name: &str, abi_version: u32, imports: VendorImports) -> Self {
		let patch = imports.callbacks.patch_callbacks();
		Self {
			id,
			name: Arc::from(name),
			abi_version,
			baseline: imports.baseline,
			callbacks: imports.callbacks,
			patch,
		}
	}

	pub fn id(&self) -> VendorId {
		self.id
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Negotiated ABI version.
	pub fn abi_version(&self) -> u32 {
		self.abi_version
	}

	pub fn baseline(&self) -> &BaselineTable {
		&self.baseline
	}

	pub fn baseline_entry(&self, entry: BaselineEntry) -> Option<EntryPoint> {
		self.baseline.get(entry)
	}

	pub fn callbacks(&self) -> &Arc<dyn VendorCallbacks> {
		&self.callbacks
	}

	pub fn patch_callbacks(&self) -> Option<&Arc<dyn PatchCallbacks>> {
		self.patch.as_ref()
	}
}

/// Registered vendors, indexed by [`VendorId`].
#[derive(Default)]
pub(crate) struct VendorSet {
	records: ArcSwap<Vec<Arc<VendorRecord>>>,
}

impl VendorSet {
	pub fn get(&self, id: VendorId) -> Option<Arc<VendorRecord>> {
		self.records.load().get(id.index()).cloned()
	}

	pub fn by_name(&self, name: &str) -> Option<Arc<VendorRecord>> {
		self.records.load().iter().find(|v| v.name() == name).cloned()
	}

	pub fn all(&self) -> Arc<Vec<Arc<VendorRecord>>> {
		self.records.load_full()
	}

	pub fn len(&self) -> usize {
		self.records.load().len()
	}

	/// Id the next registered vendor will receive.
	pub fn next_id(&self) -> VendorId {
		VendorId(self.len() as u32)
	}

	/// Appends `record`. Callers hold the dispatcher write lock.
	pub fn push(&self, record: Arc<VendorRecord>) {
		debug_assert_eq!(record.id(), self.next_id());
		let mut next = (**self.records.load()).clone();
		next.push(record);
		self.records.store(Arc::new(next));
	}
}
