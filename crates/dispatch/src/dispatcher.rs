//! Dispatcher facade tying the registries together.
//!
//! # Lock order
//!
//! `registration` → `write`. The write lock serializes slot assignment, vendor publication, table
//! creation and table release; lookups never take it. It is reentrant, because vendor callbacks
//! run under it and may call back through [`ApiExports`].

use std::sync::Arc;

use glxmux_abi::{
	BaselineEntry, DisplayHandle, EntryPoint, Handle, ObjectKind, Screen, SlotIndex, VENDOR_ABI_VERSION,
	VendorId,
};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use rustc_hash::FxHashMap;

use crate::config::Config;
use crate::current::CurrentTracker;
use crate::error::{DispatchError, Result};
use crate::exports::ApiExports;
use crate::mapping::MappingRegistry;
use crate::patch::{PatchManager, PatchOutcome, StubTable};
use crate::resolver::{EntryPointResolver, Resolution, SlotSnapshot};
use crate::table::{DynamicDispatchTable, TableAllocator, TableKey};
use crate::vendor::{VendorModule, VendorRecord, VendorSet};

/// Windowing-system lookup for drawables no vendor wrapper has mapped yet.
pub trait DrawableProbe: Send + Sync {
	fn screen_of(&self, display: DisplayHandle, drawable: Handle) -> Option<Screen>;
}

pub(crate) struct Shared {
	mappings: MappingRegistry,
	tables: TableAllocator,
	resolver: EntryPointResolver,
	vendors: VendorSet,
	current: CurrentTracker,
	patch: PatchManager,
	screens: RwLock<FxHashMap<(DisplayHandle, Screen), VendorId>>,
	forced_vendor: Option<String>,
	drawable_probe: RwLock<Option<Arc<dyn DrawableProbe>>>,
	write: ReentrantMutex<()>,
	registration: Mutex<()>,
}

/// Vendor-neutral GLX dispatch core.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Dispatcher {
	shared: Arc<Shared>,
}

impl Default for Dispatcher {
	fn default() -> Self {
		Self::new(&Config::default())
	}
}

impl std::fmt::Debug for Dispatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Dispatcher")
			.field("vendors", &self.shared.vendors.len())
			.field("slots", &self.shared.resolver.snapshot().len())
			.field("tables", &self.shared.tables.len())
			.finish()
	}
}

impl Dispatcher {
	pub fn new(config: &Config) -> Self {
		Self {
			shared: Arc::new(Shared {
				mappings: MappingRegistry::new(),
				tables: TableAllocator::new(),
				resolver: EntryPointResolver::new(),
				vendors: VendorSet::default(),
				current: CurrentTracker::new(),
				patch: PatchManager::new(config.dispatch.allow_patching),
				screens: RwLock::default(),
				forced_vendor: config.vendors.force.clone(),
				drawable_probe: RwLock::new(None),
				write: ReentrantMutex::new(()),
				registration: Mutex::new(()),
			}),
		}
	}

	pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
		Self { shared }
	}

	/// Capability set passed to vendors.
	pub fn exports(&self) -> ApiExports {
		ApiExports::new(&self.shared)
	}

	/// Performs the handshake with `module` and registers it as `name`.
	///
	/// On success the vendor has already been told about every slot assigned so far, in
	/// assignment order.
	pub fn register_vendor(&self, module: &dyn VendorModule, name: &str) -> Result<VendorId> {
		let s = &self.shared;
		let _registration = s.registration.lock();

		if s.vendors.by_name(name).is_some() {
			return Err(DispatchError::AlreadyRegistered { vendor: name.to_string() });
		}

		let required = module.abi_version();
		if required > VENDOR_ABI_VERSION {
			return Err(DispatchError::VersionMismatch {
				vendor: name.to_string(),
				required,
				supported: VENDOR_ABI_VERSION,
			});
		}
		let version = required.min(VENDOR_ABI_VERSION);

		let id = s.vendors.next_id();
		let imports = module
			.main(version, &self.exports(), name, id)
			.ok_or_else(|| DispatchError::VendorRejected { vendor: name.to_string() })?;
		let record = Arc::new(VendorRecord::new(id, name, version, imports));

		{
			let _write = s.write.lock();
			let slots = s.resolver.snapshot();
			for (slot, ext) in slots.iter() {
				record.callbacks().set_dispatch_index(ext, slot);
			}
			s.vendors.push(Arc::clone(&record));
		}

		tracing::info!(
			vendor = %name,
			%id,
			version,
			baseline = record.baseline().provided(),
			patching = record.patch_callbacks().is_some(),
			"Registered GLX vendor"
		);
		Ok(id)
	}

	/// Registers each module in order, skipping (and logging) the ones that fail.
	pub fn register_all<'a, I>(&self, modules: I) -> Vec<VendorId>
	where
		I: IntoIterator<Item = (&'a str, &'a dyn VendorModule)>,
	{
		modules
			.into_iter()
			.filter_map(|(name, module)| match self.register_vendor(module, name) {
				Ok(id) => Some(id),
				Err(err) => {
					tracing::warn!(vendor = %name, error = %err, "Skipping GLX vendor");
					None
				}
			})
			.collect()
	}

	pub fn vendor(&self, id: VendorId) -> Option<Arc<VendorRecord>> {
		self.shared.vendors.get(id)
	}

	pub fn vendor_by_name(&self, name: &str) -> Option<Arc<VendorRecord>> {
		self.shared.vendors.by_name(name)
	}

	/// Registered vendors in id order.
	pub fn vendors(&self) -> Vec<Arc<VendorRecord>> {
		self.shared.vendors.all().to_vec()
	}

	/// Routes `screen` of `display` to `vendor`.
	pub fn assign_screen_vendor(&self, display: DisplayHandle, screen: Screen, vendor: VendorId) -> Result<()> {
		if self.shared.vendors.get(vendor).is_none() {
			return Err(DispatchError::UnknownVendor(vendor));
		}
		self.shared.screens.write().insert((display, screen), vendor);
		Ok(())
	}

	/// Vendor serving `screen`. A configured forced vendor overrides per-screen assignments.
	pub fn vendor_for_screen(&self, display: DisplayHandle, screen: Screen) -> Option<Arc<VendorRecord>> {
		let s = &self.shared;
		if let Some(name) = &s.forced_vendor {
			return s.vendors.by_name(name);
		}
		let id = *s.screens.read().get(&(display, screen))?;
		s.vendors.get(id)
	}

	/// Classifies `name`, assigning and broadcasting a new slot on first sight of an extension.
	pub fn resolve(&self, name: &str) -> Resolution {
		let s = &self.shared;
		if let Some(resolution) = s.resolver.lookup(name) {
			return resolution;
		}

		let _write = s.write.lock();
		let assigned = s.resolver.assign(name);
		if assigned.fresh {
			let vendors = s.vendors.all();
			for vendor in vendors.iter() {
				vendor.callbacks().set_dispatch_index(name, assigned.slot);
			}
			s.tables.grow_all(&assigned.snapshot, |id| s.vendors.get(id));
			tracing::debug!(name, slot = %assigned.slot, vendors = vendors.len(), "Assigned dispatch slot");
		}
		Resolution::Slot(assigned.slot)
	}

	/// Slot already assigned to `name`, without assigning one.
	pub fn slot_for(&self, name: &str) -> Option<SlotIndex> {
		self.shared.resolver.slot_for(name)
	}

	pub fn slot_assignments(&self) -> Arc<SlotSnapshot> {
		self.shared.resolver.snapshot()
	}

	/// Dynamic table for `(vendor, screen)`, created on first use.
	pub fn table_for(&self, vendor: VendorId, screen: Screen) -> Result<Arc<DynamicDispatchTable>> {
		let s = &self.shared;
		if let Some(table) = s.tables.get(TableKey { vendor, screen }) {
			return Ok(table);
		}
		let record = s.vendors.get(vendor).ok_or(DispatchError::UnknownVendor(vendor))?;

		let _write = s.write.lock();
		let slots = s.resolver.snapshot();
		Ok(s.tables.get_or_create(&record, screen, &slots))
	}

	/// Dynamic table of the vendor serving `screen` on `display`.
	pub fn get_dyn_dispatch(&self, display: DisplayHandle, screen: Screen) -> Option<Arc<DynamicDispatchTable>> {
		let vendor = self.vendor_for_screen(display, screen)?;
		self.table_for(vendor.id(), screen).ok()
	}

	/// Number of dynamic tables currently owned.
	pub fn table_count(&self) -> usize {
		self.shared.tables.len()
	}

	pub fn add_mapping(&self, handle: Handle, kind: ObjectKind, screen: Screen) -> Result<()> {
		self.shared
			.mappings
			.add(handle, kind, screen)
			.inspect_err(|err| tracing::warn!(error = %err, "Rejected screen mapping"))
	}

	/// Removes a mapping; returns false when there was none.
	///
	/// Dynamic tables of a screen are released once nothing on that screen is mapped.
	pub fn remove_mapping(&self, handle: Handle, kind: ObjectKind) -> bool {
		let s = &self.shared;
		let Some(removed) = s.mappings.remove(handle, kind) else {
			return false;
		};
		if removed.last_on_screen {
			let _write = s.write.lock();
			if !s.mappings.is_screen_referenced(removed.screen) {
				let released = s.tables.release_screen(removed.screen);
				if released > 0 {
					tracing::debug!(screen = %removed.screen, released, "Released dynamic dispatch tables");
				}
			}
		}
		true
	}

	pub fn screen_for(&self, handle: Handle, kind: ObjectKind) -> Option<Screen> {
		self.shared.mappings.screen_for(handle, kind)
	}

	/// Screen of `drawable`, asking the drawable probe (and caching its answer) on a miss.
	pub fn screen_from_drawable(&self, display: DisplayHandle, drawable: Handle) -> Option<Screen> {
		let s = &self.shared;
		if let Some(screen) = s.mappings.screen_for(drawable, ObjectKind::Drawable) {
			return Some(screen);
		}
		let probe = s.drawable_probe.read().clone()?;
		let screen = probe.screen_of(display, drawable)?;
		match s.mappings.add(drawable, ObjectKind::Drawable, screen) {
			Err(DispatchError::DuplicateMapping { existing, .. }) => Some(existing),
			_ => Some(screen),
		}
	}

	pub fn set_drawable_probe(&self, probe: Arc<dyn DrawableProbe>) {
		*self.shared.drawable_probe.write() = Some(probe);
	}

	/// Makes `context` current on the calling thread, routing through its screen's vendor.
	pub fn make_current(&self, display: DisplayHandle, context: Handle) -> Result<Arc<VendorRecord>> {
		let screen = self
			.screen_for(context, ObjectKind::Context)
			.ok_or(DispatchError::UnknownHandle {
				kind: ObjectKind::Context,
				handle: context,
			})?;
		let vendor = self
			.vendor_for_screen(display, screen)
			.ok_or(DispatchError::NoVendorForScreen { screen })?;
		let table = self.table_for(vendor.id(), screen)?;
		self.bind(context, &vendor, table)?;
		Ok(vendor)
	}

	/// Binds `context` and `table` to the calling thread directly.
	pub fn set_current(&self, context: Handle, vendor: VendorId, table: Arc<DynamicDispatchTable>) -> Result<()> {
		let record = self.vendor(vendor).ok_or(DispatchError::UnknownVendor(vendor))?;
		self.bind(context, &record, table).map(|_| ())
	}

	fn bind(&self, context: Handle, vendor: &VendorRecord, table: Arc<DynamicDispatchTable>) -> Result<PatchOutcome> {
		let s = &self.shared;
		s.current
			.set_current(context, vendor.id(), table)
			.inspect_err(|err| tracing::warn!(error = %err, "make-current refused"))?;
		let others = s.current.others_current(vendor.id());
		Ok(s.patch.on_make_current(vendor.id(), vendor.patch_callbacks(), others))
	}

	/// Releases the calling thread's current context, returning it.
	pub fn lose_current(&self) -> Option<Handle> {
		self.shared.current.clear_current().map(|state| state.context)
	}

	pub fn current_context(&self) -> Option<Handle> {
		self.shared.current.current_context()
	}

	pub fn current_dyn_dispatch(&self) -> Option<Arc<DynamicDispatchTable>> {
		self.shared.current.current_dyn_dispatch()
	}

	pub fn current_vendor(&self) -> Option<Arc<VendorRecord>> {
		let id = self.shared.current.current_vendor()?;
		self.vendor(id)
	}

	/// Baseline entry of the current vendor.
	pub fn current_baseline(&self, entry: BaselineEntry) -> Option<EntryPoint> {
		self.current_vendor()?.baseline_entry(entry)
	}

	/// Function the calling thread would reach for `name`.
	///
	/// GLX names go through the baseline table or the current dynamic table, falling back to the
	/// current vendor's own GLX function; other names are client API functions answered by the
	/// current vendor.
	pub fn get_proc_address(&self, name: &str) -> Option<EntryPoint> {
		if !name.starts_with("glX") {
			return self.current_vendor()?.callbacks().get_proc_address(name, true);
		}
		let dispatched = match self.resolve(name) {
			Resolution::Baseline(entry) => self.current_baseline(entry),
			Resolution::Slot(slot) => self.shared.current.with_current(|s| s.table.fetch(slot)).flatten(),
		};
		dispatched.or_else(|| self.current_vendor()?.callbacks().get_proc_address(name, false))
	}

	/// Installs the trampoline layer used by vendor patching.
	pub fn install_stub_table(&self, stubs: Arc<dyn StubTable>) {
		self.shared.patch.install_stubs(stubs);
	}

	/// Vendor currently holding the trampoline patch.
	pub fn patch_owner(&self) -> Option<VendorId> {
		self.shared.patch.owner()
	}

	pub fn patching_enabled(&self) -> bool {
		self.shared.patch.is_enabled()
	}
}
