//! Capability set handed to vendors during the handshake.

use std::sync::{Arc, Weak};

use glxmux_abi::{DisplayHandle, EntryPoint, Handle, ObjectKind, Screen, SlotIndex};

use crate::dispatcher::{Dispatcher, Shared};
use crate::error::{DispatchError, Result};
use crate::table::DynamicDispatchTable;

/// Accessors a vendor's dispatch functions use to find the right vendor.
///
/// Cheap to clone. Holds only a weak reference to the dispatcher, so a vendor keeping a copy
/// does not keep the dispatcher alive; once it is gone, lookups return `None` and mutations fail
/// with [`DispatchError::Detached`].
#[derive(Clone)]
pub struct ApiExports {
	shared: Weak<Shared>,
}

impl std::fmt::Debug for ApiExports {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ApiExports")
			.field("attached", &(self.shared.strong_count() > 0))
			.finish()
	}
}

impl ApiExports {
	pub(crate) fn new(shared: &Arc<Shared>) -> Self {
		Self {
			shared: Arc::downgrade(shared),
		}
	}

	fn with<R>(&self, f: impl FnOnce(&Dispatcher) -> R) -> Option<R> {
		let shared = self.shared.upgrade()?;
		Some(f(&Dispatcher::from_shared(shared)))
	}

	/// Dynamic table of the vendor serving `screen` on `display`.
	pub fn get_dyn_dispatch(&self, display: DisplayHandle, screen: Screen) -> Option<Arc<DynamicDispatchTable>> {
		self.with(|d| d.get_dyn_dispatch(display, screen)).flatten()
	}

	/// Dynamic table of the calling thread's current context.
	pub fn get_current_dyn_dispatch(&self) -> Option<Arc<DynamicDispatchTable>> {
		self.with(|d| d.current_dyn_dispatch()).flatten()
	}

	/// Entry at `index` of `table`; `None` when out of range or unsupported.
	pub fn fetch_dispatch_entry(&self, table: &DynamicDispatchTable, index: SlotIndex) -> Option<EntryPoint> {
		table.fetch(index)
	}

	pub fn get_current_context(&self) -> Option<Handle> {
		self.with(|d| d.current_context()).flatten()
	}

	pub fn add_mapping(&self, handle: Handle, kind: ObjectKind, screen: Screen) -> Result<()> {
		self.with(|d| d.add_mapping(handle, kind, screen))
			.unwrap_or(Err(DispatchError::Detached))
	}

	/// Returns false when no mapping existed.
	pub fn remove_mapping(&self, handle: Handle, kind: ObjectKind) -> bool {
		self.with(|d| d.remove_mapping(handle, kind)).unwrap_or(false)
	}

	pub fn screen_for(&self, handle: Handle, kind: ObjectKind) -> Option<Screen> {
		self.with(|d| d.screen_for(handle, kind)).flatten()
	}

	/// Drawable lookup that may fall back to the installed drawable probe.
	pub fn screen_from_drawable(&self, display: DisplayHandle, drawable: Handle) -> Option<Screen> {
		self.with(|d| d.screen_from_drawable(display, drawable)).flatten()
	}
}
