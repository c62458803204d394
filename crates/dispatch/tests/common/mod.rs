#![allow(dead_code)]

use std::sync::Arc;

use glxmux_abi::{BaselineEntry, BaselineTable, EntryPoint, SlotIndex, VENDOR_ABI_VERSION, VendorId};
use glxmux_dispatch::{ApiExports, PatchCallbacks, VendorCallbacks, VendorImports, VendorModule};
use parking_lot::Mutex;

pub extern "C" fn create_context_a() {
	std::hint::black_box(0xa1);
}

pub extern "C" fn create_context_b() {
	std::hint::black_box(0xb1);
}

pub extern "C" fn swap_interval_a() {
	std::hint::black_box(0xa2);
}

pub extern "C" fn swap_interval_b() {
	std::hint::black_box(0xb2);
}

pub extern "C" fn gl_clear_a() {
	std::hint::black_box(0xa3);
}

pub extern "C" fn query_renderer_a() {
	std::hint::black_box(0xa4);
}

pub fn addr(entry: Option<EntryPoint>) -> Option<usize> {
	entry.map(|f| f as usize)
}

/// Callbacks recording every slot notification.
#[derive(Default)]
pub struct FakeCallbacks {
	pub dispatch: Vec<(&'static str, EntryPoint)>,
	pub client: Vec<(&'static str, EntryPoint)>,
	/// GLX functions the vendor exports directly, outside any dispatch table.
	pub glx: Vec<(&'static str, EntryPoint)>,
	pub indices: Mutex<Vec<(String, SlotIndex)>>,
	pub patch: Option<Arc<dyn PatchCallbacks>>,
}

impl FakeCallbacks {
	/// Notifications received for `name`.
	pub fn indices_for(&self, name: &str) -> Vec<SlotIndex> {
		self.indices
			.lock()
			.iter()
			.filter(|(n, _)| n == name)
			.map(|(_, slot)| *slot)
			.collect()
	}
}

impl VendorCallbacks for FakeCallbacks {
	fn get_proc_address(&self, name: &str, is_client_api: bool) -> Option<EntryPoint> {
		let known = if is_client_api { &self.client } else { &self.glx };
		known.iter().find(|(n, _)| *n == name).map(|(_, f)| *f)
	}

	fn get_dispatch_address(&self, name: &str) -> Option<EntryPoint> {
		self.dispatch.iter().find(|(n, _)| *n == name).map(|(_, f)| *f)
	}

	fn set_dispatch_index(&self, name: &str, index: SlotIndex) {
		self.indices.lock().push((name.to_string(), index));
	}

	fn patch_callbacks(&self) -> Option<Arc<dyn PatchCallbacks>> {
		self.patch.clone()
	}
}

/// In-process vendor module.
pub struct FakeVendor {
	pub abi_version: u32,
	pub accept: bool,
	pub baseline: BaselineTable,
	pub callbacks: Arc<FakeCallbacks>,
	pub handshake: Mutex<Option<(u32, VendorId, ApiExports)>>,
}

impl FakeVendor {
	pub fn new(callbacks: FakeCallbacks) -> Self {
		Self {
			abi_version: VENDOR_ABI_VERSION,
			accept: true,
			baseline: BaselineTable::EMPTY,
			callbacks: Arc::new(callbacks),
			handshake: Mutex::new(None),
		}
	}

	/// Vendor "A": creates contexts, implements `glXSwapIntervalEXT` and `glClear`, and exports
	/// `glXQueryRendererIntegerMESA` without a dispatch function.
	pub fn a() -> Self {
		let mut vendor = Self::new(FakeCallbacks {
			dispatch: vec![("glXSwapIntervalEXT", swap_interval_a as EntryPoint)],
			client: vec![("glClear", gl_clear_a as EntryPoint)],
			glx: vec![("glXQueryRendererIntegerMESA", query_renderer_a as EntryPoint)],
			..FakeCallbacks::default()
		});
		vendor.baseline = BaselineTable::EMPTY.with(BaselineEntry::CreateContext, create_context_a);
		vendor
	}

	/// Vendor "B": creates contexts and implements `glXSwapIntervalEXT`.
	pub fn b() -> Self {
		let mut vendor = Self::new(FakeCallbacks {
			dispatch: vec![("glXSwapIntervalEXT", swap_interval_b as EntryPoint)],
			..FakeCallbacks::default()
		});
		vendor.baseline = BaselineTable::EMPTY.with(BaselineEntry::CreateContext, create_context_b);
		vendor
	}

	pub fn exports(&self) -> Option<ApiExports> {
		self.handshake.lock().as_ref().map(|(_, _, exports)| exports.clone())
	}
}

impl VendorModule for FakeVendor {
	fn abi_version(&self) -> u32 {
		self.abi_version
	}

	fn main(&self, version: u32, exports: &ApiExports, _vendor_name: &str, vendor_id: VendorId) -> Option<VendorImports> {
		*self.handshake.lock() = Some((version, vendor_id, exports.clone()));
		if !self.accept {
			return None;
		}
		Some(VendorImports {
			baseline: self.baseline,
			callbacks: self.callbacks.clone(),
		})
	}
}
