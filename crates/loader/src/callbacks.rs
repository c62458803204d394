//! Adapters from a vendor's C callback table to the dispatch traits.

use std::cell::RefCell;
use std::ffi::{CStr, CString, c_char, c_int, c_uchar, c_void};
use std::sync::Arc;

use glxmux_abi::ffi::{RawPatchCallbacks, RawVendorCallbacks, entry_from_ptr};
use glxmux_abi::{EntryPoint, SlotIndex, StubKind};
use glxmux_dispatch::{PatchCallbacks, StubTable, VendorCallbacks};

thread_local! {
	/// Stub table of the `initiate_patch` call running on this thread.
	static ACTIVE_STUBS: RefCell<Option<Arc<dyn StubTable>>> = const { RefCell::new(None) };
}

type GetProcAddress = unsafe extern "C" fn(*const c_uchar, c_int) -> *mut c_void;
type GetDispatchAddress = unsafe extern "C" fn(*const c_uchar) -> *mut c_void;
type SetDispatchIndex = unsafe extern "C" fn(*const c_uchar, c_int);

/// A C vendor's required callbacks.
pub struct ForeignCallbacks {
	get_proc_address: GetProcAddress,
	get_dispatch_address: GetDispatchAddress,
	set_dispatch_index: SetDispatchIndex,
	patch: Option<Arc<ForeignPatchCallbacks>>,
}

impl ForeignCallbacks {
	/// Returns `None` when a required callback is missing.
	///
	/// # Safety
	///
	/// `raw.patch_callbacks` must be null or point to a valid [`RawPatchCallbacks`].
	pub unsafe fn new(raw: &RawVendorCallbacks) -> Option<Self> {
		// SAFETY: upheld by the caller.
		let patch = unsafe { raw.patch_callbacks.as_ref() }
			.copied()
			.and_then(ForeignPatchCallbacks::new)
			.map(Arc::new);
		Some(Self {
			get_proc_address: raw.get_proc_address?,
			get_dispatch_address: raw.get_dispatch_address?,
			set_dispatch_index: raw.set_dispatch_index?,
			patch,
		})
	}
}

fn c_name(name: &str) -> Option<CString> {
	CString::new(name).ok()
}

impl VendorCallbacks for ForeignCallbacks {
	fn get_proc_address(&self, name: &str, is_client_api: bool) -> Option<EntryPoint> {
		let name = c_name(name)?;
		// SAFETY: the vendor only reads the NUL-terminated name during the call.
		entry_from_ptr(unsafe { (self.get_proc_address)(name.as_ptr().cast(), c_int::from(is_client_api)) })
	}

	fn get_dispatch_address(&self, name: &str) -> Option<EntryPoint> {
		let name = c_name(name)?;
		// SAFETY: as above.
		entry_from_ptr(unsafe { (self.get_dispatch_address)(name.as_ptr().cast()) })
	}

	fn set_dispatch_index(&self, name: &str, index: SlotIndex) {
		let (Some(cname), Ok(raw)) = (c_name(name), c_int::try_from(index.0)) else {
			tracing::warn!(name, slot = index.0, "Slot not representable for C vendor");
			return;
		};
		// SAFETY: as above.
		unsafe { (self.set_dispatch_index)(cname.as_ptr().cast(), raw) }
	}

	fn patch_callbacks(&self) -> Option<Arc<dyn PatchCallbacks>> {
		self.patch.clone().map(|p| p as Arc<dyn PatchCallbacks>)
	}
}

type IsPatchSupported = unsafe extern "C" fn(c_int, c_int) -> c_uchar;
type InitiatePatch = unsafe extern "C" fn(c_int, c_int, glxmux_abi::ffi::RawLookupStubOffset) -> c_uchar;

/// A C vendor's patching hooks. Only built when all four are present.
pub struct ForeignPatchCallbacks {
	is_patch_supported: IsPatchSupported,
	initiate_patch: InitiatePatch,
	release_patch: unsafe extern "C" fn(),
	thread_attach: unsafe extern "C" fn(),
}

impl ForeignPatchCallbacks {
	pub fn new(raw: RawPatchCallbacks) -> Option<Self> {
		Some(Self {
			is_patch_supported: raw.is_patch_supported?,
			initiate_patch: raw.initiate_patch?,
			release_patch: raw.release_patch?,
			thread_attach: raw.thread_attach?,
		})
	}
}

impl PatchCallbacks for ForeignPatchCallbacks {
	fn is_patch_supported(&self, kind: StubKind, stub_size: usize) -> bool {
		let Ok(size) = c_int::try_from(stub_size) else {
			return false;
		};
		// SAFETY: plain integer arguments.
		unsafe { (self.is_patch_supported)(kind.to_raw(), size) != 0 }
	}

	fn initiate_patch(&self, kind: StubKind, stub_size: usize, stubs: &Arc<dyn StubTable>) -> bool {
		let Ok(size) = c_int::try_from(stub_size) else {
			return false;
		};
		let previous = ACTIVE_STUBS.with(|slot| slot.replace(Some(Arc::clone(stubs))));
		// SAFETY: `lookup_stub` only reads ACTIVE_STUBS, which stays set for the whole call.
		let patched = unsafe { (self.initiate_patch)(kind.to_raw(), size, lookup_stub) != 0 };
		ACTIVE_STUBS.with(|slot| slot.replace(previous));
		patched
	}

	fn release_patch(&self) {
		// SAFETY: no arguments.
		unsafe { (self.release_patch)() }
	}

	fn thread_attach(&self) {
		// SAFETY: no arguments.
		unsafe { (self.thread_attach)() }
	}
}

/// Stub lookup passed to `initiate_patch`.
unsafe extern "C" fn lookup_stub(
	func_name: *const c_char,
	writable_addr: *mut *mut c_void,
	executable_addr: *mut *const c_void,
) -> c_uchar {
	if func_name.is_null() || writable_addr.is_null() || executable_addr.is_null() {
		return 0;
	}
	// SAFETY: the vendor passes a NUL-terminated name.
	let Ok(name) = unsafe { CStr::from_ptr(func_name) }.to_str() else {
		return 0;
	};
	let found = ACTIVE_STUBS.with(|slot| slot.borrow().as_ref().and_then(|stubs| stubs.lookup(name)));
	let Some(location) = found else {
		return 0;
	};
	// SAFETY: both out-pointers were checked for null and point to vendor-owned storage.
	unsafe {
		*writable_addr = location.writable;
		*executable_addr = location.executable;
	}
	1
}
