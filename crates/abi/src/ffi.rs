//! `#[repr(C)]` layout of the vendor handshake.
//!
//! The core hands a [`RawApiExports`] table to a vendor's `__glx_Main` and receives a
//! [`RawApiImports`] table back. The exports pointer is only valid for the duration of that call
//! unless the vendor copies what it needs; the imports table must stay valid for the lifetime of
//! the process.

use std::ffi::{c_char, c_int, c_uchar, c_ulong, c_void};

use crate::{BASELINE_COUNT, EntryPoint};

/// `Display *`.
pub type RawDisplay = *mut c_void;
/// `GLXContext`.
pub type RawContext = *mut c_void;
/// `GLXFBConfig`.
pub type RawFbConfig = *mut c_void;
/// `GLXDrawable` (an XID).
pub type RawDrawable = c_ulong;
/// Opaque `__GLXdispatchTableDynamic *`.
pub type RawDynDispatch = *const c_void;

/// Functions exported by the core to vendor dispatch functions.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawApiExports {
	pub get_dyn_dispatch: unsafe extern "C" fn(dpy: RawDisplay, screen: c_int) -> RawDynDispatch,
	pub get_current_dyn_dispatch: unsafe extern "C" fn() -> RawDynDispatch,
	pub fetch_dispatch_entry:
		unsafe extern "C" fn(dyn_dispatch: RawDynDispatch, index: c_int) -> Option<EntryPoint>,
	pub get_current_context: unsafe extern "C" fn() -> RawContext,

	pub add_screen_context_mapping: unsafe extern "C" fn(context: RawContext, screen: c_int),
	pub remove_screen_context_mapping: unsafe extern "C" fn(context: RawContext),
	pub screen_from_context: unsafe extern "C" fn(context: RawContext) -> c_int,

	pub add_screen_fbconfig_mapping: unsafe extern "C" fn(config: RawFbConfig, screen: c_int),
	pub remove_screen_fbconfig_mapping: unsafe extern "C" fn(config: RawFbConfig),
	pub screen_from_fbconfig: unsafe extern "C" fn(config: RawFbConfig) -> c_int,

	pub add_screen_drawable_mapping: unsafe extern "C" fn(drawable: RawDrawable, screen: c_int),
	pub remove_screen_drawable_mapping: unsafe extern "C" fn(drawable: RawDrawable),
	pub screen_from_drawable:
		unsafe extern "C" fn(dpy: RawDisplay, drawable: RawDrawable) -> c_int,
}

/// Callback a vendor uses during `initiate_patch` to locate a trampoline.
///
/// Returns non-zero and fills both addresses when the named stub exists.
pub type RawLookupStubOffset = unsafe extern "C" fn(
	func_name: *const c_char,
	writable_addr: *mut *mut c_void,
	executable_addr: *mut *const c_void,
) -> c_uchar;

/// Optional trampoline rewriting hooks.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawPatchCallbacks {
	pub is_patch_supported: Option<unsafe extern "C" fn(stub_type: c_int, stub_size: c_int) -> c_uchar>,
	pub initiate_patch: Option<
		unsafe extern "C" fn(stub_type: c_int, stub_size: c_int, lookup: RawLookupStubOffset) -> c_uchar,
	>,
	pub release_patch: Option<unsafe extern "C" fn()>,
	pub thread_attach: Option<unsafe extern "C" fn()>,
}

/// Required and optional vendor callbacks.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawVendorCallbacks {
	pub get_proc_address:
		Option<unsafe extern "C" fn(proc_name: *const c_uchar, is_client_api: c_int) -> *mut c_void>,
	pub get_dispatch_address: Option<unsafe extern "C" fn(proc_name: *const c_uchar) -> *mut c_void>,
	pub set_dispatch_index: Option<unsafe extern "C" fn(proc_name: *const c_uchar, index: c_int)>,
	/// Statically allocated, or null when unimplemented.
	pub patch_callbacks: *const RawPatchCallbacks,
}

/// Table returned by a vendor's `__glx_Main`.
///
/// `glx14ep` is layout-compatible with a struct of 32 function pointers in
/// [`crate::BaselineEntry`] order.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawApiImports {
	pub glx14ep: [Option<EntryPoint>; BASELINE_COUNT],
	pub glxvc: RawVendorCallbacks,
}

/// Signature of `__glx_Main`.
pub type RawGlxMain = unsafe extern "C" fn(
	version: u32,
	exports: *const RawApiExports,
	vendor_name: *const c_char,
	vendor_id: c_int,
) -> *const RawApiImports;

/// Converts a nullable `void *` returned by a vendor into an entry point.
pub fn entry_from_ptr(ptr: *mut c_void) -> Option<EntryPoint> {
	if ptr.is_null() {
		None
	} else {
		// SAFETY: non-null code pointer handed out by the vendor; callers cast it back to the
		// concrete signature before calling.
		Some(unsafe { std::mem::transmute::<*mut c_void, EntryPoint>(ptr) })
	}
}
