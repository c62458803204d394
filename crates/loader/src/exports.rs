//! C entry points handed to vendors as their `__GLXapiExports` table.
//!
//! A C vendor keeps the table for the process lifetime and calls back without telling us which
//! dispatcher it belongs to, so every function routes through the exports bound by the most
//! recent handshake.

use std::ffi::{c_int, c_void};
use std::ptr;
use std::sync::Arc;

use glxmux_abi::ffi::{RawApiExports, RawContext, RawDisplay, RawDrawable, RawDynDispatch, RawFbConfig};
use glxmux_abi::{DisplayHandle, EntryPoint, Handle, ObjectKind, Screen, SlotIndex};
use glxmux_dispatch::{ApiExports, DynamicDispatchTable};
use parking_lot::RwLock;

static BOUND: RwLock<Option<ApiExports>> = RwLock::new(None);

pub(crate) static RAW_EXPORTS: RawApiExports = RawApiExports {
	get_dyn_dispatch,
	get_current_dyn_dispatch,
	fetch_dispatch_entry,
	get_current_context,
	add_screen_context_mapping,
	remove_screen_context_mapping,
	screen_from_context,
	add_screen_fbconfig_mapping,
	remove_screen_fbconfig_mapping,
	screen_from_fbconfig,
	add_screen_drawable_mapping,
	remove_screen_drawable_mapping,
	screen_from_drawable,
};

/// Routes [`RAW_EXPORTS`] to `exports`.
pub(crate) fn bind(exports: &ApiExports) {
	*BOUND.write() = Some(exports.clone());
}

/// Vendors may call back into the exports from inside our callbacks, so the lock is not held
/// across `f`.
fn with_bound<R>(f: impl FnOnce(&ApiExports) -> Option<R>) -> Option<R> {
	let exports = BOUND.read().clone()?;
	f(&exports)
}

fn ptr_handle(ptr: *mut c_void) -> Handle {
	Handle(ptr as usize)
}

fn xid_handle(xid: RawDrawable) -> Handle {
	Handle(xid as usize)
}

fn display(dpy: RawDisplay) -> DisplayHandle {
	DisplayHandle(dpy as usize)
}

fn table_ptr(table: Option<Arc<DynamicDispatchTable>>) -> RawDynDispatch {
	table.map_or(ptr::null(), |t| t.as_ffi_ptr().cast())
}

fn add(handle: Handle, kind: ObjectKind, screen: c_int) {
	let Some(screen) = Screen::from_raw(screen) else {
		tracing::warn!(%kind, %handle, screen, "Ignoring mapping to negative screen");
		return;
	};
	// Rejections are logged by the dispatcher.
	with_bound(|e| e.add_mapping(handle, kind, screen).ok());
}

fn remove(handle: Handle, kind: ObjectKind) {
	with_bound(|e| e.remove_mapping(handle, kind).then_some(()));
}

fn screen_of(handle: Handle, kind: ObjectKind) -> c_int {
	Screen::to_raw(with_bound(|e| e.screen_for(handle, kind)))
}

unsafe extern "C" fn get_dyn_dispatch(dpy: RawDisplay, screen: c_int) -> RawDynDispatch {
	let Some(screen) = Screen::from_raw(screen) else {
		return ptr::null();
	};
	table_ptr(with_bound(|e| e.get_dyn_dispatch(display(dpy), screen)))
}

unsafe extern "C" fn get_current_dyn_dispatch() -> RawDynDispatch {
	table_ptr(with_bound(ApiExports::get_current_dyn_dispatch))
}

unsafe extern "C" fn fetch_dispatch_entry(dyn_dispatch: RawDynDispatch, index: c_int) -> Option<EntryPoint> {
	if dyn_dispatch.is_null() {
		return None;
	}
	// SAFETY: non-null tables only reach vendors through `as_ffi_ptr`, which keeps them alive
	// for the process lifetime.
	let table = unsafe { &*dyn_dispatch.cast::<DynamicDispatchTable>() };
	table.fetch(SlotIndex::from_raw(index)?)
}

unsafe extern "C" fn get_current_context() -> RawContext {
	with_bound(ApiExports::get_current_context).map_or(ptr::null_mut(), |h| h.0 as RawContext)
}

unsafe extern "C" fn add_screen_context_mapping(context: RawContext, screen: c_int) {
	add(ptr_handle(context), ObjectKind::Context, screen);
}

unsafe extern "C" fn remove_screen_context_mapping(context: RawContext) {
	remove(ptr_handle(context), ObjectKind::Context);
}

unsafe extern "C" fn screen_from_context(context: RawContext) -> c_int {
	screen_of(ptr_handle(context), ObjectKind::Context)
}

unsafe extern "C" fn add_screen_fbconfig_mapping(config: RawFbConfig, screen: c_int) {
	add(ptr_handle(config), ObjectKind::FbConfig, screen);
}

unsafe extern "C" fn remove_screen_fbconfig_mapping(config: RawFbConfig) {
	remove(ptr_handle(config), ObjectKind::FbConfig);
}

unsafe extern "C" fn screen_from_fbconfig(config: RawFbConfig) -> c_int {
	screen_of(ptr_handle(config), ObjectKind::FbConfig)
}

unsafe extern "C" fn add_screen_drawable_mapping(drawable: RawDrawable, screen: c_int) {
	add(xid_handle(drawable), ObjectKind::Drawable, screen);
}

unsafe extern "C" fn remove_screen_drawable_mapping(drawable: RawDrawable) {
	remove(xid_handle(drawable), ObjectKind::Drawable);
}

unsafe extern "C" fn screen_from_drawable(dpy: RawDisplay, drawable: RawDrawable) -> c_int {
	Screen::to_raw(with_bound(|e| e.screen_from_drawable(display(dpy), xid_handle(drawable))))
}
