use std::ffi::{CStr, c_char, c_uchar, c_void};
use std::io::Write;
use std::ptr;

use glxmux_abi::ffi::{RawApiExports, RawVendorCallbacks};
use glxmux_abi::{BASELINE_COUNT, BaselineEntry, DisplayHandle, EntryPoint, Handle, ObjectKind, Screen};
use glxmux_dispatch::{DispatchError, Dispatcher, Resolution};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::*;

/// Serializes tests that go through the process-wide raw exports binding.
static SERIAL: Mutex<()> = Mutex::new(());
static HANDSHAKES: Mutex<Vec<(u32, String, c_int)>> = Mutex::new(Vec::new());
static INDICES: Mutex<Vec<(String, c_int)>> = Mutex::new(Vec::new());
static EXPORTS: Mutex<Option<RawApiExports>> = Mutex::new(None);

extern "C" fn create_context() {
	std::hint::black_box(0x11);
}

extern "C" fn swap_interval() {
	std::hint::black_box(0x12);
}

extern "C" fn flush() {
	std::hint::black_box(0x13);
}

unsafe extern "C" fn get_proc_address(name: *const c_uchar, is_client_api: c_int) -> *mut c_void {
	let name = unsafe { CStr::from_ptr(name.cast()) };
	if is_client_api != 0 && name == c"glFlush" {
		flush as *mut c_void
	} else {
		ptr::null_mut()
	}
}

unsafe extern "C" fn get_dispatch_address(name: *const c_uchar) -> *mut c_void {
	let name = unsafe { CStr::from_ptr(name.cast()) };
	if name == c"glXSwapIntervalEXT" {
		swap_interval as *mut c_void
	} else {
		ptr::null_mut()
	}
}

unsafe extern "C" fn set_dispatch_index(name: *const c_uchar, index: c_int) {
	let name = unsafe { CStr::from_ptr(name.cast()) };
	INDICES.lock().push((name.to_string_lossy().into_owned(), index));
}

fn record_handshake(version: u32, exports: *const RawApiExports, name: *const c_char, id: c_int) {
	let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
	HANDSHAKES.lock().push((version, name, id));
	*EXPORTS.lock() = unsafe { exports.as_ref() }.copied();
}

fn leak_imports(glxvc: RawVendorCallbacks) -> *const RawApiImports {
	let mut glx14ep = [None; BASELINE_COUNT];
	glx14ep[BaselineEntry::CreateContext.index()] = Some(create_context as EntryPoint);
	Box::leak(Box::new(RawApiImports { glx14ep, glxvc }))
}

const CALLBACKS: RawVendorCallbacks = RawVendorCallbacks {
	get_proc_address: Some(get_proc_address),
	get_dispatch_address: Some(get_dispatch_address),
	set_dispatch_index: Some(set_dispatch_index),
	patch_callbacks: ptr::null(),
};

unsafe extern "C" fn fake_main(
	version: u32,
	exports: *const RawApiExports,
	name: *const c_char,
	id: c_int,
) -> *const RawApiImports {
	record_handshake(version, exports, name, id);
	leak_imports(CALLBACKS)
}

unsafe extern "C" fn refusing_main(
	version: u32,
	exports: *const RawApiExports,
	name: *const c_char,
	id: c_int,
) -> *const RawApiImports {
	record_handshake(version, exports, name, id);
	ptr::null()
}

unsafe extern "C" fn incomplete_main(
	version: u32,
	exports: *const RawApiExports,
	name: *const c_char,
	id: c_int,
) -> *const RawApiImports {
	record_handshake(version, exports, name, id);
	leak_imports(RawVendorCallbacks {
		set_dispatch_index: None,
		..CALLBACKS
	})
}

fn handshakes_of(name: &str) -> Vec<(u32, c_int)> {
	HANDSHAKES
		.lock()
		.iter()
		.filter(|(_, n, _)| n == name)
		.map(|(v, _, id)| (*v, *id))
		.collect()
}

fn addr(entry: Option<EntryPoint>) -> Option<usize> {
	entry.map(|f| f as usize)
}

#[test]
fn c_vendor_registers_and_receives_slots() {
	let _serial = SERIAL.lock();
	let dispatcher = Dispatcher::default();
	let library = VendorLibrary::from_entry("c-handshake", fake_main, VENDOR_ABI_VERSION);

	let id = dispatcher.register_vendor(&library, library.name()).unwrap();
	assert_eq!(handshakes_of("c-handshake"), [(VENDOR_ABI_VERSION, 0)]);

	let vendor = dispatcher.vendor(id).unwrap();
	assert_eq!(addr(vendor.baseline_entry(BaselineEntry::CreateContext)), Some(create_context as usize));
	assert_eq!(vendor.baseline().provided(), 1);
	assert_eq!(addr(vendor.callbacks().get_proc_address("glFlush", true)), Some(flush as usize));
	assert!(vendor.callbacks().get_proc_address("glFlush", false).is_none());

	dispatcher.assign_screen_vendor(DisplayHandle(1), Screen(0), id).unwrap();
	let table = dispatcher.get_dyn_dispatch(DisplayHandle(1), Screen(0)).unwrap();
	let Resolution::Slot(slot) = dispatcher.resolve("glXSwapIntervalEXT") else {
		panic!("extension resolved as baseline");
	};
	assert!(INDICES.lock().contains(&("glXSwapIntervalEXT".to_string(), slot.0 as c_int)));
	assert_eq!(addr(table.fetch(slot)), Some(swap_interval as usize));
}

#[test]
fn raw_exports_reach_the_dispatcher() {
	let _serial = SERIAL.lock();
	let dispatcher = Dispatcher::default();
	let library = VendorLibrary::from_entry("c-exports", fake_main, VENDOR_ABI_VERSION);
	let id = dispatcher.register_vendor(&library, library.name()).unwrap();
	let exports = EXPORTS.lock().unwrap();
	let ctx = 0x1234usize as *mut c_void;

	unsafe {
		(exports.add_screen_context_mapping)(ctx, 2);
		assert_eq!(dispatcher.screen_for(Handle(0x1234), ObjectKind::Context), Some(Screen(2)));
		assert_eq!((exports.screen_from_context)(ctx), 2);

		(exports.add_screen_context_mapping)(ctx, 5);
		assert_eq!((exports.screen_from_context)(ctx), 2);

		(exports.add_screen_fbconfig_mapping)(ctx, -4);
		assert_eq!((exports.screen_from_fbconfig)(ctx), -1);

		(exports.add_screen_drawable_mapping)(0x99, 1);
		assert_eq!((exports.screen_from_drawable)(ptr::null_mut(), 0x99), 1);
		(exports.remove_screen_drawable_mapping)(0x99);
		assert_eq!((exports.screen_from_drawable)(ptr::null_mut(), 0x99), -1);

		(exports.remove_screen_context_mapping)(ctx);
		assert_eq!((exports.screen_from_context)(ctx), -1);
	}

	let dpy = 0x5000usize as *mut c_void;
	dispatcher.assign_screen_vendor(DisplayHandle(0x5000), Screen(0), id).unwrap();
	let Resolution::Slot(slot) = dispatcher.resolve("glXSwapIntervalEXT") else {
		panic!("extension resolved as baseline");
	};

	unsafe {
		assert!((exports.get_dyn_dispatch)(dpy, 3).is_null());
		assert!((exports.get_dyn_dispatch)(dpy, -1).is_null());
		let table = (exports.get_dyn_dispatch)(dpy, 0);
		assert!(!table.is_null());
		assert_eq!(table, (exports.get_dyn_dispatch)(dpy, 0));

		assert_eq!(addr((exports.fetch_dispatch_entry)(table, slot.0 as c_int)), Some(swap_interval as usize));
		assert!((exports.fetch_dispatch_entry)(table, 3).is_none());
		assert!((exports.fetch_dispatch_entry)(table, -1).is_none());
		assert!((exports.fetch_dispatch_entry)(ptr::null(), slot.0 as c_int).is_none());

		assert!((exports.get_current_context)().is_null());
		assert!((exports.get_current_dyn_dispatch)().is_null());
	}
	assert_eq!(dispatcher.current_context(), None);
}

#[test]
fn context_churn_reuses_the_pinned_table() {
	let _serial = SERIAL.lock();
	let dispatcher = Dispatcher::default();
	let library = VendorLibrary::from_entry("c-churn", fake_main, VENDOR_ABI_VERSION);
	let id = dispatcher.register_vendor(&library, library.name()).unwrap();
	let exports = EXPORTS.lock().unwrap();
	let dpy = 0x6000usize as *mut c_void;
	dispatcher.assign_screen_vendor(DisplayHandle(0x6000), Screen(1), id).unwrap();

	let mut pinned = Vec::new();
	for n in 0..50usize {
		let ctx = (0x7000 + n) as *mut c_void;
		unsafe {
			(exports.add_screen_context_mapping)(ctx, 1);
			pinned.push((exports.get_dyn_dispatch)(dpy, 1));
			(exports.remove_screen_context_mapping)(ctx);
		}
		assert_eq!(dispatcher.table_count(), 0);
	}

	pinned.dedup();
	assert_eq!(pinned.len(), 1);
	assert!(!pinned[0].is_null());
}

#[test]
fn null_imports_reject_the_vendor() {
	let _serial = SERIAL.lock();
	let dispatcher = Dispatcher::default();
	let library = VendorLibrary::from_entry("c-refusing", refusing_main, VENDOR_ABI_VERSION);
	assert_eq!(
		dispatcher.register_vendor(&library, library.name()).unwrap_err(),
		DispatchError::VendorRejected {
			vendor: "c-refusing".into()
		}
	);
	assert_eq!(handshakes_of("c-refusing").len(), 1);
	assert!(dispatcher.vendors().is_empty());
}

#[test]
fn missing_required_callback_rejects_the_vendor() {
	let _serial = SERIAL.lock();
	let dispatcher = Dispatcher::default();
	let library = VendorLibrary::from_entry("c-incomplete", incomplete_main, VENDOR_ABI_VERSION);
	assert!(matches!(
		dispatcher.register_vendor(&library, library.name()),
		Err(DispatchError::VendorRejected { .. })
	));
}

#[test]
fn newer_library_is_not_called() {
	let dispatcher = Dispatcher::default();
	let library = VendorLibrary::from_entry("c-future", fake_main, VENDOR_ABI_VERSION + 1);
	assert!(matches!(
		dispatcher.register_vendor(&library, library.name()),
		Err(DispatchError::VersionMismatch { .. })
	));
	assert!(handshakes_of("c-future").is_empty());
}

#[test]
fn missing_library_is_not_found() {
	let dir = tempfile::tempdir().unwrap();
	let err = VendorLibrary::open("absent", &[dir.path().to_path_buf()]).unwrap_err();
	assert!(matches!(err, LoadError::NotFound { ref file, .. } if file == "libGLX_absent.so.0"));
}

#[test]
fn non_library_file_fails_to_open() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join(library_file_name("junk"));
	std::fs::File::create(&path).unwrap().write_all(b"not an elf").unwrap();

	let err = VendorLibrary::open("junk", &[dir.path().to_path_buf()]).unwrap_err();
	assert!(matches!(err, LoadError::Open { .. }));
}
