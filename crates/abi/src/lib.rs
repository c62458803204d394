//! Vendor ABI shared by the glxmux dispatch core and vendor modules.
//!
//! # Dispatch tables
//!
//! Each vendor is associated with two table types:
//!
//! - **Baseline table**: the fixed list of GLX 1.4 entry points a vendor hands over during the
//!   handshake ([`BaselineTable`], ordered by [`BaselineEntry`]).
//! - **Dynamic table**: allocated by the core per (vendor, screen) and indexed by globally agreed
//!   slots for extension functions that are not part of the baseline.
//!
//! # Versioning
//!
//! [`VENDOR_ABI_VERSION`] must be bumped whenever the order of [`BaselineEntry`] or the layout of
//! any type in [`ffi`] changes.

mod baseline;
pub mod ffi;
mod handle;
mod stub;

pub use baseline::{BASELINE_COUNT, BaselineEntry, BaselineTable};
pub use handle::{DisplayHandle, Handle, ObjectKind, Screen, SlotIndex, VendorId};
pub use stub::StubKind;

/// Current version of the vendor ABI.
pub const VENDOR_ABI_VERSION: u32 = 1;

/// Symbol every vendor module exports as its handshake entry point.
pub const GLX_MAIN_SYMBOL: &[u8] = b"__glx_Main\0";

/// Optional `u32` symbol a vendor module exports to announce the ABI version it was built for.
pub const GLX_ABI_VERSION_SYMBOL: &[u8] = b"__glx_vendor_abi_version\0";

/// Untyped function pointer stored in dispatch tables.
///
/// Trampolines cast it back to the concrete signature of the entry point they forward to.
pub type EntryPoint = unsafe extern "C" fn();
