//! Loader for GLX vendor libraries.
//!
//! Opens `libGLX_<name>.so.0` for every configured vendor, runs its `__glx_Main` handshake and
//! registers it with a [`Dispatcher`]. Libraries that registered successfully stay loaded for
//! the rest of the process.

mod callbacks;
mod error;
mod exports;
mod library;

use glxmux_abi::VendorId;
use glxmux_dispatch::{Config, Dispatcher};
use parking_lot::Mutex;

pub use callbacks::{ForeignCallbacks, ForeignPatchCallbacks};
pub use error::LoadError;
pub use library::{VendorLibrary, library_file_name};

static RESIDENT: Mutex<Vec<VendorLibrary>> = Mutex::new(Vec::new());

/// Opens and registers one vendor, keeping its library resident on success.
pub fn load_vendor(dispatcher: &Dispatcher, name: &str, config: &Config) -> Result<VendorId, LoadError> {
	let library = VendorLibrary::open(name, &config.vendors.search_dirs)?;
	register(dispatcher, library)
}

/// Registers an already opened vendor, keeping its library resident on success.
pub fn register(dispatcher: &Dispatcher, library: VendorLibrary) -> Result<VendorId, LoadError> {
	let id = dispatcher.register_vendor(&library, library.name())?;
	RESIDENT.lock().push(library);
	Ok(id)
}

/// Vendor names to load: the configured list, plus the forced vendor if it is not listed.
pub fn configured_vendors(config: &Config) -> Vec<String> {
	let mut names = config.vendors.libraries.clone();
	if let Some(forced) = &config.vendors.force
		&& !names.contains(forced)
	{
		names.push(forced.clone());
	}
	names
}

/// Loads every configured vendor into `dispatcher`, skipping (and logging) failures.
pub fn load_into(dispatcher: &Dispatcher, config: &Config) -> Vec<VendorId> {
	configured_vendors(config)
		.iter()
		.filter_map(|name| match load_vendor(dispatcher, name, config) {
			Ok(id) => Some(id),
			Err(err) => {
				tracing::warn!(vendor = %name, error = %err, "Failed to load GLX vendor");
				None
			}
		})
		.collect()
}

/// Loads every configured vendor into the process-wide dispatcher.
pub fn load_configured(config: &Config) -> Vec<VendorId> {
	load_into(glxmux_dispatch::global(), config)
}
