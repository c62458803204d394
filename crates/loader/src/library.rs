//! Vendor shared libraries.

use std::ffi::{CString, c_int};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glxmux_abi::ffi::{RawApiImports, RawGlxMain};
use glxmux_abi::{BaselineTable, GLX_ABI_VERSION_SYMBOL, GLX_MAIN_SYMBOL, VENDOR_ABI_VERSION, VendorId};
use glxmux_dispatch::{ApiExports, VendorImports, VendorModule};
use libloading::Library;

use crate::callbacks::ForeignCallbacks;
use crate::error::LoadError;
use crate::exports;

/// File name of the vendor library for `name`.
pub fn library_file_name(name: &str) -> String {
	format!("libGLX_{name}.so.0")
}

/// A vendor module backed by a C `__glx_Main`.
///
/// Function pointers handed out by the vendor point into the library, so it must outlive every
/// dispatcher it was registered with.
pub struct VendorLibrary {
	name: String,
	path: Option<PathBuf>,
	main: RawGlxMain,
	abi_version: u32,
	_library: Option<Library>,
}

impl std::fmt::Debug for VendorLibrary {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("VendorLibrary")
			.field("name", &self.name)
			.field("path", &self.path)
			.field("abi_version", &self.abi_version)
			.finish()
	}
}

impl VendorLibrary {
	/// Opens `libGLX_<name>.so.0` from the first of `search_dirs` containing it, or through the
	/// dynamic linker's search path when `search_dirs` is empty.
	pub fn open(name: &str, search_dirs: &[PathBuf]) -> Result<Self, LoadError> {
		let file = library_file_name(name);
		let path = if search_dirs.is_empty() {
			PathBuf::from(&file)
		} else {
			search_dirs
				.iter()
				.map(|dir| dir.join(&file))
				.find(|path| path.is_file())
				.ok_or_else(|| LoadError::NotFound {
					name: name.to_string(),
					file: file.clone(),
				})?
		};
		Self::open_path(name, &path)
	}

	/// Opens the vendor library at `path`.
	pub fn open_path(name: &str, path: &Path) -> Result<Self, LoadError> {
		// SAFETY: loading a vendor runs its initializers; vendor libraries are trusted by
		// configuration.
		let library = unsafe { Library::new(path) }.map_err(|source| LoadError::Open {
			path: path.to_path_buf(),
			source,
		})?;

		// SAFETY: `__glx_Main` has the `RawGlxMain` signature by contract.
		let main = unsafe { library.get::<RawGlxMain>(GLX_MAIN_SYMBOL) }
			.map(|symbol| *symbol)
			.map_err(|source| LoadError::MissingEntry {
				path: path.to_path_buf(),
				source,
			})?;

		// SAFETY: the optional version symbol is a `u32` constant.
		let abi_version = unsafe { library.get::<*const u32>(GLX_ABI_VERSION_SYMBOL) }
			.ok()
			.map(|symbol| *symbol)
			.filter(|ptr| !ptr.is_null())
			.map_or(VENDOR_ABI_VERSION, |ptr| unsafe { ptr.read() });

		tracing::debug!(vendor = name, path = %path.display(), abi_version, "Opened GLX vendor library");
		Ok(Self {
			name: name.to_string(),
			path: Some(path.to_path_buf()),
			main,
			abi_version,
			_library: Some(library),
		})
	}

	/// Wraps an entry point that is already linked into the process.
	pub fn from_entry(name: &str, main: RawGlxMain, abi_version: u32) -> Self {
		Self {
			name: name.to_string(),
			path: None,
			main,
			abi_version,
			_library: None,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn path(&self) -> Option<&Path> {
		self.path.as_deref()
	}
}

impl VendorModule for VendorLibrary {
	fn abi_version(&self) -> u32 {
		self.abi_version
	}

	fn main(&self, version: u32, exports: &ApiExports, vendor_name: &str, vendor_id: VendorId) -> Option<VendorImports> {
		let name = CString::new(vendor_name).ok()?;
		let id = c_int::try_from(vendor_id.0).ok()?;
		exports::bind(exports);

		// SAFETY: the exports table is static and the name outlives the call.
		let imports = unsafe { (self.main)(version, &exports::RAW_EXPORTS, name.as_ptr(), id) };
		// SAFETY: a non-null imports table stays valid for the process lifetime.
		let Some(imports) = (unsafe { imports.as_ref() }) else {
			tracing::warn!(vendor = vendor_name, "__glx_Main returned no imports");
			return None;
		};
		into_imports(vendor_name, imports)
	}
}

fn into_imports(vendor: &str, raw: &RawApiImports) -> Option<VendorImports> {
	// SAFETY: `patch_callbacks` is null or statically allocated by the vendor.
	let Some(callbacks) = (unsafe { ForeignCallbacks::new(&raw.glxvc) }) else {
		tracing::warn!(vendor, "Vendor is missing required callbacks");
		return None;
	};
	Some(VendorImports {
		baseline: BaselineTable::from_entries(raw.glx14ep),
		callbacks: Arc::new(callbacks),
	})
}

#[cfg(test)]
mod tests;
