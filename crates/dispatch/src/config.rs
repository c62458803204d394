//! Runtime configuration.
//!
//! Looked up in `$GLXMUX_CONFIG`, then `$XDG_CONFIG_HOME/glxmux/config.toml`. A missing file is
//! not an error; every field has a default.
//!
//! ```toml
//! [vendors]
//! search_dirs = ["/usr/lib/glxmux"]
//! libraries = ["mesa", "nvidia"]
//! force = "mesa"
//!
//! [dispatch]
//! allow_patching = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Path override for the configuration file.
pub const CONFIG_ENV: &str = "GLXMUX_CONFIG";
/// Routes every screen to the named vendor.
pub const FORCE_VENDOR_ENV: &str = "GLXMUX_VENDOR_LIBRARY_NAME";
/// Any non-empty value other than `0` disables trampoline patching.
pub const DISALLOW_PATCHING_ENV: &str = "GLXMUX_DISALLOW_PATCHING";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	pub vendors: VendorsConfig,
	pub dispatch: DispatchConfig,
}

/// Vendor discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorsConfig {
	/// Directories searched for `libGLX_<name>.so.0`; empty defers to the dynamic linker.
	pub search_dirs: Vec<PathBuf>,
	/// Vendor names in load order.
	pub libraries: Vec<String>,
	/// Vendor that serves every screen, regardless of per-screen assignments.
	pub force: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
	pub allow_patching: bool,
}

impl Default for DispatchConfig {
	fn default() -> Self {
		Self { allow_patching: true }
	}
}

impl Config {
	/// Parses a configuration file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		toml::from_str(&text).map_err(|error| ConfigError::Parse {
			path: path.to_path_buf(),
			error,
		})
	}

	/// Loads the user configuration (if any) and applies environment overrides.
	pub fn discover() -> Result<Self, ConfigError> {
		let mut config = match Self::config_path() {
			Some(path) if path.exists() => Self::load(&path)?,
			_ => Self::default(),
		};
		config.apply_env(|key| std::env::var(key).ok());
		Ok(config)
	}

	/// Like [`Config::discover`], but logs and falls back to defaults on error.
	pub fn discover_or_default() -> Self {
		Self::discover().unwrap_or_else(|err| {
			tracing::warn!(error = %err, "Ignoring unreadable glxmux config");
			let mut config = Self::default();
			config.apply_env(|key| std::env::var(key).ok());
			config
		})
	}

	pub fn config_path() -> Option<PathBuf> {
		if let Some(path) = std::env::var_os(CONFIG_ENV) {
			return Some(PathBuf::from(path));
		}
		dirs::config_dir().map(|dir| dir.join("glxmux").join("config.toml"))
	}

	/// Applies environment overrides read through `var`.
	pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
		if let Some(name) = var(FORCE_VENDOR_ENV).filter(|v| !v.is_empty()) {
			self.vendors.force = Some(name);
		}
		if var(DISALLOW_PATCHING_ENV).is_some_and(|v| !v.is_empty() && v != "0") {
			self.dispatch.allow_patching = false;
		}
	}
}

#[cfg(test)]
mod tests;
