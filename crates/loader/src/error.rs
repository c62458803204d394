use std::path::PathBuf;

use glxmux_dispatch::DispatchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
	#[error("no vendor library {file} for '{name}'")]
	NotFound { name: String, file: String },

	#[error("failed to open {}: {source}", path.display())]
	Open {
		path: PathBuf,
		#[source]
		source: libloading::Error,
	},

	#[error("{} does not export __glx_Main: {source}", path.display())]
	MissingEntry {
		path: PathBuf,
		#[source]
		source: libloading::Error,
	},

	#[error(transparent)]
	Dispatch(#[from] DispatchError),
}
