//! Error types for the dispatch core.

use std::path::PathBuf;

use glxmux_abi::{Handle, ObjectKind, Screen, VendorId};
use thiserror::Error;

/// Failures reported by registration, mapping and make-current operations.
///
/// Absences on the hot path (an unassigned slot, a vendor without a given extension, a lookup
/// for an unmapped handle) are `None` rather than errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
	/// The vendor was built against a newer ABI than this core supports.
	#[error("vendor {vendor} requires ABI version {required}, supported is {supported}")]
	VersionMismatch {
		vendor: String,
		required: u32,
		supported: u32,
	},

	/// The vendor's handshake entry returned nothing.
	#[error("vendor {vendor} rejected the handshake")]
	VendorRejected { vendor: String },

	#[error("vendor {vendor} is already registered")]
	AlreadyRegistered { vendor: String },

	#[error("unknown vendor id {0}")]
	UnknownVendor(VendorId),

	/// A handle was mapped twice without an intervening removal.
	#[error("{kind} {handle} is already mapped to screen {existing}")]
	DuplicateMapping {
		kind: ObjectKind,
		handle: Handle,
		existing: Screen,
	},

	#[error("no screen mapping for {kind} {handle}")]
	UnknownHandle { kind: ObjectKind, handle: Handle },

	#[error("no vendor serves screen {screen}")]
	NoVendorForScreen { screen: Screen },

	#[error("context {context} is current on another thread")]
	ContextCurrentElsewhere { context: Handle },

	/// An exports table outlived the dispatcher that issued it.
	#[error("dispatcher is no longer alive")]
	Detached,
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("I/O error reading {path}: {error}")]
	Io {
		path: PathBuf,
		#[source]
		error: std::io::Error,
	},

	#[error("invalid config {path}: {error}")]
	Parse {
		path: PathBuf,
		#[source]
		error: toml::de::Error,
	},
}

/// Result type for dispatch operations.
pub type Result<T, E = DispatchError> = std::result::Result<T, E>;
