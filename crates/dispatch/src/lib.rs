//! Vendor-neutral GLX dispatch core.
//!
//! # Role
//!
//! Several GLX implementations ("vendors") can be loaded into one process. The core decides which
//! vendor serves each call:
//!
//! - [`MappingRegistry`] records which screen a context, fbconfig or drawable belongs to.
//! - [`Dispatcher::vendor_for_screen`] turns a screen into a vendor.
//! - Baseline GLX 1.4 functions go through the vendor's fixed table. Extension functions get a
//!   global slot from the resolver and are fetched from a per-(vendor, screen)
//!   [`DynamicDispatchTable`].
//! - The calling thread's current context picks the table used by context-bound calls.
//!
//! # Concurrency
//!
//! Every lookup on the dispatch path is lock-free or takes a sharded read lock. Mutations
//! (slot assignment, vendor registration, table creation) are serialized by a single write lock
//! inside [`Dispatcher`].

mod config;
mod current;
mod dispatcher;
mod error;
mod exports;
mod global;
mod mapping;
mod patch;
mod resolver;
mod table;
mod vendor;

pub use config::{CONFIG_ENV, Config, DISALLOW_PATCHING_ENV, DispatchConfig, FORCE_VENDOR_ENV, VendorsConfig};
pub use current::{CurrentState, CurrentTracker};
pub use dispatcher::{Dispatcher, DrawableProbe};
pub use error::{ConfigError, DispatchError, Result};
pub use exports::ApiExports;
pub use global::{global, install_global};
pub use mapping::{MappingRegistry, Removed};
pub use patch::{PatchCallbacks, PatchManager, PatchOutcome, StubLocation, StubTable};
pub use resolver::{EntryPointResolver, Resolution, SlotSnapshot};
pub use table::{DynamicDispatchTable, TableAllocator, TableKey};
pub use vendor::{VendorCallbacks, VendorImports, VendorModule, VendorRecord};
