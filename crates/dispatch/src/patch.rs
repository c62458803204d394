//! Optional trampoline patching.
//!
//! A vendor that is the only one in use may rewrite the dispatch trampolines directly at
//! make-current time. This is purely a performance hint: with patching disabled every call still
//! goes through the dynamic lookup.
//!
//! # Invariants
//!
//! - At most one vendor holds a patch at a time.
//! - Once two vendors have been current concurrently, any active patch is released and patching
//!   stays disabled for the rest of the process.

use std::ffi::c_void;
use std::sync::Arc;

use glxmux_abi::{StubKind, VendorId};
use parking_lot::Mutex;

/// Vendor-side patching hooks.
pub trait PatchCallbacks: Send + Sync {
	fn is_patch_supported(&self, kind: StubKind, stub_size: usize) -> bool;

	/// Rewrites the stubs found through `stubs`. Returns false if nothing was patched.
	fn initiate_patch(&self, kind: StubKind, stub_size: usize, stubs: &Arc<dyn StubTable>) -> bool;

	/// The vendor's patch is being removed.
	fn release_patch(&self);

	/// A new thread made a context of the patching vendor current.
	fn thread_attach(&self);
}

/// Addresses of one trampoline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StubLocation {
	pub writable: *mut c_void,
	pub executable: *const c_void,
}

/// Trampoline storage, supplied by the layer that owns the per-function stubs.
pub trait StubTable: Send + Sync {
	fn kind(&self) -> StubKind;

	fn stub_size(&self) -> usize;

	fn lookup(&self, name: &str) -> Option<StubLocation>;

	/// Puts every stub back to its default dispatching code.
	fn restore(&self);
}

/// What happened to patching during a make-current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
	/// Patching is off (configuration, or multiple vendors seen).
	Disabled,
	/// Allowed, but the vendor or stub layer could not patch.
	Unpatched,
	/// The vendor just patched the stubs.
	Patched,
	/// The vendor already held the patch; this thread was attached.
	Attached,
}

struct PatchState {
	stubs: Option<Arc<dyn StubTable>>,
	owner: Option<(VendorId, Arc<dyn PatchCallbacks>)>,
	multiplexed: bool,
}

/// Tracks which vendor, if any, currently owns the trampolines.
pub struct PatchManager {
	allowed: bool,
	state: Mutex<PatchState>,
}

impl PatchManager {
	pub fn new(allowed: bool) -> Self {
		Self {
			allowed,
			state: Mutex::new(PatchState {
				stubs: None,
				owner: None,
				multiplexed: false,
			}),
		}
	}

	/// Installs the stub layer. Without one, patching never happens.
	pub fn install_stubs(&self, stubs: Arc<dyn StubTable>) {
		self.state.lock().stubs = Some(stubs);
	}

	/// Vendor currently holding the patch.
	pub fn owner(&self) -> Option<VendorId> {
		self.state.lock().owner.as_ref().map(|(id, _)| *id)
	}

	pub fn is_enabled(&self) -> bool {
		self.allowed && !self.state.lock().multiplexed
	}

	/// Called after `vendor` became current on this thread.
	///
	/// `others_current` is true when a context of a different vendor is current on any thread.
	pub fn on_make_current(
		&self,
		vendor: VendorId,
		callbacks: Option<&Arc<dyn PatchCallbacks>>,
		others_current: bool,
	) -> PatchOutcome {
		if !self.allowed {
			return PatchOutcome::Disabled;
		}
		let mut state = self.state.lock();
		if state.multiplexed {
			return PatchOutcome::Disabled;
		}

		let owner = state.owner.as_ref().map(|(id, cb)| (*id, Arc::clone(cb)));
		match owner {
			Some((owner, cb)) if owner == vendor && !others_current => {
				cb.thread_attach();
				return PatchOutcome::Attached;
			}
			Some(_) => {
				Self::disable(&mut state);
				return PatchOutcome::Disabled;
			}
			None if others_current => {
				Self::disable(&mut state);
				return PatchOutcome::Disabled;
			}
			None => {}
		}

		let (Some(callbacks), Some(stubs)) = (callbacks, state.stubs.clone()) else {
			return PatchOutcome::Unpatched;
		};
		let (kind, size) = (stubs.kind(), stubs.stub_size());
		if !callbacks.is_patch_supported(kind, size) {
			return PatchOutcome::Unpatched;
		}
		if !callbacks.initiate_patch(kind, size, &stubs) {
			stubs.restore();
			return PatchOutcome::Unpatched;
		}

		callbacks.thread_attach();
		state.owner = Some((vendor, Arc::clone(callbacks)));
		tracing::debug!(%vendor, ?kind, "Dispatch stubs patched");
		PatchOutcome::Patched
	}

	fn disable(state: &mut PatchState) {
		if let Some((owner, cb)) = state.owner.take() {
			cb.release_patch();
			if let Some(stubs) = &state.stubs {
				stubs.restore();
			}
			tracing::debug!(vendor = %owner, "Released dispatch stub patch");
		}
		state.multiplexed = true;
		tracing::debug!("Multiple vendors current; stub patching disabled");
	}
}
