use std::fmt;

use crate::BASELINE_COUNT;

/// Raw value of a windowing-system object (context pointer, fbconfig pointer or drawable XID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub usize);

impl fmt::Display for Handle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:#x}", self.0)
	}
}

/// Opaque windowing-system connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DisplayHandle(pub usize);

/// Screen number on a display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Screen(pub u32);

impl Screen {
	/// Converts a C screen number, rejecting negative values.
	pub fn from_raw(raw: i32) -> Option<Self> {
		u32::try_from(raw).ok().map(Self)
	}

	/// C representation of an optional screen; `-1` means not found.
	pub fn to_raw(screen: Option<Self>) -> i32 {
		screen.and_then(|s| i32::try_from(s.0).ok()).unwrap_or(-1)
	}
}

impl fmt::Display for Screen {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Dense vendor identifier, assigned in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VendorId(pub u32);

impl VendorId {
	pub const fn index(self) -> usize {
		self.0 as usize
	}
}

impl fmt::Display for VendorId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Global extension slot, identical for every vendor.
///
/// Slots are numbered after the baseline table, so the first extension ever resolved receives
/// [`SlotIndex::FIRST`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex(pub u32);

impl SlotIndex {
	pub const FIRST: SlotIndex = SlotIndex(BASELINE_COUNT as u32);

	/// Slot for the `offset`-th extension in assignment order.
	pub fn from_offset(offset: usize) -> Self {
		Self(BASELINE_COUNT as u32 + offset as u32)
	}

	/// Position of this slot inside a dynamic table, or `None` for indices below the first slot.
	pub fn offset(self) -> Option<usize> {
		(self.0 as usize).checked_sub(BASELINE_COUNT)
	}

	/// Converts a C slot index, rejecting negative values.
	pub fn from_raw(raw: i32) -> Option<Self> {
		u32::try_from(raw).ok().map(Self)
	}
}

impl fmt::Display for SlotIndex {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Object kinds tracked by the mapping registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
	Context,
	FbConfig,
	Drawable,
}

impl ObjectKind {
	pub const ALL: [ObjectKind; 3] = [ObjectKind::Context, ObjectKind::FbConfig, ObjectKind::Drawable];
}

impl fmt::Display for ObjectKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			ObjectKind::Context => "context",
			ObjectKind::FbConfig => "fbconfig",
			ObjectKind::Drawable => "drawable",
		})
	}
}
