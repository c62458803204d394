use std::fmt;

use crate::EntryPoint;

macro_rules! baseline_entries {
	($($variant:ident => $name:literal),* $(,)?) => {
		/// GLX 1.4 entry points provided by every vendor, in ABI order.
		///
		/// The discriminant is the position in [`BaselineTable`]. Reordering is an ABI break.
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
		#[repr(usize)]
		pub enum BaselineEntry {
			$($variant,)*
		}

		impl BaselineEntry {
			/// Every baseline entry in table order.
			pub const ALL: &'static [BaselineEntry] = &[$(BaselineEntry::$variant,)*];

			/// Public API name of this entry point.
			pub const fn name(self) -> &'static str {
				match self {
					$(BaselineEntry::$variant => $name,)*
				}
			}

			/// Looks up a baseline entry by its API name.
			pub fn from_name(name: &str) -> Option<Self> {
				match name {
					$($name => Some(BaselineEntry::$variant),)*
					_ => None,
				}
			}
		}
	};
}

baseline_entries! {
	ChooseVisual => "glXChooseVisual",
	CopyContext => "glXCopyContext",
	CreateContext => "glXCreateContext",
	CreateGlxPixmap => "glXCreateGLXPixmap",
	DestroyContext => "glXDestroyContext",
	DestroyGlxPixmap => "glXDestroyGLXPixmap",
	GetConfig => "glXGetConfig",
	IsDirect => "glXIsDirect",
	MakeCurrent => "glXMakeCurrent",
	SwapBuffers => "glXSwapBuffers",
	UseXFont => "glXUseXFont",
	WaitGl => "glXWaitGL",
	WaitX => "glXWaitX",
	QueryServerString => "glXQueryServerString",
	GetClientString => "glXGetClientString",
	QueryExtensionsString => "glXQueryExtensionsString",
	ChooseFbConfig => "glXChooseFBConfig",
	CreateNewContext => "glXCreateNewContext",
	CreatePbuffer => "glXCreatePbuffer",
	CreatePixmap => "glXCreatePixmap",
	CreateWindow => "glXCreateWindow",
	DestroyPbuffer => "glXDestroyPbuffer",
	DestroyPixmap => "glXDestroyPixmap",
	DestroyWindow => "glXDestroyWindow",
	GetFbConfigAttrib => "glXGetFBConfigAttrib",
	GetFbConfigs => "glXGetFBConfigs",
	GetSelectedEvent => "glXGetSelectedEvent",
	GetVisualFromFbConfig => "glXGetVisualFromFBConfig",
	MakeContextCurrent => "glXMakeContextCurrent",
	QueryContext => "glXQueryContext",
	QueryDrawable => "glXQueryDrawable",
	SelectEvent => "glXSelectEvent",
}

/// Number of entries in the baseline table.
pub const BASELINE_COUNT: usize = BaselineEntry::ALL.len();

impl BaselineEntry {
	pub const fn index(self) -> usize {
		self as usize
	}
}

impl fmt::Display for BaselineEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Fixed per-vendor table of baseline entry points.
///
/// Entries a vendor leaves empty are reported as absent; calling them is the trampoline layer's
/// concern.
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct BaselineTable {
	entries: [Option<EntryPoint>; BASELINE_COUNT],
}

impl BaselineTable {
	pub const EMPTY: BaselineTable = BaselineTable {
		entries: [None; BASELINE_COUNT],
	};

	/// Builds a table from entries in ABI order.
	pub const fn from_entries(entries: [Option<EntryPoint>; BASELINE_COUNT]) -> Self {
		Self { entries }
	}

	pub fn get(&self, entry: BaselineEntry) -> Option<EntryPoint> {
		self.entries[entry.index()]
	}

	pub fn set(&mut self, entry: BaselineEntry, func: Option<EntryPoint>) {
		self.entries[entry.index()] = func;
	}

	/// Builder-style [`BaselineTable::set`].
	pub fn with(mut self, entry: BaselineEntry, func: EntryPoint) -> Self {
		self.set(entry, Some(func));
		self
	}

	/// Number of entry points the vendor actually provides.
	pub fn provided(&self) -> usize {
		self.entries.iter().filter(|e| e.is_some()).count()
	}

	pub fn as_entries(&self) -> &[Option<EntryPoint>; BASELINE_COUNT] {
		&self.entries
	}
}

impl Default for BaselineTable {
	fn default() -> Self {
		Self::EMPTY
	}
}

impl fmt::Debug for BaselineTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BaselineTable")
			.field("provided", &self.provided())
			.finish()
	}
}
