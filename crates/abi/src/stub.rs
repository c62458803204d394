/// Trampoline flavour the dispatch layer was built with, as reported to patch callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum StubKind {
	X86Tls = 0,
	X86_64Tls = 1,
	X86Tsd = 2,
	PureC = 3,
	X86_64Tsd = 4,
	Armv7ThumbTsd = 5,
	Aarch64Tsd = 6,
}

impl StubKind {
	pub fn from_raw(raw: i32) -> Option<Self> {
		Some(match raw {
			0 => StubKind::X86Tls,
			1 => StubKind::X86_64Tls,
			2 => StubKind::X86Tsd,
			3 => StubKind::PureC,
			4 => StubKind::X86_64Tsd,
			5 => StubKind::Armv7ThumbTsd,
			6 => StubKind::Aarch64Tsd,
			_ => return None,
		})
	}

	pub const fn to_raw(self) -> i32 {
		self as i32
	}
}
