use std::sync::Arc;

/// Semantic classification of one gutter mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkKind {
	/// User bookmark.
	Bookmark,
	/// Debugger breakpoint, either polled from the debugger or drawn as a marker glyph.
	Breakpoint,
	/// Debugger tracepoint.
	Tracepoint,
	/// Marker that matched no known kind. Never published.
	Unknown,
}

impl MarkKind {
	/// Returns `true` for kinds that may appear in a published list.
	pub const fn is_known(self) -> bool {
		!matches!(self, Self::Unknown)
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Bookmark => "bookmark",
			Self::Breakpoint => "breakpoint",
			Self::Tracepoint => "tracepoint",
			Self::Unknown => "unknown",
		}
	}
}

/// One classified, line-anchored mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mark {
	/// Zero-based line in the document snapshot the mark was resolved against.
	pub line: usize,
	pub kind: MarkKind,
}

impl Mark {
	pub const fn new(line: usize, kind: MarkKind) -> Self {
		Self { line, kind }
	}
}

/// Read-only view of a published mark list.
///
/// Cloning is cheap; the list itself is never mutated after publication.
pub type MarkList = Arc<Vec<Mark>>;
