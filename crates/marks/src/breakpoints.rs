use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::LineBase;
use crate::error::HostError;
use crate::host::BreakpointSource;

/// Deduplicated breakpoint lines for one document, taken in one read.
///
/// Equality is set equality. Iteration is ascending by line, which keeps the
/// breakpoint prefix of consecutive publications stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakpointSnapshot {
	lines: Arc<BTreeSet<usize>>,
}

impl BreakpointSnapshot {
	pub fn empty() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.lines.len()
	}

	pub fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}

	pub fn contains(&self, line: usize) -> bool {
		self.lines.contains(&line)
	}

	/// Lines in ascending order.
	pub fn lines(&self) -> impl Iterator<Item = usize> + '_ {
		self.lines.iter().copied()
	}
}

impl FromIterator<usize> for BreakpointSnapshot {
	fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
		Self {
			lines: Arc::new(iter.into_iter().collect()),
		}
	}
}

/// Reads the host breakpoint collection restricted to one file.
pub struct BreakpointSnapshotter {
	source: Arc<dyn BreakpointSource>,
	file: Option<PathBuf>,
	line_base: LineBase,
}

impl BreakpointSnapshotter {
	/// Creates a snapshotter for `file`. A view without a file matches no breakpoints.
	pub fn new(source: Arc<dyn BreakpointSource>, file: Option<PathBuf>, line_base: LineBase) -> Self {
		Self { source, file, line_base }
	}

	/// Takes one snapshot.
	///
	/// Breakpoints without a file, in another file, or with a line that cannot
	/// be converted are excluded. Enumeration failures are returned unchanged.
	pub fn take(&self) -> Result<BreakpointSnapshot, HostError> {
		let Some(file) = self.file.as_deref() else {
			return Ok(BreakpointSnapshot::empty());
		};
		let breakpoints = self.source.breakpoints()?;
		Ok(breakpoints
			.into_iter()
			.filter(|bp| bp.file.as_deref() == Some(file))
			.filter_map(|bp| self.line_base.to_zero_based(bp.line))
			.collect())
	}
}
