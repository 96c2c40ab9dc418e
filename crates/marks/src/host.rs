//! Host collaborator boundary.
//!
//! The engine only observes the host: it queries markers, enumerates
//! breakpoints and maps positions, but never mutates any of them.

use std::ops::Range;
use std::path::PathBuf;

use ropey::Rope;

use crate::error::HostError;

/// Identifies one buffer in the host's projection graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

/// Handle for an active marker change subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Char span anchored against a (possibly projected) buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchoredSpan {
	pub buffer: BufferId,
	pub start: usize,
	pub end: usize,
}

impl AnchoredSpan {
	pub fn new(buffer: BufferId, range: Range<usize>) -> Self {
		Self {
			buffer,
			start: range.start,
			end: range.end,
		}
	}

	/// Start point of the span.
	pub const fn start_point(&self) -> AnchoredPoint {
		AnchoredPoint {
			buffer: self.buffer,
			offset: self.start,
		}
	}
}

/// Char offset anchored against a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchoredPoint {
	pub buffer: BufferId,
	pub offset: usize,
}

/// Which side a mapped position sticks to when it falls on a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionAffinity {
	Predecessor,
	Successor,
}

/// One host-managed visual marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualMarker {
	/// Human-readable marker type name, e.g. `"Bookmark"`.
	pub name: String,
	pub span: AnchoredSpan,
}

/// One debugger breakpoint as enumerated by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
	/// Source file, or `None` when the host cannot resolve it.
	pub file: Option<PathBuf>,
	pub line: usize,
}

/// Batched marker change notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkersChanged {
	/// Top-level char ranges touched by the batch.
	pub spans: Vec<Range<usize>>,
}

/// Callback invoked once per batched marker change, on any thread.
pub type BatchCallback = Box<dyn Fn(&MarkersChanged) + Send + Sync>;

/// Visual marker aggregation for one view.
pub trait MarkerSource: Send + Sync {
	/// Returns markers overlapping `range` of the top-level document, in delivery order.
	fn query(&self, range: Range<usize>) -> Vec<VisualMarker>;

	/// Registers a batched change callback.
	fn subscribe_batched(&self, callback: BatchCallback) -> Result<SubscriptionId, HostError>;

	/// Removes a callback registered with [`Self::subscribe_batched`].
	fn unsubscribe(&self, id: SubscriptionId);
}

/// Debugger breakpoint enumeration. No change notification is available.
pub trait BreakpointSource: Send + Sync {
	fn breakpoints(&self) -> Result<Vec<Breakpoint>, HostError>;
}

/// The open text view the engine is bound to.
pub trait TextView: Send + Sync {
	/// File path of the document shown in the view, if it has one.
	fn file_path(&self) -> Option<PathBuf>;

	/// Current snapshot of the top-level document buffer.
	fn snapshot(&self) -> Rope;

	/// Maps a point onto the top-level buffer's current snapshot.
	///
	/// Returns `None` when the point does not project onto the top buffer.
	fn map_to_top(&self, point: AnchoredPoint, affinity: PositionAffinity) -> Option<usize>;
}
