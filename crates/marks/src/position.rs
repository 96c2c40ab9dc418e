use ropey::Rope;

use crate::host::{AnchoredSpan, PositionAffinity, TextView};

/// Resolves a marker span to a zero-based line of `snapshot`.
///
/// The span start is mapped onto the top-level buffer with successor affinity,
/// so a marker anchored exactly at a line boundary lands on the following
/// line. Returns `None` when the anchor does not project onto the top buffer
/// or maps outside the snapshot; callers skip such markers.
pub fn resolve_line(view: &dyn TextView, snapshot: &Rope, span: &AnchoredSpan) -> Option<usize> {
	let offset = view.map_to_top(span.start_point(), PositionAffinity::Successor)?;
	if offset > snapshot.len_chars() {
		tracing::trace!(offset, len = snapshot.len_chars(), "marks.resolve.out_of_range");
		return None;
	}
	Some(snapshot.char_to_line(offset))
}
