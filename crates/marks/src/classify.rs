use crate::mark::MarkKind;

const PREFIXES: [(&str, MarkKind); 3] = [
	("Breakpoint", MarkKind::Breakpoint),
	("Tracepoint", MarkKind::Tracepoint),
	("Bookmark", MarkKind::Bookmark),
];

/// Classifies a visual marker by the prefix of its display name.
///
/// Matching is case-sensitive. Empty or unrecognized names yield
/// [`MarkKind::Unknown`].
pub fn classify(name: &str) -> MarkKind {
	PREFIXES
		.iter()
		.find(|(prefix, _)| name.starts_with(prefix))
		.map_or(MarkKind::Unknown, |&(_, kind)| kind)
}
