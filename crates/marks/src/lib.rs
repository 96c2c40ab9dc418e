//! Gutter mark reconciliation for one open document view.
//!
//! Two independently-timed sources feed the gutter: editor visual markers
//! (bookmarks, tracepoints, breakpoint glyphs) arrive as batched push
//! notifications, while debugger breakpoints have no change notification and
//! are discovered by polling. [`MarkEngine`] funnels both into a single
//! serialized reconciliation that publishes an ordered [`Mark`] list and
//! notifies listeners on the consumer's [`ExecutionContext`] whenever the list
//! changes.
//!
//! # Ordering
//!
//! Published lists hold breakpoints first (ascending line), followed by the
//! remaining markers in the order the host's marker source delivered them.
//! Lists are not sorted by line.

mod breakpoints;
mod classify;
mod config;
mod engine;
mod error;
mod host;
mod mark;
mod notify;
mod poller;
mod position;
mod reconcile;
mod runtime;
mod watcher;

pub use breakpoints::{BreakpointSnapshot, BreakpointSnapshotter};
pub use classify::classify;
pub use config::{DEFAULT_POLL_INTERVAL, LineBase, MarkEngineConfig};
pub use engine::{HostServices, MarkEngine};
pub use error::{ConfigError, EngineError, HostError, Result};
pub use host::{
	AnchoredPoint, AnchoredSpan, BatchCallback, Breakpoint, BreakpointSource, BufferId, MarkerSource, MarkersChanged, PositionAffinity, SubscriptionId,
	TextView, VisualMarker,
};
pub use mark::{Mark, MarkKind, MarkList};
pub use notify::{ContextTask, ExecutionContext, InlineContext, ListenerId, QueuedContext, QueuedTasks};
pub use poller::PollerState;
pub use position::resolve_line;

