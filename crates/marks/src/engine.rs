//! View-bound engine lifecycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::breakpoints::{BreakpointSnapshot, BreakpointSnapshotter};
use crate::config::MarkEngineConfig;
use crate::error::{EngineError, Result};
use crate::host::{BreakpointSource, MarkerSource, TextView};
use crate::mark::MarkList;
use crate::notify::{ChangeNotifier, ExecutionContext, ListenerId};
use crate::poller::{BreakpointPoller, PollerState};
use crate::reconcile::Reconciler;
use crate::runtime::runtime_handle;
use crate::watcher::TagWatcher;

/// Host collaborators for one view.
#[derive(Clone)]
pub struct HostServices {
	pub markers: Arc<dyn MarkerSource>,
	pub breakpoints: Arc<dyn BreakpointSource>,
	pub view: Arc<dyn TextView>,
}

/// Reconciles gutter marks for one open view.
///
/// Created when the view opens and closed exactly once when it closes, either
/// through [`Self::close`] or on drop. The bound file path is fixed at open.
pub struct MarkEngine {
	file: Option<PathBuf>,
	reconciler: Arc<Reconciler>,
	notifier: Arc<ChangeNotifier>,
	watcher: Mutex<Option<TagWatcher>>,
	poller: Mutex<Option<BreakpointPoller>>,
	closing: AtomicBool,
	closed: Arc<AtomicBool>,
}

impl MarkEngine {
	/// Binds an engine to a newly opened view.
	///
	/// Subscribes to marker changes, seeds the breakpoint snapshot, runs one
	/// reconciliation and arms the first poll. On error nothing stays running.
	pub fn open(host: HostServices, config: MarkEngineConfig) -> Result<Self> {
		config.validate()?;
		let HostServices { markers, breakpoints, view } = host;
		let handle = runtime_handle()?;

		let file = view.file_path();
		let closed = Arc::new(AtomicBool::new(false));
		let notifier = Arc::new(ChangeNotifier::new(Arc::clone(&closed)));
		let reconciler = Arc::new(Reconciler::new(Arc::clone(&markers), Arc::clone(&view), Arc::clone(&notifier), Arc::clone(&closed)));

		let on_batch = {
			let reconciler = Arc::clone(&reconciler);
			Arc::new(move || reconciler.request())
		};
		let watcher = TagWatcher::subscribe(markers, on_batch).map_err(EngineError::Subscribe)?;

		let snapshotter = BreakpointSnapshotter::new(breakpoints, file.clone(), config.breakpoint_line_base);
		let initial = snapshotter.take().unwrap_or_else(|err| {
			tracing::debug!(error = %err, "marks.poll.read_failed");
			BreakpointSnapshot::empty()
		});
		reconciler.set_breakpoints(initial.clone());
		reconciler.request();

		let on_change = {
			let reconciler = Arc::clone(&reconciler);
			Arc::new(move |snapshot: BreakpointSnapshot| {
				reconciler.set_breakpoints(snapshot);
				reconciler.request();
			})
		};
		let poller = BreakpointPoller::start(&handle, snapshotter, initial, config.poll_interval(), on_change);

		tracing::debug!(
			file = ?file,
			poll_ms = config.poll_interval_ms,
			marks = reconciler.marks().len(),
			"marks.engine.open"
		);

		Ok(Self {
			file,
			reconciler,
			notifier,
			watcher: Mutex::new(Some(watcher)),
			poller: Mutex::new(Some(poller)),
			closing: AtomicBool::new(false),
			closed,
		})
	}

	/// File path the engine filters breakpoints by.
	pub fn file_path(&self) -> Option<&Path> {
		self.file.as_deref()
	}

	/// Last published mark list.
	pub fn marks(&self) -> MarkList {
		self.reconciler.marks()
	}

	/// Number of publications that changed the mark list.
	pub fn generation(&self) -> u64 {
		self.reconciler.generation()
	}

	/// Number of reconciliation runs executed, including ones that changed nothing.
	pub fn reconcile_runs(&self) -> u64 {
		self.reconciler.runs()
	}

	/// Captures the context change notifications are delivered on.
	///
	/// A change published before capture is delivered once, right after it.
	/// Returns `false` if a context was already captured; the first one stays.
	pub fn attach_context(&self, ctx: Arc<dyn ExecutionContext>) -> bool {
		self.notifier.attach(ctx)
	}

	pub fn has_context(&self) -> bool {
		self.notifier.has_context()
	}

	/// Registers a payload-free change listener. Listeners re-read [`Self::marks`].
	pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
		self.notifier.subscribe(Arc::new(listener))
	}

	pub fn unsubscribe(&self, id: ListenerId) -> bool {
		self.notifier.unsubscribe(id)
	}

	/// Forces a reconciliation. Ignored once closed.
	pub fn request_recompute(&self) {
		self.reconciler.request();
	}

	pub fn poller_state(&self) -> PollerState {
		self.poller.lock().as_ref().map_or(PollerState::Stopped, BreakpointPoller::state)
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::Acquire)
	}

	/// Tears the engine down: stops the poller, unsubscribes the watcher, then
	/// marks the engine closed. Later calls are no-ops.
	pub fn close(&self) {
		if self.closing.swap(true, Ordering::AcqRel) {
			return;
		}
		if let Some(poller) = self.poller.lock().take() {
			poller.stop();
		}
		if let Some(watcher) = self.watcher.lock().take() {
			watcher.teardown();
		}
		self.reconciler.close();
		self.notifier.clear();
		tracing::debug!(file = ?self.file, "marks.engine.close");
	}
}

impl Drop for MarkEngine {
	fn drop(&mut self) {
		self.close();
	}
}
