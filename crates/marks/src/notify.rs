//! Change notification delivery on the consumer's execution context.
//!
//! The consumer's context is captured once. Publications that happen before
//! capture are remembered as a single deferred notification and flushed when
//! the context arrives, so listeners never run on an arbitrary thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Task posted to an [`ExecutionContext`].
pub type ContextTask = Box<dyn FnOnce() + Send>;

/// Where change notifications are delivered, e.g. a UI thread's dispatcher.
pub trait ExecutionContext: Send + Sync {
	/// Schedules `task` to run on this context.
	fn post(&self, task: ContextTask);
}

/// Runs posted tasks immediately on the posting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineContext;

impl ExecutionContext for InlineContext {
	fn post(&self, task: ContextTask) {
		task();
	}
}

/// Queues posted tasks for a consumer loop to run on its own thread.
#[derive(Clone)]
pub struct QueuedContext {
	tx: mpsc::UnboundedSender<ContextTask>,
}

/// Consumer half of a [`QueuedContext`].
pub struct QueuedTasks {
	rx: mpsc::UnboundedReceiver<ContextTask>,
}

impl QueuedContext {
	pub fn new() -> (Self, QueuedTasks) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { tx }, QueuedTasks { rx })
	}
}

impl ExecutionContext for QueuedContext {
	fn post(&self, task: ContextTask) {
		if self.tx.send(task).is_err() {
			tracing::debug!("marks.notify.context_closed");
		}
	}
}

impl QueuedTasks {
	/// Runs every task queued so far without waiting. Returns the number run.
	pub fn run_pending(&mut self) -> usize {
		let mut ran = 0usize;
		while let Ok(task) = self.rx.try_recv() {
			task();
			ran = ran.wrapping_add(1);
		}
		ran
	}

	/// Waits for the next task and runs it. Returns `false` once every sender is gone.
	pub async fn run_next(&mut self) -> bool {
		match self.rx.recv().await {
			Some(task) => {
				task();
				true
			}
			None => false,
		}
	}
}

/// Identifies a registered change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn() + Send + Sync>;

enum ContextState {
	Pending { deferred: bool },
	Captured(Arc<dyn ExecutionContext>),
}

/// Fans payload-free change events out to listeners on the captured context.
pub(crate) struct ChangeNotifier {
	context: Mutex<ContextState>,
	listeners: Mutex<Vec<(ListenerId, Listener)>>,
	next_listener: AtomicU64,
	closed: Arc<AtomicBool>,
}

impl ChangeNotifier {
	pub(crate) fn new(closed: Arc<AtomicBool>) -> Self {
		Self {
			context: Mutex::new(ContextState::Pending { deferred: false }),
			listeners: Mutex::new(Vec::new()),
			next_listener: AtomicU64::new(0),
			closed,
		}
	}

	/// Captures the delivery context. Only the first capture wins.
	pub(crate) fn attach(self: &Arc<Self>, ctx: Arc<dyn ExecutionContext>) -> bool {
		let mut state = self.context.lock();
		let deferred = match &*state {
			ContextState::Captured(_) => return false,
			ContextState::Pending { deferred } => *deferred,
		};
		*state = ContextState::Captured(Arc::clone(&ctx));
		drop(state);

		if deferred {
			tracing::debug!("marks.notify.flush_deferred");
			self.post_to(&*ctx);
		}
		true
	}

	pub(crate) fn has_context(&self) -> bool {
		matches!(*self.context.lock(), ContextState::Captured(_))
	}

	/// Delivers one change event, or defers it until a context is captured.
	pub(crate) fn notify(self: &Arc<Self>) {
		let ctx = {
			let mut state = self.context.lock();
			match &mut *state {
				ContextState::Captured(ctx) => Arc::clone(ctx),
				ContextState::Pending { deferred } => {
					*deferred = true;
					tracing::debug!("marks.notify.deferred");
					return;
				}
			}
		};
		self.post_to(&*ctx);
	}

	fn post_to(self: &Arc<Self>, ctx: &dyn ExecutionContext) {
		let this = Arc::clone(self);
		ctx.post(Box::new(move || this.deliver()));
	}

	fn deliver(&self) {
		if self.closed.load(Ordering::Acquire) {
			return;
		}
		let listeners: Vec<Listener> = self.listeners.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
		for listener in listeners {
			listener();
		}
	}

	pub(crate) fn subscribe(&self, listener: Listener) -> ListenerId {
		let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
		self.listeners.lock().push((id, listener));
		id
	}

	pub(crate) fn unsubscribe(&self, id: ListenerId) -> bool {
		let mut listeners = self.listeners.lock();
		let before = listeners.len();
		listeners.retain(|(lid, _)| *lid != id);
		listeners.len() != before
	}

	pub(crate) fn clear(&self) {
		self.listeners.lock().clear();
	}
}
