//! Self-rescheduling breakpoint poller.
//!
//! The debugger exposes no change notification, so breakpoints are read on a
//! one-shot timer that is re-armed only after the previous read finishes. At
//! most one poll is ever in flight, and a slow poll simply delays the next one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::breakpoints::{BreakpointSnapshot, BreakpointSnapshotter};

/// Lifecycle state of the breakpoint poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
	/// Waiting for the idle delay to elapse.
	Idle,
	/// Reading and diffing the breakpoint collection.
	Polling,
	/// Torn down. Terminal.
	Stopped,
}

impl PollerState {
	const fn to_u8(self) -> u8 {
		match self {
			Self::Idle => 0,
			Self::Polling => 1,
			Self::Stopped => 2,
		}
	}

	const fn from_u8(raw: u8) -> Self {
		match raw {
			0 => Self::Idle,
			1 => Self::Polling,
			_ => Self::Stopped,
		}
	}
}

#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
	fn new(state: PollerState) -> Self {
		Self(AtomicU8::new(state.to_u8()))
	}

	fn load(&self) -> PollerState {
		PollerState::from_u8(self.0.load(Ordering::Acquire))
	}

	/// Moves `from -> to`; fails if another transition (only ever `Stopped`) won.
	fn transition(&self, from: PollerState, to: PollerState) -> bool {
		self.0
			.compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
			.is_ok()
	}

	fn stop(&self) -> PollerState {
		PollerState::from_u8(self.0.swap(PollerState::Stopped.to_u8(), Ordering::AcqRel))
	}
}

/// Invoked with the new snapshot whenever a poll observes a changed set.
pub(crate) type SnapshotChanged = Arc<dyn Fn(BreakpointSnapshot) + Send + Sync>;

pub(crate) struct BreakpointPoller {
	state: Arc<StateCell>,
	cancel: CancellationToken,
	task: Mutex<Option<JoinHandle<()>>>,
}

impl BreakpointPoller {
	/// Arms the first poll cycle on `handle`, diffing against `initial`.
	pub(crate) fn start(handle: &Handle, snapshotter: BreakpointSnapshotter, initial: BreakpointSnapshot, interval: Duration, on_change: SnapshotChanged) -> Self {
		let state = Arc::new(StateCell::new(PollerState::Idle));
		let cancel = CancellationToken::new();
		let task = handle.spawn(poll_loop(PollLoop {
			snapshotter,
			previous: initial,
			interval,
			on_change,
			state: Arc::clone(&state),
			cancel: cancel.clone(),
		}));

		Self {
			state,
			cancel,
			task: Mutex::new(Some(task)),
		}
	}

	pub(crate) fn state(&self) -> PollerState {
		self.state.load()
	}

	/// Cancels the pending reschedule. Idempotent.
	pub(crate) fn stop(&self) {
		let prev = self.state.stop();
		self.cancel.cancel();
		if let Some(task) = self.task.lock().take() {
			task.abort();
		}
		if prev != PollerState::Stopped {
			tracing::debug!(prev = ?prev, "marks.poll.stopped");
		}
	}
}

impl Drop for BreakpointPoller {
	fn drop(&mut self) {
		self.stop();
	}
}

struct PollLoop {
	snapshotter: BreakpointSnapshotter,
	previous: BreakpointSnapshot,
	interval: Duration,
	on_change: SnapshotChanged,
	state: Arc<StateCell>,
	cancel: CancellationToken,
}

async fn poll_loop(mut ctx: PollLoop) {
	loop {
		tokio::select! {
			biased;
			_ = ctx.cancel.cancelled() => break,
			_ = tokio::time::sleep(ctx.interval) => {}
		}

		if !ctx.state.transition(PollerState::Idle, PollerState::Polling) {
			break;
		}
		ctx.poll_once();
		if !ctx.state.transition(PollerState::Polling, PollerState::Idle) {
			break;
		}
	}
}

impl PollLoop {
	fn poll_once(&mut self) {
		let current = match self.snapshotter.take() {
			Ok(snapshot) => snapshot,
			Err(err) => {
				// Treated as "no change"; the next cycle retries.
				tracing::debug!(error = %err, "marks.poll.read_failed");
				return;
			}
		};
		if current == self.previous {
			return;
		}

		tracing::debug!(before = self.previous.len(), after = current.len(), "marks.poll.changed");
		self.previous = current.clone();
		if self.cancel.is_cancelled() {
			return;
		}
		(self.on_change)(current);
	}
}

#[cfg(test)]
mod tests {
	use std::collections::VecDeque;
	use std::path::PathBuf;
	use std::sync::atomic::AtomicUsize;

	use super::*;
	use crate::config::LineBase;
	use crate::error::HostError;
	use crate::host::{Breakpoint, BreakpointSource};

	const INTERVAL: Duration = Duration::from_millis(500);

	/// Replays scripted reads; the last entry repeats forever.
	struct ScriptedBreakpoints {
		script: Mutex<VecDeque<Result<Vec<usize>, HostError>>>,
		reads: AtomicUsize,
	}

	impl ScriptedBreakpoints {
		fn new(script: Vec<Result<Vec<usize>, HostError>>) -> Arc<Self> {
			Arc::new(Self {
				script: Mutex::new(script.into()),
				reads: AtomicUsize::new(0),
			})
		}
	}

	impl BreakpointSource for ScriptedBreakpoints {
		fn breakpoints(&self) -> Result<Vec<Breakpoint>, HostError> {
			self.reads.fetch_add(1, Ordering::SeqCst);
			let mut script = self.script.lock();
			let next = if script.len() > 1 { script.pop_front() } else { script.front().cloned() };
			next.unwrap_or_else(|| Ok(Vec::new())).map(|lines| {
				lines
					.into_iter()
					.map(|line| Breakpoint {
						file: Some(PathBuf::from("/doc.rs")),
						line,
					})
					.collect()
			})
		}
	}

	fn start(source: &Arc<ScriptedBreakpoints>) -> (BreakpointPoller, Arc<Mutex<Vec<Vec<usize>>>>) {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&seen);
		let snapshotter = BreakpointSnapshotter::new(
			Arc::clone(source) as Arc<dyn BreakpointSource>,
			Some(PathBuf::from("/doc.rs")),
			LineBase::Zero,
		);
		let poller = BreakpointPoller::start(
			&Handle::current(),
			snapshotter,
			BreakpointSnapshot::empty(),
			INTERVAL,
			Arc::new(move |snap: BreakpointSnapshot| sink.lock().push(snap.lines().collect())),
		);
		(poller, seen)
	}

	async fn tick() {
		tokio::time::advance(INTERVAL).await;
		tokio::task::yield_now().await;
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn emits_only_on_change() {
		let source = ScriptedBreakpoints::new(vec![Ok(vec![10]), Ok(vec![10]), Ok(vec![10, 4]), Ok(vec![4, 10])]);
		let (poller, seen) = start(&source);
		tokio::task::yield_now().await;

		for _ in 0..5 {
			tick().await;
		}

		assert_eq!(*seen.lock(), vec![vec![10], vec![4, 10]]);
		assert!(source.reads.load(Ordering::SeqCst) >= 4);
		poller.stop();
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn read_failure_keeps_polling() {
		let source = ScriptedBreakpoints::new(vec![Err(HostError::Read("busy".into())), Err(HostError::Read("busy".into())), Ok(vec![3])]);
		let (poller, seen) = start(&source);
		tokio::task::yield_now().await;

		for _ in 0..4 {
			tick().await;
		}

		assert_eq!(*seen.lock(), vec![vec![3]]);
		assert_eq!(poller.state(), PollerState::Idle);
		poller.stop();
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn stop_cancels_pending_reschedule() {
		let source = ScriptedBreakpoints::new(vec![Ok(vec![1])]);
		let (poller, seen) = start(&source);
		tokio::task::yield_now().await;

		poller.stop();
		poller.stop();
		assert_eq!(poller.state(), PollerState::Stopped);

		for _ in 0..3 {
			tick().await;
		}
		assert_eq!(source.reads.load(Ordering::SeqCst), 0);
		assert!(seen.lock().is_empty());
	}
}
