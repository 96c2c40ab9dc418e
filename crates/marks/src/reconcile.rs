//! Serialized mark list reconciliation.
//!
//! Every trigger (marker batch, breakpoint change, explicit request) funnels
//! into [`Reconciler::request`]. Only one reconciliation runs at a time;
//! requests arriving meanwhile collapse into a single rerun that starts after
//! the current one finishes, so the final request is never lost.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::breakpoints::BreakpointSnapshot;
use crate::classify::classify;
use crate::host::{MarkerSource, TextView};
use crate::mark::{Mark, MarkKind, MarkList};
use crate::notify::ChangeNotifier;
use crate::position::resolve_line;

#[derive(Debug, Default)]
struct Gate {
	running: bool,
	rerun: bool,
}

/// Reopens the gate if a host callback panics mid-run.
struct RunGuard<'a> {
	gate: &'a Mutex<Gate>,
	finished: bool,
}

impl Drop for RunGuard<'_> {
	fn drop(&mut self) {
		if self.finished {
			return;
		}
		let mut gate = self.gate.lock();
		gate.running = false;
		gate.rerun = false;
	}
}

pub(crate) struct Reconciler {
	markers: Arc<dyn MarkerSource>,
	view: Arc<dyn TextView>,
	gate: Mutex<Gate>,
	breakpoints: Mutex<BreakpointSnapshot>,
	published: ArcSwap<Vec<Mark>>,
	generation: AtomicU64,
	runs: AtomicU64,
	notifier: Arc<ChangeNotifier>,
	closed: Arc<AtomicBool>,
}

impl Reconciler {
	pub(crate) fn new(markers: Arc<dyn MarkerSource>, view: Arc<dyn TextView>, notifier: Arc<ChangeNotifier>, closed: Arc<AtomicBool>) -> Self {
		Self {
			markers,
			view,
			gate: Mutex::new(Gate::default()),
			breakpoints: Mutex::new(BreakpointSnapshot::empty()),
			published: ArcSwap::from_pointee(Vec::new()),
			generation: AtomicU64::new(0),
			runs: AtomicU64::new(0),
			notifier,
			closed,
		}
	}

	/// Replaces the breakpoint snapshot used by subsequent runs. Ignored once closed.
	pub(crate) fn set_breakpoints(&self, snapshot: BreakpointSnapshot) {
		let _gate = self.gate.lock();
		if self.closed.load(Ordering::Acquire) {
			return;
		}
		*self.breakpoints.lock() = snapshot;
	}

	/// Marks the reconciler closed. Once this returns no run publishes and no
	/// snapshot is replaced.
	pub(crate) fn close(&self) {
		let _gate = self.gate.lock();
		self.closed.store(true, Ordering::Release);
	}

	/// Last published list.
	pub(crate) fn marks(&self) -> MarkList {
		self.published.load_full()
	}

	/// Number of publications that changed the list.
	pub(crate) fn generation(&self) -> u64 {
		self.generation.load(Ordering::Acquire)
	}

	/// Number of reconciliation runs executed.
	pub(crate) fn runs(&self) -> u64 {
		self.runs.load(Ordering::Acquire)
	}

	/// Requests a reconciliation, running it on the calling thread unless one
	/// is already in progress elsewhere.
	pub(crate) fn request(&self) {
		if self.closed.load(Ordering::Acquire) {
			return;
		}
		{
			let mut gate = self.gate.lock();
			if gate.running {
				gate.rerun = true;
				tracing::trace!("marks.reconcile.coalesced");
				return;
			}
			gate.running = true;
		}

		let mut guard = RunGuard {
			gate: &self.gate,
			finished: false,
		};
		loop {
			self.run_once();
			// Release under the same lock that records reruns so none slip between.
			let mut gate = self.gate.lock();
			if gate.rerun && !self.closed.load(Ordering::Acquire) {
				gate.rerun = false;
				continue;
			}
			gate.running = false;
			gate.rerun = false;
			break;
		}
		guard.finished = true;
	}

	fn run_once(&self) {
		self.runs.fetch_add(1, Ordering::AcqRel);
		let next = self.collect();

		if **self.published.load() == next {
			return;
		}

		let len = next.len();
		let generation = {
			// Close takes the gate too, so teardown cannot land between check and store.
			let _gate = self.gate.lock();
			if self.closed.load(Ordering::Acquire) {
				return;
			}
			self.published.store(Arc::new(next));
			self.generation.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
		};
		tracing::debug!(marks = len, generation, "marks.reconcile.published");
		self.notifier.notify();
	}

	/// Breakpoints first, then classified markers in delivery order.
	fn collect(&self) -> Vec<Mark> {
		let breakpoints = self.breakpoints.lock().clone();
		let mut marks: Vec<Mark> = breakpoints.lines().map(|line| Mark::new(line, MarkKind::Breakpoint)).collect();

		let snapshot = self.view.snapshot();
		let mut skipped = 0usize;
		for marker in self.markers.query(0..snapshot.len_chars()) {
			let kind = classify(&marker.name);
			if !kind.is_known() {
				skipped = skipped.wrapping_add(1);
				continue;
			}
			let Some(line) = resolve_line(&*self.view, &snapshot, &marker.span) else {
				skipped = skipped.wrapping_add(1);
				continue;
			};
			marks.push(Mark::new(line, kind));
		}
		if skipped > 0 {
			tracing::trace!(skipped, "marks.reconcile.skipped");
		}
		marks
	}
}
