//! In-memory host for engine integration tests.

#![allow(dead_code)]

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, mpsc};
use std::time::Duration;

use margin_marks::{
	AnchoredPoint, AnchoredSpan, BatchCallback, Breakpoint, BreakpointSource, BufferId, HostError, HostServices, MarkEngine, MarkEngineConfig,
	MarkerSource, MarkersChanged, PositionAffinity, SubscriptionId, TextView, VisualMarker,
};
use parking_lot::Mutex;
use ropey::Rope;

pub const DOC: &str = "/work/src/main.rs";
pub const TOP: BufferId = BufferId(0);
/// A projection layer that never maps onto the top buffer.
pub const DETACHED: BufferId = BufferId(99);
pub const INTERVAL: Duration = Duration::from_millis(500);

pub struct FakeHost {
	path: Option<PathBuf>,
	text: Rope,
	markers: Mutex<Vec<VisualMarker>>,
	breakpoints: Mutex<Result<Vec<Breakpoint>, HostError>>,
	callback: Mutex<Option<BatchCallback>>,
	fail_subscribe: AtomicBool,
	/// When set, the next `query` parks until released.
	hold: Mutex<Option<(Arc<Barrier>, mpsc::Receiver<()>)>>,
	in_flight: AtomicUsize,
	pub max_in_flight: AtomicUsize,
	pub breakpoint_reads: AtomicUsize,
	pub unsubscribes: AtomicUsize,
}

impl FakeHost {
	/// A view on [`DOC`] with `lines` lines of text.
	pub fn new(lines: usize) -> Arc<Self> {
		Self::with_path(Some(Path::new(DOC)), lines)
	}

	pub fn with_path(path: Option<&Path>, lines: usize) -> Arc<Self> {
		let _ = tracing_subscriber::fmt::try_init();
		Arc::new(Self {
			path: path.map(Path::to_path_buf),
			text: Rope::from_str(&"fn line() {}\n".repeat(lines)),
			markers: Mutex::new(Vec::new()),
			breakpoints: Mutex::new(Ok(Vec::new())),
			callback: Mutex::new(None),
			fail_subscribe: AtomicBool::new(false),
			hold: Mutex::new(None),
			in_flight: AtomicUsize::new(0),
			max_in_flight: AtomicUsize::new(0),
			breakpoint_reads: AtomicUsize::new(0),
			unsubscribes: AtomicUsize::new(0),
		})
	}

	pub fn services(self: &Arc<Self>) -> HostServices {
		HostServices {
			markers: Arc::clone(self) as Arc<dyn MarkerSource>,
			breakpoints: Arc::clone(self) as Arc<dyn BreakpointSource>,
			view: Arc::clone(self) as Arc<dyn TextView>,
		}
	}

	pub fn open(self: &Arc<Self>) -> MarkEngine {
		MarkEngine::open(self.services(), MarkEngineConfig::default().with_poll_interval(INTERVAL)).expect("engine opens")
	}

	pub fn fail_subscribe(&self) {
		self.fail_subscribe.store(true, Ordering::SeqCst);
	}

	/// Marker anchored at the start of `line` in the top buffer.
	pub fn marker(&self, name: &str, line: usize) -> VisualMarker {
		let offset = self.text.line_to_char(line);
		VisualMarker {
			name: name.to_string(),
			span: AnchoredSpan::new(TOP, offset..offset + 2),
		}
	}

	pub fn detached_marker(&self, name: &str) -> VisualMarker {
		VisualMarker {
			name: name.to_string(),
			span: AnchoredSpan::new(DETACHED, 0..1),
		}
	}

	pub fn set_markers(&self, markers: Vec<VisualMarker>) {
		*self.markers.lock() = markers;
	}

	/// Breakpoints in [`DOC`] at the given lines.
	pub fn set_breakpoints(&self, lines: &[usize]) {
		let bps = lines
			.iter()
			.map(|&line| Breakpoint {
				file: Some(PathBuf::from(DOC)),
				line,
			})
			.collect();
		*self.breakpoints.lock() = Ok(bps);
	}

	pub fn set_raw_breakpoints(&self, bps: Vec<Breakpoint>) {
		*self.breakpoints.lock() = Ok(bps);
	}

	pub fn fail_breakpoint_reads(&self) {
		*self.breakpoints.lock() = Err(HostError::Read("debugger not responding".into()));
	}

	/// Delivers one batched change notification, as the host's aggregator would.
	pub fn fire_batch(&self, spans: Vec<Range<usize>>) {
		let batch = MarkersChanged { spans };
		if let Some(callback) = self.callback.lock().as_ref() {
			callback(&batch);
		}
	}

	pub fn is_subscribed(&self) -> bool {
		self.callback.lock().is_some()
	}

	/// Parks the next marker query. Returns the barrier it waits on once
	/// entered and the sender that lets it continue.
	pub fn hold_next_query(&self) -> (Arc<Barrier>, mpsc::Sender<()>) {
		let entered = Arc::new(Barrier::new(2));
		let (release_tx, release_rx) = mpsc::channel();
		*self.hold.lock() = Some((Arc::clone(&entered), release_rx));
		(entered, release_tx)
	}
}

impl MarkerSource for FakeHost {
	fn query(&self, range: Range<usize>) -> Vec<VisualMarker> {
		let depth = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
		self.max_in_flight.fetch_max(depth, Ordering::SeqCst);
		let hold = self.hold.lock().take();
		if let Some((entered, release)) = hold {
			entered.wait();
			let _ = release.recv_timeout(Duration::from_secs(5));
		}
		let markers = self
			.markers
			.lock()
			.iter()
			.filter(|m| m.span.buffer != TOP || (m.span.start < range.end && m.span.end > range.start))
			.cloned()
			.collect();
		self.in_flight.fetch_sub(1, Ordering::SeqCst);
		markers
	}

	fn subscribe_batched(&self, callback: BatchCallback) -> Result<SubscriptionId, HostError> {
		if self.fail_subscribe.load(Ordering::SeqCst) {
			return Err(HostError::Unavailable("tag aggregator".into()));
		}
		*self.callback.lock() = Some(callback);
		Ok(SubscriptionId(1))
	}

	fn unsubscribe(&self, _id: SubscriptionId) {
		self.unsubscribes.fetch_add(1, Ordering::SeqCst);
		// Callback stays registered, modelling a batch racing teardown.
	}
}

impl BreakpointSource for FakeHost {
	fn breakpoints(&self) -> Result<Vec<Breakpoint>, HostError> {
		self.breakpoint_reads.fetch_add(1, Ordering::SeqCst);
		self.breakpoints.lock().clone()
	}
}

impl TextView for FakeHost {
	fn file_path(&self) -> Option<PathBuf> {
		self.path.clone()
	}

	fn snapshot(&self) -> Rope {
		self.text.clone()
	}

	fn map_to_top(&self, point: AnchoredPoint, _affinity: PositionAffinity) -> Option<usize> {
		(point.buffer == TOP).then_some(point.offset)
	}
}

/// Counts change notifications delivered to one listener.
pub fn count_notifications(engine: &MarkEngine) -> Arc<AtomicUsize> {
	let count = Arc::new(AtomicUsize::new(0));
	let c = Arc::clone(&count);
	engine.subscribe(move || {
		c.fetch_add(1, Ordering::SeqCst);
	});
	count
}

/// Lets one poll interval elapse and the poller run.
pub async fn tick() {
	tokio::time::advance(INTERVAL).await;
	tokio::task::yield_now().await;
}
