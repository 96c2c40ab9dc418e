use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::HostError;
use crate::host::{MarkerSource, MarkersChanged, SubscriptionId};

/// Forwards batched marker changes as recompute requests.
pub(crate) struct TagWatcher {
	source: Arc<dyn MarkerSource>,
	subscription: Mutex<Option<SubscriptionId>>,
	torn_down: Arc<AtomicBool>,
}

impl TagWatcher {
	/// Subscribes once to `source`; `on_batch` runs once per batch until teardown.
	pub(crate) fn subscribe(source: Arc<dyn MarkerSource>, on_batch: Arc<dyn Fn() + Send + Sync>) -> Result<Self, HostError> {
		let torn_down = Arc::new(AtomicBool::new(false));
		let guard = Arc::clone(&torn_down);
		let id = source.subscribe_batched(Box::new(move |batch: &MarkersChanged| {
			if guard.load(Ordering::Acquire) {
				return;
			}
			tracing::trace!(spans = batch.spans.len(), "marks.watch.batch");
			on_batch();
		}))?;

		Ok(Self {
			source,
			subscription: Mutex::new(Some(id)),
			torn_down,
		})
	}

	/// Stops forwarding and unsubscribes. Later calls are no-ops.
	pub(crate) fn teardown(&self) {
		// Flag first so callbacks already running inside the host see it.
		self.torn_down.store(true, Ordering::Release);
		if let Some(id) = self.subscription.lock().take() {
			self.source.unsubscribe(id);
		}
	}

	pub(crate) fn is_torn_down(&self) -> bool {
		self.torn_down.load(Ordering::Acquire)
	}
}
