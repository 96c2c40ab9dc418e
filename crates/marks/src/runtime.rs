use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};

use crate::error::EngineError;

static SHARED_RT: OnceLock<Runtime> = OnceLock::new();

/// Returns the current tokio runtime, or a small shared runtime for hosts
/// that call in from plain threads.
pub(crate) fn runtime_handle() -> Result<Handle, EngineError> {
	if let Ok(handle) = Handle::try_current() {
		return Ok(handle);
	}
	if let Some(runtime) = SHARED_RT.get() {
		return Ok(runtime.handle().clone());
	}

	let runtime = Builder::new_multi_thread()
		.enable_time()
		.worker_threads(1)
		.thread_name("margin-marks-poller")
		.build()
		.map_err(EngineError::Runtime)?;
	// A racing caller may have won; its runtime is kept and ours dropped.
	Ok(SHARED_RT.get_or_init(|| runtime).handle().clone())
}
