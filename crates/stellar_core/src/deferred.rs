//! DeferredTask - cancellable background work on rayon's pool.
//!
//! Used for lookup-table generation and other results the frame loop can
//! pick up later. The frame loop never blocks on a task: it polls once per
//! frame and carries on when the result is not ready.
//!
//! # Usage
//!
//! ```ignore
//! let mut task = DeferredTask::spawn(move || lookup_table(mode, midplane, max, 1024));
//!
//! // Each frame
//! if let Some(table) = task.poll() {
//!     renderer.upload_depth_table(&table);
//! }
//!
//! // Observer jumped: the old table is useless
//! task.cancel();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{self as channel, Receiver, TryRecvError};

/// Handle to a value computed on rayon's thread pool.
#[derive(Debug)]
pub struct DeferredTask<T> {
	/// Receiver for the pending result. `None` once delivered or cancelled.
	receiver: Option<Receiver<T>>,
	cancelled: Arc<AtomicBool>,
}

impl<T: Send + 'static> DeferredTask<T> {
	/// Start `work` on rayon's pool (non-blocking).
	pub fn spawn<F>(work: F) -> Self
	where
		F: FnOnce() -> T + Send + 'static,
	{
		let (sender, receiver) = channel::bounded(1);
		let cancelled = Arc::new(AtomicBool::new(false));
		let flag = Arc::clone(&cancelled);

		rayon::spawn(move || {
			if flag.load(Ordering::Acquire) {
				return;
			}
			let result = work();
			if flag.load(Ordering::Acquire) {
				return;
			}
			// Receiver dropped = cancelled
			let _ = sender.send(result);
		});

		Self {
			receiver: Some(receiver),
			cancelled,
		}
	}
}

impl<T> DeferredTask<T> {
	/// Whether a result is still expected.
	pub fn is_pending(&self) -> bool {
		self.receiver.is_some()
	}

	/// Poll for the result (non-blocking).
	///
	/// Returns `Some(result)` exactly once, `None` while running or after
	/// delivery or cancellation.
	pub fn poll(&mut self) -> Option<T> {
		let receiver = self.receiver.as_ref()?;
		match receiver.try_recv() {
			Ok(result) => {
				self.receiver = None;
				Some(result)
			}
			Err(TryRecvError::Empty) => None,
			Err(TryRecvError::Disconnected) => {
				self.receiver = None;
				None
			}
		}
	}

	/// Block until the result arrives. `None` if the task was cancelled or
	/// its worker panicked.
	pub fn wait(mut self) -> Option<T> {
		let receiver = self.receiver.take()?;
		receiver.recv().ok()
	}

	/// Drop the pending result. The worker may still run to completion but
	/// its result is discarded.
	pub fn cancel(&mut self) {
		self.cancelled.store(true, Ordering::Release);
		if self.receiver.take().is_some() {
			tracing::trace!("deferred task cancelled");
		}
	}
}
