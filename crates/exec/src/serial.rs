use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, mpsc};
use std::thread::ThreadId;

use crate::context::{ExecutionContext, Job};
use crate::spawn::spawn_named_thread;

struct Envelope {
	job: Job,
	span: tracing::Span,
}

struct SerialInner {
	name: String,
	tx: mpsc::Sender<Envelope>,
	thread: ThreadId,
}

/// Execution context backed by one dedicated OS thread.
///
/// Jobs run one at a time in submission order. The submitter's tracing span
/// is entered around each job so logs nest under the caller. A panicking job
/// is logged and the thread moves on to the next one. The thread exits once
/// every clone of the executor has been dropped and the queue is empty.
#[derive(Clone)]
pub struct SerialExecutor {
	inner: Arc<SerialInner>,
}

impl std::fmt::Debug for SerialExecutor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SerialExecutor").field("name", &self.inner.name).finish_non_exhaustive()
	}
}

impl SerialExecutor {
	/// Spawns the executor thread under `name`.
	pub fn new(name: impl Into<String>) -> std::io::Result<Self> {
		let name = name.into();
		let (tx, rx) = mpsc::channel::<Envelope>();
		let label = name.clone();
		let handle = spawn_named_thread(name.clone(), move || {
			while let Ok(Envelope { job, span }) = rx.recv() {
				let _guard = span.enter();
				if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(job)) {
					tracing::error!(executor = %label, panic = panic_message(payload.as_ref()), "exec.serial.job_panicked");
				}
			}
			tracing::trace!(executor = %label, "exec.serial.exit");
		})?;
		let thread = handle.thread().id();

		Ok(Self {
			inner: Arc::new(SerialInner { name, tx, thread }),
		})
	}

	/// Thread name given at construction.
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	/// Returns `true` when called from this executor's thread.
	pub fn is_current(&self) -> bool {
		std::thread::current().id() == self.inner.thread
	}
}

impl ExecutionContext for SerialExecutor {
	fn execute(&self, job: Job) {
		let envelope = Envelope {
			job,
			span: tracing::Span::current(),
		};
		if self.inner.tx.send(envelope).is_err() {
			tracing::warn!(executor = %self.inner.name, "exec.serial.closed, dropping job");
		}
	}
}

/// Best-effort text of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		msg
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg.as_str()
	} else {
		"<non-string panic payload>"
	}
}
