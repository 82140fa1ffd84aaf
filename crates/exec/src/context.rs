use std::sync::Arc;

/// Boxed unit of work handed to an [`ExecutionContext`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Somewhere to run jobs without blocking the submitter.
///
/// Implementations must not run `job` inline on the calling thread. Jobs may
/// block (they contend on container locks), so async runtimes should route
/// them to a blocking-capable pool.
pub trait ExecutionContext: Send + Sync + 'static {
	/// Schedules `job` for execution.
	fn execute(&self, job: Job);
}

impl ExecutionContext for tokio::runtime::Handle {
	fn execute(&self, job: Job) {
		tracing::trace!("exec.tokio.spawn_blocking");
		drop(self.spawn_blocking(job));
	}
}

impl<C: ExecutionContext + ?Sized> ExecutionContext for Arc<C> {
	fn execute(&self, job: Job) {
		(**self).execute(job);
	}
}
