//! Execution contexts for work dispatched off the calling thread.
//!
//! An [`ExecutionContext`] accepts boxed jobs and runs them somewhere other
//! than the submitting thread. Two contexts ship with the crate:
//!
//! * [`SerialExecutor`]: one named OS thread running jobs in submission order.
//! * [`tokio::runtime::Handle`]: jobs run on the runtime's blocking pool.
//!
//! [`runtime_handle`] resolves the ambient tokio runtime, falling back to a
//! shared process-wide runtime when called outside of one.

mod context;
mod serial;
mod spawn;

pub use context::{ExecutionContext, Job};
pub use serial::{SerialExecutor, panic_message};
pub use spawn::{runtime_handle, spawn_named_thread};
