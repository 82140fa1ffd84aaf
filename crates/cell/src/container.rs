use std::sync::{Arc, Weak};

use warden_exec::ExecutionContext;

use crate::command::PriorityTag;
use crate::queue::CommandQueue;
use crate::scheduler::{AsyncScheduler, SyncScheduler};
use crate::spec::ContainerSpec;

/// Protected value plus the queue that serializes access to it.
///
/// The value lives inside the queue's execution lock, so the only way to
/// reach it is a mutator run through [`Container::append_and_perform`] or
/// [`Container::perform_now`].
pub(crate) struct Container<V> {
	queue: CommandQueue<V>,
}

impl<V: Send + 'static> Container<V> {
	fn new(value: V, spec: ContainerSpec) -> Self {
		Self {
			queue: CommandQueue::with_spec(value, spec),
		}
	}

	pub(crate) fn label(&self) -> &str {
		self.queue.label()
	}

	/// Queues `mutator` with `tag`, then drains the queue.
	pub(crate) fn append_and_perform(&self, tag: PriorityTag, mutator: impl FnOnce(&mut V) + Send + 'static) {
		self.queue.append(tag, mutator);
		self.queue.perform();
	}

	/// Runs `mutator` now, still serialized against queued commands.
	pub(crate) fn perform_now<R>(&self, mutator: impl FnOnce(&mut V) -> R) -> R {
		self.queue.perform_now(mutator)
	}
}

/// Owning handle to a serialized value.
///
/// Schedulers obtained from [`sync`](Self::sync) and [`async_on`](Self::async_on)
/// only hold a weak reference. Dropping this handle makes every later
/// operation through them fail with
/// [`ContainerError::ContainerGone`](crate::ContainerError::ContainerGone);
/// operations already running finish first.
pub struct ValueContainer<V> {
	inner: Arc<Container<V>>,
}

impl<V> std::fmt::Debug for ValueContainer<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ValueContainer").field("queue", &self.inner.queue).finish()
	}
}

impl<V: Send + 'static> ValueContainer<V> {
	/// Wraps `value` with default options.
	pub fn new(value: V) -> Self {
		Self::with_spec(value, ContainerSpec::default())
	}

	/// Wraps `value` using `spec`.
	pub fn with_spec(value: V, spec: ContainerSpec) -> Self {
		Self {
			inner: Arc::new(Container::new(value, spec)),
		}
	}

	/// Blocking operations.
	pub fn sync(&self) -> SyncScheduler<V> {
		SyncScheduler::new(self.downgrade())
	}

	/// Non-blocking operations whose work and completions run on `context`.
	pub fn async_on(&self, context: impl ExecutionContext) -> AsyncScheduler<V> {
		AsyncScheduler::new(self.downgrade(), Arc::new(context))
	}

	/// Non-blocking operations on the ambient (or shared fallback) tokio runtime.
	pub fn background(&self) -> AsyncScheduler<V> {
		self.async_on(warden_exec::runtime_handle())
	}

	/// Name used in trace events.
	pub fn label(&self) -> &str {
		self.inner.label()
	}

	/// Number of queued commands not yet drained.
	pub fn pending(&self) -> usize {
		self.inner.queue.pending()
	}

	/// Takes the value back out.
	///
	/// Fails, returning the handle, while an admitted operation still holds
	/// the container.
	pub fn into_inner(self) -> Result<V, Self> {
		match Arc::try_unwrap(self.inner) {
			Ok(container) => Ok(container.queue.into_state()),
			Err(inner) => Err(Self { inner }),
		}
	}

	fn downgrade(&self) -> Weak<Container<V>> {
		Arc::downgrade(&self.inner)
	}
}

impl<T: Send + Sync + 'static> ValueContainer<Arc<T>> {
	/// Strong reference count of the protected `Arc`, read under the
	/// execution lock.
	pub fn value_strong_count(&self) -> usize {
		self.inner.perform_now(|value| Arc::strong_count(value))
	}
}
