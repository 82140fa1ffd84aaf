//! Read, write, update and transform operations over a weakly held container.
//!
//! Every operation funnels into [`execute`], parameterized by a [`Tier`]:
//!
//! | Tier | Path |
//! |---|---|
//! | [`Tier::Immediate`] | runs under the execution lock, skipping the heap |
//! | [`Tier::Highest`], [`Tier::Lowest`] | appended with that tag, then the queue is drained |
//!
//! [`SyncActions`] call it on the caller's thread and block until the
//! mutator has run. [`AsyncActions`] hand the same call to an
//! [`ExecutionContext`] and report through a completion that runs on that
//! context.

use std::sync::{Arc, Weak, mpsc};

use warden_exec::ExecutionContext;

use crate::command::PriorityTag;
use crate::container::Container;
use crate::error::{ContainerError, Result};

/// Where an operation lands relative to already pending work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
	/// Run as soon as the execution lock is free, ahead of the queue.
	Immediate,
	/// Queue ahead of everything pending.
	Highest,
	/// Queue behind everything pending.
	Lowest,
}

impl Tier {
	fn tag(self) -> Option<PriorityTag> {
		match self {
			Self::Immediate => None,
			Self::Highest => Some(PriorityTag::Highest),
			Self::Lowest => Some(PriorityTag::Lowest),
		}
	}
}

/// Resolves `container` and runs `mutator` against its value on this thread.
///
/// The strong reference taken here keeps the container alive until the
/// mutator has reported back, even if the owning handle is dropped meanwhile.
fn execute<V, R>(container: &Weak<Container<V>>, tier: Tier, mutator: impl FnOnce(&mut V) -> R + Send + 'static) -> Result<R>
where
	V: Send + 'static,
	R: Send + 'static,
{
	let Some(container) = container.upgrade() else {
		tracing::debug!(?tier, "cell.container_gone");
		return Err(ContainerError::ContainerGone);
	};

	let Some(tag) = tier.tag() else {
		return Ok(container.perform_now(mutator));
	};

	// Another thread's drain may pop and run this command, so wait for it to
	// report instead of assuming our own drain ran it.
	let (tx, rx) = mpsc::sync_channel(1);
	container.append_and_perform(tag, move |value| {
		let _ = tx.send(mutator(value));
	});
	rx.recv().map_err(|_| {
		ContainerError::Unexpected(anyhow::anyhow!("command for container `{}` was dropped before reporting", container.label()))
	})
}

/// Entry point for blocking operations.
pub struct SyncScheduler<V> {
	container: Weak<Container<V>>,
}

impl<V> Clone for SyncScheduler<V> {
	fn clone(&self) -> Self {
		Self {
			container: Weak::clone(&self.container),
		}
	}
}

impl<V> std::fmt::Debug for SyncScheduler<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SyncScheduler").field("alive", &(self.container.strong_count() > 0)).finish()
	}
}

impl<V: Send + 'static> SyncScheduler<V> {
	pub(crate) fn new(container: Weak<Container<V>>) -> Self {
		Self { container }
	}

	/// Operations for `tier`.
	pub fn tier(&self, tier: Tier) -> SyncActions<V> {
		SyncActions {
			container: Weak::clone(&self.container),
			tier,
		}
	}

	/// Operations that run ahead of the queue.
	pub fn immediate(&self) -> SyncActions<V> {
		self.tier(Tier::Immediate)
	}

	/// Operations queued ahead of pending work.
	pub fn highest_priority(&self) -> SyncActions<V> {
		self.tier(Tier::Highest)
	}

	/// Operations queued behind pending work.
	pub fn lowest_priority(&self) -> SyncActions<V> {
		self.tier(Tier::Lowest)
	}
}

/// Blocking operations at one [`Tier`].
///
/// Each call returns once its mutator has run. There is no timeout, and a
/// mutator that calls back into its own container deadlocks.
pub struct SyncActions<V> {
	container: Weak<Container<V>>,
	tier: Tier,
}

impl<V> Clone for SyncActions<V> {
	fn clone(&self) -> Self {
		Self {
			container: Weak::clone(&self.container),
			tier: self.tier,
		}
	}
}

impl<V> std::fmt::Debug for SyncActions<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SyncActions").field("tier", &self.tier).finish_non_exhaustive()
	}
}

impl<V: Send + 'static> SyncActions<V> {
	/// Returns this handle's tier.
	pub fn tier(&self) -> Tier {
		self.tier
	}

	/// Copy of the current value.
	pub fn get(&self) -> Result<V>
	where
		V: Clone,
	{
		execute(&self.container, self.tier, |value: &mut V| value.clone())
	}

	/// Replaces the value, returning a copy of what was stored.
	pub fn set(&self, new_value: V) -> Result<V>
	where
		V: Clone,
	{
		execute(&self.container, self.tier, move |value: &mut V| {
			*value = new_value;
			value.clone()
		})
	}

	/// Mutates the value in place, returning a copy of the result.
	///
	/// `mutator` is not called when the container is gone.
	pub fn update(&self, mutator: impl FnOnce(&mut V) + Send + 'static) -> Result<V>
	where
		V: Clone,
	{
		execute(&self.container, self.tier, move |value: &mut V| {
			mutator(value);
			value.clone()
		})
	}

	/// Projects the value through `f` without mutating it.
	///
	/// `f` is not called when the container is gone.
	pub fn transform<R: Send + 'static>(&self, f: impl FnOnce(&V) -> R + Send + 'static) -> Result<R> {
		execute(&self.container, self.tier, move |value: &mut V| f(&*value))
	}
}

/// Entry point for non-blocking operations bound to one execution context.
pub struct AsyncScheduler<V> {
	container: Weak<Container<V>>,
	context: Arc<dyn ExecutionContext>,
}

impl<V> Clone for AsyncScheduler<V> {
	fn clone(&self) -> Self {
		Self {
			container: Weak::clone(&self.container),
			context: Arc::clone(&self.context),
		}
	}
}

impl<V> std::fmt::Debug for AsyncScheduler<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AsyncScheduler").field("alive", &(self.container.strong_count() > 0)).finish_non_exhaustive()
	}
}

impl<V: Send + 'static> AsyncScheduler<V> {
	pub(crate) fn new(container: Weak<Container<V>>, context: Arc<dyn ExecutionContext>) -> Self {
		Self { container, context }
	}

	/// Operations for `tier`.
	pub fn tier(&self, tier: Tier) -> AsyncActions<V> {
		AsyncActions {
			container: Weak::clone(&self.container),
			context: Arc::clone(&self.context),
			tier,
		}
	}

	/// Operations that run ahead of the queue.
	pub fn immediate(&self) -> AsyncActions<V> {
		self.tier(Tier::Immediate)
	}

	/// Operations queued ahead of pending work.
	pub fn highest_priority(&self) -> AsyncActions<V> {
		self.tier(Tier::Highest)
	}

	/// Operations queued behind pending work.
	pub fn lowest_priority(&self) -> AsyncActions<V> {
		self.tier(Tier::Lowest)
	}
}

/// Non-blocking operations at one [`Tier`].
///
/// Calls return immediately. The container is resolved, the mutator run and
/// the completion invoked on the scheduler's execution context, never on the
/// calling thread.
pub struct AsyncActions<V> {
	container: Weak<Container<V>>,
	context: Arc<dyn ExecutionContext>,
	tier: Tier,
}

impl<V> Clone for AsyncActions<V> {
	fn clone(&self) -> Self {
		Self {
			container: Weak::clone(&self.container),
			context: Arc::clone(&self.context),
			tier: self.tier,
		}
	}
}

impl<V> std::fmt::Debug for AsyncActions<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AsyncActions").field("tier", &self.tier).finish_non_exhaustive()
	}
}

impl<V: Send + 'static> AsyncActions<V> {
	/// Returns this handle's tier.
	pub fn tier(&self) -> Tier {
		self.tier
	}

	fn dispatch<R>(&self, mutator: impl FnOnce(&mut V) -> R + Send + 'static, completion: impl FnOnce(Result<R>) + Send + 'static)
	where
		R: Send + 'static,
	{
		let container = Weak::clone(&self.container);
		let tier = self.tier;
		self.context.execute(Box::new(move || completion(execute(&container, tier, mutator))));
	}

	/// Delivers a copy of the current value to `completion`.
	pub fn get(&self, completion: impl FnOnce(Result<V>) + Send + 'static)
	where
		V: Clone,
	{
		self.dispatch(|value: &mut V| value.clone(), completion);
	}

	/// Replaces the value without waiting for the outcome.
	pub fn set(&self, new_value: V)
	where
		V: Clone,
	{
		self.set_with(new_value, discard);
	}

	/// Replaces the value and delivers a copy of what was stored.
	pub fn set_with(&self, new_value: V, completion: impl FnOnce(Result<V>) + Send + 'static)
	where
		V: Clone,
	{
		self.dispatch(
			move |value: &mut V| {
				*value = new_value;
				value.clone()
			},
			completion,
		);
	}

	/// Mutates the value without waiting for the outcome.
	pub fn update(&self, mutator: impl FnOnce(&mut V) + Send + 'static)
	where
		V: Clone,
	{
		self.update_with(mutator, discard);
	}

	/// Mutates the value and delivers a copy of the result.
	///
	/// `mutator` is not called when the container is gone.
	pub fn update_with(&self, mutator: impl FnOnce(&mut V) + Send + 'static, completion: impl FnOnce(Result<V>) + Send + 'static)
	where
		V: Clone,
	{
		self.dispatch(
			move |value: &mut V| {
				mutator(value);
				value.clone()
			},
			completion,
		);
	}

	/// Projects the value through `f` and delivers the output.
	///
	/// `f` is not called when the container is gone.
	pub fn transform<R: Send + 'static>(&self, f: impl FnOnce(&V) -> R + Send + 'static, completion: impl FnOnce(Result<R>) + Send + 'static) {
		self.dispatch(move |value: &mut V| f(&*value), completion);
	}
}

fn discard<V>(result: Result<V>) {
	if let Err(err) = result {
		tracing::debug!(%err, "cell.async.unobserved_error");
	}
}

#[cfg(test)]
mod tests;
