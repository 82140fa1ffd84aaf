//! Priority-ordered command execution over a single guarded state.
//!
//! A [`CommandQueue`] keeps two critical sections apart:
//!
//! * the structure lock guards the pending heap and is held only long enough
//!   to allocate a priority and insert, or to pop the next command;
//! * the execution lock guards the state and is held while one command body
//!   runs.
//!
//! Command bodies therefore never run while the heap is locked, and a body
//! may append further commands to its own queue without deadlocking.

use std::panic::AssertUnwindSafe;

use parking_lot::Mutex;
use warden_exec::panic_message;
use warden_heap::{HeapOrder, PriorityQueue};

use crate::command::{Command, PriorityTag};
use crate::spec::ContainerSpec;

/// Serializes command bodies against a guarded state `S`.
pub struct CommandQueue<S> {
	label: String,
	pending: Mutex<PriorityQueue<Command<S>>>,
	execution: Mutex<S>,
}

impl<S> std::fmt::Debug for CommandQueue<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CommandQueue")
			.field("label", &self.label)
			.field("pending", &self.pending.try_lock().map(|pending| pending.len()))
			.finish_non_exhaustive()
	}
}

impl<S: Default> Default for CommandQueue<S> {
	fn default() -> Self {
		Self::new(S::default())
	}
}

impl<S> CommandQueue<S> {
	/// Creates an empty queue guarding `state`.
	pub fn new(state: S) -> Self {
		Self::with_spec(state, ContainerSpec::default())
	}

	/// Creates an empty queue guarding `state` with the given options.
	pub fn with_spec(state: S, spec: ContainerSpec) -> Self {
		Self {
			label: spec.label,
			pending: Mutex::new(PriorityQueue::with_capacity(HeapOrder::ParentsGreaterOrEqual, spec.capacity)),
			execution: Mutex::new(state),
		}
	}

	/// Name used in trace events.
	pub fn label(&self) -> &str {
		&self.label
	}

	/// Number of commands waiting to be drained.
	pub fn pending(&self) -> usize {
		self.pending.lock().len()
	}

	/// Queues `work` without running it, returning the allocated priority.
	pub fn append(&self, tag: PriorityTag, work: impl FnOnce(&mut S) + Send + 'static) -> i64 {
		let mut pending = self.pending.lock();
		let priority = next_priority(&pending, tag);
		pending.insert(Command::new(priority, work));
		tracing::trace!(container = %self.label, tag = tag.as_str(), priority, pending = pending.len(), "cell.append");
		priority
	}

	/// Drains the queue, running the highest priority command first.
	///
	/// Keeps going until the queue is observed empty, so commands appended by
	/// other threads during the drain are picked up too. A panicking body is
	/// logged and skipped; it does not unwind into whichever caller happened
	/// to be draining.
	pub fn perform(&self) {
		let mut drained = 0usize;
		loop {
			let next = self.pending.lock().remove_highest_priority();
			let Some(command) = next else {
				break;
			};
			let priority = command.priority();
			let mut state = self.execution.lock();
			if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(|| command.run(&mut state))) {
				tracing::error!(container = %self.label, priority, panic = panic_message(payload.as_ref()), "cell.command_panicked");
			}
			drained += 1;
		}
		if drained > 0 {
			tracing::trace!(container = %self.label, drained, "cell.drain");
		}
	}

	/// Runs `work` right away under the execution lock, skipping the heap.
	pub fn perform_now<R>(&self, work: impl FnOnce(&mut S) -> R) -> R {
		let mut state = self.execution.lock();
		tracing::trace!(container = %self.label, "cell.perform_now");
		work(&mut state)
	}

	/// Consumes the queue and returns the guarded state.
	///
	/// Commands still pending are dropped without running.
	pub fn into_state(self) -> S {
		self.execution.into_inner()
	}
}

/// Picks the numeric priority for a command appended with `tag`.
///
/// The base is 0 for an empty heap and the sole element's priority for a
/// one-element heap. Otherwise `Highest` uses the root and `Lowest` scans the
/// back half of the backing array for its smallest priority. The result is
/// one above or below the base.
pub(crate) fn next_priority<S>(pending: &PriorityQueue<Command<S>>, tag: PriorityTag) -> i64 {
	let elements = pending.as_slice();
	let base = match elements {
		[] => 0,
		[only] => only.priority(),
		_ => match tag {
			PriorityTag::Highest => elements[0].priority(),
			PriorityTag::Lowest => elements[elements.len() / 2..].iter().map(Command::priority).min().unwrap_or(0),
		},
	};
	match tag {
		PriorityTag::Highest => base.saturating_add(1),
		PriorityTag::Lowest => base.saturating_sub(1),
	}
}
