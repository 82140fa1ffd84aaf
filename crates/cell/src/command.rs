use std::cmp::Ordering;

/// Boxed body of a [`Command`], run against the queue's guarded state.
pub type Work<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// Coarse placement request for an appended command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriorityTag {
	/// Run ahead of everything already pending.
	Highest,
	/// Run after everything already pending.
	Lowest,
}

impl PriorityTag {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Highest => "highest",
			Self::Lowest => "lowest",
		}
	}
}

/// A unit of work paired with the numeric priority it was queued under.
///
/// Commands compare by priority alone. They run exactly once.
pub struct Command<S> {
	priority: i64,
	work: Work<S>,
}

impl<S> Command<S> {
	/// Creates a command with an explicit numeric priority.
	pub fn new(priority: i64, work: impl FnOnce(&mut S) + Send + 'static) -> Self {
		Self {
			priority,
			work: Box::new(work),
		}
	}

	/// Numeric priority; higher runs first.
	pub fn priority(&self) -> i64 {
		self.priority
	}

	/// Consumes the command, running its body against `state`.
	pub fn run(self, state: &mut S) {
		(self.work)(state);
	}
}

impl<S> std::fmt::Debug for Command<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Command").field("priority", &self.priority).finish_non_exhaustive()
	}
}

impl<S> PartialEq for Command<S> {
	fn eq(&self, other: &Self) -> bool {
		self.priority == other.priority
	}
}

impl<S> Eq for Command<S> {}

impl<S> PartialOrd for Command<S> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl<S> Ord for Command<S> {
	fn cmp(&self, other: &Self) -> Ordering {
		self.priority.cmp(&other.priority)
	}
}
