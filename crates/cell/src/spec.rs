/// Construction options for a container and its command queue.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
	pub(crate) label: String,
	pub(crate) capacity: usize,
}

impl ContainerSpec {
	/// Sets the name reported in trace events.
	#[must_use]
	pub fn label(mut self, label: impl Into<String>) -> Self {
		self.label = label.into();
		self
	}

	/// Pre-sizes the pending command heap.
	#[must_use]
	pub fn capacity(mut self, capacity: usize) -> Self {
		self.capacity = capacity;
		self
	}
}

impl Default for ContainerSpec {
	fn default() -> Self {
		Self {
			label: "container".to_string(),
			capacity: 16,
		}
	}
}
