//! Binary heap ordering structure used to schedule pending work.
//!
//! [`PriorityQueue`] keeps its elements in a flat backing array that satisfies
//! the binary heap invariant for the [`HeapOrder`] chosen at construction. The
//! backing array is observable through [`PriorityQueue::as_slice`] because some
//! callers derive new priorities from the current layout, not only from the
//! root.

/// Comparator direction of a [`PriorityQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeapOrder {
	/// Max-heap: every parent compares greater than or equal to its children.
	#[default]
	ParentsGreaterOrEqual,
	/// Min-heap: every parent compares less than or equal to its children.
	ParentsLessOrEqual,
}

impl HeapOrder {
	/// Returns `true` when `parent` may sit above `child` under this order.
	pub fn is_correct<E: Ord>(self, parent: &E, child: &E) -> bool {
		match self {
			Self::ParentsGreaterOrEqual => parent >= child,
			Self::ParentsLessOrEqual => parent <= child,
		}
	}
}

/// Array-backed binary heap with a fixed comparator direction.
///
/// Removal operations return `None` on an empty queue or an out of range
/// index; nothing here panics.
#[derive(Debug, Clone)]
pub struct PriorityQueue<E> {
	elements: Vec<E>,
	order: HeapOrder,
}

impl<E: Ord> Default for PriorityQueue<E> {
	fn default() -> Self {
		Self::new(HeapOrder::default())
	}
}

impl<E: Ord> PriorityQueue<E> {
	/// Creates an empty queue with the given comparator direction.
	pub fn new(order: HeapOrder) -> Self {
		Self { elements: Vec::new(), order }
	}

	/// Creates an empty max-heap.
	pub fn max() -> Self {
		Self::new(HeapOrder::ParentsGreaterOrEqual)
	}

	/// Creates an empty min-heap.
	pub fn min() -> Self {
		Self::new(HeapOrder::ParentsLessOrEqual)
	}

	/// Creates an empty queue with room for `capacity` elements.
	pub fn with_capacity(order: HeapOrder, capacity: usize) -> Self {
		Self {
			elements: Vec::with_capacity(capacity),
			order,
		}
	}

	/// Adopts `elements` as-is if they already satisfy the heap invariant.
	///
	/// Returns `None` when the sequence is not heap-ordered under `order`.
	pub fn from_heap(elements: Vec<E>, order: HeapOrder) -> Option<Self> {
		let queue = Self { elements, order };
		queue.is_heap().then_some(queue)
	}

	/// Builds a queue from arbitrary `elements` in O(n).
	pub fn heapify(elements: Vec<E>, order: HeapOrder) -> Self {
		let mut queue = Self { elements, order };
		for index in (0..queue.elements.len() / 2).rev() {
			queue.sift_down(index);
		}
		queue
	}

	/// Returns the comparator direction.
	pub fn order(&self) -> HeapOrder {
		self.order
	}

	/// Returns the number of queued elements.
	pub fn len(&self) -> usize {
		self.elements.len()
	}

	/// Returns `true` when no element is queued.
	pub fn is_empty(&self) -> bool {
		self.elements.is_empty()
	}

	/// Returns the highest priority element without removing it.
	pub fn peek(&self) -> Option<&E> {
		self.elements.first()
	}

	/// Inserts `element` and restores the invariant. O(log n).
	pub fn insert(&mut self, element: E) {
		self.elements.push(element);
		self.sift_up(self.elements.len() - 1);
	}

	/// Removes and returns the highest priority element. O(log n).
	pub fn remove_highest_priority(&mut self) -> Option<E> {
		if self.elements.is_empty() {
			return None;
		}
		let last = self.elements.len() - 1;
		self.elements.swap(0, last);
		let top = self.elements.pop();
		if !self.elements.is_empty() {
			self.sift_down(0);
		}
		top
	}

	/// Removes the element stored at `index` of the backing array.
	pub fn remove(&mut self, index: usize) -> Option<E> {
		if index >= self.elements.len() {
			return None;
		}
		let last = self.elements.len() - 1;
		self.elements.swap(index, last);
		let removed = self.elements.pop();
		if index < self.elements.len() {
			self.sift_up(index);
			self.sift_down(index);
		}
		removed
	}

	/// Backing array in heap layout, root first.
	pub fn as_slice(&self) -> &[E] {
		&self.elements
	}

	/// Iterates the backing array in heap layout, not in priority order.
	pub fn iter(&self) -> std::slice::Iter<'_, E> {
		self.elements.iter()
	}

	/// Drops every queued element.
	pub fn clear(&mut self) {
		self.elements.clear();
	}

	/// Consumes the queue, returning the backing array in heap layout.
	pub fn into_vec(self) -> Vec<E> {
		self.elements
	}

	/// Checks the heap invariant over the whole backing array.
	pub fn is_heap(&self) -> bool {
		(1..self.elements.len()).all(|child| self.order.is_correct(&self.elements[(child - 1) / 2], &self.elements[child]))
	}

	fn sift_up(&mut self, mut index: usize) {
		while index > 0 {
			let parent = (index - 1) / 2;
			if self.order.is_correct(&self.elements[parent], &self.elements[index]) {
				break;
			}
			self.elements.swap(parent, index);
			index = parent;
		}
	}

	fn sift_down(&mut self, mut index: usize) {
		let len = self.elements.len();
		loop {
			let left = 2 * index + 1;
			let right = left + 1;
			let mut candidate = index;
			if left < len && !self.order.is_correct(&self.elements[candidate], &self.elements[left]) {
				candidate = left;
			}
			if right < len && !self.order.is_correct(&self.elements[candidate], &self.elements[right]) {
				candidate = right;
			}
			if candidate == index {
				return;
			}
			self.elements.swap(index, candidate);
			index = candidate;
		}
	}
}

impl<E: Ord> Extend<E> for PriorityQueue<E> {
	fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
		for element in iter {
			self.insert(element);
		}
	}
}

impl<'a, E> IntoIterator for &'a PriorityQueue<E> {
	type Item = &'a E;
	type IntoIter = std::slice::Iter<'a, E>;

	fn into_iter(self) -> Self::IntoIter {
		self.elements.iter()
	}
}
