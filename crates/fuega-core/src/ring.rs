//! Fixed-capacity, newest-first rolling buffer.
//!
//! Every buffer in the pipeline (inbound events, instrumentation entries,
//! the merged console view) is a [`RingBuffer`]: `push` prepends, the oldest
//! element is evicted on overflow, and reads produce copies so no consumer
//! can mutate shared state.

use std::collections::VecDeque;

/// A rolling buffer holding at most `capacity` elements, newest first.
#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer. A zero capacity is clamped to 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend an element, evicting the oldest if the buffer is full.
    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            let _ = self.items.pop_back();
        }
        self.items.push_front(item);
    }

    /// Number of retained elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the buffer holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of retained elements.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remove all elements. Capacity is unchanged.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterate newest-first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Newest element, if any.
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    /// Oldest retained element, if any.
    #[must_use]
    pub fn back(&self) -> Option<&T> {
        self.items.back()
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copy-on-read snapshot, newest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
