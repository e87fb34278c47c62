use std::collections::VecDeque;

pub const DEFAULT_HISTORY_SIZE: usize = 70;

/// Fixed-capacity circular buffer of recent samples (for sparklines).
///
/// Oldest values are evicted first. The live buffer never leaves the owner;
/// readers get an owned copy through [`RollingHistory::snapshot`].
#[derive(Debug, Clone)]
pub struct RollingHistory<T = f32> {
    capacity: usize,
    values: VecDeque<T>,
}

impl<T: Clone + Default> RollingHistory<T> {
    /// History pre-filled with `capacity` default values, so the first render
    /// shows a flat baseline.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut values = VecDeque::with_capacity(capacity);
        values.resize(capacity, T::default());
        Self { capacity, values }
    }
}

impl<T: Clone> RollingHistory<T> {
    pub fn empty(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    pub fn append(&mut self, value: T) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Copy of the current window, oldest first
    pub fn snapshot(&self) -> Vec<T> {
        self.values.iter().cloned().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone + Default> Default for RollingHistory<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}
