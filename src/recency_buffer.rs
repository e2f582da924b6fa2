use std::collections::VecDeque;

use crate::error::ThrottleError;

// Fixed-capacity history of the most recent request timestamps.
// One in, one out: recording past capacity evicts exactly the oldest entry.
#[derive(Debug, Clone)]
pub struct RecencyBuffer<T> {
    capacity: usize,
    entries: VecDeque<T>,
}

impl<T> RecencyBuffer<T> {
    pub fn new(capacity: usize) -> Result<Self, ThrottleError> {
        if capacity == 0 {
            return Err(ThrottleError::invalid(
                "capacity",
                "must be greater than zero",
            ));
        }

        Ok(Self {
            capacity,
            // +1 leaves room for the transient overflow before eviction
            entries: VecDeque::with_capacity(capacity + 1),
        })
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    pub fn record(&mut self, timestamp: T) {
        self.entries.push_back(timestamp);
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn oldest(&self) -> Result<&T, ThrottleError> {
        self.entries.front().ok_or(ThrottleError::EmptyState)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}
