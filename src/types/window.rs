//! Fixed-capacity sliding window shared by all estimators

use std::collections::VecDeque;

use crate::{RadiometerError, Result};

/// Fixed-capacity FIFO of recent values.
///
/// Appending past capacity evicts the oldest value, so `len() <= capacity()`
/// always holds and the contents are the most recent `capacity()` values in
/// append order.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowBuffer {
    values: VecDeque<f64>,
    capacity: usize,
}

impl WindowBuffer {
    /// Create an empty window. A zero capacity is a configuration error.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(RadiometerError::config("window capacity must be positive"));
        }
        Ok(Self { values: VecDeque::with_capacity(capacity), capacity })
    }

    /// Append one value, evicting the oldest when full.
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Append values in order.
    pub fn extend<I: IntoIterator<Item = f64>>(&mut self, values: I) {
        for value in values {
            self.push(value);
        }
    }

    /// Drop every value (heartbeat epoch alignment).
    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    /// Values oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    /// Copy of the contents sorted ascending.
    pub fn sorted(&self) -> Vec<f64> {
        let mut sorted: Vec<f64> = self.values.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        sorted
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Smallest value, `None` when empty.
    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    /// Arithmetic mean, `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() { None } else { Some(self.sum() / self.values.len() as f64) }
    }

    /// Contiguous view of the contents, oldest first.
    pub fn make_contiguous(&mut self) -> &[f64] {
        self.values.make_contiguous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn window_keeps_last_capacity_values_in_order(
            capacity in 1usize..64,
            values in prop::collection::vec(-1e6f64..1e6, 0..256),
        ) {
            let mut window = WindowBuffer::new(capacity).unwrap();
            window.extend(values.iter().copied());

            let expected_len = values.len().min(capacity);
            prop_assert_eq!(window.len(), expected_len);
            prop_assert!(window.len() <= window.capacity());
            prop_assert_eq!(window.is_full(), values.len() >= capacity);

            let tail: Vec<f64> = values[values.len() - expected_len..].to_vec();
            let contents: Vec<f64> = window.iter().collect();
            prop_assert_eq!(contents, tail);
        }
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(WindowBuffer::new(0), Err(RadiometerError::Config { .. })));
    }

    #[test]
    fn clear_empties_without_changing_capacity() {
        let mut window = WindowBuffer::new(3).unwrap();
        window.extend([1.0, 2.0, 3.0, 4.0]);
        assert!(window.is_full());
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);

        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.capacity(), 3);
        assert_eq!(window.min(), None);
        assert_eq!(window.mean(), None);
    }

    #[test]
    fn reductions_over_contents() {
        let mut window = WindowBuffer::new(4).unwrap();
        window.extend([4.0, -1.0, 3.0, 2.0]);
        assert_eq!(window.sorted(), vec![-1.0, 2.0, 3.0, 4.0]);
        assert_eq!(window.sum(), 8.0);
        assert_eq!(window.min(), Some(-1.0));
        assert_eq!(window.mean(), Some(2.0));
        assert_eq!(window.make_contiguous(), &[4.0, -1.0, 3.0, 2.0]);
    }
}
