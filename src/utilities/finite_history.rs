use std::collections::VecDeque;

/// Track a finite number of the most recently seen items in a stream.
#[derive(Debug, Clone)]
pub struct FiniteHistory<T> {
    // The number of items.
    size: usize,
    // The items.
    data: VecDeque<T>,
}

impl<T> FiniteHistory<T> {
    /// Create a new `FiniteHistory` that can hold `size` items.
    pub fn new(size: usize) -> Self {
        let mut data = VecDeque::new();
        data.reserve_exact(size);
        FiniteHistory { size, data }
    }
    /// Add an `item`, removing another if necessary.
    pub fn add(&mut self, item: T) {
        if self.size == 0 {
            return;
        }
        if self.data.len() == self.size {
            self.data.pop_front();
        }
        self.data.push_back(item);
    }
    /// The number of items currently held.
    pub fn n(&self) -> usize {
        self.data.len()
    }
    /// Forget everything.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}
impl<T> FiniteHistory<T>
where
    for<'a> &'a T: Into<f64>,
{
    /// Compute the mean value in the history, or `NaN` if it is empty.
    pub fn mean(&self) -> f64 {
        self.data.iter().map(|x| x.into()).sum::<f64>() / (self.data.len() as f64)
    }
}

/// A wrapper for `bool` that can be converted to `f64`.
#[derive(Debug, Clone, Copy)]
pub struct FHBool(pub bool);

impl<'a> From<&'a FHBool> for f64 {
    fn from(b: &FHBool) -> Self {
        if b.0 {
            1.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FHBool, FiniteHistory};

    #[test]
    fn finite_history_window_test() {
        let mut history = FiniteHistory::new(4);
        assert!(history.mean().is_nan());
        for b in &[true, true, false, false, false, true] {
            history.add(FHBool(*b));
        }
        assert_eq!(4, history.n());
        assert!((history.mean() - 0.25).abs() < 1e-12);
    }
}
