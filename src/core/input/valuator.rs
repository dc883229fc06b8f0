//! Valuator masks: per-axis values with a "set" bit per axis.

use std::collections::TryReserveError;

/// Sparse set of axis values attached to a touch sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValuatorMask {
    values: Vec<f64>,
    set: Vec<bool>,
}

impl ValuatorMask {
    /// Create a mask with room for `num_axes` axes, none set
    pub fn new(num_axes: usize) -> Self {
        Self {
            values: vec![0.0; num_axes],
            set: vec![false; num_axes],
        }
    }

    /// Like `new`, but reports allocation failure instead of aborting
    pub fn try_new(num_axes: usize) -> Result<Self, TryReserveError> {
        let mut values = Vec::new();
        values.try_reserve_exact(num_axes)?;
        let mut set = Vec::new();
        set.try_reserve_exact(num_axes)?;
        values.resize(num_axes, 0.0);
        set.resize(num_axes, false);
        Ok(Self { values, set })
    }

    /// Set `axis` to `value`, growing the mask if needed
    pub fn set_double(&mut self, axis: usize, value: f64) {
        if axis >= self.values.len() {
            self.values.resize(axis + 1, 0.0);
            self.set.resize(axis + 1, false);
        }
        self.values[axis] = value;
        self.set[axis] = true;
    }

    pub fn get_double(&self, axis: usize) -> Option<f64> {
        match self.set.get(axis) {
            Some(true) => Some(self.values[axis]),
            _ => None,
        }
    }

    pub fn is_set(&self, axis: usize) -> bool {
        self.set.get(axis).copied().unwrap_or(false)
    }

    pub fn unset(&mut self, axis: usize) {
        if let Some(bit) = self.set.get_mut(axis) {
            *bit = false;
            self.values[axis] = 0.0;
        }
    }

    /// Number of axes with a value
    pub fn num_set(&self) -> usize {
        self.set.iter().filter(|&&s| s).count()
    }

    /// Number of axes the mask has room for
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Clear every value but keep the storage
    pub fn zero(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
        self.set.iter_mut().for_each(|s| *s = false);
    }

    /// Drop the storage itself
    pub fn release(&mut self) {
        self.values = Vec::new();
        self.set = Vec::new();
    }

    /// Iterate `(axis, value)` for every set axis
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .zip(&self.set)
            .enumerate()
            .filter_map(|(axis, (&value, &set))| set.then_some((axis, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_zero() {
        let mut mask = ValuatorMask::new(2);
        assert_eq!(mask.num_set(), 0);

        mask.set_double(1, 4.5);
        assert_eq!(mask.get_double(1), Some(4.5));
        assert_eq!(mask.get_double(0), None);

        mask.set_double(5, 1.0);
        assert_eq!(mask.size(), 6);
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![(1, 4.5), (5, 1.0)]);

        mask.zero();
        assert_eq!(mask.num_set(), 0);
        assert_eq!(mask.size(), 6);

        mask.release();
        assert_eq!(mask.size(), 0);
    }
}
