//! Counting storage
//!
//! Values `start, start + step, start + 2 * step, ...` computed on demand.
//! Nothing is stored, so the array is read-only and cannot be resized.
//! Integer sequences wrap around on overflow.

use super::{Lifecycle, Storage};
use crate::element::Element;
use crate::error::{ArrayError, Result};
use crate::portal::ArrayPortal;

/// Portal computing `start + step * index`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountingPortal<T> {
    start: T,
    step: T,
    len: usize,
}

impl<T: Element> ArrayPortal for CountingPortal<T> {
    type Value = T;

    #[inline]
    fn num_values(&self) -> usize {
        self.len
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        T::counting_value(self.start, self.step, index)
    }
}

/// Storage describing an arithmetic sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountingStorage<T> {
    start: T,
    step: T,
    len: usize,
}

impl<T: Element> CountingStorage<T> {
    /// `len` values starting at `start`, `step` apart
    pub fn new(start: T, step: T, len: usize) -> Self {
        Self { start, step, len }
    }

    /// `0, 1, 2, ..., len - 1`
    pub fn indices(len: usize) -> Self {
        Self::new(T::from_index(0), T::from_index(1), len)
    }
}

impl<T: Element> Storage for CountingStorage<T> {
    type Value = T;
    type PortalConst = CountingPortal<T>;

    const NAME: &'static str = "counting";

    fn portal_const(&self) -> Result<Self::PortalConst> {
        Ok(CountingPortal {
            start: self.start,
            step: self.step,
            len: self.len,
        })
    }

    fn num_values(&self) -> Result<usize> {
        Ok(self.len)
    }

    fn allocate(&mut self, _num_values: usize) -> Result<()> {
        Err(ArrayError::ReadOnly { storage: Self::NAME })
    }

    fn shrink(&mut self, _num_values: usize) -> Result<()> {
        Err(ArrayError::ReadOnly { storage: Self::NAME })
    }

    /// Nothing to free
    fn release_resources(&mut self) -> Result<()> {
        Ok(())
    }

    fn check(&self, op: Lifecycle) -> Result<()> {
        match op {
            Lifecycle::Release => Ok(()),
            _ => Err(ArrayError::ReadOnly { storage: Self::NAME }),
        }
    }
}
