//! Implicit storage
//!
//! Values computed on demand by a functor of the index. The functor is shared
//! between portal copies behind an `Arc`, so copying a portal never copies the
//! functor's captured state.

use super::{Lifecycle, Storage};
use crate::error::{ArrayError, Result};
use crate::portal::ArrayPortal;
use std::sync::Arc;

/// Portal evaluating a functor at each index
pub struct ImplicitPortal<F> {
    functor: Arc<F>,
    len: usize,
}

impl<F> Clone for ImplicitPortal<F> {
    fn clone(&self) -> Self {
        Self {
            functor: Arc::clone(&self.functor),
            len: self.len,
        }
    }
}

impl<T, F> ArrayPortal for ImplicitPortal<F>
where
    F: Fn(usize) -> T + Send + Sync,
{
    type Value = T;

    #[inline]
    fn num_values(&self) -> usize {
        self.len
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        (self.functor)(index)
    }
}

/// Storage computing `functor(index)` for `index in 0..len`
pub struct ImplicitStorage<F> {
    functor: Arc<F>,
    len: usize,
}

impl<F> ImplicitStorage<F> {
    /// `len` values produced by `functor`
    pub fn new<T>(functor: F, len: usize) -> Self
    where
        F: Fn(usize) -> T + Send + Sync,
    {
        Self {
            functor: Arc::new(functor),
            len,
        }
    }
}

impl<T, F> Storage for ImplicitStorage<F>
where
    F: Fn(usize) -> T + Send + Sync,
{
    type Value = T;
    type PortalConst = ImplicitPortal<F>;

    const NAME: &'static str = "implicit";

    fn portal_const(&self) -> Result<Self::PortalConst> {
        Ok(ImplicitPortal {
            functor: Arc::clone(&self.functor),
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

impl<F> std::fmt::Debug for ImplicitStorage<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ImplicitStorage(len={})", self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squares() {
        let storage = ImplicitStorage::new(|i| (i * i) as u64, 5);
        assert_eq!(storage.portal_const().unwrap().to_vec(), vec![0, 1, 4, 9, 16]);
    }

    #[test]
    fn test_portal_copies_share_functor() {
        let offset = 0.5f64;
        let storage = ImplicitStorage::new(move |i| i as f64 + offset, 3);
        let portal = storage.portal_const().unwrap();
        let copy = portal.clone();
        assert!(Arc::ptr_eq(&portal.functor, &copy.functor));
        assert_eq!(copy.get(2), 2.5);
    }

    #[test]
    fn test_read_only() {
        let mut storage = ImplicitStorage::new(|i| i, 3);
        assert!(matches!(storage.allocate(1), Err(ArrayError::ReadOnly { storage: "implicit" })));
        assert!(matches!(storage.shrink(1), Err(ArrayError::ReadOnly { .. })));
        assert!(matches!(storage.check(Lifecycle::AllocateFullArray(8)), Err(ArrayError::ReadOnly { .. })));
    }
}
