//! Zipped storage
//!
//! Pairs values at the same index from two handles: `get(i) == (a[i], b[i])`.
//! The visible length is the shorter of the two arrays. Lifecycle operations
//! are applied to both sides, and only once both sides accept them.

use super::{Lifecycle, Storage, WritableStorage};
use crate::error::Result;
use crate::handle::ArrayHandle;
use crate::portal::{ArrayPortal, ArrayPortalMut, PortalFrom};

/// Portal yielding pairs from two portals
#[derive(Debug, Clone)]
pub struct ZipPortal<P1, P2> {
    first: P1,
    second: P2,
}

impl<P1, P2> ZipPortal<P1, P2> {
    /// Zip `first` with `second`
    pub fn new(first: P1, second: P2) -> Self {
        Self { first, second }
    }
}

impl<P1: ArrayPortal, P2: ArrayPortal> ArrayPortal for ZipPortal<P1, P2> {
    type Value = (P1::Value, P2::Value);

    #[inline]
    fn num_values(&self) -> usize {
        self.first.num_values().min(self.second.num_values())
    }

    #[inline]
    fn get(&self, index: usize) -> Self::Value {
        (self.first.get(index), self.second.get(index))
    }
}

impl<P1: ArrayPortalMut, P2: ArrayPortalMut> ArrayPortalMut for ZipPortal<P1, P2> {
    type Const = ZipPortal<P1::Const, P2::Const>;

    #[inline]
    fn set(&self, index: usize, (a, b): Self::Value) {
        self.first.set(index, a);
        self.second.set(index, b);
    }
}

impl<P1, P2, Q1, Q2> PortalFrom<ZipPortal<Q1, Q2>> for ZipPortal<P1, P2>
where
    P1: PortalFrom<Q1>,
    P2: PortalFrom<Q2>,
{
    fn portal_from(other: ZipPortal<Q1, Q2>) -> Self {
        Self {
            first: P1::portal_from(other.first),
            second: P2::portal_from(other.second),
        }
    }
}

/// Storage pairing two handles index by index
pub struct ZipStorage<S1: Storage, S2: Storage> {
    first: ArrayHandle<S1>,
    second: ArrayHandle<S2>,
}

impl<S1: Storage, S2: Storage> ZipStorage<S1, S2> {
    /// Zip `first` with `second`
    pub fn new(first: ArrayHandle<S1>, second: ArrayHandle<S2>) -> Self {
        Self { first, second }
    }

    /// First array
    pub fn first(&self) -> &ArrayHandle<S1> {
        &self.first
    }

    /// Second array
    pub fn second(&self) -> &ArrayHandle<S2> {
        &self.second
    }
}

impl<S1: Storage, S2: Storage> Storage for ZipStorage<S1, S2> {
    type Value = (S1::Value, S2::Value);
    type PortalConst = ZipPortal<S1::PortalConst, S2::PortalConst>;

    const NAME: &'static str = "zip";

    fn portal_const(&self) -> Result<Self::PortalConst> {
        Ok(ZipPortal::new(self.first.read_portal()?, self.second.read_portal()?))
    }

    fn num_values(&self) -> Result<usize> {
        Ok(self.first.num_values()?.min(self.second.num_values()?))
    }

    fn allocate(&mut self, num_values: usize) -> Result<()> {
        self.check(Lifecycle::Allocate(num_values))?;
        self.first.allocate(num_values)?;
        self.second.allocate(num_values)
    }

    fn allocate_full_array(&mut self, num_values: usize) -> Result<()> {
        self.check(Lifecycle::AllocateFullArray(num_values))?;
        self.first.allocate_full_array(num_values)?;
        self.second.allocate_full_array(num_values)
    }

    fn shrink(&mut self, num_values: usize) -> Result<()> {
        self.check(Lifecycle::Shrink(num_values))?;
        self.first.shrink(num_values)?;
        self.second.shrink(num_values)
    }

    fn release_resources(&mut self) -> Result<()> {
        self.check(Lifecycle::Release)?;
        self.first.release_resources()?;
        self.second.release_resources()
    }

    fn check(&self, op: Lifecycle) -> Result<()> {
        self.first.check(op)?;
        self.second.check(op)
    }

    fn generation(&self) -> u64 {
        self.first.generation().wrapping_add(self.second.generation())
    }
}

impl<S1: WritableStorage, S2: WritableStorage> WritableStorage for ZipStorage<S1, S2> {
    type Portal = ZipPortal<S1::Portal, S2::Portal>;

    fn portal(&self) -> Result<Self::Portal> {
        Ok(ZipPortal::new(self.first.write_portal()?, self.second.write_portal()?))
    }
}

impl<S1: Storage, S2: Storage> std::fmt::Debug for ZipStorage<S1, S2> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ZipStorage(len={})", self.num_values().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArrayError;
    use crate::storage::{BasicStorage, CountingStorage};

    #[test]
    fn test_pairs() {
        let ids = ArrayHandle::new(CountingStorage::<u32>::indices(3));
        let weights = ArrayHandle::from_vec(vec![0.5f32, 1.5, 2.5]);
        let storage = ZipStorage::new(ids, weights);
        assert_eq!(storage.portal_const().unwrap().to_vec(), vec![(0, 0.5), (1, 1.5), (2, 2.5)]);
    }

    #[test]
    fn test_shorter_side_wins() {
        let storage = ZipStorage::new(ArrayHandle::from_vec(vec![1, 2, 3]), ArrayHandle::from_vec(vec![4u8]));
        assert_eq!(storage.num_values().unwrap(), 1);
        assert_eq!(storage.portal_const().unwrap().num_values(), 1);
    }

    #[test]
    fn test_set_writes_both() {
        let a = ArrayHandle::<BasicStorage<i16>>::new_basic(2);
        let b = ArrayHandle::<BasicStorage<f64>>::new_basic(2);
        let storage = ZipStorage::new(a.clone(), b.clone());
        storage.portal().unwrap().set(1, (7, 0.25));
        assert_eq!(a.to_vec().unwrap(), vec![0, 7]);
        assert_eq!(b.to_vec().unwrap(), vec![0.0, 0.25]);
    }

    #[test]
    fn test_allocate_both() {
        let a = ArrayHandle::<BasicStorage<i16>>::new_basic(2);
        let b = ArrayHandle::<BasicStorage<i16>>::new_basic(3);
        let mut storage = ZipStorage::new(a.clone(), b.clone());
        storage.allocate(5).unwrap();
        assert_eq!(a.num_values().unwrap(), 5);
        assert_eq!(b.num_values().unwrap(), 5);

        storage.shrink(1).unwrap();
        assert_eq!(storage.num_values().unwrap(), 1);
    }

    #[test]
    fn test_read_only_side_rejects_allocate() {
        let mut storage = ZipStorage::new(
            ArrayHandle::new(CountingStorage::<i32>::indices(2)),
            ArrayHandle::<BasicStorage<i32>>::new_basic(2),
        );
        assert!(storage.allocate(4).is_err());
    }

    #[test]
    fn test_failing_second_side_leaves_first_untouched() {
        let first = ArrayHandle::from_vec(vec![1, 2, 3]);
        let mut storage = ZipStorage::new(first.clone(), ArrayHandle::from_vec(vec![9u8]));
        assert!(matches!(
            storage.shrink(2),
            Err(ArrayError::ShrinkBeyondLength { requested: 2, len: 1 })
        ));
        assert_eq!(first.to_vec().unwrap(), vec![1, 2, 3]);

        let first = ArrayHandle::<BasicStorage<i32>>::new_basic(2);
        let mut storage = ZipStorage::new(first.clone(), ArrayHandle::new(CountingStorage::<i32>::indices(2)));
        assert!(matches!(storage.allocate(4), Err(ArrayError::ReadOnly { storage: "counting" })));
        assert!(matches!(storage.allocate_full_array(4), Err(ArrayError::ReadOnly { .. })));
        assert_eq!(first.num_values().unwrap(), 2);
    }

    #[test]
    fn test_generation_tracks_both_sides() {
        let a = ArrayHandle::from_vec(vec![1, 2]);
        let b = ArrayHandle::from_vec(vec![3, 4]);
        let zipped = ArrayHandle::new(ZipStorage::new(a.clone(), b.clone()));
        assert_eq!(zipped.to_vec().unwrap(), vec![(1, 3), (2, 4)]);

        b.allocate(1).unwrap();
        assert!(!zipped.has_cached_portal());
        assert_eq!(zipped.to_vec().unwrap(), vec![(1, 3)]);
    }
}
