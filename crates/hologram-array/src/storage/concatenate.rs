//! Concatenated storage
//!
//! Presents two handles with the same value type as one array: indices below
//! the first array's length go to the first array, the rest to the second.
//! Streaming over a concatenation is supported like over any other storage.

use super::{Lifecycle, Storage, WritableStorage};
use crate::error::{ArrayError, Result};
use crate::handle::ArrayHandle;
use crate::portal::{ArrayPortal, ArrayPortalMut, PortalFrom};

/// Portal over two portals placed back to back
#[derive(Debug, Clone)]
pub struct ConcatenatePortal<P1, P2> {
    first: P1,
    second: P2,
}

impl<P1: ArrayPortal, P2: ArrayPortal<Value = P1::Value>> ConcatenatePortal<P1, P2> {
    /// Concatenate `first` and `second`
    pub fn new(first: P1, second: P2) -> Self {
        Self { first, second }
    }
}

impl<P1, P2> ArrayPortal for ConcatenatePortal<P1, P2>
where
    P1: ArrayPortal,
    P2: ArrayPortal<Value = P1::Value>,
{
    type Value = P1::Value;

    #[inline]
    fn num_values(&self) -> usize {
        self.first.num_values() + self.second.num_values()
    }

    #[inline]
    fn get(&self, index: usize) -> Self::Value {
        let split = self.first.num_values();
        if index < split {
            self.first.get(index)
        } else {
            self.second.get(index - split)
        }
    }
}

impl<P1, P2> ArrayPortalMut for ConcatenatePortal<P1, P2>
where
    P1: ArrayPortalMut,
    P2: ArrayPortalMut<Value = P1::Value>,
    P2::Const: ArrayPortal<Value = P1::Value>,
{
    type Const = ConcatenatePortal<P1::Const, P2::Const>;

    #[inline]
    fn set(&self, index: usize, value: Self::Value) {
        let split = self.first.num_values();
        if index < split {
            self.first.set(index, value)
        } else {
            self.second.set(index - split, value)
        }
    }
}

impl<P1, P2, Q1, Q2> PortalFrom<ConcatenatePortal<Q1, Q2>> for ConcatenatePortal<P1, P2>
where
    P1: PortalFrom<Q1>,
    P2: PortalFrom<Q2>,
{
    fn portal_from(other: ConcatenatePortal<Q1, Q2>) -> Self {
        Self {
            first: P1::portal_from(other.first),
            second: P2::portal_from(other.second),
        }
    }
}

/// Storage joining two handles end to end
pub struct ConcatenateStorage<S1: Storage, S2: Storage<Value = S1::Value>> {
    first: ArrayHandle<S1>,
    second: ArrayHandle<S2>,
}

impl<S1: Storage, S2: Storage<Value = S1::Value>> ConcatenateStorage<S1, S2> {
    /// Join `first` and `second`
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

impl<S1: Storage, S2: Storage<Value = S1::Value>> Storage for ConcatenateStorage<S1, S2> {
    type Value = S1::Value;
    type PortalConst = ConcatenatePortal<S1::PortalConst, S2::PortalConst>;

    const NAME: &'static str = "concatenate";

    fn portal_const(&self) -> Result<Self::PortalConst> {
        Ok(ConcatenatePortal::new(self.first.read_portal()?, self.second.read_portal()?))
    }

    fn num_values(&self) -> Result<usize> {
        Ok(self.first.num_values()? + self.second.num_values()?)
    }

    /// Always fails: there is no single way to split new capacity between the parts
    fn allocate(&mut self, _num_values: usize) -> Result<()> {
        Err(ArrayError::NotResizable { storage: Self::NAME })
    }

    /// Shrink the second array first, then the first
    fn shrink(&mut self, num_values: usize) -> Result<()> {
        self.check(Lifecycle::Shrink(num_values))?;
        let first_len = self.first.num_values()?;
        if num_values < first_len {
            self.first.shrink(num_values)?;
            self.second.shrink(0)
        } else {
            self.second.shrink(num_values - first_len)
        }
    }

    fn release_resources(&mut self) -> Result<()> {
        self.check(Lifecycle::Release)?;
        self.first.release_resources()?;
        self.second.release_resources()
    }

    fn check(&self, op: Lifecycle) -> Result<()> {
        match op {
            Lifecycle::Allocate(_) | Lifecycle::AllocateFullArray(_) => {
                Err(ArrayError::NotResizable { storage: Self::NAME })
            }
            Lifecycle::Shrink(num_values) => {
                let first_len = self.first.num_values()?;
                if num_values < first_len {
                    self.first.check(Lifecycle::Shrink(num_values))?;
                    self.second.check(Lifecycle::Shrink(0))
                } else {
                    self.second.check(Lifecycle::Shrink(num_values - first_len))
                }
            }
            Lifecycle::Release => {
                self.first.check(op)?;
                self.second.check(op)
            }
        }
    }

    fn generation(&self) -> u64 {
        self.first.generation().wrapping_add(self.second.generation())
    }
}

impl<S1, S2> WritableStorage for ConcatenateStorage<S1, S2>
where
    S1: WritableStorage,
    S2: WritableStorage<Value = S1::Value>,
    <S2::Portal as ArrayPortalMut>::Const: ArrayPortal<Value = S1::Value>,
{
    type Portal = ConcatenatePortal<S1::Portal, S2::Portal>;

    fn portal(&self) -> Result<Self::Portal> {
        Ok(ConcatenatePortal::new(self.first.write_portal()?, self.second.write_portal()?))
    }
}

impl<S1: Storage, S2: Storage<Value = S1::Value>> std::fmt::Debug for ConcatenateStorage<S1, S2> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ConcatenateStorage({}, {})",
            self.first.num_values().unwrap_or(0),
            self.second.num_values().unwrap_or(0)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BasicStorage;

    fn pair() -> (ArrayHandle<BasicStorage<i32>>, ArrayHandle<BasicStorage<i32>>) {
        (ArrayHandle::from_vec(vec![0, 1, 2]), ArrayHandle::from_vec(vec![3, 4, 5, 6]))
    }

    #[test]
    fn test_reads_across_split() {
        let (a, b) = pair();
        let storage = ConcatenateStorage::new(a, b);
        assert_eq!(storage.num_values().unwrap(), 7);
        assert_eq!(storage.portal_const().unwrap().to_vec(), (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_writes_reach_both_parts() {
        let (a, b) = pair();
        let storage = ConcatenateStorage::new(a.clone(), b.clone());
        let portal = storage.portal().unwrap();
        portal.set(2, 20);
        portal.set(3, 30);
        assert_eq!(a.to_vec().unwrap(), vec![0, 1, 20]);
        assert_eq!(b.to_vec().unwrap(), vec![30, 4, 5, 6]);
    }

    #[test]
    fn test_allocate_rejected() {
        let (a, b) = pair();
        let mut storage = ConcatenateStorage::new(a, b);
        assert!(matches!(
            storage.allocate(10),
            Err(ArrayError::NotResizable { storage: "concatenate" })
        ));
        assert!(storage.allocate_full_array(10).is_err());
    }

    #[test]
    fn test_shrink_into_second() {
        let (a, b) = pair();
        let mut storage = ConcatenateStorage::new(a.clone(), b.clone());
        storage.shrink(5).unwrap();
        assert_eq!(a.num_values().unwrap(), 3);
        assert_eq!(b.to_vec().unwrap(), vec![3, 4]);
    }

    #[test]
    fn test_shrink_into_first() {
        let (a, b) = pair();
        let mut storage = ConcatenateStorage::new(a.clone(), b.clone());
        storage.shrink(2).unwrap();
        assert_eq!(a.to_vec().unwrap(), vec![0, 1]);
        assert_eq!(b.num_values().unwrap(), 0);
    }

    #[test]
    fn test_release_both() {
        let (a, b) = pair();
        let mut storage = ConcatenateStorage::new(a.clone(), b.clone());
        storage.release_resources().unwrap();
        assert_eq!(storage.num_values().unwrap(), 0);
    }

    #[test]
    fn test_read_only_second_part_blocks_shrink() {
        let first = ArrayHandle::from_vec(vec![0u32, 1, 2]);
        let second = ArrayHandle::new(crate::storage::CountingStorage::new(3u32, 1, 4));
        let mut storage = ConcatenateStorage::new(first.clone(), second);

        assert!(matches!(storage.shrink(2), Err(ArrayError::ReadOnly { storage: "counting" })));
        assert_eq!(first.to_vec().unwrap(), vec![0, 1, 2]);
        assert!(matches!(storage.shrink(20), Err(ArrayError::ReadOnly { .. })));
    }

    #[test]
    fn test_failing_second_part_blocks_release() {
        let first = ArrayHandle::from_vec(vec![7, 8]);
        let unbound = ArrayHandle::new(crate::storage::StreamingStorage::<BasicStorage<i32>>::default());
        let mut storage = ConcatenateStorage::new(first.clone(), unbound);

        assert!(matches!(storage.release_resources(), Err(ArrayError::InvalidStorage)));
        assert_eq!(first.to_vec().unwrap(), vec![7, 8]);
    }

    #[test]
    fn test_cached_portal_follows_parts() {
        let (a, b) = pair();
        let joined = ArrayHandle::new(ConcatenateStorage::new(a.clone(), b));
        assert_eq!(joined.num_values().unwrap(), 7);
        joined.read_portal().unwrap();

        a.allocate(5).unwrap();
        assert_eq!(joined.read_portal().unwrap().num_values(), 9);
    }

    #[test]
    fn test_to_const() {
        let (a, b) = pair();
        let storage = ConcatenateStorage::new(a, b);
        let read = storage.portal().unwrap().to_const();
        assert_eq!(read.get(6), 6);
    }
}
