//! Streaming storage
//!
//! Presents a fixed-size window ("block") over a backing array that is too
//! large to process at once. The window is described by a [`BlockDescriptor`]:
//!
//! ```text
//! backing:  [ b0 b1 b2 b3 | b4 b5 b6 b7 | b8 b9 ]
//!             block 0       block 1       block 2 (partial)
//!
//! block_size = 4, block_index = 2, current_block_size = 2
//! offset     = block_index * block_size = 8
//! portal.get(i) == backing.get(8 + i)   for i in [0, 2)
//! ```
//!
//! Lifecycle operations act on the backing array, never on the window:
//! [`Storage::allocate`] is a deliberate no-op and only
//! [`Storage::allocate_full_array`] changes backing capacity. Shrinking the
//! backing array leaves the descriptor alone; a window that no longer fits is
//! the caller's to move (see [`StreamingStorage::window_in_bounds`]).
//!
//! Binding or moving a window checks it against the backing array whenever
//! the backing array holds values. Over an empty backing array any well-formed
//! window is accepted, so output streams can be bound before the backing array
//! is allocated.

use super::{Lifecycle, Storage, WritableStorage};
use crate::error::{ArrayError, Result};
use crate::handle::ArrayHandle;
use crate::portal::{ArrayPortal, ArrayPortalMut, PortalFrom};

/// Position and size of the visible window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockDescriptor {
    /// Values per full block
    pub block_size: usize,
    /// Which block is visible
    pub block_index: usize,
    /// Values in the visible block (`<= block_size`; smaller for a final partial block)
    pub current_block_size: usize,
}

impl BlockDescriptor {
    /// Descriptor for an explicit window
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::InvalidWindow`] if `current_block_size > block_size`
    /// and [`ArrayError::WindowOverflow`] if the window end does not fit in `usize`.
    pub fn new(block_size: usize, block_index: usize, current_block_size: usize) -> Result<Self> {
        let descriptor = Self {
            block_size,
            block_index,
            current_block_size,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Descriptor for block `block_index` of a backing array of `backing_len` values
    ///
    /// The final block is shortened to whatever remains of the backing array.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::InvalidWindow`] for a zero block size and
    /// [`ArrayError::WindowOutOfRange`] if the block starts past the end.
    pub fn for_block(backing_len: usize, block_size: usize, block_index: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(ArrayError::InvalidWindow {
                block_size,
                current_block_size: 0,
            });
        }
        let offset = block_index.saturating_mul(block_size);
        if offset >= backing_len && !(offset == 0 && backing_len == 0) {
            return Err(ArrayError::WindowOutOfRange {
                offset,
                len: 0,
                backing_len,
            });
        }
        Ok(Self {
            block_size,
            block_index,
            current_block_size: block_size.min(backing_len - offset),
        })
    }

    /// Number of blocks needed to cover `backing_len` values
    pub fn num_blocks(backing_len: usize, block_size: usize) -> usize {
        if block_size == 0 {
            return 0;
        }
        backing_len.div_ceil(block_size)
    }

    /// Absolute backing index of local index 0
    ///
    /// Saturates for a hand-built descriptor whose offset overflows, so such a
    /// window addresses past any backing array instead of wrapping around.
    #[inline]
    pub fn offset(&self) -> usize {
        self.block_index.saturating_mul(self.block_size)
    }

    /// Absolute backing index one past the last visible value
    #[inline]
    pub fn end(&self) -> usize {
        self.offset().saturating_add(self.current_block_size)
    }

    /// Whether the window lies inside a backing array of `backing_len` values
    pub fn fits(&self, backing_len: usize) -> bool {
        self.block_index
            .checked_mul(self.block_size)
            .and_then(|offset| offset.checked_add(self.current_block_size))
            .is_some_and(|end| end <= backing_len)
    }

    fn validate(&self) -> Result<()> {
        if self.current_block_size > self.block_size {
            return Err(ArrayError::InvalidWindow {
                block_size: self.block_size,
                current_block_size: self.current_block_size,
            });
        }
        let end = self
            .block_index
            .checked_mul(self.block_size)
            .and_then(|offset| offset.checked_add(self.current_block_size));
        if end.is_none() {
            return Err(ArrayError::WindowOverflow {
                block_size: self.block_size,
                block_index: self.block_index,
            });
        }
        Ok(())
    }

    /// Reject a window that misses a non-empty backing array
    fn check_bounds(&self, backing_len: usize) -> Result<()> {
        if backing_len > 0 && !self.fits(backing_len) {
            return Err(ArrayError::WindowOutOfRange {
                offset: self.offset(),
                len: self.current_block_size,
                backing_len,
            });
        }
        Ok(())
    }
}

/// Portal over the visible window of a backing array
///
/// Holds the inner portal over the whole backing array plus a copy of the
/// descriptor taken when the portal was built. Advancing the storage's window
/// does not move portals already handed out.
#[derive(Debug, Clone)]
pub struct StreamingPortal<P> {
    inner: P,
    descriptor: BlockDescriptor,
}

impl<P> StreamingPortal<P> {
    /// Window `descriptor` over `inner`
    pub fn new(inner: P, descriptor: BlockDescriptor) -> Self {
        Self { inner, descriptor }
    }

    /// Descriptor this portal addresses through
    pub fn descriptor(&self) -> BlockDescriptor {
        self.descriptor
    }

    /// Portal over the whole backing array
    pub fn inner(&self) -> &P {
        &self.inner
    }

    #[inline]
    fn backing_index(&self, index: usize) -> usize {
        debug_assert!(
            index < self.descriptor.current_block_size,
            "streaming index {} out of window of {} values",
            index,
            self.descriptor.current_block_size
        );
        self.descriptor.offset().saturating_add(index)
    }
}

impl<P: ArrayPortal> ArrayPortal for StreamingPortal<P> {
    type Value = P::Value;

    #[inline]
    fn num_values(&self) -> usize {
        self.descriptor.current_block_size
    }

    #[inline]
    fn get(&self, index: usize) -> Self::Value {
        self.inner.get(self.backing_index(index))
    }
}

impl<P: ArrayPortalMut> ArrayPortalMut for StreamingPortal<P> {
    type Const = StreamingPortal<P::Const>;

    #[inline]
    fn set(&self, index: usize, value: Self::Value) {
        self.inner.set(self.backing_index(index), value)
    }
}

impl<P, Q> PortalFrom<StreamingPortal<Q>> for StreamingPortal<P>
where
    P: PortalFrom<Q>,
{
    fn portal_from(other: StreamingPortal<Q>) -> Self {
        Self {
            inner: P::portal_from(other.inner),
            descriptor: other.descriptor,
        }
    }
}

enum StreamingState<S: Storage> {
    Unbound,
    Bound {
        backing: ArrayHandle<S>,
        descriptor: BlockDescriptor,
    },
    Released,
}

/// Storage exposing one block of a backing array at a time
pub struct StreamingStorage<S: Storage> {
    state: StreamingState<S>,
}

impl<S: Storage> StreamingStorage<S> {
    /// Bind a window over `backing`
    ///
    /// The backing array may still be empty (see
    /// [`allocate_full_array`](Storage::allocate_full_array)); once it holds
    /// values the window must lie inside it.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::InvalidWindow`] or [`ArrayError::WindowOverflow`]
    /// for a malformed descriptor, [`ArrayError::WindowOutOfRange`] if the
    /// window misses a non-empty backing array, and whatever the backing
    /// handle reports for its length.
    pub fn new(
        backing: ArrayHandle<S>,
        block_size: usize,
        block_index: usize,
        current_block_size: usize,
    ) -> Result<Self> {
        let descriptor = BlockDescriptor::new(block_size, block_index, current_block_size)?;
        descriptor.check_bounds(backing.num_values()?)?;
        Ok(Self {
            state: StreamingState::Bound { backing, descriptor },
        })
    }

    /// Whether the storage is bound to a backing array
    pub fn is_valid(&self) -> bool {
        matches!(self.state, StreamingState::Bound { .. })
    }

    /// Backing array handle
    pub fn array(&self) -> Result<&ArrayHandle<S>> {
        self.bound().map(|(backing, _)| backing)
    }

    /// Current window
    pub fn descriptor(&self) -> Result<BlockDescriptor> {
        self.bound().map(|(_, descriptor)| *descriptor)
    }

    /// Replace the window
    ///
    /// Portals already handed out keep the descriptor they were built with.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new), plus [`ArrayError::InvalidStorage`] /
    /// [`ArrayError::Released`] when unbound or released.
    pub fn set_descriptor(&mut self, next: BlockDescriptor) -> Result<()> {
        next.validate()?;
        match &mut self.state {
            StreamingState::Bound { backing, descriptor } => {
                next.check_bounds(backing.num_values()?)?;
                tracing::trace!(
                    block_index = next.block_index,
                    current_block_size = next.current_block_size,
                    "streaming_window_moved"
                );
                *descriptor = next;
                Ok(())
            }
            StreamingState::Unbound => Err(ArrayError::InvalidStorage),
            StreamingState::Released => Err(ArrayError::Released),
        }
    }

    /// Whether the window lies inside the backing array as currently allocated
    pub fn window_in_bounds(&self) -> Result<bool> {
        let (backing, descriptor) = self.bound()?;
        Ok(descriptor.fits(backing.num_values()?))
    }

    fn bound(&self) -> Result<(&ArrayHandle<S>, &BlockDescriptor)> {
        match &self.state {
            StreamingState::Bound { backing, descriptor } => Ok((backing, descriptor)),
            StreamingState::Unbound => Err(ArrayError::InvalidStorage),
            StreamingState::Released => Err(ArrayError::Released),
        }
    }
}

impl<S: Storage> Default for StreamingStorage<S> {
    /// Unbound storage; every accessor fails with [`ArrayError::InvalidStorage`]
    fn default() -> Self {
        Self {
            state: StreamingState::Unbound,
        }
    }
}

impl<S: Storage> Storage for StreamingStorage<S> {
    type Value = S::Value;
    type PortalConst = StreamingPortal<S::PortalConst>;

    const NAME: &'static str = "streaming";

    fn portal_const(&self) -> Result<Self::PortalConst> {
        let (backing, descriptor) = self.bound()?;
        Ok(StreamingPortal::new(backing.read_portal()?, *descriptor))
    }

    fn num_values(&self) -> Result<usize> {
        self.bound().map(|(_, descriptor)| descriptor.current_block_size)
    }

    /// No-op: the window size is fixed by the block descriptor
    ///
    /// Use [`allocate_full_array`](Storage::allocate_full_array) to resize the
    /// backing array, or move the window to change what is visible.
    fn allocate(&mut self, num_values: usize) -> Result<()> {
        let (_, descriptor) = self.bound()?;
        tracing::trace!(
            requested = num_values,
            current_block_size = descriptor.current_block_size,
            "streaming_allocate_ignored"
        );
        Ok(())
    }

    fn allocate_full_array(&mut self, num_values: usize) -> Result<()> {
        let (backing, _) = self.bound()?;
        backing.allocate_full_array(num_values)?;
        tracing::debug!(num_values, "streaming_backing_allocated");
        Ok(())
    }

    fn shrink(&mut self, num_values: usize) -> Result<()> {
        let (backing, descriptor) = self.bound()?;
        backing.shrink(num_values)?;
        tracing::debug!(
            num_values,
            window_fits = descriptor.fits(num_values),
            "streaming_backing_shrunk"
        );
        Ok(())
    }

    fn release_resources(&mut self) -> Result<()> {
        let (backing, _) = self.bound()?;
        backing.release_resources()?;
        self.state = StreamingState::Released;
        tracing::debug!("streaming_storage_released");
        Ok(())
    }

    fn check(&self, op: Lifecycle) -> Result<()> {
        let (backing, _) = self.bound()?;
        match op {
            Lifecycle::Allocate(_) => Ok(()),
            Lifecycle::AllocateFullArray(_) | Lifecycle::Shrink(_) | Lifecycle::Release => backing.check(op),
        }
    }

    fn generation(&self) -> u64 {
        self.bound().map_or(0, |(backing, _)| backing.generation())
    }
}

impl<S: WritableStorage> WritableStorage for StreamingStorage<S> {
    type Portal = StreamingPortal<S::Portal>;

    fn portal(&self) -> Result<Self::Portal> {
        let (backing, descriptor) = self.bound()?;
        Ok(StreamingPortal::new(backing.write_portal()?, *descriptor))
    }
}

impl<S: Storage> std::fmt::Debug for StreamingStorage<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            StreamingState::Unbound => write!(f, "StreamingStorage(unbound)"),
            StreamingState::Released => write!(f, "StreamingStorage(released)"),
            StreamingState::Bound { descriptor, .. } => write!(
                f,
                "StreamingStorage(block_size={}, block_index={}, current_block_size={})",
                descriptor.block_size, descriptor.block_index, descriptor.current_block_size
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BasicStorage;

    fn backing(len: i32) -> ArrayHandle<BasicStorage<i32>> {
        ArrayHandle::from_vec((0..len).collect())
    }

    #[test]
    fn test_descriptor_offset_and_end() {
        let descriptor = BlockDescriptor::new(4, 2, 2).unwrap();
        assert_eq!(descriptor.offset(), 8);
        assert_eq!(descriptor.end(), 10);
        assert!(descriptor.fits(10));
        assert!(!descriptor.fits(9));
    }

    #[test]
    fn test_descriptor_rejects_oversized_block() {
        let err = BlockDescriptor::new(4, 0, 5).unwrap_err();
        assert!(matches!(
            err,
            ArrayError::InvalidWindow {
                block_size: 4,
                current_block_size: 5
            }
        ));
    }

    #[test]
    fn test_for_block_partial_final_block() {
        let descriptor = BlockDescriptor::for_block(10, 4, 2).unwrap();
        assert_eq!(descriptor.current_block_size, 2);
        assert_eq!(BlockDescriptor::for_block(10, 4, 1).unwrap().current_block_size, 4);
        assert_eq!(BlockDescriptor::num_blocks(10, 4), 3);
        assert_eq!(BlockDescriptor::num_blocks(8, 4), 2);
    }

    #[test]
    fn test_for_block_past_end() {
        assert!(matches!(
            BlockDescriptor::for_block(8, 4, 2),
            Err(ArrayError::WindowOutOfRange { offset: 8, .. })
        ));
        assert!(BlockDescriptor::for_block(8, 0, 0).is_err());
    }

    #[test]
    fn test_for_block_empty_backing() {
        let descriptor = BlockDescriptor::for_block(0, 4, 0).unwrap();
        assert_eq!(descriptor.current_block_size, 0);
    }

    #[test]
    fn test_fits_does_not_overflow() {
        let descriptor = BlockDescriptor {
            block_size: usize::MAX,
            block_index: 2,
            current_block_size: 1,
        };
        assert!(!descriptor.fits(usize::MAX));
        assert_eq!(descriptor.offset(), usize::MAX);
    }

    #[test]
    fn test_descriptor_rejects_overflowing_offset() {
        assert!(matches!(
            BlockDescriptor::new(4, usize::MAX / 4 + 1, 4),
            Err(ArrayError::WindowOverflow { block_size: 4, .. })
        ));
        assert!(BlockDescriptor::new(1, usize::MAX, 1).is_err());
        assert!(BlockDescriptor::new(1, usize::MAX, 0).is_ok());
    }

    #[test]
    fn test_new_rejects_window_past_backing() {
        assert!(matches!(
            StreamingStorage::new(backing(10), 4, 5, 4),
            Err(ArrayError::WindowOutOfRange {
                offset: 20,
                len: 4,
                backing_len: 10
            })
        ));
        assert!(StreamingStorage::new(backing(10), 4, 2, 4).is_err());
        assert!(StreamingStorage::new(backing(10), 4, 2, 2).is_ok());
    }

    #[test]
    fn test_new_accepts_any_window_over_empty_backing() {
        let storage = StreamingStorage::new(backing(0), 4, 3, 4).unwrap();
        assert_eq!(storage.num_values().unwrap(), 4);
        assert!(!storage.window_in_bounds().unwrap());
    }

    #[test]
    fn test_set_descriptor_rejects_window_past_backing() {
        let mut storage = StreamingStorage::new(backing(10), 4, 0, 4).unwrap();
        let past = BlockDescriptor::new(4, 3, 4).unwrap();
        assert!(matches!(
            storage.set_descriptor(past),
            Err(ArrayError::WindowOutOfRange { .. })
        ));
        assert_eq!(storage.descriptor().unwrap().block_index, 0);
    }

    #[test]
    fn test_check_forwards_to_backing() {
        let storage = StreamingStorage::new(backing(10), 4, 0, 4).unwrap();
        assert!(storage.check(Lifecycle::Allocate(100)).is_ok());
        assert!(storage.check(Lifecycle::Shrink(10)).is_ok());
        assert!(matches!(
            storage.check(Lifecycle::Shrink(11)),
            Err(ArrayError::ShrinkBeyondLength { requested: 11, len: 10 })
        ));

        let unbound = StreamingStorage::<BasicStorage<i32>>::default();
        assert!(matches!(unbound.check(Lifecycle::Release), Err(ArrayError::InvalidStorage)));
    }

    #[test]
    fn test_generation_follows_backing() {
        let array = backing(10);
        let storage = StreamingStorage::new(array.clone(), 4, 0, 4).unwrap();
        let before = storage.generation();
        array.allocate(12).unwrap();
        assert_ne!(storage.generation(), before);
        assert_eq!(StreamingStorage::<BasicStorage<i32>>::default().generation(), 0);
    }

    #[test]
    fn test_portal_addresses_window() {
        let storage = StreamingStorage::new(backing(10), 4, 1, 4).unwrap();
        let portal = storage.portal_const().unwrap();
        assert_eq!(portal.num_values(), 4);
        assert_eq!(portal.to_vec(), vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_set_writes_backing() {
        let array = backing(10);
        let storage = StreamingStorage::new(array.clone(), 4, 2, 2).unwrap();
        storage.portal().unwrap().set(1, -1);
        assert_eq!(array.read_portal().unwrap().get(9), -1);
    }

    #[test]
    fn test_unbound_storage_fails() {
        let storage = StreamingStorage::<BasicStorage<i32>>::default();
        assert!(!storage.is_valid());
        assert!(matches!(storage.portal(), Err(ArrayError::InvalidStorage)));
        assert!(matches!(storage.portal_const(), Err(ArrayError::InvalidStorage)));
        assert!(matches!(storage.num_values(), Err(ArrayError::InvalidStorage)));
        assert!(matches!(storage.array(), Err(ArrayError::InvalidStorage)));
    }

    #[test]
    fn test_unbound_lifecycle_fails() {
        let mut storage = StreamingStorage::<BasicStorage<i32>>::default();
        assert!(matches!(storage.allocate(1), Err(ArrayError::InvalidStorage)));
        assert!(matches!(storage.allocate_full_array(1), Err(ArrayError::InvalidStorage)));
        assert!(matches!(storage.shrink(0), Err(ArrayError::InvalidStorage)));
        assert!(matches!(storage.release_resources(), Err(ArrayError::InvalidStorage)));
        assert!(matches!(
            storage.set_descriptor(BlockDescriptor::default()),
            Err(ArrayError::InvalidStorage)
        ));
    }

    #[test]
    fn test_allocate_is_noop() {
        let array = backing(10);
        let mut storage = StreamingStorage::new(array.clone(), 4, 0, 4).unwrap();
        storage.allocate(100).unwrap();
        assert_eq!(storage.num_values().unwrap(), 4);
        assert_eq!(array.num_values().unwrap(), 10);
    }

    #[test]
    fn test_allocate_full_array_resizes_backing_only() {
        let array = backing(10);
        let mut storage = StreamingStorage::new(array.clone(), 4, 0, 4).unwrap();
        storage.allocate_full_array(20).unwrap();
        assert_eq!(array.num_values().unwrap(), 20);
        assert_eq!(storage.descriptor().unwrap(), BlockDescriptor::new(4, 0, 4).unwrap());
    }

    #[test]
    fn test_shrink_leaves_descriptor() {
        let array = backing(10);
        let mut storage = StreamingStorage::new(array.clone(), 4, 2, 2).unwrap();
        storage.shrink(9).unwrap();
        assert_eq!(array.num_values().unwrap(), 9);
        assert_eq!(storage.num_values().unwrap(), 2);
        assert!(!storage.window_in_bounds().unwrap());
    }

    #[test]
    fn test_release_is_terminal() {
        let array = backing(10);
        let mut storage = StreamingStorage::new(array.clone(), 4, 0, 4).unwrap();
        storage.release_resources().unwrap();

        assert_eq!(array.num_values().unwrap(), 0);
        assert!(matches!(storage.portal_const(), Err(ArrayError::Released)));
        assert!(matches!(storage.release_resources(), Err(ArrayError::Released)));
    }

    #[test]
    fn test_portal_from_copies_descriptor() {
        let storage = StreamingStorage::new(backing(10), 3, 3, 1).unwrap();
        let portal = storage.portal().unwrap();
        let read = portal.to_const();
        assert_eq!(read.descriptor(), portal.descriptor());
        assert_eq!(read.to_vec(), vec![9]);
    }

    #[test]
    fn test_issued_portal_keeps_old_window() {
        let mut storage = StreamingStorage::new(backing(10), 4, 0, 4).unwrap();
        let first = storage.portal_const().unwrap();
        storage.set_descriptor(BlockDescriptor::new(4, 1, 4).unwrap()).unwrap();

        assert_eq!(first.get(0), 0);
        assert_eq!(storage.portal_const().unwrap().get(0), 4);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of window")]
    fn test_index_past_window_asserts() {
        let storage = StreamingStorage::new(backing(10), 4, 0, 4).unwrap();
        storage.portal_const().unwrap().get(4);
    }
}
