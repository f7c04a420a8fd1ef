//! Streaming array handle
//!
//! [`ArrayHandleStreaming`] walks a large backing array one block at a time.
//! It is an ordinary [`ArrayHandle`] over [`StreamingStorage`] (all standard
//! handle operations are reachable through `Deref`) plus window management.
//!
//! ```
//! use hologram_array::{ArrayHandle, ArrayHandleStreaming, ArrayPortal};
//!
//! let backing = ArrayHandle::from_vec((0..10).collect::<Vec<i32>>());
//! let stream = ArrayHandleStreaming::new(backing, 0, 4, 4)?;
//! assert_eq!(stream.to_vec()?, vec![0, 1, 2, 3]);
//!
//! stream.advance_to(2)?;
//! assert_eq!(stream.read_portal()?.to_vec(), vec![8, 9]);
//! # Ok::<(), hologram_array::ArrayError>(())
//! ```
//!
//! Moving the window is a single-writer operation: work running against
//! portals from the previous window must finish first. Portals already handed
//! out keep addressing the window they were built for.

use crate::error::Result;
use crate::handle::ArrayHandle;
use crate::storage::{BlockDescriptor, Storage, StreamingStorage};
use std::ops::Deref;

/// Handle exposing one block of a backing array at a time
pub struct ArrayHandleStreaming<S: Storage> {
    handle: ArrayHandle<StreamingStorage<S>>,
}

impl<S: Storage> ArrayHandleStreaming<S> {
    /// Stream over `input`, starting at block `block_index`
    ///
    /// The new handle inherits the input's config (device, grain size).
    ///
    /// # Errors
    ///
    /// - [`ArrayError::InvalidWindow`](crate::ArrayError::InvalidWindow) if
    ///   `current_block_size > block_size`
    /// - [`ArrayError::WindowOverflow`](crate::ArrayError::WindowOverflow) if
    ///   the window offset does not fit in `usize`
    /// - [`ArrayError::WindowOutOfRange`](crate::ArrayError::WindowOutOfRange)
    ///   if `input` holds values and the window does not lie inside them
    /// - any error `input` returns for its length or its read portal
    pub fn new(
        input: ArrayHandle<S>,
        block_index: usize,
        block_size: usize,
        current_block_size: usize,
    ) -> Result<Self> {
        let config = input.config();
        let storage = StreamingStorage::new(input, block_size, block_index, current_block_size)?;
        let stream = Self {
            handle: ArrayHandle::with_config(storage, config),
        };
        stream.sync_portal()?;

        tracing::debug!(block_size, block_index, current_block_size, "streaming_handle_created");
        Ok(stream)
    }

    /// Stream over `input` in blocks of `block_size`, positioned at block 0
    ///
    /// The first window is shortened if the input is smaller than one block.
    pub fn with_block_size(input: ArrayHandle<S>, block_size: usize) -> Result<Self> {
        let first = BlockDescriptor::for_block(input.num_values()?, block_size, 0)?;
        Self::new(input, first.block_index, first.block_size, first.current_block_size)
    }

    /// Stream over `input` using the block size from its config
    pub fn from_config(input: ArrayHandle<S>) -> Result<Self> {
        let block_size = input.config().block_size;
        Self::with_block_size(input, block_size)
    }

    /// Current window
    pub fn descriptor(&self) -> Result<BlockDescriptor> {
        self.handle.with_storage(|storage| storage.descriptor())
    }

    /// Index of the visible block
    pub fn block_index(&self) -> Result<usize> {
        Ok(self.descriptor()?.block_index)
    }

    /// Values per full block
    pub fn block_size(&self) -> Result<usize> {
        Ok(self.descriptor()?.block_size)
    }

    /// Values in the visible block
    pub fn current_block_size(&self) -> Result<usize> {
        Ok(self.descriptor()?.current_block_size)
    }

    /// Move the window to block `block_index`, keeping its current size
    ///
    /// Rejected with [`ArrayError::WindowOutOfRange`](crate::ArrayError::WindowOutOfRange)
    /// if the moved window misses a non-empty backing array.
    pub fn set_block_index(&self, block_index: usize) -> Result<()> {
        self.update_descriptor(|descriptor| {
            Ok(BlockDescriptor {
                block_index,
                ..descriptor
            })
        })
        .map(drop)
    }

    /// Change the number of values per full block
    pub fn set_block_size(&self, block_size: usize) -> Result<()> {
        self.update_descriptor(|descriptor| {
            BlockDescriptor::new(block_size, descriptor.block_index, descriptor.current_block_size)
        })
        .map(drop)
    }

    /// Change the number of visible values
    pub fn set_current_block_size(&self, current_block_size: usize) -> Result<()> {
        self.update_descriptor(|descriptor| {
            BlockDescriptor::new(descriptor.block_size, descriptor.block_index, current_block_size)
        })
        .map(drop)
    }

    /// Move the window to block `block_index`, sizing it from the backing length
    ///
    /// The final block of the backing array is shortened to whatever remains.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::WindowOutOfRange`](crate::ArrayError::WindowOutOfRange)
    /// if the block starts past the end of the backing array.
    pub fn advance_to(&self, block_index: usize) -> Result<BlockDescriptor> {
        let backing_len = self.backing_array()?.num_values()?;
        self.update_descriptor(|descriptor| BlockDescriptor::for_block(backing_len, descriptor.block_size, block_index))
    }

    /// Number of blocks covering the backing array
    pub fn num_blocks(&self) -> Result<usize> {
        let backing_len = self.backing_array()?.num_values()?;
        Ok(BlockDescriptor::num_blocks(backing_len, self.block_size()?))
    }

    /// Whether the window lies inside the backing array as currently allocated
    ///
    /// Goes false after a `shrink` cuts into the window; the caller must move
    /// the window before reading again.
    pub fn window_in_bounds(&self) -> Result<bool> {
        self.handle.with_storage(|storage| storage.window_in_bounds())
    }

    /// Backing array handle (shares storage with the stream)
    pub fn backing_array(&self) -> Result<ArrayHandle<S>> {
        self.handle.with_storage(|storage| storage.array().cloned())
    }

    /// Resize the backing array to `num_values`
    ///
    /// Cached portals of both the stream and the backing handle are dropped
    /// before capacity changes. The window is left as is.
    pub fn allocate_full_array(&self, num_values: usize) -> Result<()> {
        self.handle.allocate_full_array(num_values)
    }

    /// Generic handle over the streaming storage
    pub fn as_handle(&self) -> &ArrayHandle<StreamingStorage<S>> {
        &self.handle
    }

    /// Unwrap into the generic handle
    pub fn into_handle(self) -> ArrayHandle<StreamingStorage<S>> {
        self.handle
    }

    fn update_descriptor(
        &self,
        f: impl FnOnce(BlockDescriptor) -> Result<BlockDescriptor>,
    ) -> Result<BlockDescriptor> {
        let next = self.handle.modify_storage(|storage| {
            let next = f(storage.descriptor()?)?;
            storage.set_descriptor(next)?;
            Ok::<_, crate::ArrayError>(next)
        })?;
        self.sync_portal()?;
        Ok(next)
    }

    /// Rebuild the cached read portal so it carries the current descriptor
    fn sync_portal(&self) -> Result<()> {
        self.handle.invalidate_cache();
        self.handle.read_portal().map(drop)
    }
}

impl<S: Storage> Deref for ArrayHandleStreaming<S> {
    type Target = ArrayHandle<StreamingStorage<S>>;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl<S: Storage> Clone for ArrayHandleStreaming<S> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
        }
    }
}

impl<S: Storage> std::fmt::Debug for ArrayHandleStreaming<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.handle.with_storage(|storage| write!(f, "ArrayHandleStreaming({storage:?})"))
    }
}
