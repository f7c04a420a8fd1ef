//! Basic in-memory storage
//!
//! Values live in a reference-counted buffer of [`Element`] cells. Portals hold
//! their own reference to the buffer, so cloning a portal is a refcount bump
//! and a portal can never dangle.
//!
//! Reallocation (allocate to a new length, shrink, release) swaps in a fresh
//! buffer. Portals issued before the swap keep the old buffer alive: reads and
//! writes through them still work but are detached from the array. Reacquire
//! portals after every lifecycle call.

use super::{Storage, WritableStorage};
use crate::element::Element;
use crate::error::{ArrayError, Result};
use crate::portal::{ArrayPortal, ArrayPortalMut, PortalFrom};
use std::fmt;
use std::sync::Arc;

/// Fixed-length run of element cells
struct Buffer<T: Element> {
    cells: Box<[T::Cell]>,
}

impl<T: Element> Buffer<T> {
    fn empty() -> Self {
        Self { cells: Box::new([]) }
    }

    fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        Self {
            cells: values.into_iter().map(T::new_cell).collect(),
        }
    }

    /// Copy of the first `len` values, padded with `T::default()`
    fn resized(&self, len: usize) -> Self {
        let kept = len.min(self.len());
        Self::from_values(
            (0..kept)
                .map(|i| self.get(i))
                .chain(std::iter::repeat(T::default()).take(len - kept)),
        )
    }

    #[inline]
    fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        T::load(&self.cells[index])
    }

    #[inline]
    fn set(&self, index: usize, value: T) {
        T::store(&self.cells[index], value)
    }
}

/// Contiguous in-memory storage
pub struct BasicStorage<T: Element> {
    buffer: Arc<Buffer<T>>,
}

impl<T: Element> BasicStorage<T> {
    /// Storage holding `values`
    pub fn from_vec(values: Vec<T>) -> Self {
        Self {
            buffer: Arc::new(Buffer::from_values(values)),
        }
    }

    /// Storage of `len` default values
    pub fn with_len(len: usize) -> Self {
        Self {
            buffer: Arc::new(Buffer::from_values(std::iter::repeat(T::default()).take(len))),
        }
    }

    /// Number of values in the buffer
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    fn replace_buffer(&mut self, buffer: Buffer<T>) {
        let old_len = self.buffer.len();
        self.buffer = Arc::new(buffer);
        tracing::debug!(old_len, new_len = self.buffer.len(), "basic_storage_reallocated");
    }
}

impl<T: Element> Default for BasicStorage<T> {
    fn default() -> Self {
        Self {
            buffer: Arc::new(Buffer::empty()),
        }
    }
}

impl<T: Element> Storage for BasicStorage<T> {
    type Value = T;
    type PortalConst = BasicPortalConst<T>;

    const NAME: &'static str = "basic";

    fn portal_const(&self) -> Result<Self::PortalConst> {
        Ok(BasicPortalConst {
            buffer: Arc::clone(&self.buffer),
        })
    }

    fn num_values(&self) -> Result<usize> {
        Ok(self.buffer.len())
    }

    /// Reallocate to `num_values`, keeping the common prefix
    ///
    /// Allocating the current length keeps the existing buffer (outstanding
    /// portals stay attached).
    fn allocate(&mut self, num_values: usize) -> Result<()> {
        if num_values != self.buffer.len() {
            let buffer = self.buffer.resized(num_values);
            self.replace_buffer(buffer);
        }
        Ok(())
    }

    fn shrink(&mut self, num_values: usize) -> Result<()> {
        let len = self.buffer.len();
        if num_values > len {
            return Err(ArrayError::ShrinkBeyondLength {
                requested: num_values,
                len,
            });
        }
        if num_values < len {
            let buffer = self.buffer.resized(num_values);
            self.replace_buffer(buffer);
        }
        Ok(())
    }

    fn release_resources(&mut self) -> Result<()> {
        self.replace_buffer(Buffer::empty());
        Ok(())
    }
}

impl<T: Element> WritableStorage for BasicStorage<T> {
    type Portal = BasicPortal<T>;

    fn portal(&self) -> Result<Self::Portal> {
        Ok(BasicPortal {
            buffer: Arc::clone(&self.buffer),
        })
    }
}

impl<T: Element> fmt::Debug for BasicStorage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BasicStorage(len={})", self.buffer.len())
    }
}

/// Writable portal over a basic storage buffer
pub struct BasicPortal<T: Element> {
    buffer: Arc<Buffer<T>>,
}

/// Read-only portal over a basic storage buffer
pub struct BasicPortalConst<T: Element> {
    buffer: Arc<Buffer<T>>,
}

// Manual impls: derive would require `T: Clone` on the cell type.
impl<T: Element> Clone for BasicPortal<T> {
    fn clone(&self) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl<T: Element> Clone for BasicPortalConst<T> {
    fn clone(&self) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl<T: Element> ArrayPortal for BasicPortal<T> {
    type Value = T;

    #[inline]
    fn num_values(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        self.buffer.get(index)
    }
}

impl<T: Element> ArrayPortalMut for BasicPortal<T> {
    type Const = BasicPortalConst<T>;

    #[inline]
    fn set(&self, index: usize, value: T) {
        self.buffer.set(index, value)
    }
}

impl<T: Element> ArrayPortal for BasicPortalConst<T> {
    type Value = T;

    #[inline]
    fn num_values(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        self.buffer.get(index)
    }
}

impl<T: Element> PortalFrom<BasicPortal<T>> for BasicPortalConst<T> {
    fn portal_from(other: BasicPortal<T>) -> Self {
        Self { buffer: other.buffer }
    }
}

impl<T: Element> BasicPortal<T> {
    /// Whether `self` and `other` address the same buffer
    pub fn shares_buffer_with(&self, other: &BasicPortal<T>) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }
}

impl<T: Element> fmt::Debug for BasicPortal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BasicPortal(len={})", self.buffer.len())
    }
}

impl<T: Element> fmt::Debug for BasicPortalConst<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BasicPortalConst(len={})", self.buffer.len())
    }
}
