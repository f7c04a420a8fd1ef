//! Storage policies
//!
//! A storage owns or references the values of an array and knows how to
//! allocate, shrink and release them. It hands out portals bound to its current
//! state; it never hands out references into itself, so the handle that owns it
//! can keep it behind a lock while portal copies roam freely.
//!
//! # Storage Kinds
//!
//! | Storage | Values | Writable | Resizable |
//! |---------|--------|----------|-----------|
//! | [`BasicStorage`] | in-memory buffer | yes | yes |
//! | [`StreamingStorage`] | window over a backing handle | if backing is | backing only |
//! | [`ConcatenateStorage`] | two handles back to back | if both are | shrink only |
//! | [`ZipStorage`] | pairs from two handles | if both are | yes |
//! | [`CountingStorage`] | `start + step * i` | no | no |
//! | [`ImplicitStorage`] | functor of the index | no | no |
//!
//! # Two allocation operations
//!
//! [`Storage::allocate`] resizes *this* array's visible values.
//! [`Storage::allocate_full_array`] resizes the true backing store. For most
//! storages they are the same operation; for streaming storage `allocate` is a
//! no-op (the window size is fixed by its block descriptor) and only
//! `allocate_full_array` reaches the backing array.
//!
//! # Composed storages
//!
//! Storages that read through other handles (streaming, concatenate, zip)
//! report those handles' [`generation`](Storage::generation) so the owning
//! handle can tell when a cached portal went stale underneath it. They also
//! [`check`](Storage::check) every inner handle before mutating any of them,
//! so a failing lifecycle call leaves all sides untouched.

pub mod basic;
pub mod concatenate;
pub mod counting;
pub mod implicit;
pub mod streaming;
pub mod zip;

pub use basic::{BasicPortal, BasicPortalConst, BasicStorage};
pub use concatenate::{ConcatenatePortal, ConcatenateStorage};
pub use counting::{CountingPortal, CountingStorage};
pub use implicit::{ImplicitPortal, ImplicitStorage};
pub use streaming::{BlockDescriptor, StreamingPortal, StreamingStorage};
pub use zip::{ZipPortal, ZipStorage};

use crate::error::{ArrayError, Result};
use crate::portal::{ArrayPortal, ArrayPortalMut};

/// A lifecycle operation, named so it can be checked before it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// [`Storage::allocate`]
    Allocate(usize),
    /// [`Storage::allocate_full_array`]
    AllocateFullArray(usize),
    /// [`Storage::shrink`]
    Shrink(usize),
    /// [`Storage::release_resources`]
    Release,
}

/// Read side and lifecycle of a storage policy
///
/// Every operation that touches the storage's state returns a [`Result`]: a
/// storage may be unbound or released, and read-only storages reject resizing.
/// Portals obtained before an `allocate`, `allocate_full_array`, `shrink` or
/// `release_resources` call are stale afterwards and must be reacquired.
pub trait Storage {
    /// Value type of the array
    type Value;

    /// Read-only portal type
    type PortalConst: ArrayPortal<Value = Self::Value>;

    /// Short name used in logs and errors
    const NAME: &'static str;

    /// Read-only portal bound to the current state
    fn portal_const(&self) -> Result<Self::PortalConst>;

    /// Number of values visible through this storage's portals
    fn num_values(&self) -> Result<usize>;

    /// Resize the visible array to `num_values`
    fn allocate(&mut self, num_values: usize) -> Result<()>;

    /// Resize the true backing store to `num_values`
    ///
    /// Defaults to [`allocate`](Self::allocate); storages that present a view
    /// over a larger array override it.
    fn allocate_full_array(&mut self, num_values: usize) -> Result<()> {
        self.allocate(num_values)
    }

    /// Reduce the backing store to its first `num_values` values
    fn shrink(&mut self, num_values: usize) -> Result<()>;

    /// Free the backing store
    fn release_resources(&mut self) -> Result<()>;

    /// Whether `op` would succeed, without running it
    ///
    /// The default accepts everything except shrinking past the current length.
    fn check(&self, op: Lifecycle) -> Result<()> {
        if let Lifecycle::Shrink(requested) = op {
            let len = self.num_values()?;
            if requested > len {
                return Err(ArrayError::ShrinkBeyondLength { requested, len });
            }
        }
        Ok(())
    }

    /// Combined generation of the handles this storage reads through
    ///
    /// Storages that own their values return 0.
    fn generation(&self) -> u64 {
        0
    }
}

/// Storage that can also hand out writable portals
pub trait WritableStorage: Storage {
    /// Writable portal type
    type Portal: ArrayPortalMut<Value = Self::Value>;

    /// Writable portal bound to the current state
    fn portal(&self) -> Result<Self::Portal>;
}
