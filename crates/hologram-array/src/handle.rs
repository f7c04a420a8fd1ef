//! Array handles
//!
//! An [`ArrayHandle`] is the public façade over a storage. Cloning a handle is
//! shallow: every clone shares the same storage, so resizing through one clone
//! is seen by all of them.
//!
//! # Portal cache
//!
//! The handle caches the read-only portal it last built so repeated
//! [`read_portal`](ArrayHandle::read_portal) calls do not go back to the
//! storage. Every lifecycle operation drops that cache *before* it reaches the
//! storage, so the cache never outlives the buffer it points at.
//!
//! A handle over a composed storage (streaming, concatenate, zip) also caches
//! portals built from *other* handles, which can be resized behind its back.
//! Every handle therefore keeps a generation counter, bumped by each
//! lifecycle operation. A cached portal remembers the combined generation it
//! was built at (this handle's plus every handle it reads through) and is
//! rebuilt once that number moves.
//!
//! # Locking
//!
//! Handle state sits behind a `parking_lot::RwLock` that is held only while a
//! portal is built or a lifecycle call runs. Element access through portals
//! never touches it.

use crate::config::ArrayConfig;
use crate::device::DeviceAdapterId;
use crate::element::Element;
use crate::error::{ArrayError, Result};
use crate::portal::{ArrayPortal, ArrayPortalMut};
use crate::storage::{BasicStorage, Lifecycle, Storage, WritableStorage};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Handle over an in-memory array
pub type BasicArrayHandle<T> = ArrayHandle<BasicStorage<T>>;

struct HandleState<S: Storage> {
    storage: S,
    cached_read: Option<(S::PortalConst, u64)>,
    config: ArrayConfig,
    generation: u64,
}

impl<S: Storage> HandleState<S> {
    fn generation(&self) -> u64 {
        self.generation.wrapping_add(self.storage.generation())
    }

    fn fresh_portal(&self) -> Option<&S::PortalConst> {
        match &self.cached_read {
            Some((portal, built_at)) if *built_at == self.generation() => Some(portal),
            _ => None,
        }
    }

    fn invalidate(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.cached_read = None;
    }
}

/// Shared handle over a storage policy
pub struct ArrayHandle<S: Storage> {
    state: Arc<RwLock<HandleState<S>>>,
}

impl<S: Storage> ArrayHandle<S> {
    /// Wrap `storage` with the default config (serial device)
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, ArrayConfig::default())
    }

    /// Wrap `storage`, scheduling bulk work on `config.device`
    pub fn with_config(storage: S, config: ArrayConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(HandleState {
                storage,
                cached_read: None,
                config,
                generation: 0,
            })),
        }
    }

    /// Config this handle was built with
    pub fn config(&self) -> ArrayConfig {
        self.state.read().config
    }

    /// Device bulk operations run on
    pub fn device(&self) -> DeviceAdapterId {
        self.state.read().config.device
    }

    /// Read-only portal over the current values
    ///
    /// Served from the handle's cache unless this handle, or a handle it reads
    /// through, ran a lifecycle operation since the portal was built.
    pub fn read_portal(&self) -> Result<S::PortalConst> {
        if let Some(portal) = self.state.read().fresh_portal() {
            return Ok(portal.clone());
        }

        let mut state = self.state.write();
        // Another clone may have refreshed the cache between the two locks.
        if let Some(portal) = state.fresh_portal() {
            return Ok(portal.clone());
        }
        let built_at = state.generation();
        let portal = state.storage.portal_const()?;
        state.cached_read = Some((portal.clone(), built_at));
        tracing::trace!(storage = S::NAME, num_values = portal.num_values(), built_at, "read_portal_cached");
        Ok(portal)
    }

    /// Number of values visible through this handle's portals
    pub fn num_values(&self) -> Result<usize> {
        self.state.read().storage.num_values()
    }

    /// Resize the visible array (see [`Storage::allocate`])
    #[tracing::instrument(level = "debug", skip(self), fields(storage = S::NAME))]
    pub fn allocate(&self, num_values: usize) -> Result<()> {
        self.modify_storage(|storage| storage.allocate(num_values))
    }

    /// Resize the true backing store (see [`Storage::allocate_full_array`])
    #[tracing::instrument(level = "debug", skip(self), fields(storage = S::NAME))]
    pub fn allocate_full_array(&self, num_values: usize) -> Result<()> {
        self.modify_storage(|storage| storage.allocate_full_array(num_values))
    }

    /// Reduce the backing store to its first `num_values` values
    #[tracing::instrument(level = "debug", skip(self), fields(storage = S::NAME))]
    pub fn shrink(&self, num_values: usize) -> Result<()> {
        self.modify_storage(|storage| storage.shrink(num_values))
    }

    /// Free the backing store
    #[tracing::instrument(level = "debug", skip(self), fields(storage = S::NAME))]
    pub fn release_resources(&self) -> Result<()> {
        self.modify_storage(|storage| storage.release_resources())
    }

    /// Whether `op` would succeed on this handle's storage, without running it
    pub fn check(&self, op: Lifecycle) -> Result<()> {
        self.state.read().storage.check(op)
    }

    /// Counter that moves whenever this handle, or a handle it reads through,
    /// runs a lifecycle operation
    pub fn generation(&self) -> u64 {
        self.state.read().generation()
    }

    /// Copy every visible value into a `Vec`
    pub fn to_vec(&self) -> Result<Vec<S::Value>> {
        Ok(self.read_portal()?.to_vec())
    }

    /// Whether a cached read-only portal is present and still current
    pub fn has_cached_portal(&self) -> bool {
        self.state.read().fresh_portal().is_some()
    }

    /// Whether `self` and `other` share one storage
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Run `f` with shared access to the storage
    pub fn with_storage<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.read().storage)
    }

    /// Run `f` with exclusive access to the storage
    ///
    /// The cached portal is dropped first; whatever `f` changes is picked up
    /// by the next `read_portal` call.
    pub(crate) fn modify_storage<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut state = self.state.write();
        state.invalidate();
        f(&mut state.storage)
    }

    /// Drop the cached portal and bump the generation
    pub(crate) fn invalidate_cache(&self) {
        self.state.write().invalidate();
    }
}

impl<S: WritableStorage> ArrayHandle<S> {
    /// Writable portal over the current values
    pub fn write_portal(&self) -> Result<S::Portal> {
        self.state.read().storage.portal()
    }

    /// Set every visible value to `value` on the handle's device
    #[tracing::instrument(level = "debug", skip(self, value), fields(storage = S::NAME))]
    pub fn fill(&self, value: S::Value) -> Result<()>
    where
        S::Value: Clone + Send + Sync,
    {
        let portal = self.write_portal()?;
        let config = self.config();
        config
            .device
            .schedule(portal.num_values(), config.grain_size, |i| portal.set(i, value.clone()));
        Ok(())
    }

    /// Overwrite every visible value from `values` on the handle's device
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::SizeMismatch`] if `values` is not exactly as long
    /// as the array.
    #[tracing::instrument(level = "debug", skip(self, values), fields(storage = S::NAME, len = values.len()))]
    pub fn copy_from_slice(&self, values: &[S::Value]) -> Result<()>
    where
        S::Value: Clone + Send + Sync,
    {
        let portal = self.write_portal()?;
        if values.len() != portal.num_values() {
            return Err(ArrayError::SizeMismatch {
                expected: portal.num_values(),
                actual: values.len(),
            });
        }
        let config = self.config();
        config
            .device
            .schedule(values.len(), config.grain_size, |i| portal.set(i, values[i].clone()));
        Ok(())
    }
}

impl<T: Element> ArrayHandle<BasicStorage<T>> {
    /// In-memory handle holding `values`
    pub fn from_vec(values: Vec<T>) -> Self {
        Self::new(BasicStorage::from_vec(values))
    }

    /// In-memory handle of `len` default values
    pub fn new_basic(len: usize) -> Self {
        Self::new(BasicStorage::with_len(len))
    }
}

impl<S: Storage> Clone for ArrayHandle<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: Storage + Default> Default for ArrayHandle<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: Storage + fmt::Debug> fmt::Debug for ArrayHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("ArrayHandle")
            .field("storage", &state.storage)
            .field("device", &state.config.device)
            .field("generation", &state.generation())
            .field("cached", &state.fresh_portal().is_some())
            .finish()
    }
}
