//! # hologram-array - Storage-Agnostic Arrays and Streaming Windows
//!
//! Lets compute kernels read and write arrays the same way whether the values
//! live in memory, are computed on demand, or are only reachable one bounded
//! block at a time out of a much larger array.
//!
//! ## Core Concept
//!
//! ```text
//! ArrayHandle<S>          shared façade, caches read portal, forwards lifecycle
//!     │
//!     ▼
//! Storage (S)             owns/references values: allocate, shrink, release
//!     │  portal() / portal_const()
//!     ▼
//! Portal                  cheap value-copy accessor: num_values, get, set
//! ```
//!
//! Storages compose: a [`StreamingStorage`] wraps any backing handle, including
//! a [`ConcatenateStorage`] or another streaming storage, and its portal wraps
//! the backing portal with a block offset.
//!
//! ## Quick Start
//!
//! ```
//! use hologram_array::{ArrayHandle, ArrayHandleStreaming, ArrayPortal, ArrayPortalMut};
//!
//! // Backing array of 10 values, streamed in blocks of 4
//! let backing = ArrayHandle::from_vec((0..10).collect::<Vec<i32>>());
//! let stream = ArrayHandleStreaming::new(backing.clone(), 0, 4, 4)?;
//!
//! for block in 0..stream.num_blocks()? {
//!     stream.advance_to(block)?;
//!     let portal = stream.write_portal()?;
//!     for i in 0..portal.num_values() {
//!         portal.set(i, portal.get(i) * 2);
//!     }
//! }
//!
//! assert_eq!(backing.to_vec()?, vec![0, 2, 4, 6, 8, 10, 12, 14, 16, 18]);
//! # Ok::<(), hologram_array::ArrayError>(())
//! ```
//!
//! ## Architecture
//!
//! - **portal** - Portal traits and the explicit read-only conversion
//! - **storage** - Storage policies (basic, streaming, concatenate, zip, counting, implicit)
//! - **handle** - Shared array handle with portal cache
//! - **streaming** - Streaming handle with window management
//! - **device** - Explicit device selection and index scheduling
//! - **config** - Handle configuration (TOML loadable)
//!
//! ## Stale Portals
//!
//! Any `allocate`, `allocate_full_array`, `shrink` or `release_resources` call
//! may replace the backing buffer. Portals obtained earlier stay memory-safe
//! but are detached: they no longer see, or affect, the array. Reacquire
//! portals after every lifecycle call.
//!
//! ## Features
//!
//! - `threading` *(default)*: parallel device backed by rayon

pub mod config;
pub mod constants;
pub mod device;
pub mod element;
pub mod error;
pub mod handle;
pub mod portal;
pub mod storage;
pub mod streaming;

// Re-export primary types
pub use config::ArrayConfig;
pub use constants::{DEFAULT_BLOCK_SIZE, DEFAULT_GRAIN_SIZE};
pub use device::DeviceAdapterId;
pub use element::Element;
pub use error::{ArrayError, ConfigError, Result};
pub use handle::{ArrayHandle, BasicArrayHandle};
pub use portal::{ArrayPortal, ArrayPortalMut, PortalFrom, PortalValues};
pub use storage::{
    BasicPortal, BasicPortalConst, BasicStorage, BlockDescriptor, ConcatenatePortal, ConcatenateStorage,
    CountingPortal, CountingStorage, ImplicitPortal, ImplicitStorage, Lifecycle, Storage, StreamingPortal,
    StreamingStorage, WritableStorage, ZipPortal, ZipStorage,
};
pub use streaming::ArrayHandleStreaming;
