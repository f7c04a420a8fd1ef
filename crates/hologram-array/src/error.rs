//! Error types for the array layer
//!
//! Every variant here describes a caller programming error (touching an unbound
//! or released storage, resizing a read-only array, binding a window that does
//! not fit). None of them occur on the per-element hot path: portal `get`/`set`
//! never return errors.

use std::path::PathBuf;

/// Errors that can occur while acquiring portals or running lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum ArrayError {
    /// Storage was accessed before being bound to a backing array
    #[error("Storage is not bound to a backing array")]
    InvalidStorage,

    /// Storage was accessed after its resources were released
    #[error("Storage resources have been released")]
    Released,

    /// Block descriptor is malformed
    #[error("Invalid window: block size {block_size}, current block size {current_block_size}")]
    InvalidWindow { block_size: usize, current_block_size: usize },

    /// Window offset does not fit in `usize`
    #[error("Window offset overflows: block {block_index} of size {block_size}")]
    WindowOverflow { block_size: usize, block_index: usize },

    /// Window does not fit inside the backing array
    #[error("Window [{offset}, {offset} + {len}) exceeds backing array of length {backing_len}")]
    WindowOutOfRange { offset: usize, len: usize, backing_len: usize },

    /// Shrink requested a length larger than the current one
    #[error("Cannot shrink array of length {len} to {requested}")]
    ShrinkBeyondLength { requested: usize, len: usize },

    /// Host data length does not match the array length
    #[error("Array size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Storage cannot be allocated explicitly
    #[error("{storage} arrays cannot be allocated explicitly")]
    NotResizable { storage: &'static str },

    /// Storage computes its values and cannot be resized or written
    #[error("{storage} arrays are read-only")]
    ReadOnly { storage: &'static str },

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while loading an [`ArrayConfig`](crate::config::ArrayConfig)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {}: {}", .0.display(), .1)]
    IoError(PathBuf, #[source] std::io::Error),

    /// Config file is not valid TOML for this layout
    #[error("Failed to parse config {}: {}", .0.display(), .1)]
    ParseError(PathBuf, #[source] toml::de::Error),

    /// A field holds a value outside its valid range
    #[error("Invalid config value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: &'static str },
}

/// Result type for array operations
pub type Result<T> = std::result::Result<T, ArrayError>;
