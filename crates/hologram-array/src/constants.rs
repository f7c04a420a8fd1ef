//! Constants and Default Values
//!
//! Defaults used when no [`ArrayConfig`](crate::config::ArrayConfig) overrides them.

/// Default number of values in one streaming block
///
/// 64 Ki values keeps a block of `f64` at 512 KiB, small enough to stay
/// cache-friendly on the CPU device and large enough that per-block overhead
/// (portal acquisition, descriptor update) is negligible.
///
/// Configurable via `block_size` in the config file or
/// [`ArrayConfig::with_block_size`](crate::config::ArrayConfig::with_block_size).
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Default minimum number of indices handed to one worker by the parallel device
///
/// Below this, rayon's splitting overhead dominates the per-index work of
/// simple fills and copies.
pub const DEFAULT_GRAIN_SIZE: usize = 4096;
