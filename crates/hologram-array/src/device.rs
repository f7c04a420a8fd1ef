//! Device selection and index scheduling
//!
//! The array layer never picks a device on its own. A [`DeviceAdapterId`] is
//! carried in [`ArrayConfig`](crate::config::ArrayConfig) and threaded into
//! every [`ArrayHandle`](crate::ArrayHandle) built from it; bulk handle
//! operations (`fill`, `copy_from_slice`) schedule their per-index work on it.
//!
//! Scheduling hands each worker a contiguous, disjoint range of indices. Portals
//! captured by the closure are shared by reference across workers, which is
//! sound because portals are `Sync` and element cells are lock-free.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution device an array handle schedules its bulk work on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceAdapterId {
    /// Single-threaded, in index order
    #[default]
    Serial,
    /// Rayon thread pool (falls back to serial without the `threading` feature)
    Parallel,
}

impl DeviceAdapterId {
    /// Run `f` once for every index in `0..len`
    ///
    /// `grain` is the minimum number of consecutive indices handed to one
    /// worker on the parallel device; it is ignored by the serial device.
    pub fn schedule<F>(self, len: usize, grain: usize, f: F)
    where
        F: Fn(usize) + Send + Sync,
    {
        if len == 0 {
            return;
        }

        match self {
            Self::Serial => (0..len).for_each(f),
            Self::Parallel => schedule_parallel(len, grain, f),
        }
    }

    /// Whether this device runs work on more than one thread
    pub fn is_parallel(self) -> bool {
        matches!(self, Self::Parallel) && cfg!(feature = "threading")
    }
}

#[cfg(feature = "threading")]
fn schedule_parallel<F>(len: usize, grain: usize, f: F)
where
    F: Fn(usize) + Send + Sync,
{
    use rayon::prelude::*;

    (0..len).into_par_iter().with_min_len(grain.max(1)).for_each(f);
}

#[cfg(not(feature = "threading"))]
fn schedule_parallel<F>(len: usize, _grain: usize, f: F)
where
    F: Fn(usize) + Send + Sync,
{
    (0..len).for_each(f);
}

impl fmt::Display for DeviceAdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => write!(f, "serial"),
            Self::Parallel => write!(f, "parallel"),
        }
    }
}
