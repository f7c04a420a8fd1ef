//! Element types held by in-memory storage
//!
//! Basic storage keeps every value in its own lock-free cell so that portal
//! copies handed to different workers can read and write disjoint indices
//! without a lock. Each [`Element`] names the cell type it is stored in;
//! integers use the matching atomic, floats are stored by bit pattern.
//!
//! All cell accesses use `Relaxed` ordering. Ordering between workers is
//! established by whoever schedules them (joining a rayon scope, for example),
//! not by the cells.

use std::fmt::Debug;
use std::sync::atomic::{
    AtomicI16, AtomicI32, AtomicI64, AtomicI8, AtomicIsize, AtomicU16, AtomicU32, AtomicU64, AtomicU8, AtomicUsize,
    Ordering,
};

/// A value type that can live in a basic storage buffer
pub trait Element: Copy + Default + PartialEq + Debug + Send + Sync + 'static {
    /// Lock-free cell holding one value
    type Cell: Send + Sync;

    /// Create a cell holding `value`
    fn new_cell(value: Self) -> Self::Cell;

    /// Read the value in `cell`
    fn load(cell: &Self::Cell) -> Self;

    /// Overwrite the value in `cell`
    fn store(cell: &Self::Cell, value: Self);

    /// Convert a position into a value (used by counting arrays)
    fn from_index(index: usize) -> Self;

    /// `start + step * index`, wrapping on overflow for integers
    fn counting_value(start: Self, step: Self, index: usize) -> Self;
}

macro_rules! impl_element_int {
    ($ty:ty, $atomic:ty) => {
        impl Element for $ty {
            type Cell = $atomic;

            #[inline]
            fn new_cell(value: Self) -> Self::Cell {
                <$atomic>::new(value)
            }

            #[inline]
            fn load(cell: &Self::Cell) -> Self {
                cell.load(Ordering::Relaxed)
            }

            #[inline]
            fn store(cell: &Self::Cell, value: Self) {
                cell.store(value, Ordering::Relaxed)
            }

            #[inline]
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            fn from_index(index: usize) -> Self {
                index as Self
            }

            #[inline]
            fn counting_value(start: Self, step: Self, index: usize) -> Self {
                start.wrapping_add(step.wrapping_mul(Self::from_index(index)))
            }
        }
    };
}

macro_rules! impl_element_float {
    ($ty:ty, $atomic:ty) => {
        impl Element for $ty {
            type Cell = $atomic;

            #[inline]
            fn new_cell(value: Self) -> Self::Cell {
                <$atomic>::new(value.to_bits())
            }

            #[inline]
            fn load(cell: &Self::Cell) -> Self {
                <$ty>::from_bits(cell.load(Ordering::Relaxed))
            }

            #[inline]
            fn store(cell: &Self::Cell, value: Self) {
                cell.store(value.to_bits(), Ordering::Relaxed)
            }

            #[inline]
            #[allow(clippy::cast_precision_loss)]
            fn from_index(index: usize) -> Self {
                index as Self
            }

            #[inline]
            fn counting_value(start: Self, step: Self, index: usize) -> Self {
                start + step * Self::from_index(index)
            }
        }
    };
}

impl_element_int!(i8, AtomicI8);
impl_element_int!(i16, AtomicI16);
impl_element_int!(i32, AtomicI32);
impl_element_int!(i64, AtomicI64);
impl_element_int!(isize, AtomicIsize);
impl_element_int!(u8, AtomicU8);
impl_element_int!(u16, AtomicU16);
impl_element_int!(u32, AtomicU32);
impl_element_int!(u64, AtomicU64);
impl_element_int!(usize, AtomicUsize);

impl_element_float!(f32, AtomicU32);
impl_element_float!(f64, AtomicU64);
