//! Vectorized kernels operating directly on contiguous value slices plus an
//! optional validity [`Bitmap`](colframe_arrow::Bitmap).
//!
//! This crate knows nothing about `Series`/`ChunkedArray` (those live in
//! `colframe-core`, which depends on this crate, not the other way round);
//! callers rechunk to a single contiguous buffer before invoking a kernel,
//! the same boundary `polars-compute` draws against `polars-core`.

pub mod aggregate;
pub mod arithmetic;
pub mod comparison;
pub mod sort;
pub mod take;

use num_traits::{NumCast, Zero};

/// The physical numeric element types these kernels are generic over.
pub trait Number:
    Copy
    + PartialOrd
    + PartialEq
    + Send
    + Sync
    + Zero
    + NumCast
    + std::ops::Add<Output = Self>
    + std::ops::Sub<Output = Self>
    + std::ops::Mul<Output = Self>
    + std::ops::Div<Output = Self>
    + std::fmt::Debug
    + 'static
{
    /// Whether the type has a NaN concept at all (only floats do).
    const HAS_NAN: bool;
    fn is_nan(&self) -> bool;
}

macro_rules! impl_number_int {
    ($($t:ty),*) => {
        $(impl Number for $t {
            const HAS_NAN: bool = false;
            #[inline]
            fn is_nan(&self) -> bool { false }
        })*
    };
}

macro_rules! impl_number_float {
    ($($t:ty),*) => {
        $(impl Number for $t {
            const HAS_NAN: bool = true;
            #[inline]
            fn is_nan(&self) -> bool { <$t>::is_nan(*self) }
        })*
    };
}

impl_number_int!(i8, i16, i32, i64, u8, u16, u32, u64);
impl_number_float!(f32, f64);

/// Whether integer division should be checked for an exact zero divisor.
/// Floats never error here (per IEEE, yield `inf`/`NaN`), only integers do
/// (spec §7 `DivisionByZero`).
pub fn is_integer_like<T: Number>() -> bool {
    !T::HAS_NAN
}
