//! A minimal Arrow-style validity bitmap: an immutable, reference-counted,
//! 1-bit-per-row buffer that supports O(1) zero-copy slicing.
//!
//! This is a deliberately smaller cousin of `polars-arrow`'s
//! `bitmap::immutable::Bitmap` (see `reference/polars-arrow_bitmap_immutable.rs`):
//! it drops the unset-bit-count cache and the `SharedStorage`/`MutableBitmap`
//! copy-on-write machinery, keeping only what chunked arrays need — shared
//! bytes, an offset, a length, and bit-level random access.

pub mod bitmap;

pub use bitmap::{Bitmap, BitmapBuilder};
