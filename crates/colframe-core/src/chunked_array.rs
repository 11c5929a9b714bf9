//! Typed, possibly multi-chunk columns (spec §3 "ChunkedArray").
//!
//! Each `*Chunked` type owns a `Vec` of chunks plus a name. Locating a
//! logical row is O(1) for the common single-chunk case and O(log
//! #chunks) otherwise, via binary search over cumulative chunk offsets
//! (spec §4.2's explicit algorithmic contract).

use colframe_arrow::{Bitmap, BitmapBuilder};
use colframe_error::{ColframeError, ColframeResult};
use colframe_utils::SmallStr;

use crate::chunk::{BinaryChunk, BooleanChunk, NativeType, PrimitiveChunk, StringChunk};

/// Locate which chunk (and offset within it) holds logical row `i`, or
/// `IndexOutOfRange` (spec §4.2) if `i` is beyond the array's total length.
fn locate(chunk_lens: &[usize], i: usize) -> ColframeResult<(usize, usize)> {
    if chunk_lens.len() == 1 {
        let len = chunk_lens[0];
        check_bounds(len, i)?;
        return Ok((0, i));
    }
    let mut offsets = Vec::with_capacity(chunk_lens.len());
    let mut acc = 0usize;
    for &len in chunk_lens {
        offsets.push(acc);
        acc += len;
    }
    check_bounds(acc, i)?;
    // Largest chunk index whose starting offset is `<= i` (cumulative
    // offsets are non-decreasing, so this is a binary search).
    let ci = offsets.partition_point(|&start| start <= i) - 1;
    Ok((ci, i - offsets[ci]))
}

macro_rules! chunked_common {
    ($ty:ident, $chunk:ty) => {
        impl $ty {
            pub fn name(&self) -> &str {
                &self.name
            }

            pub fn rename(&mut self, name: impl Into<SmallStr>) {
                self.name = name.into();
            }

            pub fn len(&self) -> usize {
                self.chunks.iter().map(<$chunk>::len).sum()
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            pub fn null_count(&self) -> usize {
                self.chunks.iter().map(<$chunk>::null_count).sum()
            }

            pub fn n_chunks(&self) -> usize {
                self.chunks.len()
            }

            fn chunk_lens(&self) -> Vec<usize> {
                self.chunks.iter().map(<$chunk>::len).collect()
            }

            pub fn is_valid(&self, i: usize) -> bool {
                locate(&self.chunk_lens(), i)
                    .map(|(ci, off)| self.chunks[ci].is_valid(off))
                    .unwrap_or(false)
            }
        }
    };
    ($ty:ident<$generic:ident : $bound:path>, $chunk:ty) => {
        impl<$generic: $bound> $ty<$generic> {
            pub fn name(&self) -> &str {
                &self.name
            }

            pub fn rename(&mut self, name: impl Into<SmallStr>) {
                self.name = name.into();
            }

            pub fn len(&self) -> usize {
                self.chunks.iter().map(<$chunk>::len).sum()
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            pub fn null_count(&self) -> usize {
                self.chunks.iter().map(<$chunk>::null_count).sum()
            }

            pub fn n_chunks(&self) -> usize {
                self.chunks.len()
            }

            fn chunk_lens(&self) -> Vec<usize> {
                self.chunks.iter().map(<$chunk>::len).collect()
            }

            pub fn is_valid(&self, i: usize) -> bool {
                locate(&self.chunk_lens(), i)
                    .map(|(ci, off)| self.chunks[ci].is_valid(off))
                    .unwrap_or(false)
            }
        }
    };
}

/// A named, chunked column of a fixed-width native type.
#[derive(Clone)]
pub struct ChunkedArray<T: NativeType> {
    name: SmallStr,
    chunks: Vec<PrimitiveChunk<T>>,
}

chunked_common!(ChunkedArray<T: NativeType>, PrimitiveChunk<T>);

impl<T: NativeType> ChunkedArray<T> {
    pub fn from_vec(name: impl Into<SmallStr>, values: Vec<T>) -> Self {
        Self {
            name: name.into(),
            chunks: vec![PrimitiveChunk::new(values, None)],
        }
    }

    pub fn from_slice_options(name: impl Into<SmallStr>, values: &[Option<T>]) -> Self {
        let mut builder = BitmapBuilder::with_capacity(values.len());
        let raw: Vec<T> = values
            .iter()
            .map(|v| match v {
                Some(x) => {
                    builder.push(true);
                    *x
                },
                None => {
                    builder.push(false);
                    T::ZERO
                },
            })
            .collect();
        let validity = builder.finish();
        let has_nulls = validity.unset_count() > 0;
        Self {
            name: name.into(),
            chunks: vec![PrimitiveChunk::new(raw, has_nulls.then_some(validity))],
        }
    }

    pub fn full_null(name: impl Into<SmallStr>, length: usize) -> Self {
        let values = vec![T::ZERO; length];
        let validity = Bitmap::new_zeroed(length);
        Self {
            name: name.into(),
            chunks: vec![PrimitiveChunk::new(values, Some(validity))],
        }
    }

    pub fn get(&self, i: usize) -> ColframeResult<Option<T>> {
        let (ci, off) = locate(&self.chunk_lens(), i)?;
        Ok(self.chunks[ci].get(off))
    }

    pub fn chunks(&self) -> &[PrimitiveChunk<T>] {
        &self.chunks
    }

    /// Iterate logical values across chunk boundaries.
    pub fn iter(&self) -> impl Iterator<Item = Option<T>> + '_ {
        self.chunks.iter().flat_map(|c| (0..c.len()).map(move |i| c.get(i)))
    }

    pub fn append(&mut self, other: &Self) {
        self.chunks.extend(other.chunks.iter().cloned());
    }

    pub fn slice(&self, offset: usize, length: usize) -> Self {
        let total = self.len();
        assert!(offset + length <= total, "slice out of bounds");
        let mut remaining = length;
        let mut pos = offset;
        let mut chunks = Vec::new();
        for chunk in &self.chunks {
            if remaining == 0 {
                break;
            }
            if pos >= chunk.len() {
                pos -= chunk.len();
                continue;
            }
            let take = (chunk.len() - pos).min(remaining);
            chunks.push(chunk.slice(pos, take));
            remaining -= take;
            pos = 0;
        }
        Self {
            name: self.name.clone(),
            chunks,
        }
    }

    /// Produce a new array with one chunk per contiguous run, taken from
    /// `indices` (each `None` becomes a null row regardless of validity at
    /// the source position). A `Some(i)` with `i` out of range fails with
    /// `IndexOutOfRange` (spec §4.5 `Take`'s strict-gather contract).
    pub fn take_opt(&self, indices: &[Option<u32>]) -> ColframeResult<Self> {
        let mut builder = BitmapBuilder::with_capacity(indices.len());
        let values: ColframeResult<Vec<T>> = indices
            .iter()
            .map(|idx| {
                Ok(match idx {
                    Some(i) => match self.get(*i as usize)? {
                        Some(v) => {
                            builder.push(true);
                            v
                        },
                        None => {
                            builder.push(false);
                            T::ZERO
                        },
                    },
                    None => {
                        builder.push(false);
                        T::ZERO
                    },
                })
            })
            .collect();
        let values = values?;
        let validity = builder.finish();
        let has_nulls = validity.unset_count() > 0;
        Ok(Self {
            name: self.name.clone(),
            chunks: vec![PrimitiveChunk::new(values, has_nulls.then_some(validity))],
        })
    }

    /// Collapse to a single contiguous chunk; no-op if already one chunk.
    pub fn rechunk(&self) -> Self {
        if self.chunks.len() <= 1 {
            return self.clone();
        }
        let indices: Vec<Option<u32>> = (0..self.len() as u32).map(Some).collect();
        self.take_opt(&indices).expect("rechunk indices are always in range")
    }
}

/// A named, chunked column of UTF-8 strings.
#[derive(Clone)]
pub struct StringChunked {
    name: SmallStr,
    chunks: Vec<StringChunk>,
}

chunked_common!(StringChunked, StringChunk);

impl StringChunked {
    pub fn from_opt_vec(name: impl Into<SmallStr>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            chunks: vec![StringChunk::new(values)],
        }
    }

    pub fn get(&self, i: usize) -> ColframeResult<Option<&str>> {
        let (ci, off) = locate(&self.chunk_lens(), i)?;
        Ok(self.chunks[ci].get(off))
    }

    pub fn chunks(&self) -> &[StringChunk] {
        &self.chunks
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.chunks.iter().flat_map(|c| (0..c.len()).map(move |i| c.get(i)))
    }

    pub fn append(&mut self, other: &Self) {
        self.chunks.extend(other.chunks.iter().cloned());
    }

    pub fn slice(&self, offset: usize, length: usize) -> Self {
        let mut remaining = length;
        let mut pos = offset;
        let mut chunks = Vec::new();
        for chunk in &self.chunks {
            if remaining == 0 {
                break;
            }
            if pos >= chunk.len() {
                pos -= chunk.len();
                continue;
            }
            let take = (chunk.len() - pos).min(remaining);
            chunks.push(chunk.slice(pos, take));
            remaining -= take;
            pos = 0;
        }
        Self {
            name: self.name.clone(),
            chunks,
        }
    }

    pub fn take_opt(&self, indices: &[Option<u32>]) -> ColframeResult<Self> {
        let values: ColframeResult<Vec<Option<String>>> = indices
            .iter()
            .map(|idx| match idx {
                Some(i) => Ok(self.get(*i as usize)?.map(|s| s.to_string())),
                None => Ok(None),
            })
            .collect();
        Ok(Self {
            name: self.name.clone(),
            chunks: vec![StringChunk::new(values?)],
        })
    }
}

/// A named, chunked column of binary blobs.
#[derive(Clone)]
pub struct BinaryChunked {
    name: SmallStr,
    chunks: Vec<BinaryChunk>,
}

chunked_common!(BinaryChunked, BinaryChunk);

impl BinaryChunked {
    pub fn from_opt_vec(name: impl Into<SmallStr>, values: Vec<Option<Vec<u8>>>) -> Self {
        Self {
            name: name.into(),
            chunks: vec![BinaryChunk::new(values)],
        }
    }

    pub fn get(&self, i: usize) -> ColframeResult<Option<&[u8]>> {
        let (ci, off) = locate(&self.chunk_lens(), i)?;
        Ok(self.chunks[ci].get(off))
    }

    pub fn chunks(&self) -> &[BinaryChunk] {
        &self.chunks
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&[u8]>> + '_ {
        self.chunks.iter().flat_map(|c| (0..c.len()).map(move |i| c.get(i)))
    }

    pub fn append(&mut self, other: &Self) {
        self.chunks.extend(other.chunks.iter().cloned());
    }

    pub fn slice(&self, offset: usize, length: usize) -> Self {
        let mut remaining = length;
        let mut pos = offset;
        let mut chunks = Vec::new();
        for chunk in &self.chunks {
            if remaining == 0 {
                break;
            }
            if pos >= chunk.len() {
                pos -= chunk.len();
                continue;
            }
            let take = (chunk.len() - pos).min(remaining);
            chunks.push(chunk.slice(pos, take));
            remaining -= take;
            pos = 0;
        }
        Self {
            name: self.name.clone(),
            chunks,
        }
    }
}

/// A named, chunked column of booleans.
#[derive(Clone)]
pub struct BooleanChunked {
    name: SmallStr,
    chunks: Vec<BooleanChunk>,
}

chunked_common!(BooleanChunked, BooleanChunk);

impl BooleanChunked {
    pub fn from_slice_options(name: impl Into<SmallStr>, values: &[Option<bool>]) -> Self {
        let mut vals = BitmapBuilder::with_capacity(values.len());
        let mut validity = BitmapBuilder::with_capacity(values.len());
        for v in values {
            match v {
                Some(b) => {
                    vals.push(*b);
                    validity.push(true);
                },
                None => {
                    vals.push(false);
                    validity.push(false);
                },
            }
        }
        let validity = validity.finish();
        let has_nulls = validity.unset_count() > 0;
        Self {
            name: name.into(),
            chunks: vec![BooleanChunk::new(vals.finish(), has_nulls.then_some(validity))],
        }
    }

    pub fn from_bitmap(name: impl Into<SmallStr>, values: Bitmap) -> Self {
        Self {
            name: name.into(),
            chunks: vec![BooleanChunk::new(values, None)],
        }
    }

    pub fn get(&self, i: usize) -> ColframeResult<Option<bool>> {
        let (ci, off) = locate(&self.chunk_lens(), i)?;
        Ok(self.chunks[ci].get(off))
    }

    pub fn chunks(&self) -> &[BooleanChunk] {
        &self.chunks
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<bool>> + '_ {
        self.chunks.iter().flat_map(|c| (0..c.len()).map(move |i| c.get(i)))
    }

    pub fn append(&mut self, other: &Self) {
        self.chunks.extend(other.chunks.iter().cloned());
    }

    pub fn slice(&self, offset: usize, length: usize) -> Self {
        let mut remaining = length;
        let mut pos = offset;
        let mut chunks = Vec::new();
        for chunk in &self.chunks {
            if remaining == 0 {
                break;
            }
            if pos >= chunk.len() {
                pos -= chunk.len();
                continue;
            }
            let take = (chunk.len() - pos).min(remaining);
            chunks.push(chunk.slice(pos, take));
            remaining -= take;
            pos = 0;
        }
        Self {
            name: self.name.clone(),
            chunks,
        }
    }

    /// Rechunk into a single contiguous chunk, OR-combining into one bitmap.
    pub fn rechunk(&self) -> Self {
        if self.chunks.len() <= 1 {
            return self.clone();
        }
        let values = Bitmap::from_bools(self.iter().map(|v| v.unwrap_or(false)));
        let validity = Bitmap::from_bools(self.iter().map(|v| v.is_some()));
        let has_nulls = validity.unset_count() > 0;
        Self {
            name: self.name.clone(),
            chunks: vec![BooleanChunk::new(values, has_nulls.then_some(validity))],
        }
    }
}

/// Shared bounds check used by operations that index by row.
pub fn check_bounds(len: usize, i: usize) -> ColframeResult<()> {
    if i >= len {
        return Err(ColframeError::oob(i, len));
    }
    Ok(())
}
