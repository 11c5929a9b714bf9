//! Immutable buffer chunks (spec §3 "Chunk"). Each chunk pairs a values
//! buffer with a parallel validity bitmap; once constructed, a chunk's
//! contents never change. Appending a chunk is the only way to grow a
//! [`crate::chunked_array::ChunkedArray`].

use std::sync::Arc;

use colframe_arrow::Bitmap;

/// Marker for the handful of primitive Rust types a [`PrimitiveChunk`] can
/// store. Kept deliberately small — this is the physical-storage trait, not
/// a user-facing dtype.
pub trait NativeType: Copy + Clone + PartialEq + PartialOrd + Send + Sync + std::fmt::Debug + 'static {
    const ZERO: Self;
}

macro_rules! impl_native {
    ($($t:ty),*) => {
        $(impl NativeType for $t { const ZERO: Self = 0 as $t; })*
    };
}
impl_native!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

/// A contiguous, shared, offset/length-sliceable buffer of `T`, with an
/// optional parallel validity bitmap (spec §3: bit=1 means valid).
#[derive(Clone)]
pub struct PrimitiveChunk<T: NativeType> {
    values: Arc<[T]>,
    validity: Option<Bitmap>,
    offset: usize,
    length: usize,
}

impl<T: NativeType> PrimitiveChunk<T> {
    pub fn new(values: Vec<T>, validity: Option<Bitmap>) -> Self {
        let length = values.len();
        if let Some(v) = &validity {
            assert_eq!(v.len(), length, "validity length must match values length");
        }
        Self {
            values: Arc::from(values.into_boxed_slice()),
            validity,
            offset: 0,
            length,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn null_count(&self) -> usize {
        self.validity.as_ref().map(|v| v.unset_count()).unwrap_or(0)
    }

    pub fn validity(&self) -> Option<&Bitmap> {
        self.validity.as_ref()
    }

    #[inline]
    pub fn is_valid(&self, i: usize) -> bool {
        self.validity.as_ref().map(|v| v.get(i)).unwrap_or(true)
    }

    #[inline]
    pub fn value(&self, i: usize) -> T {
        self.values[self.offset + i]
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<T> {
        if self.is_valid(i) {
            Some(self.value(i))
        } else {
            None
        }
    }

    /// Raw values slice for this chunk (nulls may hold garbage at that row).
    pub fn values_slice(&self) -> &[T] {
        &self.values[self.offset..self.offset + self.length]
    }

    pub fn slice(&self, offset: usize, length: usize) -> Self {
        assert!(offset + length <= self.length);
        Self {
            values: self.values.clone(),
            validity: self.validity.as_ref().map(|v| v.slice(offset, length)),
            offset: self.offset + offset,
            length,
        }
    }
}

/// A chunk of packed booleans: both values and validity are bitmaps.
#[derive(Clone)]
pub struct BooleanChunk {
    values: Bitmap,
    validity: Option<Bitmap>,
}

impl BooleanChunk {
    pub fn new(values: Bitmap, validity: Option<Bitmap>) -> Self {
        if let Some(v) = &validity {
            assert_eq!(v.len(), values.len());
        }
        Self { values, validity }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.validity.as_ref().map(|v| v.unset_count()).unwrap_or(0)
    }

    pub fn validity(&self) -> Option<&Bitmap> {
        self.validity.as_ref()
    }

    pub fn is_valid(&self, i: usize) -> bool {
        self.validity.as_ref().map(|v| v.get(i)).unwrap_or(true)
    }

    pub fn value(&self, i: usize) -> bool {
        self.values.get(i)
    }

    pub fn get(&self, i: usize) -> Option<bool> {
        if self.is_valid(i) {
            Some(self.value(i))
        } else {
            None
        }
    }

    pub fn values(&self) -> &Bitmap {
        &self.values
    }

    pub fn slice(&self, offset: usize, length: usize) -> Self {
        Self {
            values: self.values.slice(offset, length),
            validity: self.validity.as_ref().map(|v| v.slice(offset, length)),
        }
    }
}

/// A chunk of variable-length UTF-8 strings: an `i64` offsets buffer plus a
/// concatenated bytes buffer (spec §3).
#[derive(Clone)]
pub struct StringChunk {
    offsets: Arc<[i64]>,
    data: Arc<[u8]>,
    validity: Option<Bitmap>,
    offset: usize,
    length: usize,
}

impl StringChunk {
    pub fn new(values: Vec<Option<String>>) -> Self {
        let mut offsets = Vec::with_capacity(values.len() + 1);
        let mut data = Vec::new();
        let mut validity = colframe_arrow::BitmapBuilder::with_capacity(values.len());
        offsets.push(0i64);
        for v in &values {
            match v {
                Some(s) => {
                    data.extend_from_slice(s.as_bytes());
                    validity.push(true);
                },
                None => validity.push(false),
            }
            offsets.push(data.len() as i64);
        }
        let validity = validity.finish();
        let has_nulls = validity.unset_count() > 0;
        Self {
            offsets: Arc::from(offsets.into_boxed_slice()),
            data: Arc::from(data.into_boxed_slice()),
            validity: has_nulls.then_some(validity),
            offset: 0,
            length: values.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn null_count(&self) -> usize {
        self.validity.as_ref().map(|v| v.unset_count()).unwrap_or(0)
    }

    pub fn validity(&self) -> Option<&Bitmap> {
        self.validity.as_ref()
    }

    pub fn is_valid(&self, i: usize) -> bool {
        self.validity.as_ref().map(|v| v.get(i)).unwrap_or(true)
    }

    pub fn value(&self, i: usize) -> &str {
        let row = self.offset + i;
        let start = self.offsets[row] as usize;
        let end = self.offsets[row + 1] as usize;
        std::str::from_utf8(&self.data[start..end]).expect("chunk holds valid utf-8")
    }

    pub fn get(&self, i: usize) -> Option<&str> {
        if self.is_valid(i) {
            Some(self.value(i))
        } else {
            None
        }
    }

    pub fn slice(&self, offset: usize, length: usize) -> Self {
        assert!(offset + length <= self.length);
        Self {
            offsets: self.offsets.clone(),
            data: self.data.clone(),
            validity: self.validity.as_ref().map(|v| v.slice(offset, length)),
            offset: self.offset + offset,
            length,
        }
    }
}

/// A chunk of variable-length binary blobs; same layout as [`StringChunk`]
/// without the UTF-8 invariant.
#[derive(Clone)]
pub struct BinaryChunk {
    offsets: Arc<[i64]>,
    data: Arc<[u8]>,
    validity: Option<Bitmap>,
    offset: usize,
    length: usize,
}

impl BinaryChunk {
    pub fn new(values: Vec<Option<Vec<u8>>>) -> Self {
        let mut offsets = Vec::with_capacity(values.len() + 1);
        let mut data = Vec::new();
        let mut validity = colframe_arrow::BitmapBuilder::with_capacity(values.len());
        offsets.push(0i64);
        for v in &values {
            match v {
                Some(bytes) => {
                    data.extend_from_slice(bytes);
                    validity.push(true);
                },
                None => validity.push(false),
            }
            offsets.push(data.len() as i64);
        }
        let validity = validity.finish();
        let has_nulls = validity.unset_count() > 0;
        Self {
            offsets: Arc::from(offsets.into_boxed_slice()),
            data: Arc::from(data.into_boxed_slice()),
            validity: has_nulls.then_some(validity),
            offset: 0,
            length: values.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn null_count(&self) -> usize {
        self.validity.as_ref().map(|v| v.unset_count()).unwrap_or(0)
    }

    pub fn validity(&self) -> Option<&Bitmap> {
        self.validity.as_ref()
    }

    pub fn is_valid(&self, i: usize) -> bool {
        self.validity.as_ref().map(|v| v.get(i)).unwrap_or(true)
    }

    pub fn value(&self, i: usize) -> &[u8] {
        let row = self.offset + i;
        let start = self.offsets[row] as usize;
        let end = self.offsets[row + 1] as usize;
        &self.data[start..end]
    }

    pub fn get(&self, i: usize) -> Option<&[u8]> {
        if self.is_valid(i) {
            Some(self.value(i))
        } else {
            None
        }
    }

    pub fn slice(&self, offset: usize, length: usize) -> Self {
        assert!(offset + length <= self.length);
        Self {
            offsets: self.offsets.clone(),
            data: self.data.clone(),
            validity: self.validity.as_ref().map(|v| v.slice(offset, length)),
            offset: self.offset + offset,
            length,
        }
    }
}
