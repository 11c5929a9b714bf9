use std::fmt;
use std::sync::Arc;

use colframe_error::{ColframeError, ColframeResult};

#[inline]
fn bytes_for(n_bits: usize) -> usize {
    n_bits.div_ceil(8)
}

#[inline]
unsafe fn get_bit_unchecked(bytes: &[u8], i: usize) -> bool {
    let byte = *bytes.get_unchecked(i / 8);
    (byte >> (i % 8)) & 1 == 1
}

/// An immutable container semantically equivalent to `Arc<Vec<bool>>` but
/// represented as `Arc<Vec<u8>>` where each boolean is a single bit.
///
/// Bit `i` set means "valid" (row present); bit `i` unset means null, per the
/// validity-bitmap convention in spec §3.
#[derive(Clone)]
pub struct Bitmap {
    bytes: Arc<[u8]>,
    offset: usize,
    length: usize,
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitmap {{ len: {}, offset: {} }}", self.length, self.offset)
    }
}

impl Bitmap {
    /// Build from packed bytes (bit `i` = `(bytes[i/8] >> (i%8)) & 1`).
    pub fn try_new(bytes: Vec<u8>, length: usize) -> ColframeResult<Self> {
        if length > bytes.len() * 8 {
            return Err(ColframeError::Internal(format!(
                "bitmap length {length} exceeds {} available bits",
                bytes.len() * 8
            )));
        }
        Ok(Self {
            bytes: Arc::from(bytes.into_boxed_slice()),
            offset: 0,
            length,
        })
    }

    pub fn new_zeroed(length: usize) -> Self {
        Self::try_new(vec![0u8; bytes_for(length)], length).unwrap()
    }

    pub fn new_set(length: usize) -> Self {
        Self::try_new(vec![0xffu8; bytes_for(length)], length).unwrap()
    }

    pub fn from_bools(bools: impl IntoIterator<Item = bool>) -> Self {
        let mut builder = BitmapBuilder::new();
        for b in bools {
            builder.push(b);
        }
        builder.finish()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.length, "index {i} out of bounds for len {}", self.length);
        unsafe { get_bit_unchecked(&self.bytes, self.offset + i) }
    }

    #[inline]
    pub unsafe fn get_unchecked(&self, i: usize) -> bool {
        get_bit_unchecked(&self.bytes, self.offset + i)
    }

    /// Zero-copy view: adjusts offset/length, shares the backing bytes.
    pub fn slice(&self, offset: usize, length: usize) -> Self {
        assert!(offset + length <= self.length, "slice out of bounds");
        Self {
            bytes: self.bytes.clone(),
            offset: self.offset + offset,
            length,
        }
    }

    pub fn set_count(&self) -> usize {
        (0..self.length).filter(|&i| self.get(i)).count()
    }

    pub fn unset_count(&self) -> usize {
        self.length - self.set_count()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.length).map(move |i| self.get(i))
    }

    /// Bitwise AND of two same-length bitmaps (used for composing validity).
    pub fn and(&self, other: &Bitmap) -> Bitmap {
        assert_eq!(self.length, other.length);
        Bitmap::from_bools(self.iter().zip(other.iter()).map(|(a, b)| a && b))
    }

    pub fn to_vec(&self) -> Vec<bool> {
        self.iter().collect()
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.iter().eq(other.iter())
    }
}

/// Growable builder for [`Bitmap`]; pushes one bit at a time or extends from
/// an existing bitmap/constant run.
pub struct BitmapBuilder {
    bits: Vec<bool>,
}

impl BitmapBuilder {
    pub fn new() -> Self {
        Self { bits: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            bits: Vec::with_capacity(cap),
        }
    }

    pub fn push(&mut self, value: bool) {
        self.bits.push(value);
    }

    pub fn extend_constant(&mut self, n: usize, value: bool) {
        self.bits.resize(self.bits.len() + n, value);
    }

    pub fn extend_from_bitmap(&mut self, bitmap: &Bitmap) {
        self.bits.extend(bitmap.iter());
    }

    pub fn finish(self) -> Bitmap {
        Bitmap::try_new(pack_bools(&self.bits), self.bits.len()).unwrap()
    }
}

impl Default for BitmapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn pack_bools(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bytes_for(bits.len())];
    for (i, &b) in bits.iter().enumerate() {
        if b {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let bits = [true, false, true, true, false, false, true];
        let bm = Bitmap::from_bools(bits);
        assert_eq!(bm.to_vec(), bits);
        assert_eq!(bm.set_count(), 4);
    }

    #[test]
    fn slice_is_zero_copy_view() {
        let bm = Bitmap::from_bools([true, false, true, true, false]);
        let sliced = bm.slice(1, 3);
        assert_eq!(sliced.to_vec(), vec![false, true, true]);
    }

    #[test]
    fn and_combines_validity() {
        let a = Bitmap::from_bools([true, true, false]);
        let b = Bitmap::from_bools([true, false, false]);
        assert_eq!(a.and(&b).to_vec(), vec![true, false, false]);
    }
}
