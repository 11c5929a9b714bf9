//! Composite key encoding shared by group-by and hash join (spec §4.8/§4.9,
//! §9 "hash table open-addressing contract").
//!
//! Both operators need to hash and compare a *row* across several columns
//! at once. Rather than build a tuple-keyed hash map generic over every
//! combination of physical types, every row's key columns are encoded into
//! one `Vec<u8>`: a type tag byte, then a 4-byte little-endian length prefix
//! and the value's raw bytes, concatenated column-by-column in the order
//! the caller asked for. Two rows produce identical bytes iff they agree on
//! dtype and value for every key column, which is exactly `Eq`/`Hash` for a
//! `Vec<u8>` key in a `hashbrown`/`ahash` table.
//!
//! Floats get one extra step: `NaN` bit patterns are canonicalized before
//! encoding so every `NaN` (however it arose) lands in the same bucket, per
//! the group-by "single canonical NaN group" decision. Join equality still
//! treats NaN as never matching anything — join achieves that by checking
//! [`row_has_null`]-style NaN exclusion at the predicate level
//! (`colframe-expr`'s `compare_any`), not by varying this encoding; the
//! join build/probe key columns the engine uses internally never compare
//! float columns directly, since join keys are equality-checked through a
//! row-value comparison that already makes NaN != NaN (see `join.rs`).

use colframe_core::series::AnyValue;
use colframe_core::DataFrame;
use colframe_error::ColframeResult;

const NAN_F32_BITS: u32 = 0x7fc0_0000;
const NAN_F64_BITS: u64 = 0x7ff8_0000_0000_0000;

fn tag(v: &AnyValue) -> u8 {
    match v {
        AnyValue::Null => 0,
        AnyValue::Boolean(_) => 1,
        AnyValue::Int8(_) => 2,
        AnyValue::Int16(_) => 3,
        AnyValue::Int32(_) => 4,
        AnyValue::Int64(_) => 5,
        AnyValue::UInt8(_) => 6,
        AnyValue::UInt16(_) => 7,
        AnyValue::UInt32(_) => 8,
        AnyValue::UInt64(_) => 9,
        AnyValue::Float32(_) => 10,
        AnyValue::Float64(_) => 11,
        AnyValue::String(_) => 12,
        AnyValue::Binary(_) => 13,
    }
}

fn encode_value(out: &mut Vec<u8>, v: &AnyValue) {
    out.push(tag(v));
    match v {
        AnyValue::Null => {},
        AnyValue::Boolean(b) => out.push(*b as u8),
        AnyValue::Int8(x) => out.extend_from_slice(&x.to_le_bytes()),
        AnyValue::Int16(x) => out.extend_from_slice(&x.to_le_bytes()),
        AnyValue::Int32(x) => out.extend_from_slice(&x.to_le_bytes()),
        AnyValue::Int64(x) => out.extend_from_slice(&x.to_le_bytes()),
        AnyValue::UInt8(x) => out.extend_from_slice(&x.to_le_bytes()),
        AnyValue::UInt16(x) => out.extend_from_slice(&x.to_le_bytes()),
        AnyValue::UInt32(x) => out.extend_from_slice(&x.to_le_bytes()),
        AnyValue::UInt64(x) => out.extend_from_slice(&x.to_le_bytes()),
        AnyValue::Float32(x) => {
            let bits = if x.is_nan() { NAN_F32_BITS } else { x.to_bits() };
            out.extend_from_slice(&bits.to_le_bytes());
        },
        AnyValue::Float64(x) => {
            let bits = if x.is_nan() { NAN_F64_BITS } else { x.to_bits() };
            out.extend_from_slice(&bits.to_le_bytes());
        },
        AnyValue::String(s) => {
            let bytes = s.as_bytes();
            out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            out.extend_from_slice(bytes);
        },
        AnyValue::Binary(b) => {
            out.extend_from_slice(&(b.len() as u32).to_le_bytes());
            out.extend_from_slice(b);
        },
    }
}

/// Encode one composite key per row of `df`, over the named columns in the
/// order given.
pub fn encode_keys(df: &DataFrame, names: &[&str]) -> ColframeResult<Vec<Vec<u8>>> {
    let cols: Vec<_> = names.iter().map(|n| df.column(n)).collect::<ColframeResult<_>>()?;
    (0..df.height())
        .map(|row| {
            let mut bytes = Vec::new();
            for col in &cols {
                encode_value(&mut bytes, &col.get(row)?);
            }
            Ok(bytes)
        })
        .collect()
}

/// True if any of the named columns is null at `row` — used by join to
/// exclude a row from ever matching (spec §4.9 "null on either side of a
/// join key never matches").
pub fn row_has_null(df: &DataFrame, names: &[&str], row: usize) -> ColframeResult<bool> {
    for name in names {
        if df.column(name)?.is_null_at(row) {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod test {
    use super::*;
    use colframe_core::chunked_array::ChunkedArray;
    use colframe_core::Series;

    fn df() -> DataFrame {
        DataFrame::new(vec![
            Series::Int32(ChunkedArray::from_vec("a", vec![1, 1, 2])),
            Series::Float64(ChunkedArray::from_vec("b", vec![f64::NAN, f64::NAN, 1.0])),
        ])
        .unwrap()
    }

    #[test]
    fn identical_rows_encode_identically() {
        let keys = encode_keys(&df(), &["a", "b"]).unwrap();
        assert_eq!(keys[0], keys[1]);
        assert_ne!(keys[0], keys[2]);
    }

    #[test]
    fn nan_bit_patterns_canonicalize() {
        let a = {
            let mut v = Vec::new();
            encode_value(&mut v, &AnyValue::Float64(f64::NAN));
            v
        };
        let b = {
            let mut v = Vec::new();
            encode_value(&mut v, &AnyValue::Float64(-f64::NAN));
            v
        };
        assert_eq!(a, b);
    }

    #[test]
    fn row_has_null_detects_any_key_column_null() {
        let df = DataFrame::new(vec![
            Series::Int32(ChunkedArray::from_slice_options("a", &[Some(1), None])),
            Series::Int32(ChunkedArray::from_vec("b", vec![1, 2])),
        ])
        .unwrap();
        assert!(!row_has_null(&df, &["a", "b"], 0).unwrap());
        assert!(row_has_null(&df, &["a", "b"], 1).unwrap());
    }
}
