//! Numeric type coercion rules for binary expressions (spec §4.6: "numeric
//! widening"), grounded on the rank-based promotion `polars-plan`'s type
//! coercion pass applies before dispatching a binary op to a kernel.

use colframe_core::DataType;
use colframe_error::{ColframeError, ColframeResult};

/// Ordinal rank in the numeric promotion lattice; higher wins. Floats
/// always outrank integers; among integers, signedness and width both
/// matter (unsigned only promotes past a same-width signed type when
/// paired with a wider signed type, which this simple rank captures well
/// enough for the engine's closed dtype set).
fn rank(dt: &DataType) -> Option<u8> {
    use DataType::*;
    Some(match dt {
        Boolean => 0,
        Int8 => 1,
        UInt8 => 2,
        Int16 => 3,
        UInt16 => 4,
        Int32 => 5,
        UInt32 => 6,
        Int64 => 7,
        UInt64 => 8,
        Float32 => 9,
        Float64 => 10,
        _ => return None,
    })
}

fn from_rank(r: u8) -> DataType {
    use DataType::*;
    match r {
        0 => Boolean,
        1 => Int8,
        2 => UInt8,
        3 => Int16,
        4 => UInt16,
        5 => Int32,
        6 => UInt32,
        7 => Int64,
        8 => UInt64,
        9 => Float32,
        10 => Float64,
        _ => unreachable!(),
    }
}

/// The dtype a binary arithmetic op between `a` and `b` should produce:
/// the wider of the two on the numeric promotion lattice above.
pub fn promote(a: &DataType, b: &DataType) -> ColframeResult<DataType> {
    if a == b {
        return Ok(a.clone());
    }
    match (rank(a), rank(b)) {
        (Some(ra), Some(rb)) => Ok(from_rank(ra.max(rb))),
        _ => Err(ColframeError::TypeMismatch(format!("cannot unify dtypes {a:?} and {b:?}"))),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn float_outranks_int() {
        assert_eq!(promote(&DataType::Int32, &DataType::Float64).unwrap(), DataType::Float64);
    }

    #[test]
    fn identical_dtypes_pass_through() {
        assert_eq!(promote(&DataType::Int64, &DataType::Int64).unwrap(), DataType::Int64);
    }

    #[test]
    fn non_numeric_pair_fails() {
        assert!(promote(&DataType::String, &DataType::Int64).is_err());
    }
}
