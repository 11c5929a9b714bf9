//! Take/gather index semantics (spec §4.5).
//!
//! Callers choose between two gather contracts: permissive (an index equal
//! to the `NULL_IDX` sentinel, or out of range, becomes a null row) and
//! strict (any out-of-range index is rejected with `IndexOutOfRange`).
//! Both funnel into `Option<u32>` slices, the shape `ChunkedArray::take_opt`
//! and `Series::take` already consume.

use colframe_error::{ColframeError, ColframeResult};
use colframe_utils::NULL_IDX;

/// Reject any index `>= len` (the sentinel itself included, since a strict
/// gather has no notion of "emit null here").
pub fn validate_strict(indices: &[u32], len: usize) -> ColframeResult<()> {
    for &i in indices {
        if i as usize >= len {
            return Err(ColframeError::oob(i as usize, len));
        }
    }
    Ok(())
}

/// Sentinel-aware, permissive conversion: `NULL_IDX` or an out-of-range row
/// becomes `None` (null), everything else passes through as `Some`.
pub fn to_opt_permissive(indices: &[u32], len: usize) -> Vec<Option<u32>> {
    indices
        .iter()
        .map(|&i| if i == NULL_IDX || i as usize >= len { None } else { Some(i) })
        .collect()
}

/// Strict conversion: every index must be in range or the whole gather
/// fails (spec §4.5 `Take`: "otherwise out-of-range fails with
/// IndexOutOfRange").
pub fn to_opt_strict(indices: &[u32], len: usize) -> ColframeResult<Vec<Option<u32>>> {
    validate_strict(indices, len)?;
    Ok(indices.iter().map(|&i| Some(i)).collect())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn permissive_nulls_sentinel_and_oob() {
        let idx = [0u32, NULL_IDX, 5];
        assert_eq!(to_opt_permissive(&idx, 3), vec![Some(0), None, None]);
    }

    #[test]
    fn strict_rejects_oob() {
        let err = to_opt_strict(&[0, 9], 3).unwrap_err();
        assert!(matches!(err, ColframeError::IndexOutOfRange(_)));
    }
}
