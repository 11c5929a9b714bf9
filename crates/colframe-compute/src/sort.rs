//! Stable sort / arg-sort kernels (spec §5). Nulls sort first or last per
//! the caller's choice; among non-null values, NaN always sorts last
//! regardless of ascending/descending (the locked NaN-handling decision is
//! about position, not about reversing with the rest of the order).

use rayon::slice::ParallelSliceMut;

use colframe_arrow::Bitmap;

use crate::comparison::total_cmp;
use crate::Number;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

/// Returns a stable permutation of `0..values.len()` that sorts `values`.
pub fn arg_sort<T: Number>(
    values: &[T],
    validity: Option<&Bitmap>,
    descending: bool,
    nulls: NullsOrder,
) -> Vec<u32> {
    let mut idx: Vec<u32> = (0..values.len() as u32).collect();
    let is_null = |i: u32| -> bool { validity.map(|v| !v.get(i as usize)).unwrap_or(false) };
    let cmp = |&a: &u32, &b: &u32| {
        let (na, nb) = (is_null(a), is_null(b));
        match (na, nb) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => match nulls {
                NullsOrder::First => std::cmp::Ordering::Less,
                NullsOrder::Last => std::cmp::Ordering::Greater,
            },
            (false, true) => match nulls {
                NullsOrder::First => std::cmp::Ordering::Greater,
                NullsOrder::Last => std::cmp::Ordering::Less,
            },
            (false, false) => {
                let ord = total_cmp(&values[a as usize], &values[b as usize]);
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            },
        }
    };
    // Parallel merge sort over the index permutation (spec §5: sort is one
    // of the DataFrame-level entry points allowed to call into the pool
    // directly, since it never nests inside another parallel operator).
    if colframe_utils::pool::is_parallel_disabled() {
        idx.sort_by(cmp);
    } else {
        colframe_utils::pool::install(|| idx.par_sort_by(cmp));
    }
    idx
}

/// Sorts `values`/`validity` directly, returning the new value buffer and
/// validity bitmap (nulls keep no meaningful value in the output slot).
pub fn sort<T: Number>(
    values: &[T],
    validity: Option<&Bitmap>,
    descending: bool,
    nulls: NullsOrder,
) -> (Vec<T>, Option<Bitmap>) {
    let perm = arg_sort(values, validity, descending, nulls);
    let sorted: Vec<T> = perm.iter().map(|&i| values[i as usize]).collect();
    let sorted_validity = validity.map(|v| Bitmap::from_bools(perm.iter().map(|&i| v.get(i as usize))));
    (sorted, sorted_validity)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stable_ascending_nulls_last() {
        let values = [3.0f64, 1.0, 2.0, 1.0];
        let validity = Bitmap::from_bools([true, true, false, true]);
        let perm = arg_sort(&values, Some(&validity), false, NullsOrder::Last);
        assert_eq!(perm, vec![1, 3, 0, 2]);
    }

    #[test]
    fn nan_sorts_after_real_values_even_descending() {
        let values = [1.0f64, f64::NAN, 2.0];
        let perm = arg_sort(&values, None, true, NullsOrder::Last);
        assert_eq!(perm, vec![2, 0, 1]);
    }
}
