//! Reduction kernels (spec §5). Nulls are always skipped; an all-null or
//! empty input yields `None` (the caller maps that to a null scalar) rather
//! than a kernel-level error. Variance/standard deviation use the sample
//! (`n - 1`) estimator only (locked decision, no population variant).

use colframe_arrow::Bitmap;

use crate::comparison::total_cmp;
use crate::Number;

/// Skips null rows only. NaN is a non-null float value: it flows into
/// `sum`/`mean` (IEEE propagation) and is ordered last by `min`/`max`/
/// `median` via `total_cmp`, per spec §5 ("skip nulls" — not NaN).
fn valid_values<'a, T: Number>(values: &'a [T], validity: Option<&Bitmap>) -> impl Iterator<Item = T> + 'a {
    let validity = validity.cloned();
    values.iter().copied().enumerate().filter_map(move |(i, v)| {
        let is_valid = validity.as_ref().map(|b| b.get(i)).unwrap_or(true);
        is_valid.then_some(v)
    })
}

pub fn count<T: Number>(values: &[T], validity: Option<&Bitmap>) -> usize {
    valid_values(values, validity).count()
}

pub fn sum<T: Number>(values: &[T], validity: Option<&Bitmap>) -> Option<T> {
    let mut acc = T::zero();
    let mut any = false;
    for v in valid_values(values, validity) {
        acc = acc + v;
        any = true;
    }
    any.then_some(acc)
}

pub fn mean<T: Number>(values: &[T], validity: Option<&Bitmap>) -> Option<f64> {
    let mut acc = 0f64;
    let mut n = 0usize;
    for v in valid_values(values, validity) {
        acc += num_traits::cast(v).unwrap_or(0.0);
        n += 1;
    }
    (n > 0).then_some(acc / n as f64)
}

pub fn min<T: Number>(values: &[T], validity: Option<&Bitmap>) -> Option<T> {
    valid_values(values, validity).fold(None, |acc, v| match acc {
        None => Some(v),
        Some(cur) if total_cmp(&v, &cur) == std::cmp::Ordering::Less => Some(v),
        other => other,
    })
}

pub fn max<T: Number>(values: &[T], validity: Option<&Bitmap>) -> Option<T> {
    valid_values(values, validity).fold(None, |acc, v| match acc {
        None => Some(v),
        Some(cur) if total_cmp(&v, &cur) == std::cmp::Ordering::Greater => Some(v),
        other => other,
    })
}

/// Sample variance (Bessel-corrected, divisor `n - 1`). `None` when fewer
/// than two non-null, non-NaN values are present.
pub fn var<T: Number>(values: &[T], validity: Option<&Bitmap>) -> Option<f64> {
    let vals: Vec<f64> = valid_values(values, validity)
        .map(|v| num_traits::cast(v).unwrap_or(0.0))
        .collect();
    if vals.len() < 2 {
        return None;
    }
    let mean = vals.iter().sum::<f64>() / vals.len() as f64;
    let sq_diff: f64 = vals.iter().map(|v| (v - mean) * (v - mean)).sum();
    Some(sq_diff / (vals.len() - 1) as f64)
}

pub fn std<T: Number>(values: &[T], validity: Option<&Bitmap>) -> Option<f64> {
    var(values, validity).map(f64::sqrt)
}

/// Median by value, not by position: sorts the non-null, non-NaN values and
/// averages the middle two on an even count.
pub fn median<T: Number>(values: &[T], validity: Option<&Bitmap>) -> Option<f64> {
    let mut vals: Vec<f64> = valid_values(values, validity)
        .map(|v| num_traits::cast(v).unwrap_or(0.0))
        .collect();
    if vals.is_empty() {
        return None;
    }
    vals.sort_by(total_cmp);
    let n = vals.len();
    Some(if n % 2 == 1 {
        vals[n / 2]
    } else {
        (vals[n / 2 - 1] + vals[n / 2]) / 2.0
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sum_skips_nulls() {
        let validity = Bitmap::from_bools([true, false, true]);
        assert_eq!(sum(&[1i32, 99, 3], Some(&validity)), Some(4));
    }

    #[test]
    fn variance_is_sample_not_population() {
        let v = var(&[2.0f64, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], None).unwrap();
        assert!((v - 4.571428571428571).abs() < 1e-9);
    }

    #[test]
    fn all_null_yields_none() {
        let validity = Bitmap::new_zeroed(3);
        assert_eq!(sum(&[1i32, 2, 3], Some(&validity)), None);
        assert_eq!(mean(&[1i32, 2, 3], Some(&validity)), None);
    }

    #[test]
    fn median_even_count_averages_middle_pair() {
        assert_eq!(median(&[1.0f64, 2.0, 3.0, 4.0], None), Some(2.5));
    }

    #[test]
    fn nan_is_not_null_and_propagates_through_sum_and_mean() {
        let vals = [1.0f64, f64::NAN, 2.0];
        assert!(sum(&vals, None).unwrap().is_nan());
        assert!(mean(&vals, None).unwrap().is_nan());
    }

    #[test]
    fn nan_sorts_last_in_min_and_max() {
        let vals = [1.0f64, f64::NAN, 2.0];
        assert_eq!(min(&vals, None), Some(1.0));
        assert!(max(&vals, None).unwrap().is_nan());
    }

    #[test]
    fn all_nan_min_is_nan() {
        let vals = [f64::NAN, f64::NAN];
        assert!(min(&vals, None).unwrap().is_nan());
    }

    #[test]
    fn median_places_nan_last_among_ordered_values() {
        // Ordered [1.0, 3.0, NaN]; odd count, middle element is 3.0.
        let vals = [3.0f64, f64::NAN, 1.0];
        assert_eq!(median(&vals, None), Some(3.0));
    }
}
