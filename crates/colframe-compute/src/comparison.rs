//! Elementwise comparison kernels (spec §5). Result validity is the AND of
//! both operands' validity — a comparison against a null is unknown, not
//! false. NaN never equals NaN and never satisfies `<`/`<=`/`>`/`>=` against
//! anything including itself, matching IEEE 754 and the locked "NaN never
//! equals NaN for join matching" decision.

use colframe_arrow::Bitmap;
use colframe_error::{ColframeError, ColframeResult};

use crate::Number;

fn combine_validity(a: Option<&Bitmap>, b: Option<&Bitmap>) -> Option<Bitmap> {
    match (a, b) {
        (None, None) => None,
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (Some(a), Some(b)) => Some(a.and(b)),
    }
}

fn compare<T: Number>(
    lhs: &[T],
    lv: Option<&Bitmap>,
    rhs: &[T],
    rv: Option<&Bitmap>,
    op: impl Fn(T, T) -> bool,
) -> ColframeResult<(Bitmap, Option<Bitmap>)> {
    if lhs.len() != rhs.len() {
        return Err(ColframeError::LengthMismatch(format!(
            "comparison operands have lengths {} and {}",
            lhs.len(),
            rhs.len()
        )));
    }
    let values = Bitmap::from_bools(lhs.iter().zip(rhs.iter()).map(|(&a, &b)| op(a, b)));
    Ok((values, combine_validity(lv, rv)))
}

pub fn eq<T: Number>(lhs: &[T], lv: Option<&Bitmap>, rhs: &[T], rv: Option<&Bitmap>) -> ColframeResult<(Bitmap, Option<Bitmap>)> {
    compare(lhs, lv, rhs, rv, |a, b| !a.is_nan() && !b.is_nan() && a == b)
}

pub fn ne<T: Number>(lhs: &[T], lv: Option<&Bitmap>, rhs: &[T], rv: Option<&Bitmap>) -> ColframeResult<(Bitmap, Option<Bitmap>)> {
    compare(lhs, lv, rhs, rv, |a, b| a.is_nan() || b.is_nan() || a != b)
}

pub fn lt<T: Number>(lhs: &[T], lv: Option<&Bitmap>, rhs: &[T], rv: Option<&Bitmap>) -> ColframeResult<(Bitmap, Option<Bitmap>)> {
    compare(lhs, lv, rhs, rv, |a, b| !a.is_nan() && !b.is_nan() && a < b)
}

pub fn le<T: Number>(lhs: &[T], lv: Option<&Bitmap>, rhs: &[T], rv: Option<&Bitmap>) -> ColframeResult<(Bitmap, Option<Bitmap>)> {
    compare(lhs, lv, rhs, rv, |a, b| !a.is_nan() && !b.is_nan() && a <= b)
}

pub fn gt<T: Number>(lhs: &[T], lv: Option<&Bitmap>, rhs: &[T], rv: Option<&Bitmap>) -> ColframeResult<(Bitmap, Option<Bitmap>)> {
    compare(lhs, lv, rhs, rv, |a, b| !a.is_nan() && !b.is_nan() && a > b)
}

pub fn ge<T: Number>(lhs: &[T], lv: Option<&Bitmap>, rhs: &[T], rv: Option<&Bitmap>) -> ColframeResult<(Bitmap, Option<Bitmap>)> {
    compare(lhs, lv, rhs, rv, |a, b| !a.is_nan() && !b.is_nan() && a >= b)
}

/// Total order used by sort/group-by keys: NaN sorts after every other
/// value (spec's locked NaN-handling decision), nulls are handled by the
/// caller (sort/group-by treat null as its own bucket, not via this fn).
pub fn total_cmp<T: Number>(a: &T, b: &T) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => a.partial_cmp(b).expect("non-NaN Number values are totally ordered"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nan_never_equals_nan() {
        let (mask, _) = eq(&[f64::NAN], None, &[f64::NAN], None).unwrap();
        assert_eq!(mask.get(0), false);
    }

    #[test]
    fn nan_sorts_last() {
        assert_eq!(total_cmp(&f64::NAN, &1.0), std::cmp::Ordering::Greater);
        assert_eq!(total_cmp(&1.0, &f64::NAN), std::cmp::Ordering::Less);
    }
}
