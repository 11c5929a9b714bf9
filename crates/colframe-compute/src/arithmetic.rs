//! Elementwise arithmetic kernels (spec §5). A null operand makes the
//! result null; integer division by zero is an error, float division by
//! zero follows IEEE 754 (`inf`/`NaN`), never an error.

use colframe_arrow::{Bitmap, BitmapBuilder};
use colframe_error::{ColframeError, ColframeResult};

use crate::{is_integer_like, Number};

fn combine_validity(a: Option<&Bitmap>, b: Option<&Bitmap>, _len: usize) -> Option<Bitmap> {
    match (a, b) {
        (None, None) => None,
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (Some(a), Some(b)) => Some(a.and(b)),
    }
}

fn binary_op<T: Number>(
    lhs: &[T],
    lhs_validity: Option<&Bitmap>,
    rhs: &[T],
    rhs_validity: Option<&Bitmap>,
    op: impl Fn(T, T) -> T,
) -> ColframeResult<(Vec<T>, Option<Bitmap>)> {
    if lhs.len() != rhs.len() {
        return Err(ColframeError::LengthMismatch(format!(
            "arithmetic operands have lengths {} and {}",
            lhs.len(),
            rhs.len()
        )));
    }
    let values: Vec<T> = lhs.iter().zip(rhs.iter()).map(|(&a, &b)| op(a, b)).collect();
    let validity = combine_validity(lhs_validity, rhs_validity, lhs.len());
    Ok((values, validity))
}

pub fn add<T: Number>(
    lhs: &[T],
    lv: Option<&Bitmap>,
    rhs: &[T],
    rv: Option<&Bitmap>,
) -> ColframeResult<(Vec<T>, Option<Bitmap>)> {
    binary_op(lhs, lv, rhs, rv, |a, b| a + b)
}

pub fn sub<T: Number>(
    lhs: &[T],
    lv: Option<&Bitmap>,
    rhs: &[T],
    rv: Option<&Bitmap>,
) -> ColframeResult<(Vec<T>, Option<Bitmap>)> {
    binary_op(lhs, lv, rhs, rv, |a, b| a - b)
}

pub fn mul<T: Number>(
    lhs: &[T],
    lv: Option<&Bitmap>,
    rhs: &[T],
    rv: Option<&Bitmap>,
) -> ColframeResult<(Vec<T>, Option<Bitmap>)> {
    binary_op(lhs, lv, rhs, rv, |a, b| a * b)
}

/// Division. Integer division by zero produces a null at that row rather
/// than an error (spec §4.5, §7: `DivisionByZero` is informational only —
/// kernels null the row by default); float division follows IEEE 754 and
/// never nulls a row on its own account.
pub fn div<T: Number>(
    lhs: &[T],
    lv: Option<&Bitmap>,
    rhs: &[T],
    rv: Option<&Bitmap>,
) -> ColframeResult<(Vec<T>, Option<Bitmap>)> {
    if lhs.len() != rhs.len() {
        return Err(ColframeError::LengthMismatch(format!(
            "arithmetic operands have lengths {} and {}",
            lhs.len(),
            rhs.len()
        )));
    }
    let mut validity = combine_validity(lv, rv, lhs.len());
    if is_integer_like::<T>() {
        let zero_rows: Vec<usize> = rhs
            .iter()
            .enumerate()
            .filter(|&(i, &b)| b == T::zero() && validity.as_ref().map(|v| v.get(i)).unwrap_or(true))
            .map(|(i, _)| i)
            .collect();
        if !zero_rows.is_empty() {
            tracing::debug!(rows = zero_rows.len(), "integer division by zero nulled");
            let mut builder = colframe_arrow::BitmapBuilder::with_capacity(lhs.len());
            for i in 0..lhs.len() {
                let was_valid = validity.as_ref().map(|v| v.get(i)).unwrap_or(true);
                builder.push(was_valid && rhs[i] != T::zero());
            }
            validity = Some(builder.finish());
        }
    }
    let values: Vec<T> = lhs
        .iter()
        .zip(rhs.iter())
        .map(|(&a, &b)| if is_integer_like::<T>() && b == T::zero() { T::zero() } else { a / b })
        .collect();
    Ok((values, validity))
}

/// Scalar (broadcast) variant of [`add`]/[`sub`]/[`mul`]/[`div`].
pub fn scalar_op<T: Number>(
    lhs: &[T],
    lv: Option<&Bitmap>,
    rhs: T,
    op: impl Fn(T, T) -> T,
) -> (Vec<T>, Option<Bitmap>) {
    let values: Vec<T> = lhs.iter().map(|&a| op(a, rhs)).collect();
    (values, lv.cloned())
}

pub fn scalar_div<T: Number>(lhs: &[T], lv: Option<&Bitmap>, rhs: T) -> ColframeResult<(Vec<T>, Option<Bitmap>)> {
    if is_integer_like::<T>() && rhs == T::zero() {
        return Err(ColframeError::DivisionByZero("scalar divisor is zero".into()));
    }
    Ok(scalar_op(lhs, lv, rhs, |a, b| a / b))
}

/// Builds a nullable boolean mask reporting which output rows are null,
/// for kernels that want to hand their caller a ready validity bitmap.
pub fn null_mask_from(len: usize, validity: Option<&Bitmap>) -> Bitmap {
    validity.cloned().unwrap_or_else(|| Bitmap::new_set(len))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_propagates_nulls() {
        let lv = Bitmap::from_bools([true, false, true]);
        let (vals, validity) = add(&[1i32, 2, 3], Some(&lv), &[10, 20, 30], None).unwrap();
        assert_eq!(vals, vec![11, 22, 33]);
        assert_eq!(validity.unwrap().to_vec(), vec![true, false, true]);
    }

    #[test]
    fn integer_division_by_zero_nulls_the_row() {
        let (vals, validity) = div(&[1i32, 2], None, &[1, 0], None).unwrap();
        assert_eq!(vals[0], 1);
        let validity = validity.unwrap();
        assert!(validity.get(0));
        assert!(!validity.get(1));
    }

    #[test]
    fn float_division_by_zero_is_infinite() {
        let (vals, _) = div(&[1.0f64], None, &[0.0], None).unwrap();
        assert!(vals[0].is_infinite());
    }
}
