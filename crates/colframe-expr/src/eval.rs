//! Evaluating an [`Expr`] against a [`DataFrame`] (spec §4.6: "an
//! expression evaluates against a DataFrame and yields a Series of length
//! = df.height").
//!
//! Arithmetic and comparison between two numeric columns route through
//! `colframe-core`'s vectorized `Series` kernels (after promoting both
//! sides to a common dtype, spec §4.6's "numeric widening"); everything
//! else — string/boolean comparison, `When`, casts that touch strings —
//! is built row-at-a-time from `AnyValue`, which is the right place to pay
//! that cost since `colframe-ops` calls the vectorized kernels directly
//! for its hot paths (filter masks, join/group-by keys) rather than
//! through this evaluator.

use colframe_core::chunked_array::{BinaryChunked, BooleanChunked, ChunkedArray, StringChunked};
use colframe_core::series::AnyValue;
use colframe_core::{DataFrame, DataType, Series};
use colframe_error::{ColframeError, ColframeResult};

use crate::expr::{AggFn, BinaryOp, Expr, UnaryOp};

/// Evaluate `expr` against `df`, producing a `Series` of length
/// `df.height()`.
pub fn evaluate(expr: &Expr, df: &DataFrame) -> ColframeResult<Series> {
    let series = evaluate_inner(expr, df)?;
    Ok(series)
}

fn evaluate_inner(expr: &Expr, df: &DataFrame) -> ColframeResult<Series> {
    match expr {
        Expr::ColumnRef(name) => df.column(name).map(|s| s.clone()),
        Expr::Literal(v) => Ok(broadcast_literal(v, df.height())),
        Expr::BinaryOp(op, l, r) => eval_binary(*op, l, r, df),
        Expr::UnaryOp(UnaryOp::Not, e) => {
            let s = evaluate_inner(e, df)?;
            eval_not(&s)
        },
        Expr::UnaryOp(UnaryOp::Neg, e) => {
            let s = evaluate_inner(e, df)?;
            eval_neg(&s)
        },
        Expr::Cast(e, dtype) => evaluate_inner(e, df)?.cast(dtype),
        Expr::Aggregate(func, e) => {
            let s = evaluate_inner(e, df)?;
            let scalar = apply_agg(*func, &s)?;
            Ok(broadcast_literal(&scalar, df.height()))
        },
        Expr::When { cond, then, otherwise } => {
            let cond = evaluate_inner(cond, df)?;
            let then = evaluate_inner(then, df)?;
            let otherwise = evaluate_inner(otherwise, df)?;
            eval_when(&cond, &then, &otherwise)
        },
        Expr::Alias(e, name) => {
            let mut s = evaluate_inner(e, df)?;
            s.rename(name.clone());
            Ok(s)
        },
        Expr::IsNull(e) => {
            let s = evaluate_inner(e, df)?;
            let vals: Vec<Option<bool>> = (0..s.len()).map(|i| Some(s.is_null_at(i))).collect();
            Ok(Series::Boolean(BooleanChunked::from_slice_options("is_null", &vals)))
        },
        Expr::IsNotNull(e) => {
            let s = evaluate_inner(e, df)?;
            let vals: Vec<Option<bool>> = (0..s.len()).map(|i| Some(!s.is_null_at(i))).collect();
            Ok(Series::Boolean(BooleanChunked::from_slice_options("is_not_null", &vals)))
        },
    }
}

fn apply_agg(func: AggFn, s: &Series) -> ColframeResult<AnyValue> {
    Ok(match func {
        AggFn::Sum => s.sum()?,
        AggFn::Mean => s.mean()?,
        AggFn::Min => s.min()?,
        AggFn::Max => s.max()?,
        AggFn::Count => AnyValue::Int64(s.count() as i64),
        AggFn::Std => s.std()?,
        AggFn::Var => s.var()?,
        AggFn::Median => s.median()?,
    })
}

/// Public entry point for callers outside this crate that already have a
/// per-group `Series` slice in hand (group-by's `agg`) and just need the
/// same scalar reduction this evaluator uses for whole-frame aggregates.
pub fn apply_aggregate(func: AggFn, s: &Series) -> ColframeResult<AnyValue> {
    apply_agg(func, s)
}

/// Public entry point for materializing a `Series` from a list of scalar
/// `AnyValue`s — used by group-by to build an aggregate output column from
/// one reduced value per group, and by the lazy optimizer's constant
/// folding to wrap a folded literal back into a one-row `Series`.
pub fn series_from_any_values(name: &str, values: &[AnyValue]) -> ColframeResult<Series> {
    any_values_to_series(name, values)
}

fn eval_binary(op: BinaryOp, l: &Expr, r: &Expr, df: &DataFrame) -> ColframeResult<Series> {
    let lhs = evaluate_inner(l, df)?;
    let rhs = evaluate_inner(r, df)?;
    if op.is_logical() {
        return eval_logical(op, &lhs, &rhs);
    }
    if lhs.is_numeric() && rhs.is_numeric() {
        let dtype = crate::coerce::promote(&lhs.data_type(), &rhs.data_type())?;
        let lhs = lhs.cast(&dtype)?;
        let rhs = rhs.cast(&dtype)?;
        return match op {
            BinaryOp::Add => lhs.add(&rhs),
            BinaryOp::Sub => lhs.sub(&rhs),
            BinaryOp::Mul => lhs.mul(&rhs),
            BinaryOp::Div => lhs.div(&rhs),
            BinaryOp::Eq => lhs.eq(&rhs),
            BinaryOp::NotEq => lhs.neq(&rhs),
            BinaryOp::Lt => lhs.lt(&rhs),
            BinaryOp::LtEq => lhs.lte(&rhs),
            BinaryOp::Gt => lhs.gt(&rhs),
            BinaryOp::GtEq => lhs.gte(&rhs),
            BinaryOp::And | BinaryOp::Or => unreachable!("handled by eval_logical above"),
        };
    }
    if op.is_comparison() {
        return eval_row_comparison(op, &lhs, &rhs);
    }
    Err(ColframeError::TypeMismatch(format!(
        "cannot apply {op:?} between {:?} and {:?}",
        lhs.data_type(),
        rhs.data_type()
    )))
}

fn eval_logical(op: BinaryOp, lhs: &Series, rhs: &Series) -> ColframeResult<Series> {
    if lhs.len() != rhs.len() {
        return Err(ColframeError::LengthMismatch(format!(
            "logical operands have lengths {} and {}",
            lhs.len(),
            rhs.len()
        )));
    }
    let vals: ColframeResult<Vec<Option<bool>>> = (0..lhs.len())
        .map(|i| {
            let a = as_opt_bool(&lhs.get(i)?)?;
            let b = as_opt_bool(&rhs.get(i)?)?;
            Ok(match op {
                BinaryOp::And => match (a, b) {
                    (Some(false), _) | (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                },
                BinaryOp::Or => match (a, b) {
                    (Some(true), _) | (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                },
                _ => unreachable!("eval_logical only handles And/Or"),
            })
        })
        .collect();
    Ok(Series::Boolean(BooleanChunked::from_slice_options("logical", &vals?)))
}

fn as_opt_bool(v: &AnyValue) -> ColframeResult<Option<bool>> {
    Ok(match v {
        AnyValue::Null => None,
        AnyValue::Boolean(b) => Some(*b),
        other => return Err(ColframeError::TypeMismatch(format!("expected Boolean, got {other:?}"))),
    })
}

/// Row-wise comparison fallback for non-numeric operands (strings compare
/// lexicographically by UTF-8 bytes, per spec §4.5).
fn eval_row_comparison(op: BinaryOp, lhs: &Series, rhs: &Series) -> ColframeResult<Series> {
    if lhs.len() != rhs.len() {
        return Err(ColframeError::LengthMismatch(format!(
            "comparison operands have lengths {} and {}",
            lhs.len(),
            rhs.len()
        )));
    }
    let vals: ColframeResult<Vec<Option<bool>>> = (0..lhs.len())
        .map(|i| Ok(compare_any(op, &lhs.get(i)?, &rhs.get(i)?)))
        .collect();
    Ok(Series::Boolean(BooleanChunked::from_slice_options("cmp", &vals?)))
}

/// `None` means the result row is null (either operand was null); strings
/// compare byte-for-byte, everything else falls back through `f64`.
fn compare_any(op: BinaryOp, a: &AnyValue, b: &AnyValue) -> Option<bool> {
    if matches!(a, AnyValue::Null) || matches!(b, AnyValue::Null) {
        return None;
    }
    let ord = match (a, b) {
        (AnyValue::String(a), AnyValue::String(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
        (AnyValue::Boolean(a), AnyValue::Boolean(b)) => Some(a.cmp(b)),
        _ => any_as_f64(a).zip(any_as_f64(b)).and_then(|(a, b)| a.partial_cmp(&b)),
    };
    let nan_involved = matches!(a, AnyValue::Float32(v) if v.is_nan())
        || matches!(a, AnyValue::Float64(v) if v.is_nan())
        || matches!(b, AnyValue::Float32(v) if v.is_nan())
        || matches!(b, AnyValue::Float64(v) if v.is_nan());
    match op {
        BinaryOp::Eq => Some(!nan_involved && ord == Some(std::cmp::Ordering::Equal)),
        BinaryOp::NotEq => Some(nan_involved || ord != Some(std::cmp::Ordering::Equal)),
        BinaryOp::Lt => Some(!nan_involved && ord == Some(std::cmp::Ordering::Less)),
        BinaryOp::LtEq => Some(!nan_involved && matches!(ord, Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal))),
        BinaryOp::Gt => Some(!nan_involved && ord == Some(std::cmp::Ordering::Greater)),
        BinaryOp::GtEq => Some(!nan_involved && matches!(ord, Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal))),
        _ => unreachable!("compare_any only handles comparison ops"),
    }
}

fn any_as_f64(v: &AnyValue) -> Option<f64> {
    Some(match v {
        AnyValue::Int8(x) => *x as f64,
        AnyValue::Int16(x) => *x as f64,
        AnyValue::Int32(x) => *x as f64,
        AnyValue::Int64(x) => *x as f64,
        AnyValue::UInt8(x) => *x as f64,
        AnyValue::UInt16(x) => *x as f64,
        AnyValue::UInt32(x) => *x as f64,
        AnyValue::UInt64(x) => *x as f64,
        AnyValue::Float32(x) => *x as f64,
        AnyValue::Float64(x) => *x,
        _ => return None,
    })
}

fn eval_not(s: &Series) -> ColframeResult<Series> {
    let vals: ColframeResult<Vec<Option<bool>>> = (0..s.len())
        .map(|i| Ok(as_opt_bool(&s.get(i)?)?.map(|b| !b)))
        .collect();
    Ok(Series::Boolean(BooleanChunked::from_slice_options(s.name(), &vals?)))
}

fn eval_neg(s: &Series) -> ColframeResult<Series> {
    if !s.is_numeric() {
        return Err(ColframeError::TypeMismatch(format!("cannot negate {:?}", s.data_type())));
    }
    let zero = broadcast_literal(&zero_like(&s.data_type()), s.len());
    zero.sub(s)
}

fn zero_like(dtype: &DataType) -> AnyValue {
    use DataType::*;
    match dtype {
        Int8 => AnyValue::Int8(0),
        Int16 => AnyValue::Int16(0),
        Int32 => AnyValue::Int32(0),
        Int64 => AnyValue::Int64(0),
        UInt8 => AnyValue::UInt8(0),
        UInt16 => AnyValue::UInt16(0),
        UInt32 => AnyValue::UInt32(0),
        UInt64 => AnyValue::UInt64(0),
        Float32 => AnyValue::Float32(0.0),
        Float64 => AnyValue::Float64(0.0),
        _ => AnyValue::Null,
    }
}

fn eval_when(cond: &Series, then: &Series, otherwise: &Series) -> ColframeResult<Series> {
    if cond.len() != then.len() || cond.len() != otherwise.len() {
        return Err(ColframeError::LengthMismatch("when/then/otherwise branches must share df height".into()));
    }
    let picked: ColframeResult<Vec<AnyValue>> = (0..cond.len())
        .map(|i| {
            let take_then = matches!(cond.get(i)?, AnyValue::Boolean(true));
            if take_then {
                then.get(i)
            } else {
                otherwise.get(i)
            }
        })
        .collect();
    let picked = picked?;
    let name = then.name().to_string();
    any_values_to_series(&name, &picked)
}

/// Build a full-height `Series` from a single repeated `AnyValue` (spec
/// §4.6: literals broadcast to `df.height()` rows; aggregates broadcast
/// their scalar the same way when evaluated outside a group-by).
fn broadcast_literal(v: &AnyValue, len: usize) -> Series {
    any_values_to_series("literal", &vec![v.clone(); len]).unwrap_or_else(|_| {
        Series::String(StringChunked::from_opt_vec("literal", vec![None; len]))
    })
}

/// Build a `Series` from row values whose variants may mix (e.g. a `When`
/// with differently-typed branches); falls back to `String` when the
/// values don't share one physical dtype, matching the branch-type
/// unification `output_dtype` documents.
pub(crate) fn any_values_to_series(name: &str, values: &[AnyValue]) -> ColframeResult<Series> {
    let dtype = values.iter().find(|v| !matches!(v, AnyValue::Null)).map(any_value_dtype);
    let Some(dtype) = dtype else {
        return Ok(Series::Boolean(BooleanChunked::from_slice_options(name, &vec![None; values.len()])));
    };
    use DataType::*;
    Ok(match dtype {
        Boolean => Series::Boolean(BooleanChunked::from_slice_options(
            name,
            &values.iter().map(as_bool_opt).collect::<Vec<_>>(),
        )),
        Int8 => Series::Int8(ChunkedArray::from_slice_options(name, &values.iter().map(|v| as_num_opt::<i8>(v)).collect::<Vec<_>>())),
        Int16 => Series::Int16(ChunkedArray::from_slice_options(name, &values.iter().map(|v| as_num_opt::<i16>(v)).collect::<Vec<_>>())),
        Int32 => Series::Int32(ChunkedArray::from_slice_options(name, &values.iter().map(|v| as_num_opt::<i32>(v)).collect::<Vec<_>>())),
        Int64 => Series::Int64(ChunkedArray::from_slice_options(name, &values.iter().map(|v| as_num_opt::<i64>(v)).collect::<Vec<_>>())),
        UInt8 => Series::UInt8(ChunkedArray::from_slice_options(name, &values.iter().map(|v| as_num_opt::<u8>(v)).collect::<Vec<_>>())),
        UInt16 => Series::UInt16(ChunkedArray::from_slice_options(name, &values.iter().map(|v| as_num_opt::<u16>(v)).collect::<Vec<_>>())),
        UInt32 => Series::UInt32(ChunkedArray::from_slice_options(name, &values.iter().map(|v| as_num_opt::<u32>(v)).collect::<Vec<_>>())),
        UInt64 => Series::UInt64(ChunkedArray::from_slice_options(name, &values.iter().map(|v| as_num_opt::<u64>(v)).collect::<Vec<_>>())),
        Float32 => Series::Float32(ChunkedArray::from_slice_options(name, &values.iter().map(|v| as_num_opt::<f32>(v)).collect::<Vec<_>>())),
        Float64 => Series::Float64(ChunkedArray::from_slice_options(name, &values.iter().map(|v| as_num_opt::<f64>(v)).collect::<Vec<_>>())),
String => Series::String(StringChunked::from_opt_vec(
            name,
            values
                .iter()
                .map(|v| match v {
                    AnyValue::Null => None,
                    AnyValue::String(s) => Some(s.to_string()),
                    other => Some(other.to_string()),
                })
                .collect(),
        )),
        Binary => Series::Binary(BinaryChunked::from_opt_vec(
            name,
            values
                .iter()
                .map(|v| match v {
                    AnyValue::Binary(b) => Some(b.to_vec()),
                    _ => None,
                })
                .collect::<Vec<Option<Vec<u8>>>>(),
        )),
        other => return Err(ColframeError::UnsupportedCast(format!("cannot materialize a Series of {other:?} from scalar values"))),
    })
}

fn any_value_dtype(v: &AnyValue) -> DataType {
    use DataType::*;
    match v {
        AnyValue::Null => Null,
        AnyValue::Boolean(_) => Boolean,
        AnyValue::Int8(_) => Int8,
        AnyValue::Int16(_) => Int16,
        AnyValue::Int32(_) => Int32,
        AnyValue::Int64(_) => Int64,
        AnyValue::UInt8(_) => UInt8,
        AnyValue::UInt16(_) => UInt16,
        AnyValue::UInt32(_) => UInt32,
        AnyValue::UInt64(_) => UInt64,
        AnyValue::Float32(_) => Float32,
        AnyValue::Float64(_) => Float64,
        AnyValue::String(_) => String,
        AnyValue::Binary(_) => Binary,
    }
}

fn as_bool_opt(v: &AnyValue) -> Option<bool> {
    match v {
        AnyValue::Boolean(b) => Some(*b),
        _ => None,
    }
}

fn as_num_opt<T: num_traits::NumCast>(v: &AnyValue) -> Option<T> {
    let f = any_as_f64(v)?;
    num_traits::cast(f)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::expr::{col, lit, when};
    use colframe_core::chunked_array::ChunkedArray;
    use colframe_core::Field;
    use colframe_core::Schema;

    fn df() -> DataFrame {
        DataFrame::new(vec![
            Series::Int32(ChunkedArray::from_vec("age", vec![25, 30, 35])),
            Series::Float64(ChunkedArray::from_vec("score", vec![95.5, 87.0, 92.3])),
        ])
        .unwrap()
    }

    #[test]
    fn column_ref_and_arithmetic() {
        let out = evaluate(&col("age").add(lit(1i32)), &df()).unwrap();
        assert_eq!(out.get(0).unwrap(), AnyValue::Int32(26));
    }

    #[test]
    fn comparison_is_boolean() {
        let out = evaluate(&col("age").gt(lit(28i32)), &df()).unwrap();
        assert_eq!(out.data_type(), DataType::Boolean);
        assert_eq!(out.get(0).unwrap(), AnyValue::Boolean(false));
        assert_eq!(out.get(1).unwrap(), AnyValue::Boolean(true));
    }

    #[test]
    fn aggregate_broadcasts_scalar() {
        let out = evaluate(&col("age").sum(), &df()).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.get(0).unwrap(), AnyValue::Int32(90));
    }

    #[test]
    fn when_then_otherwise_selects_by_predicate() {
        let out = evaluate(&when(col("age").gt(lit(28i32))).then(lit(1i32)).otherwise(lit(0i32)), &df()).unwrap();
        assert_eq!(out.get(0).unwrap(), AnyValue::Int32(0));
        assert_eq!(out.get(1).unwrap(), AnyValue::Int32(1));
    }

    #[test]
    fn schema_output_dtype_matches_evaluated_dtype() {
        let schema = Schema::try_from_fields(vec![Field::new("age", DataType::Int32), Field::new("score", DataType::Float64)]).unwrap();
        let e = col("age").add(col("score"));
        assert_eq!(e.output_dtype(&schema).unwrap(), DataType::Float64);
        let out = evaluate(&e, &df()).unwrap();
        assert_eq!(out.data_type(), DataType::Float64);
    }
}
