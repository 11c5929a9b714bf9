//! Join-where: a nested-loop Θ-join over arbitrary per-column predicates
//! (spec §4.9 supplement — not every join condition is an equality, e.g.
//! `left.start <= right.end AND left.end >= right.start`).
//!
//! [`hash_join`](crate::join::hash_join) only handles equality keys, since
//! that's what makes hashing the build side possible at all; a predicate
//! list with `<`/`<=`/`>`/`>=` can't be hashed the same way; each right row
//! has to be checked against every left row, which is the cost real
//! engines also pay for a non-equi join absent some sorted-merge trick this
//! engine doesn't implement (spec.md leaves that optimization out of
//! scope).

use colframe_core::DataFrame;
use colframe_error::ColframeResult;
use colframe_utils::IdxSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// One clause of the join condition: `left[left_col] <op> right[right_col]`.
/// All clauses must hold (logical AND) for a row pair to match.
#[derive(Debug, Clone)]
pub struct JoinPredicate {
    pub left_col: String,
    pub op: CompareOp,
    pub right_col: String,
}

/// Inner join `left` and `right` keeping row pairs where every predicate in
/// `predicates` holds. A null operand on either side of any predicate
/// means that predicate does not hold (spec §4.9: "null never satisfies a
/// join-where predicate").
pub fn join_where(left: &DataFrame, right: &DataFrame, predicates: &[JoinPredicate]) -> ColframeResult<DataFrame> {
    let left_cols = predicates.iter().map(|p| left.column(&p.left_col)).collect::<ColframeResult<Vec<_>>>()?;
    let right_cols = predicates.iter().map(|p| right.column(&p.right_col)).collect::<ColframeResult<Vec<_>>>()?;

    let mut left_idx: Vec<Option<IdxSize>> = Vec::new();
    let mut right_idx: Vec<Option<IdxSize>> = Vec::new();

    for l in 0..left.height() {
        for r in 0..right.height() {
            let mut holds = true;
            for (i, p) in predicates.iter().enumerate() {
                let lv = left_cols[i].get(l)?;
                let rv = right_cols[i].get(r)?;
                if !predicate_holds(p.op, &lv, &rv) {
                    holds = false;
                    break;
                }
            }
            if holds {
                left_idx.push(Some(l as IdxSize));
                right_idx.push(Some(r as IdxSize));
            }
        }
    }

    let left_gathered = left.take(&left_idx)?;
    let right_gathered = right.take(&right_idx)?;

    let left_names: std::collections::HashSet<&str> = left.get_column_names().into_iter().collect();
    let mut columns = left_gathered.into_columns();
    for name in right_gathered.get_column_names() {
        let mut series = right_gathered.column(name)?.clone();
        if left_names.contains(name) {
            series.rename(format!("{name}_right"));
        }
        columns.push(series);
    }
    DataFrame::new(columns)
}

fn predicate_holds(op: CompareOp, lv: &colframe_core::series::AnyValue, rv: &colframe_core::series::AnyValue) -> bool {
    use colframe_core::series::AnyValue;
    if matches!(lv, AnyValue::Null) || matches!(rv, AnyValue::Null) {
        return false;
    }
    let Some(ord) = compare(lv, rv) else {
        return false;
    };
    match op {
        CompareOp::Eq => ord == std::cmp::Ordering::Equal,
        CompareOp::NotEq => ord != std::cmp::Ordering::Equal,
        CompareOp::Lt => ord == std::cmp::Ordering::Less,
        CompareOp::LtEq => ord != std::cmp::Ordering::Greater,
        CompareOp::Gt => ord == std::cmp::Ordering::Greater,
        CompareOp::GtEq => ord != std::cmp::Ordering::Less,
    }
}

/// `None` whenever either side is NaN, since NaN never satisfies any
/// ordering comparison, join-where included.
fn compare(lv: &colframe_core::series::AnyValue, rv: &colframe_core::series::AnyValue) -> Option<std::cmp::Ordering> {
    use colframe_core::series::AnyValue;
    match (lv, rv) {
        (AnyValue::String(a), AnyValue::String(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
        (AnyValue::Boolean(a), AnyValue::Boolean(b)) => Some(a.cmp(b)),
        _ => as_f64(lv).zip(as_f64(rv)).and_then(|(a, b)| a.partial_cmp(&b)),
    }
}

fn as_f64(v: &colframe_core::series::AnyValue) -> Option<f64> {
    use colframe_core::series::AnyValue;
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

#[cfg(test)]
mod test {
    use super::*;
    use colframe_core::chunked_array::ChunkedArray;
    use colframe_core::Series;

    fn left() -> DataFrame {
        DataFrame::new(vec![Series::Int32(ChunkedArray::from_vec("start", vec![1, 5]))]).unwrap()
    }

    fn right() -> DataFrame {
        DataFrame::new(vec![Series::Int32(ChunkedArray::from_vec("end", vec![3, 10]))]).unwrap()
    }

    #[test]
    fn keeps_only_pairs_satisfying_every_predicate() {
        let out = join_where(
            &left(),
            &right(),
            &[JoinPredicate { left_col: "start".into(), op: CompareOp::Lt, right_col: "end".into() }],
        )
        .unwrap();
        assert_eq!(out.height(), 3);
    }

    #[test]
    fn null_operand_never_satisfies_a_predicate() {
        let left = DataFrame::new(vec![Series::Int32(ChunkedArray::from_slice_options("start", &[Some(1), None]))]).unwrap();
        let out = join_where(
            &left,
            &right(),
            &[JoinPredicate { left_col: "start".into(), op: CompareOp::Lt, right_col: "end".into() }],
        )
        .unwrap();
        let starts: Vec<_> = (0..out.height()).map(|i| out.column("start").unwrap().get(i).unwrap()).collect();
        assert!(!starts.iter().any(|v| matches!(v, colframe_core::series::AnyValue::Null)));
    }
}
