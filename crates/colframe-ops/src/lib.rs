//! Relational operators over [`colframe_core::DataFrame`]: filter,
//! group-by+agg, hash join, and join-where (spec §4.7-§4.9).
//!
//! These live one layer above `colframe-core`/`colframe-expr`: a `DataFrame`
//! only guarantees the shape invariants (equal-length, unique names), and
//! `Expr`/`eval::evaluate` only know how to produce one `Series` at a time.
//! Everything here composes those two primitives into whole-frame
//! operators, the way `polars-ops` sits above `polars-core`.

pub mod group_by;
pub mod join;
pub mod join_where;
pub mod key_encoding;

pub use group_by::{GroupBy, GroupByOptions};
pub use join::{hash_join, hash_join_cancellable, JoinType};
pub use join_where::{join_where, CompareOp, JoinPredicate};

use colframe_core::DataFrame;
use colframe_error::ColframeResult;
use colframe_expr::eval::evaluate;
use colframe_expr::Expr;

/// Keep rows where `predicate` evaluates true; null evaluates to "drop"
/// (spec §4.7 `Filter`).
pub fn filter(df: &DataFrame, predicate: &Expr) -> ColframeResult<DataFrame> {
    let mask = evaluate(predicate, df)?;
    let mask = match mask {
        colframe_core::Series::Boolean(b) => b,
        other => {
            return Err(colframe_error::ColframeError::TypeMismatch(format!(
                "filter predicate must evaluate to Boolean, got {:?}",
                other.data_type()
            )))
        },
    };
    df.filter_mask(&mask)
}

/// Spec §4.4's `DataFrame` methods that need the expression/relational
/// layers (`with_column_expr`, `group_by(..).agg(..)`, the three join
/// forms) — kept as an extension trait rather than inherent `DataFrame`
/// methods because `colframe-core` cannot depend on `colframe-expr`/
/// this crate without an upward dependency cycle. `use colframe_ops::DataFrameOpsExt`
/// (re-exported from the `colframe` facade's prelude) brings these into
/// scope alongside the inherent methods, the same way `rayon`'s
/// `ParallelIterator` or `itertools`'s `Itertools` extend a foreign type.
pub trait DataFrameOpsExt {
    fn filter_expr(&self, predicate: &Expr) -> ColframeResult<DataFrame>;
    fn with_column_expr(&self, name: &str, expr: &Expr) -> ColframeResult<DataFrame>;
    fn group_by<'a>(&'a self, keys: &[&str]) -> ColframeResult<GroupBy<'a>>;
    fn group_by_with<'a>(&'a self, keys: &[&str], options: GroupByOptions) -> ColframeResult<GroupBy<'a>>;
    fn join(&self, other: &DataFrame, on: &[&str], how: JoinType) -> ColframeResult<DataFrame>;
    fn join_on(&self, other: &DataFrame, left_on: &[&str], right_on: &[&str], how: JoinType) -> ColframeResult<DataFrame>;
    fn join_where(&self, other: &DataFrame, predicates: &[JoinPredicate]) -> ColframeResult<DataFrame>;
}

impl DataFrameOpsExt for DataFrame {
    fn filter_expr(&self, predicate: &Expr) -> ColframeResult<DataFrame> {
        filter(self, predicate)
    }

    fn with_column_expr(&self, name: &str, expr: &Expr) -> ColframeResult<DataFrame> {
        let mut series = evaluate(expr, self)?;
        series.rename(name);
        self.with_column(series)
    }

    fn group_by<'a>(&'a self, keys: &[&str]) -> ColframeResult<GroupBy<'a>> {
        GroupBy::new(self, keys, GroupByOptions::default())
    }

    fn group_by_with<'a>(&'a self, keys: &[&str], options: GroupByOptions) -> ColframeResult<GroupBy<'a>> {
        GroupBy::new(self, keys, options)
    }

    fn join(&self, other: &DataFrame, on: &[&str], how: JoinType) -> ColframeResult<DataFrame> {
        hash_join(self, other, on, on, how)
    }

    fn join_on(&self, other: &DataFrame, left_on: &[&str], right_on: &[&str], how: JoinType) -> ColframeResult<DataFrame> {
        hash_join(self, other, left_on, right_on, how)
    }

    fn join_where(&self, other: &DataFrame, predicates: &[JoinPredicate]) -> ColframeResult<DataFrame> {
        join_where::join_where(self, other, predicates)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use colframe_core::chunked_array::ChunkedArray;
    use colframe_core::Series;
    use colframe_expr::{col, lit};

    #[test]
    fn filter_keeps_rows_matching_predicate() {
        let df = DataFrame::new(vec![Series::Int32(ChunkedArray::from_vec("age", vec![25, 30, 35]))]).unwrap();
        let out = filter(&df, &col("age").gt(lit(28i32))).unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn extension_trait_group_by_and_join_match_free_functions() {
        let df = DataFrame::new(vec![
            Series::String(colframe_core::chunked_array::StringChunked::from_opt_vec(
                "team",
                vec![Some("a".into()), Some("b".into()), Some("a".into())],
            )),
            Series::Int32(ChunkedArray::from_vec("v", vec![1, 2, 3])),
        ])
        .unwrap();
        let mut aggs = indexmap::IndexMap::new();
        aggs.insert("v_sum".to_string(), col("v").sum());
        let via_trait = df.group_by(&["team"]).unwrap().agg(&aggs).unwrap();
        assert_eq!(via_trait.height(), 2);

        let left = df.clone();
        let right = df.clone();
        let joined = left.join(&right, &["team"], JoinType::Inner).unwrap();
        assert!(joined.height() >= left.height());
    }
}
