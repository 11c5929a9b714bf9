//! Bottom-up execution of an (optimized or raw) [`LogicalPlan`] into a
//! materialized [`DataFrame`] (spec §4.8 "Execution (collect)"), folded
//! into this crate since the retrieval pack did not carry a standalone
//! `polars-mem-engine` source to ground a separate crate on (see
//! `DESIGN.md`).
//!
//! Every node maps directly onto one `colframe-ops`/`colframe-core`
//! eager call; the only non-trivial bit is `Scan`, which must apply
//! `pushed_predicates` itself for sources whose reader can't filter rows
//! (a file source only pushes the projection into the reader).

use colframe_core::DataFrame;
use colframe_error::ColframeResult;
use colframe_expr::eval::evaluate;
use colframe_utils::CancellationToken;

use crate::node::LogicalPlan;

/// Materialize `plan` by walking it bottom-up, calling the eager
/// `colframe-ops`/`colframe-core` operator for each node (spec §4.8).
pub fn collect(plan: &LogicalPlan) -> ColframeResult<DataFrame> {
    collect_cancellable(plan, None)
}

/// Same as [`collect`], but checks `token` (if given) before each `Scan`
/// read and threads it into join build/probe — the two node kinds spec §5
/// calls out as cooperative-cancellation checkpoints.
pub fn collect_cancellable(plan: &LogicalPlan, token: Option<&CancellationToken>) -> ColframeResult<DataFrame> {
    if let Some(token) = token {
        token.check()?;
    }
    match plan {
        LogicalPlan::Scan { source, projected_columns, pushed_predicates } => {
            let _span = tracing::debug_span!("scan", predicates = pushed_predicates.len()).entered();
            let projection = projected_columns.as_deref();
            let mut df = source.read(projection)?;
            for predicate in pushed_predicates {
                df = colframe_ops::filter(&df, predicate)?;
            }
            Ok(df)
        },
        LogicalPlan::Project(input, exprs) => {
            let input_df = collect_cancellable(input, token)?;
            let mut columns = Vec::with_capacity(exprs.len());
            for expr in exprs {
                let mut series = evaluate(expr, &input_df)?;
                series.rename(expr.output_name());
                columns.push(series);
            }
            DataFrame::new(columns)
        },
        LogicalPlan::Filter(input, predicate) => {
            let input_df = collect_cancellable(input, token)?;
            colframe_ops::filter(&input_df, predicate)
        },
        LogicalPlan::Sort { input, by, descending, nulls_last } => {
            let input_df = collect_cancellable(input, token)?;
            let by: Vec<&str> = by.iter().map(|s| s.as_str()).collect();
            input_df.sort_by(&by, descending, *nulls_last)
        },
        LogicalPlan::Limit(input, n) => {
            let input_df = collect_cancellable(input, token)?;
            input_df.head(*n)
        },
        LogicalPlan::Aggregate { input, keys, aggs } => {
            let input_df = collect_cancellable(input, token)?;
            let keys: Vec<&str> = keys.iter().map(|s| s.as_str()).collect();
            let grouped = colframe_ops::GroupBy::new(&input_df, &keys, colframe_ops::GroupByOptions::default())?;
            grouped.agg(aggs)
        },
        LogicalPlan::Join { left, right, kind, left_keys, right_keys } => {
            let left_df = collect_cancellable(left, token)?;
            let right_df = collect_cancellable(right, token)?;
            let left_on: Vec<&str> = left_keys.iter().map(|s| s.as_str()).collect();
            let right_on: Vec<&str> = right_keys.iter().map(|s| s.as_str()).collect();
            colframe_ops::hash_join_cancellable(&left_df, &right_df, &left_on, &right_on, *kind, token)
        },
        LogicalPlan::WithColumn(input, name, expr) => {
            let input_df = collect_cancellable(input, token)?;
            let mut series = evaluate(expr, &input_df)?;
            series.rename(name.clone());
            input_df.with_column(series)
        },
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use colframe_core::chunked_array::ChunkedArray;
    use colframe_core::Series;
    use colframe_expr::{col, lit};
    use colframe_ops::JoinType;

    use super::*;
    use crate::source::ScanSource;

    fn people() -> DataFrame {
        DataFrame::new(vec![
            Series::String(colframe_core::chunked_array::StringChunked::from_opt_vec(
                "name",
                vec![Some("A".into()), Some("B".into()), Some("C".into())],
            )),
            Series::Int32(ChunkedArray::from_vec("age", vec![25, 30, 35])),
        ])
        .unwrap()
    }

    #[test]
    fn scan_and_filter_round_trips_eager_semantics() {
        let plan = LogicalPlan::Filter(
            Arc::new(LogicalPlan::scan(ScanSource::InMemory(Arc::new(people())))),
            col("age").gt(lit(28i32)),
        );
        let out = collect(&plan).unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn project_renames_per_expression_output_name() {
        let plan = LogicalPlan::Project(
            Arc::new(LogicalPlan::scan(ScanSource::InMemory(Arc::new(people())))),
            vec![col("age").alias("years")],
        );
        let out = collect(&plan).unwrap();
        assert_eq!(out.get_column_names(), vec!["years"]);
    }

    #[test]
    fn aggregate_node_matches_eager_group_by() {
        let plan = LogicalPlan::Aggregate {
            input: Arc::new(LogicalPlan::scan(ScanSource::InMemory(Arc::new(people())))),
            keys: vec!["name".to_string()],
            aggs: {
                let mut m = indexmap::IndexMap::new();
                m.insert("age_sum".to_string(), col("age").sum());
                m
            },
        };
        let out = collect(&plan).unwrap();
        assert_eq!(out.height(), 3);
    }

    #[test]
    fn join_node_matches_eager_hash_join() {
        let left = DataFrame::new(vec![
            Series::Int32(ChunkedArray::from_vec("id", vec![1, 2, 3])),
            Series::String(colframe_core::chunked_array::StringChunked::from_opt_vec(
                "v",
                vec![Some("a".into()), Some("b".into()), Some("c".into())],
            )),
        ])
        .unwrap();
        let right = DataFrame::new(vec![
            Series::Int32(ChunkedArray::from_vec("id", vec![2, 3, 4])),
            Series::String(colframe_core::chunked_array::StringChunked::from_opt_vec(
                "w",
                vec![Some("X".into()), Some("Y".into()), Some("Z".into())],
            )),
        ])
        .unwrap();
        let plan = LogicalPlan::Join {
            left: Arc::new(LogicalPlan::scan(ScanSource::InMemory(Arc::new(left)))),
            right: Arc::new(LogicalPlan::scan(ScanSource::InMemory(Arc::new(right)))),
            kind: JoinType::Inner,
            left_keys: vec!["id".to_string()],
            right_keys: vec!["id".to_string()],
        };
        let out = collect(&plan).unwrap();
        assert_eq!(out.height(), 2);
    }
}
