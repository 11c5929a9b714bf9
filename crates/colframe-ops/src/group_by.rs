//! Group-by + aggregate (spec §4.8).
//!
//! Grouping itself is a single pass building an `IndexMap` keyed by the
//! encoded composite key from [`crate::key_encoding`] — `IndexMap` rather
//! than a plain hash map because the spec's first-seen-order-preserving
//! contract for group output rows falls out of it for free (insertion order
//! is iteration order), the same reason `polars` keeps its own grouping
//! proxy ordered rather than re-sorting by key afterward.

use indexmap::IndexMap;
use rayon::prelude::*;

use colframe_core::series::AnyValue;
use colframe_core::{DataFrame, Series};
use colframe_error::{ColframeError, ColframeResult};
use colframe_expr::eval::{apply_aggregate, evaluate, series_from_any_values};
use colframe_expr::Expr;
use colframe_utils::{build_hasher, PlRandomState, SmallStr};

use crate::key_encoding;

/// Tunables for [`GroupBy::new`] (spec §9 open question: "what happens to a
/// null group key by default").
#[derive(Debug, Clone, Copy)]
pub struct GroupByOptions {
    /// When true, rows with a null value in any key column are excluded
    /// from every group rather than forming their own `Null` group.
    pub drop_null_keys: bool,
}

impl Default for GroupByOptions {
    fn default() -> Self {
        Self { drop_null_keys: false }
    }
}

/// A `DataFrame` partitioned by one or more key columns, ready to reduce
/// with [`GroupBy::agg`].
pub struct GroupBy<'a> {
    df: &'a DataFrame,
    keys: Vec<SmallStr>,
    groups: IndexMap<Vec<u8>, Vec<u32>, PlRandomState>,
}

impl<'a> GroupBy<'a> {
    /// Partition `df` by the named key columns, preserving first-seen key
    /// order (spec §4.8 `group_by`).
    pub fn new(df: &'a DataFrame, keys: &[&str], options: GroupByOptions) -> ColframeResult<Self> {
        let _span = tracing::debug_span!("group_by-build-keys", rows = df.height(), keys = keys.len()).entered();
        let encoded = key_encoding::encode_keys(df, keys)?;
        let mut groups: IndexMap<Vec<u8>, Vec<u32>, PlRandomState> = IndexMap::with_hasher(build_hasher());
        for row in 0..df.height() {
            if options.drop_null_keys && key_encoding::row_has_null(df, keys, row)? {
                continue;
            }
            groups.entry(encoded[row].clone()).or_default().push(row as u32);
        }
        Ok(Self {
            df,
            keys: keys.iter().map(|&k| SmallStr::from(k)).collect(),
            groups,
        })
    }

    /// Number of distinct groups.
    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    /// Reduce each group to one row: the key columns (first occurrence of
    /// each key), followed by one output column per requested aggregate
    /// expression, in the order given (spec §4.8 `agg`).
    ///
    /// Each value in `aggs` must be an (optionally aliased) `Aggregate`
    /// expression — e.g. `col("score").mean()` — since a group reduces
    /// many rows from its child expression to one scalar per group.
    pub fn agg(&self, aggs: &IndexMap<String, Expr>) -> ColframeResult<DataFrame> {
        let _span = tracing::debug_span!("group_by-materialize", groups = self.groups.len(), aggs = aggs.len()).entered();
        let group_rows: Vec<&Vec<u32>> = self.groups.values().collect();
        let first_rows: Vec<Option<u32>> = group_rows.iter().map(|rows| Some(rows[0])).collect();

        let mut columns = Vec::with_capacity(self.keys.len() + aggs.len());
        for key in &self.keys {
            columns.push(self.df.column(key)?.take(&first_rows)?);
        }

        for (out_name, expr) in aggs {
            let Some((func, child)) = expr.as_aggregate() else {
                return Err(ColframeError::InvalidExpression(format!(
                    "group_by agg expression for '{out_name}' is not an aggregate (e.g. col(..).sum())"
                )));
            };
            let child_series = evaluate(child, self.df)?;
            let values: Vec<AnyValue> = colframe_utils::pool::install(|| {
                group_rows
                    .par_iter()
                    .map(|rows| {
                        let idx: Vec<Option<u32>> = rows.iter().map(|&r| Some(r)).collect();
                        let sub = child_series.take(&idx)?;
                        apply_aggregate(func, &sub)
                    })
                    .collect::<ColframeResult<Vec<_>>>()
            })?;
            columns.push(series_from_any_values(out_name, &values)?);
        }

        DataFrame::new(columns)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use colframe_core::chunked_array::ChunkedArray;
    use colframe_core::DataType;
    use colframe_expr::col;

    fn df() -> DataFrame {
        DataFrame::new(vec![
            Series::String(colframe_core::chunked_array::StringChunked::from_opt_vec(
                "team",
                vec![Some("a".into()), Some("b".into()), Some("a".into()), Some("b".into())],
            )),
            Series::Int64(ChunkedArray::from_vec("score", vec![10, 20, 30, 40])),
        ])
        .unwrap()
    }

    #[test]
    fn groups_preserve_first_seen_order() {
        let gb = GroupBy::new(&df(), &["team"], GroupByOptions::default()).unwrap();
        assert_eq!(gb.n_groups(), 2);
        let mut aggs = IndexMap::new();
        aggs.insert("total".to_string(), col("score").sum());
        let out = gb.agg(&aggs).unwrap();
        assert_eq!(out.column("team").unwrap().get(0).unwrap(), AnyValue::String("a".into()));
        assert_eq!(out.column("total").unwrap().data_type(), DataType::Int64);
        assert_eq!(out.column("total").unwrap().get(0).unwrap(), AnyValue::Int64(40));
        assert_eq!(out.column("total").unwrap().get(1).unwrap(), AnyValue::Int64(60));
    }

    #[test]
    fn drop_null_keys_excludes_null_group() {
        let df = DataFrame::new(vec![
            Series::Int32(ChunkedArray::from_slice_options("k", &[Some(1), None, Some(1)])),
            Series::Int64(ChunkedArray::from_vec("v", vec![1, 2, 3])),
        ])
        .unwrap();
        let gb = GroupBy::new(&df, &["k"], GroupByOptions { drop_null_keys: true }).unwrap();
        assert_eq!(gb.n_groups(), 1);
    }

    #[test]
    fn non_aggregate_expression_is_rejected() {
        let gb = GroupBy::new(&df(), &["team"], GroupByOptions::default()).unwrap();
        let mut aggs = IndexMap::new();
        aggs.insert("bad".to_string(), col("score"));
        assert!(gb.agg(&aggs).is_err());
    }
}
