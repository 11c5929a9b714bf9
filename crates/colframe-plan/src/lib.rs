//! The lazy layer (spec §4.8): logical plan nodes, the rewrite passes
//! that push predicates/projections toward `Scan` and fold constant
//! expressions, and the bottom-up executor that materializes a
//! `colframe_core::DataFrame` by calling straight into `colframe-ops`'s
//! eager operators.
//!
//! Mirrors the split `polars-plan` (nodes + optimizer) / `polars-mem-engine`
//! (executor) take in the teacher workspace, collapsed into one crate here
//! since the retrieval pack only carried `polars-plan` source (see
//! `DESIGN.md`).

pub mod executor;
pub mod node;
pub mod optimizer;
pub mod source;

pub use executor::{collect, collect_cancellable};
pub use node::LogicalPlan;
pub use optimizer::optimize;
pub use source::ScanSource;

use std::sync::Arc;

use colframe_core::{DataFrame, Schema};
use colframe_error::ColframeResult;
use colframe_expr::Expr;
use colframe_ops::JoinType;
use colframe_utils::CancellationToken;
use indexmap::IndexMap;

/// A lazily-built query: wraps a [`LogicalPlan`] so callers can chain
/// `Project`/`Filter`/`Sort`/... without materializing anything until
/// [`LazyFrame::collect`] (spec §4.8: "optimizer rewrites and then
/// materializes by calling the eager operators").
#[derive(Clone)]
pub struct LazyFrame {
    plan: Arc<LogicalPlan>,
}

impl LazyFrame {
    pub fn new(plan: LogicalPlan) -> Self {
        Self { plan: Arc::new(plan) }
    }

    pub fn scan(source: ScanSource) -> Self {
        Self::new(LogicalPlan::scan(source))
    }

    pub fn plan(&self) -> &LogicalPlan {
        &self.plan
    }

    pub fn schema(&self) -> ColframeResult<Schema> {
        self.plan.schema()
    }

    pub fn select(&self, exprs: Vec<Expr>) -> Self {
        Self::new(LogicalPlan::Project(self.plan.clone(), exprs))
    }

    pub fn filter(&self, predicate: Expr) -> Self {
        Self::new(LogicalPlan::Filter(self.plan.clone(), predicate))
    }

    pub fn with_column(&self, name: impl Into<String>, expr: Expr) -> Self {
        Self::new(LogicalPlan::WithColumn(self.plan.clone(), name.into(), expr))
    }

    pub fn sort(&self, by: Vec<String>, descending: Vec<bool>, nulls_last: bool) -> Self {
        Self::new(LogicalPlan::Sort { input: self.plan.clone(), by, descending, nulls_last })
    }

    pub fn limit(&self, n: usize) -> Self {
        Self::new(LogicalPlan::Limit(self.plan.clone(), n))
    }

    pub fn group_by(&self, keys: Vec<String>, aggs: IndexMap<String, Expr>) -> Self {
        Self::new(LogicalPlan::Aggregate { input: self.plan.clone(), keys, aggs })
    }

    pub fn join(&self, other: LazyFrame, kind: JoinType, left_keys: Vec<String>, right_keys: Vec<String>) -> Self {
        Self::new(LogicalPlan::Join {
            left: self.plan.clone(),
            right: other.plan,
            kind,
            left_keys,
            right_keys,
        })
    }

    /// Human-readable plan tree (spec §4.8 `explain`). `optimized = false`
    /// prints the tree as built; `true` runs the rewrite passes first, so
    /// callers can diff the before/after shape without a separate
    /// `.optimize()` round-trip.
    pub fn explain(&self, optimized: bool) -> ColframeResult<String> {
        if optimized {
            Ok(optimizer::optimize(self.plan.clone())?.explain())
        } else {
            Ok(self.plan.explain())
        }
    }

    /// Run the rewrite passes to a fixed point and return the rewritten
    /// plan without executing it.
    pub fn optimize(&self) -> ColframeResult<LazyFrame> {
        Ok(LazyFrame { plan: optimizer::optimize(self.plan.clone())? })
    }

    /// Optimize then materialize into a `DataFrame` (spec §4.8 "collect").
    pub fn collect(&self) -> ColframeResult<DataFrame> {
        self.collect_cancellable(None)
    }

    /// Same as [`collect`](Self::collect), checking `token` at each `Scan`
    /// and join build/probe boundary (spec §5).
    pub fn collect_cancellable(&self, token: Option<&CancellationToken>) -> ColframeResult<DataFrame> {
        let optimized = optimizer::optimize(self.plan.clone())?;
        executor::collect_cancellable(&optimized, token)
    }
}

#[cfg(test)]
mod test {
    use colframe_core::chunked_array::ChunkedArray;
    use colframe_core::Series;
    use colframe_expr::{col, lit};

    use super::*;

    fn df() -> DataFrame {
        DataFrame::new(vec![
            Series::Int32(ChunkedArray::from_vec("a", vec![1, 2, 3, 4])),
            Series::Int32(ChunkedArray::from_vec("b", vec![10, 20, 30, 40])),
        ])
        .unwrap()
    }

    #[test]
    fn lazy_frame_collect_matches_eager_filter() {
        let lf = LazyFrame::scan(ScanSource::InMemory(Arc::new(df()))).filter(col("a").gt(lit(2i32)));
        let out = lf.collect().unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn explain_reports_unoptimized_tree_shape() {
        let lf = LazyFrame::scan(ScanSource::InMemory(Arc::new(df())))
            .select(vec![col("a"), col("b")])
            .filter(col("a").gt(lit(1i32)));
        let tree = lf.explain(false).unwrap();
        assert!(tree.contains("Filter"));
        assert!(tree.contains("Project"));
        assert!(tree.contains("Scan"));
    }

    #[test]
    fn explain_optimized_pushes_filter_toward_scan() {
        let lf = LazyFrame::scan(ScanSource::InMemory(Arc::new(df())))
            .filter(col("a").gt(lit(1i32)))
            .select(vec![col("a")]);
        let tree = lf.explain(true).unwrap();
        assert!(tree.contains("Scan"));
    }
}
