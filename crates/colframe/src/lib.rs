//! `colframe`: the public facade over the columnar DataFrame engine.
//!
//! Plays the same role `polars` itself plays over its split workspace
//! (`polars-core`, `polars-plan`, `polars-io`, ...): this crate adds no
//! engine logic of its own, it only re-exports the pieces a caller needs
//! and adds the handful of free-function constructors spec §6 names
//! (`make_dataframe`, `from_map`, `from_rows`, `series_with_nulls`) that
//! don't naturally belong to any one lower crate.
//!
//! ```
//! use colframe::prelude::*;
//!
//! let df = make_dataframe(vec![
//!     Series::named("name", vec!["A", "B", "C"]),
//!     Series::named("age", vec![25i32, 30, 35]),
//!     Series::named("score", vec![95.5f64, 87.0, 92.3]),
//! ]).unwrap();
//! assert_eq!(df.shape(), (3, 3));
//! let filtered = df.filter_expr(&col("age").gt(lit(28i32))).unwrap();
//! assert_eq!(filtered.height(), 2);
//! ```

pub mod construct;

pub use colframe_core::chunked_array::{self, BinaryChunked, BooleanChunked, ChunkedArray, StringChunked};
pub use colframe_core::series::AnyValue;
pub use colframe_core::{DataFrame, DataType, Field, Schema, Series, TimeUnit};
pub use colframe_error::{ColframeError, ColframeResult};
pub use colframe_expr::{col, lit, when, AggFn, BinaryOp, Expr, UnaryOp};
pub use colframe_ops::{hash_join, hash_join_cancellable, join_where, CompareOp, DataFrameOpsExt, GroupBy, GroupByOptions, JoinPredicate, JoinType};
pub use colframe_plan::{LazyFrame, LogicalPlan, ScanSource};
pub use colframe_utils::CancellationToken;

pub use colframe_io::{
    read_csv, read_json, read_ndjson, read_ndjson_chunked, read_parquet, write_csv, write_json, write_ndjson, write_parquet,
    CsvReadOptions, CsvWriteOptions, JsonOrientation, JsonReadOptions, JsonWriteOptions, NdjsonReadOptions, ParquetCompression,
    ParquetReadOptions, ParquetWriteOptions,
};

pub use construct::{from_map, from_rows, make_dataframe, series_with_nulls, NamedFrom};

use std::path::Path;

/// Build a lazy plan scanning a CSV file (spec §6 `scan_csv`). The
/// optimizer absorbs any later `.select`/`.filter` into the scan's
/// projection/predicate pushdown (spec §4.8).
pub fn scan_csv(path: impl AsRef<Path>, opts: CsvReadOptions) -> LazyFrame {
    LazyFrame::scan(ScanSource::CsvPath(path.as_ref().to_path_buf(), opts))
}

/// Build a lazy plan scanning a Parquet file (spec §6 `scan_parquet`).
pub fn scan_parquet(path: impl AsRef<Path>, opts: ParquetReadOptions) -> LazyFrame {
    LazyFrame::scan(ScanSource::ParquetPath(path.as_ref().to_path_buf(), opts))
}

/// Everything a typical caller needs in scope: `use colframe::prelude::*;`
/// (spec §6's "public library surface").
pub mod prelude {
    pub use crate::{
        col, from_map, from_rows, lit, make_dataframe, scan_csv, scan_parquet, series_with_nulls, when, AggFn, AnyValue, BinaryOp,
        CancellationToken, ColframeError, ColframeResult, DataFrame, DataFrameOpsExt, DataType, Expr, Field, GroupByOptions, JoinType,
        LazyFrame, NamedFrom, Schema, Series, TimeUnit, UnaryOp,
    };
}

#[cfg(test)]
mod test {
    use super::prelude::*;
    use super::ScanSource;

    #[test]
    fn construction_filter_and_aggregate_scenario() {
        let df = make_dataframe(vec![
            Series::named("name", vec!["A".to_string(), "B".to_string(), "C".to_string()]),
            Series::named("age", vec![25i32, 30, 35]),
            Series::named("score", vec![95.5f64, 87.0, 92.3]),
        ])
        .unwrap();
        assert_eq!(df.shape(), (3, 3));

        let filtered = df.filter_expr(&col("age").gt(lit(28i32))).unwrap();
        assert_eq!(filtered.height(), 2);

        let total = df.column("score").unwrap().sum().unwrap();
        match total {
            AnyValue::Float64(v) => assert!((v - 274.8).abs() < 1e-9),
            other => panic!("unexpected sum result: {other:?}"),
        }
    }

    #[test]
    fn lazy_scan_select_filter_matches_eager() {
        let df = make_dataframe(vec![Series::named("a", vec![1i32, 2, 3, 4])]).unwrap();
        let lazy = LazyFrame::scan(ScanSource::InMemory(std::sync::Arc::new(df.clone())))
            .select(vec![col("a")])
            .filter(col("a").gt(lit(2i32)));
        let out = lazy.collect().unwrap();
        let eager = df.filter_expr(&col("a").gt(lit(2i32))).unwrap();
        assert_eq!(out.height(), eager.height());
    }

    #[test]
    fn cancelled_token_aborts_collect_before_materializing() {
        let df = make_dataframe(vec![Series::named("a", vec![1i32, 2, 3, 4])]).unwrap();
        let lazy = LazyFrame::scan(ScanSource::InMemory(std::sync::Arc::new(df))).filter(col("a").gt(lit(1i32)));
        let token = CancellationToken::new();
        token.cancel();
        let err = lazy.collect_cancellable(Some(&token)).unwrap_err();
        assert!(matches!(err, ColframeError::Cancelled));
    }
}
