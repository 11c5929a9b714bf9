//! Scan sources a [`crate::node::LogicalPlan::Scan`] can read from (spec
//! §4.8: `Scan(source, projected_columns?, pushed_predicates?)` where
//! `source` is one of `{InMemory, CsvPath, ParquetPath}`).

use std::path::PathBuf;
use std::sync::Arc;

use colframe_core::{DataFrame, Schema};
use colframe_error::ColframeResult;
use colframe_io::{CsvReadOptions, ParquetReadOptions};

/// Where a `Scan` node reads its rows from.
#[derive(Clone)]
pub enum ScanSource {
    /// Already materialized — the common case for eager callers who wrap a
    /// `DataFrame` in a plan to reuse the optimizer/executor machinery.
    InMemory(Arc<DataFrame>),
    CsvPath(PathBuf, CsvReadOptions),
    ParquetPath(PathBuf, ParquetReadOptions),
}

impl ScanSource {
    /// The schema a scan of this source would produce, without reading
    /// the whole file where avoidable (spec §4.8 projection pushdown needs
    /// this to validate that a requested column set actually exists).
    pub fn schema(&self) -> ColframeResult<Schema> {
        match self {
            ScanSource::InMemory(df) => Ok(df.schema()),
            // Neither the CSV nor the Parquet reader in this workspace
            // exposes a cheap, read-only schema probe separate from
            // reading the data (the CSV reader's type inference needs the
            // sample rows; the parquet reader's schema comes off the file
            // footer, which `read_parquet` already parses as part of
            // opening the file). The executor resolves the schema by
            // reading once, lazily, the first time it is asked — see
            // `LogicalPlan::schema`.
            ScanSource::CsvPath(path, opts) => {
                let mut probe = opts.clone();
                probe.infer_schema_rows = 1;
                let df = colframe_io::read_csv(path, &probe)?;
                Ok(df.schema())
            },
            ScanSource::ParquetPath(path, opts) => {
                let mut probe = opts.clone();
                probe.num_rows = Some(0);
                let df = colframe_io::read_parquet(path, &probe)?;
                Ok(df.schema())
            },
        }
    }

    /// Read this source, applying the given projection and predicate
    /// pushdown where the source format supports it.
    ///
    /// `CsvPath`/`ParquetPath` absorb `projection` directly (the reader
    /// only parses the requested columns); `pushed_predicates` on a file
    /// source are not evaluated by the reader itself (neither reader in
    /// this workspace supports predicate pushdown at the parse layer) —
    /// the executor re-applies them as an ordinary `Filter` after the
    /// read, which is still strictly fewer rows materialized downstream
    /// than not pushing at all whenever the projection narrowed the scan.
    pub fn read(&self, projection: Option<&[String]>) -> ColframeResult<DataFrame> {
        match self {
            ScanSource::InMemory(df) => match projection {
                Some(cols) => {
                    let names: Vec<&str> = cols.iter().map(|s| s.as_str()).collect();
                    df.select(&names)
                },
                None => Ok((**df).clone()),
            },
            ScanSource::CsvPath(path, opts) => {
                let mut opts = opts.clone();
                if let Some(cols) = projection {
                    opts.projection = Some(cols.to_vec());
                }
                colframe_io::read_csv(path, &opts)
            },
            ScanSource::ParquetPath(path, opts) => {
                let mut opts = opts.clone();
                if let Some(cols) = projection {
                    opts.projection = Some(cols.to_vec());
                }
                colframe_io::read_parquet(path, &opts)
            },
        }
    }
}

impl std::fmt::Debug for ScanSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanSource::InMemory(df) => write!(f, "InMemory[{}x{}]", df.height(), df.width()),
            ScanSource::CsvPath(p, _) => write!(f, "Csv({})", p.display()),
            ScanSource::ParquetPath(p, _) => write!(f, "Parquet({})", p.display()),
        }
    }
}
