//! A tiny, format-agnostic intermediate shape every reader in this crate
//! produces before handing off to `colframe-core` (spec §4.9: "external
//! readers expose open(source, options) -> iterator of record batches
//! (arrays + schema); the core maps each batch into Series by type-code").
//!
//! CSV/JSON/Parquet each parse their own wire format into a `RecordBatch`
//! — one `(name, dtype, values)` triple per column — then share this one
//! path into a `DataFrame`, rather than each reader hand-rolling its own
//! `ChunkedArray` construction.

use colframe_core::series::AnyValue;
use colframe_core::{DataFrame, DataType};
use colframe_error::ColframeResult;
use colframe_expr::eval::series_from_any_values;
use colframe_utils::SmallStr;

pub struct RecordBatch {
    pub columns: Vec<(SmallStr, DataType, Vec<AnyValue>)>,
}

impl RecordBatch {
    pub fn new() -> Self {
        Self { columns: Vec::new() }
    }

    pub fn push_column(&mut self, name: impl Into<SmallStr>, dtype: DataType, values: Vec<AnyValue>) {
        self.columns.push((name.into(), dtype, values));
    }

    pub fn into_dataframe(self) -> ColframeResult<DataFrame> {
        let series = self
            .columns
            .into_iter()
            .map(|(name, _dtype, values)| series_from_any_values(&name, &values))
            .collect::<ColframeResult<Vec<_>>>()?;
        DataFrame::new(series)
    }
}

impl Default for RecordBatch {
    fn default() -> Self {
        Self::new()
    }
}

/// The reverse direction: a writer's common entry point, splitting a
/// `DataFrame` into column name/dtype/value triples so CSV/JSON/Parquet
/// writers don't each re-derive this from `Series`.
pub fn dataframe_to_rows(df: &DataFrame) -> ColframeResult<Vec<(SmallStr, DataType, Vec<AnyValue>)>> {
    df.columns()
        .iter()
        .map(|s| {
            let values = (0..s.len()).map(|i| s.get(i)).collect::<ColframeResult<Vec<_>>>()?;
            Ok((SmallStr::from(s.name()), s.data_type(), values))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use colframe_core::chunked_array::ChunkedArray;
    use colframe_core::Series;

    #[test]
    fn round_trips_through_a_dataframe() {
        let mut batch = RecordBatch::new();
        batch.push_column("a", DataType::Int64, vec![AnyValue::Int64(1), AnyValue::Int64(2)]);
        let df = batch.into_dataframe().unwrap();
        assert_eq!(df.height(), 2);

        let df2 = DataFrame::new(vec![Series::Int64(ChunkedArray::from_vec("a", vec![1, 2]))]).unwrap();
        let rows = dataframe_to_rows(&df2).unwrap();
        assert_eq!(rows[0].0.as_str(), "a");
        assert_eq!(rows[0].2, vec![AnyValue::Int64(1), AnyValue::Int64(2)]);
    }
}
