//! Parquet reader/writer built on the low-level, row-oriented `parquet`
//! crate API — the workspace's `parquet` dependency does not enable the
//! `"arrow"` feature, so this is a thin adapter over `SerializedFileReader`'s
//! `Row`/`Field` iteration and `SerializedFileWriter`'s typed column writers
//! rather than an Arrow `RecordBatch` bridge.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use ::parquet::basic::{Compression as PqCompression, Type as PhysicalType, ZstdLevel};
use ::parquet::column::writer::ColumnWriter;
use ::parquet::file::properties::WriterProperties;
use ::parquet::file::reader::{FileReader, SerializedFileReader};
use ::parquet::file::writer::SerializedFileWriter;
use ::parquet::record::Field;
use ::parquet::schema::parser::parse_message_type;
use ::parquet::schema::types::Type as SchemaType;

use colframe_core::series::AnyValue;
use colframe_core::{DataFrame, DataType};
use colframe_error::{ColframeError, ColframeResult};

use crate::record_batch::{dataframe_to_rows, RecordBatch};

#[derive(Debug, Clone)]
pub struct ParquetReadOptions {
    pub projection: Option<Vec<String>>,
    pub row_groups: Option<Vec<usize>>,
    pub num_rows: Option<usize>,
    /// Advisory: whether row-group reads may run across the worker pool.
    pub parallel: bool,
    pub batch_size: usize,
    pub buffered_stream: bool,
    pub buffer_size: usize,
    pub memory_map: bool,
}

impl Default for ParquetReadOptions {
    fn default() -> Self {
        Self {
            projection: None,
            row_groups: None,
            num_rows: None,
            parallel: true,
            batch_size: 8192,
            buffered_stream: false,
            buffer_size: 8 * 1024 * 1024,
            memory_map: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParquetCompression {
    None,
    Snappy,
    Gzip,
    Zstd,
    Lz4,
}

#[derive(Debug, Clone)]
pub struct ParquetWriteOptions {
    pub compression: ParquetCompression,
    pub compression_level: Option<i32>,
    pub row_group_size: usize,
    pub page_size: usize,
    pub dictionary_encoding: bool,
}

impl Default for ParquetWriteOptions {
    fn default() -> Self {
        Self {
            compression: ParquetCompression::Snappy,
            compression_level: None,
            row_group_size: 1_000_000,
            page_size: 1024 * 1024,
            dictionary_encoding: true,
        }
    }
}

/// Read a Parquet file into a `DataFrame` via the row-record API: each row
/// group's rows are materialized as `parquet::record::Row`s and converted
/// field-by-field into `AnyValue`s.
pub fn read_parquet(path: impl AsRef<Path>, opts: &ParquetReadOptions) -> ColframeResult<DataFrame> {
    let file = File::open(path.as_ref())?;
    let reader = SerializedFileReader::new(file).map_err(pq_err)?;
    let metadata = reader.metadata();

    let schema_columns: Vec<String> = metadata.file_metadata().schema_descr().columns().iter().map(|c| c.name().to_string()).collect();
    let names: Vec<String> = match &opts.projection {
        Some(p) => p.clone(),
        None => schema_columns.clone(),
    };

    let groups_to_read: Vec<usize> = match &opts.row_groups {
        Some(g) => g.clone(),
        None => (0..reader.num_row_groups()).collect(),
    };

    let mut raw_rows: Vec<Vec<Option<Field>>> = Vec::new();
    'outer: for group_idx in groups_to_read {
        let row_group = reader.get_row_group(group_idx).map_err(pq_err)?;
        let mut rows = row_group.get_row_iter(None).map_err(pq_err)?;
        while let Some(row) = rows.next() {
            let row = row.map_err(pq_err)?;
            let values: Vec<Option<Field>> = names
                .iter()
                .map(|name| row.get_column_iter().find(|(n, _)| *n == name).map(|(_, f)| f.clone()))
                .collect();
            raw_rows.push(values);
            if let Some(limit) = opts.num_rows {
                if raw_rows.len() >= limit {
                    break 'outer;
                }
            }
        }
    }

    let mut batch = RecordBatch::new();
    for (col_idx, name) in names.iter().enumerate() {
        let column: Vec<Option<&Field>> = raw_rows.iter().map(|r| r[col_idx].as_ref()).collect();
        let dtype = infer_dtype(&column);
        let values = column.iter().map(|f| field_to_any_value(*f, &dtype)).collect();
        batch.push_column(name.clone(), dtype, values);
    }
    batch.into_dataframe()
}

fn infer_dtype(values: &[Option<&Field>]) -> DataType {
    for v in values.iter().flatten() {
        match v {
            Field::Bool(_) => return DataType::Boolean,
            Field::Byte(_) | Field::Short(_) | Field::Int(_) | Field::Long(_) | Field::UByte(_) | Field::UShort(_) | Field::UInt(_) | Field::ULong(_) => {
                return DataType::Int64
            }
            Field::Float(_) | Field::Double(_) => return DataType::Float64,
            Field::Str(_) => return DataType::String,
            Field::Bytes(_) => return DataType::Binary,
            _ => continue,
        }
    }
    DataType::String
}

fn field_to_any_value(field: Option<&Field>, dtype: &DataType) -> AnyValue {
    let Some(field) = field else { return AnyValue::Null };
    match (dtype, field) {
        (DataType::Boolean, Field::Bool(b)) => AnyValue::Boolean(*b),
        (DataType::Int64, Field::Byte(x)) => AnyValue::Int64(*x as i64),
        (DataType::Int64, Field::Short(x)) => AnyValue::Int64(*x as i64),
        (DataType::Int64, Field::Int(x)) => AnyValue::Int64(*x as i64),
        (DataType::Int64, Field::Long(x)) => AnyValue::Int64(*x),
        (DataType::Int64, Field::UByte(x)) => AnyValue::Int64(*x as i64),
        (DataType::Int64, Field::UShort(x)) => AnyValue::Int64(*x as i64),
        (DataType::Int64, Field::UInt(x)) => AnyValue::Int64(*x as i64),
        (DataType::Int64, Field::ULong(x)) => AnyValue::Int64(*x as i64),
        (DataType::Float64, Field::Float(x)) => AnyValue::Float64(*x as f64),
        (DataType::Float64, Field::Double(x)) => AnyValue::Float64(*x),
        (DataType::String, Field::Str(s)) => AnyValue::String(s.as_str().into()),
        (DataType::Binary, Field::Bytes(b)) => AnyValue::Binary(b.data().to_vec().into()),
        _ => AnyValue::Null,
    }
}

/// Write a `DataFrame` to Parquet using the row-group typed column writer
/// API (spec §6 writer option surface: compression, row-group/page sizing,
/// dictionary encoding).
pub fn write_parquet(df: &DataFrame, path: impl AsRef<Path>, opts: &ParquetWriteOptions) -> ColframeResult<()> {
    let rows = dataframe_to_rows(df)?;
    let height = rows.first().map(|(_, _, v)| v.len()).unwrap_or(0);

    let message = build_message_type(&rows);
    let schema: Arc<SchemaType> = Arc::new(parse_message_type(&message).map_err(pq_err)?);

    let mut builder = WriterProperties::builder()
        .set_compression(to_pq_compression(opts.compression, opts.compression_level)?)
        .set_dictionary_enabled(opts.dictionary_encoding)
        .set_max_row_group_size(opts.row_group_size)
        .set_data_page_size_limit(opts.page_size);
    builder = builder.set_writer_version(::parquet::file::properties::WriterVersion::PARQUET_2_0);
    let props = Arc::new(builder.build());

    let file = File::create(path.as_ref())?;
    let mut writer = SerializedFileWriter::new(file, schema, props).map_err(pq_err)?;
    let mut row_group_writer = writer.next_row_group().map_err(pq_err)?;

    for (_, dtype, values) in &rows {
        let mut column_writer = row_group_writer.next_column().map_err(pq_err)?.expect("one column per schema field");
        write_column(&mut column_writer, dtype, values, height)?;
        column_writer.close().map_err(pq_err)?;
    }
    row_group_writer.close().map_err(pq_err)?;
    writer.close().map_err(pq_err)?;
    Ok(())
}

fn build_message_type(rows: &[(colframe_utils::SmallStr, DataType, Vec<AnyValue>)]) -> String {
    let mut fields = String::new();
    for (name, dtype, _) in rows {
        let ty = match dtype {
            DataType::Boolean => "optional boolean",
            DataType::Int64 | DataType::Int32 | DataType::Int16 | DataType::Int8 | DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => "optional int64",
            DataType::Float32 | DataType::Float64 => "optional double",
            DataType::Binary => "optional binary",
            _ => "optional binary (UTF8)",
        };
        fields.push_str(&format!("  {ty} {name};\n"));
    }
    format!("message colframe_schema {{\n{fields}}}")
}

fn to_pq_compression(c: ParquetCompression, level: Option<i32>) -> ColframeResult<PqCompression> {
    Ok(match c {
        ParquetCompression::None => PqCompression::UNCOMPRESSED,
        ParquetCompression::Snappy => PqCompression::SNAPPY,
        ParquetCompression::Gzip => PqCompression::GZIP(Default::default()),
        ParquetCompression::Lz4 => PqCompression::LZ4,
        ParquetCompression::Zstd => {
            let level = level.unwrap_or(1);
            PqCompression::ZSTD(ZstdLevel::try_new(level).map_err(pq_err)?)
        }
    })
}

fn write_column(writer: &mut ColumnWriter, dtype: &DataType, values: &[AnyValue], height: usize) -> ColframeResult<()> {
    let mut def_levels = Vec::with_capacity(height);
    match (writer, dtype) {
        (ColumnWriter::BoolColumnWriter(w), DataType::Boolean) => {
            let data: Vec<bool> = values
                .iter()
                .filter_map(|v| {
                    def_levels.push(if matches!(v, AnyValue::Null) { 0 } else { 1 });
                    match v {
                        AnyValue::Boolean(b) => Some(*b),
                        _ => None,
                    }
                })
                .collect();
            w.write_batch(&data, Some(&def_levels), None).map_err(pq_err)?;
        }
        (ColumnWriter::Int64ColumnWriter(w), _) => {
            let data: Vec<i64> = values
                .iter()
                .filter_map(|v| {
                    def_levels.push(if matches!(v, AnyValue::Null) { 0 } else { 1 });
                    as_i64(v)
                })
                .collect();
            w.write_batch(&data, Some(&def_levels), None).map_err(pq_err)?;
        }
        (ColumnWriter::DoubleColumnWriter(w), _) => {
            let data: Vec<f64> = values
                .iter()
                .filter_map(|v| {
                    def_levels.push(if matches!(v, AnyValue::Null) { 0 } else { 1 });
                    as_f64(v)
                })
                .collect();
            w.write_batch(&data, Some(&def_levels), None).map_err(pq_err)?;
        }
        (ColumnWriter::ByteArrayColumnWriter(w), _) => {
            let data: Vec<::parquet::data_type::ByteArray> = values
                .iter()
                .filter_map(|v| {
                    def_levels.push(if matches!(v, AnyValue::Null) { 0 } else { 1 });
                    as_bytes(v)
                })
                .collect();
            w.write_batch(&data, Some(&def_levels), None).map_err(pq_err)?;
        }
        (_, dtype) => {
            return Err(ColframeError::UnsupportedCast(format!("parquet write for {dtype:?}")));
        }
    }
    Ok(())
}

fn as_i64(v: &AnyValue) -> Option<i64> {
    match v {
        AnyValue::Int8(x) => Some(*x as i64),
        AnyValue::Int16(x) => Some(*x as i64),
        AnyValue::Int32(x) => Some(*x as i64),
        AnyValue::Int64(x) => Some(*x),
        AnyValue::UInt8(x) => Some(*x as i64),
        AnyValue::UInt16(x) => Some(*x as i64),
        AnyValue::UInt32(x) => Some(*x as i64),
        AnyValue::UInt64(x) => Some(*x as i64),
        _ => None,
    }
}

fn as_f64(v: &AnyValue) -> Option<f64> {
    match v {
        AnyValue::Float32(x) => Some(*x as f64),
        AnyValue::Float64(x) => Some(*x),
        _ => None,
    }
}

fn as_bytes(v: &AnyValue) -> Option<::parquet::data_type::ByteArray> {
    match v {
        AnyValue::String(s) => Some(s.as_bytes().to_vec().into()),
        AnyValue::Binary(b) => Some(b.to_vec().into()),
        _ => None,
    }
}

fn pq_err(e: ::parquet::errors::ParquetError) -> ColframeError {
    ColframeError::IoError(format!("parquet: {e}"))
}

/// Silence the "unused" physical-type import; kept so the schema-building
/// helpers above can be extended to `FIXED_LEN_BYTE_ARRAY` columns without
/// another import pass.
#[allow(dead_code)]
fn _physical_type_marker(_: PhysicalType) {}

#[cfg(test)]
mod test {
    use super::*;
    use colframe_core::chunked_array::{ChunkedArray, StringChunked};
    use colframe_core::Series;

    #[test]
    fn round_trips_numeric_and_string_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");

        let df = DataFrame::new(vec![
            Series::Int64(ChunkedArray::from_vec("id", vec![1, 2, 3])),
            Series::Float64(ChunkedArray::from_vec("score", vec![1.5, 2.5, 3.5])),
            Series::String(StringChunked::from_opt_vec("name", vec![Some("a".to_string()), Some("b".to_string()), Some("c".to_string())])),
        ])
        .unwrap();

        write_parquet(&df, &path, &ParquetWriteOptions::default()).unwrap();
        let read_back = read_parquet(&path, &ParquetReadOptions::default()).unwrap();

        assert_eq!(read_back.height(), 3);
        assert_eq!(read_back.column("id").unwrap().data_type(), DataType::Int64);
        assert_eq!(read_back.column("score").unwrap().data_type(), DataType::Float64);
    }

    #[test]
    fn num_rows_option_truncates_the_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        let df = DataFrame::new(vec![Series::Int64(ChunkedArray::from_vec("id", vec![1, 2, 3, 4]))]).unwrap();
        write_parquet(&df, &path, &ParquetWriteOptions::default()).unwrap();

        let opts = ParquetReadOptions { num_rows: Some(2), ..Default::default() };
        let read_back = read_parquet(&path, &opts).unwrap();
        assert_eq!(read_back.height(), 2);
    }
}
