//! CSV reader/writer (spec §6's detailed CSV option surface), built on the
//! `csv` crate the teacher workspace already depends on for delimited
//! parsing rather than hand-rolling a tokenizer.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use colframe_core::series::AnyValue;
use colframe_core::DataType;
use colframe_error::{ColframeError, ColframeResult};

use crate::record_batch::{dataframe_to_rows, RecordBatch};

#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    pub delimiter: u8,
    pub has_header: bool,
    pub skip_rows: usize,
    pub projection: Option<Vec<String>>,
    pub null_tokens: Vec<String>,
    /// Rows sampled to infer each column's dtype; 0 means sample every row.
    pub infer_schema_rows: usize,
    pub comment_char: Option<u8>,
    pub explicit_dtypes: HashMap<String, DataType>,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            skip_rows: 0,
            projection: None,
            null_tokens: vec![String::new()],
            infer_schema_rows: 100,
            comment_char: None,
            explicit_dtypes: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvWriteOptions {
    pub delimiter: u8,
    pub write_header: bool,
    pub null_token: String,
    /// A printf-style float format, e.g. `"%.2f"`; `None` uses `ryu`'s
    /// shortest round-trip representation.
    pub float_format: Option<String>,
    pub quote_all: bool,
}

impl Default for CsvWriteOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            write_header: true,
            null_token: String::new(),
            float_format: None,
            quote_all: false,
        }
    }
}

/// Read a CSV file into a `DataFrame`, inferring each column's dtype by the
/// precedence spec §6 lays out: all-null -> String; all boolean keywords ->
/// Boolean; all 64-bit integers -> Int64; all 64-bit floats -> Float64;
/// otherwise String.
pub fn read_csv(path: impl AsRef<Path>, opts: &CsvReadOptions) -> ColframeResult<colframe_core::DataFrame> {
    let file = File::open(path.as_ref())?;
    let mut builder = ::csv::ReaderBuilder::new();
    builder.delimiter(opts.delimiter).has_headers(opts.has_header).flexible(false);
    if let Some(c) = opts.comment_char {
        builder.comment(Some(c));
    }
    let mut reader = builder.from_reader(BufReader::new(file));

    let headers: Vec<String> = if opts.has_header {
        reader.headers()?.iter().map(|s| s.to_string()).collect()
    } else {
        Vec::new()
    };

    let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();
    for (i, record) in reader.records().enumerate() {
        if i < opts.skip_rows {
            continue;
        }
        let record = record?;
        let row: Vec<Option<String>> = record
            .iter()
            .map(|field| {
                if opts.null_tokens.iter().any(|tok| tok == field) {
                    None
                } else {
                    Some(field.to_string())
                }
            })
            .collect();
        raw_rows.push(row);
    }

    let width = raw_rows.first().map(|r| r.len()).unwrap_or(headers.len());
    let names: Vec<String> = if !headers.is_empty() {
        headers
    } else {
        (0..width).map(|i| format!("column_{i}")).collect()
    };

    let sample_n = if opts.infer_schema_rows == 0 { raw_rows.len() } else { opts.infer_schema_rows.min(raw_rows.len()) };

    let mut batch = RecordBatch::new();
    for (col_idx, name) in names.iter().enumerate() {
        let column: Vec<Option<&str>> = raw_rows.iter().map(|r| r.get(col_idx).and_then(|v| v.as_deref())).collect();
        let dtype = opts.explicit_dtypes.get(name).cloned().unwrap_or_else(|| infer_dtype(&column[..sample_n.min(column.len())]));
        let values = column.iter().map(|v| parse_value(*v, &dtype)).collect();
        batch.push_column(name.clone(), dtype, values);
    }

    let df = batch.into_dataframe()?;
    match &opts.projection {
        Some(names) => df.select(&names.iter().map(String::as_str).collect::<Vec<_>>()),
        None => Ok(df),
    }
}

fn infer_dtype(values: &[Option<&str>]) -> DataType {
    if values.iter().all(|v| v.is_none()) {
        return DataType::String;
    }
    let present: Vec<&str> = values.iter().filter_map(|v| *v).collect();
    if present.iter().all(|v| is_bool_token(v)) {
        return DataType::Boolean;
    }
    if present.iter().all(|v| v.parse::<i64>().is_ok()) {
        return DataType::Int64;
    }
    if present.iter().all(|v| v.parse::<f64>().is_ok()) {
        return DataType::Float64;
    }
    DataType::String
}

fn is_bool_token(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "true" | "false" | "yes" | "no" | "0" | "1")
}

/// Parse one field under a resolved column dtype; a row-level parse
/// failure becomes Null rather than an error (spec §4.3 lossy-cast policy).
fn parse_value(raw: Option<&str>, dtype: &DataType) -> AnyValue {
    let Some(raw) = raw else { return AnyValue::Null };
    match dtype {
        DataType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => AnyValue::Boolean(true),
            "false" | "no" | "0" => AnyValue::Boolean(false),
            _ => AnyValue::Null,
        },
        DataType::Int64 => raw.parse::<i64>().map(AnyValue::Int64).unwrap_or(AnyValue::Null),
        DataType::Float64 => raw.parse::<f64>().map(AnyValue::Float64).unwrap_or(AnyValue::Null),
        _ => AnyValue::String(raw.into()),
    }
}

/// Write a `DataFrame` to CSV (spec §6 writer option surface).
pub fn write_csv(df: &colframe_core::DataFrame, path: impl AsRef<Path>, opts: &CsvWriteOptions) -> ColframeResult<()> {
    let file = File::create(path.as_ref())?;
    let mut builder = ::csv::WriterBuilder::new();
    builder.delimiter(opts.delimiter);
    if opts.quote_all {
        builder.quote_style(::csv::QuoteStyle::Always);
    }
    let mut writer = builder.from_writer(BufWriter::new(file));

    let rows = dataframe_to_rows(df)?;
    if opts.write_header {
        writer.write_record(rows.iter().map(|(name, _, _)| name.as_str()))?;
    }
    let height = rows.first().map(|(_, _, v)| v.len()).unwrap_or(0);
    for row_idx in 0..height {
        let fields: Vec<String> = rows
            .iter()
            .map(|(_, _, values)| format_value(&values[row_idx], opts))
            .collect();
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    Ok(())
}

fn format_value(v: &AnyValue, opts: &CsvWriteOptions) -> String {
    match v {
        AnyValue::Null => opts.null_token.clone(),
        AnyValue::Float32(x) => format_float(*x as f64, opts.float_format.as_deref()),
        AnyValue::Float64(x) => format_float(*x, opts.float_format.as_deref()),
        other => other.to_string(),
    }
}

/// A small subset of printf float formats (`%.Nf`); anything else falls
/// back to the shortest round-tripping representation via `ryu`.
fn format_float(v: f64, fmt: Option<&str>) -> String {
    if let Some(fmt) = fmt {
        if let Some(precision) = fmt.strip_prefix("%.").and_then(|s| s.strip_suffix('f')).and_then(|s| s.parse::<usize>().ok()) {
            return format!("{v:.precision$}");
        }
    }
    let mut buf = ryu::Buffer::new();
    buf.format(v).to_string()
}

impl From<::csv::Error> for ColframeError {
    fn from(e: ::csv::Error) -> Self {
        ColframeError::ParseError(format!("csv: {e}"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn infers_int_bool_float_string_precedence() {
        assert_eq!(infer_dtype(&[Some("1"), Some("0")]), DataType::Boolean);
        assert_eq!(infer_dtype(&[Some("1"), Some("2")]), DataType::Int64);
        assert_eq!(infer_dtype(&[Some("1.5"), Some("2")]), DataType::Float64);
        assert_eq!(infer_dtype(&[Some("a"), Some("2")]), DataType::String);
        assert_eq!(infer_dtype(&[None, None]), DataType::String);
    }

    #[test]
    fn round_trip_through_tempfile() {
        use colframe_core::chunked_array::ChunkedArray;
        use colframe_core::{DataFrame, Series};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let df = DataFrame::new(vec![
            Series::Int64(ChunkedArray::from_vec("age", vec![25, 30])),
            Series::Float64(ChunkedArray::from_vec("score", vec![95.5, 87.0])),
        ])
        .unwrap();
        write_csv(&df, &path, &CsvWriteOptions::default()).unwrap();
        let read_back = read_csv(&path, &CsvReadOptions::default()).unwrap();
        assert_eq!(read_back.height(), 2);
        assert_eq!(read_back.column("age").unwrap().data_type(), DataType::Int64);
    }
}
