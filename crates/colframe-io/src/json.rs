//! JSON / NDJSON reader and writer (spec §6's JSON option surface): three
//! orientations for whole-document JSON, newline-delimited JSON with
//! chunked/streaming reads, dot-flattening of nested objects, and
//! gzip-by-extension via `flate2`, matching the teacher workspace's existing
//! `serde_json` dependency rather than adding a second JSON crate.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;

use colframe_core::series::AnyValue;
use colframe_core::{DataFrame, DataType};
use colframe_error::{ColframeError, ColframeResult};

use crate::record_batch::{dataframe_to_rows, RecordBatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonOrientation {
    /// `[{"a": 1, "b": "x"}, {"a": 2, "b": "y"}]`
    Records,
    /// `{"a": [1, 2], "b": ["x", "y"]}`
    Columns,
    /// `{"columns": ["a", "b"], "data": [[1, "x"], [2, "y"]]}`
    Values,
}

#[derive(Debug, Clone)]
pub struct JsonReadOptions {
    pub orientation: JsonOrientation,
}

impl Default for JsonReadOptions {
    fn default() -> Self {
        Self { orientation: JsonOrientation::Records }
    }
}

#[derive(Debug, Clone)]
pub struct JsonWriteOptions {
    pub orientation: JsonOrientation,
    pub pretty: bool,
    pub indent: usize,
}

impl Default for JsonWriteOptions {
    fn default() -> Self {
        Self { orientation: JsonOrientation::Records, pretty: false, indent: 2 }
    }
}

#[derive(Debug, Clone)]
pub struct NdjsonReadOptions {
    /// Skip a line that fails to parse rather than erroring the whole read.
    pub skip_invalid_line: bool,
    /// Stop after this many records; `None` reads to EOF.
    pub max_records: Option<usize>,
}

impl Default for NdjsonReadOptions {
    fn default() -> Self {
        Self { skip_invalid_line: false, max_records: None }
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("gz")).unwrap_or(false)
}

fn open_reader(path: &Path) -> ColframeResult<Box<dyn std::io::Read>> {
    let file = File::open(path)?;
    if is_gzip(path) {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

fn open_writer(path: &Path) -> ColframeResult<Box<dyn Write>> {
    let file = File::create(path)?;
    if is_gzip(path) {
        Ok(Box::new(GzEncoder::new(file, Compression::default())))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Read a whole JSON document into a `DataFrame`, under the given orientation.
pub fn read_json(path: impl AsRef<Path>, opts: &JsonReadOptions) -> ColframeResult<DataFrame> {
    let reader = open_reader(path.as_ref())?;
    let value: Value = serde_json::from_reader(reader)?;
    match opts.orientation {
        JsonOrientation::Records => records_to_dataframe(value),
        JsonOrientation::Columns => columns_to_dataframe(value),
        JsonOrientation::Values => values_to_dataframe(value),
    }
}

fn records_to_dataframe(value: Value) -> ColframeResult<DataFrame> {
    let Value::Array(records) = value else {
        return Err(ColframeError::ParseError("expected a JSON array of records".into()));
    };
    let flattened: Vec<Value> = records.into_iter().map(flatten_record).collect();
    build_from_records(flattened)
}

fn build_from_records(records: Vec<Value>) -> ColframeResult<DataFrame> {
    let mut order: Vec<String> = Vec::new();
    for record in &records {
        if let Value::Object(map) = record {
            for key in map.keys() {
                if !order.contains(key) {
                    order.push(key.clone());
                }
            }
        }
    }

    let mut batch = RecordBatch::new();
    for key in &order {
        let raw: Vec<Option<Value>> = records
            .iter()
            .map(|r| r.as_object().and_then(|m| m.get(key)).cloned())
            .collect();
        let dtype = infer_dtype(&raw);
        let values = raw.iter().map(|v| coerce_value(v.as_ref(), &dtype)).collect();
        batch.push_column(key.clone(), dtype, values);
    }
    batch.into_dataframe()
}

fn columns_to_dataframe(value: Value) -> ColframeResult<DataFrame> {
    let Value::Object(map) = value else {
        return Err(ColframeError::ParseError("expected a JSON object of columns".into()));
    };
    let mut batch = RecordBatch::new();
    for (key, col) in map {
        let Value::Array(items) = col else {
            return Err(ColframeError::ParseError(format!("column {key} is not an array")));
        };
        let raw: Vec<Option<Value>> = items.into_iter().map(Some).collect();
        let dtype = infer_dtype(&raw);
        let values = raw.iter().map(|v| coerce_value(v.as_ref(), &dtype)).collect();
        batch.push_column(key, dtype, values);
    }
    batch.into_dataframe()
}

fn values_to_dataframe(value: Value) -> ColframeResult<DataFrame> {
    let Value::Object(mut map) = value else {
        return Err(ColframeError::ParseError("expected {columns, data}".into()));
    };
    let columns = map
        .remove("columns")
        .and_then(|v| v.as_array().cloned())
        .ok_or_else(|| ColframeError::ParseError("missing \"columns\"".into()))?;
    let data = map
        .remove("data")
        .and_then(|v| v.as_array().cloned())
        .ok_or_else(|| ColframeError::ParseError("missing \"data\"".into()))?;
    let names: Vec<String> = columns.iter().map(|v| v.as_str().unwrap_or_default().to_string()).collect();

    let mut batch = RecordBatch::new();
    for (i, name) in names.iter().enumerate() {
        let raw: Vec<Option<Value>> = data
            .iter()
            .map(|row| row.as_array().and_then(|r| r.get(i)).cloned())
            .collect();
        let dtype = infer_dtype(&raw);
        let values = raw.iter().map(|v| coerce_value(v.as_ref(), &dtype)).collect();
        batch.push_column(name.clone(), dtype, values);
    }
    batch.into_dataframe()
}

/// Dot-flatten a nested-object record: `{"a": {"b": 1}}` becomes
/// `{"a.b": 1}`. A nested array is stringified rather than flattened, since
/// an array has no stable set of keys to flatten onto (spec §6 JSON
/// supplement).
fn flatten_record(value: Value) -> Value {
    let Value::Object(map) = value else { return value };
    let mut out = serde_json::Map::new();
    flatten_into(&mut out, String::new(), Value::Object(map));
    Value::Object(out)
}

fn flatten_into(out: &mut serde_json::Map<String, Value>, prefix: String, value: Value) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() { k } else { format!("{prefix}.{k}") };
                flatten_into(out, key, v);
            }
        }
        Value::Array(_) => {
            out.insert(prefix, Value::String(value.to_string()));
        }
        other => {
            out.insert(prefix, other);
        }
    }
}

fn infer_dtype(values: &[Option<Value>]) -> DataType {
    let present: Vec<&Value> = values.iter().filter_map(|v| v.as_ref()).filter(|v| !v.is_null()).collect();
    if present.is_empty() {
        return DataType::String;
    }
    if present.iter().all(|v| v.is_boolean()) {
        return DataType::Boolean;
    }
    if present.iter().all(|v| v.is_i64() || v.is_u64()) {
        return DataType::Int64;
    }
    if present.iter().all(|v| v.is_number()) {
        return DataType::Float64;
    }
    if present.iter().all(|v| v.is_string()) {
        return DataType::String;
    }
    DataType::String
}

fn coerce_value(v: Option<&Value>, dtype: &DataType) -> AnyValue {
    let Some(v) = v else { return AnyValue::Null };
    if v.is_null() {
        return AnyValue::Null;
    }
    match dtype {
        DataType::Boolean => v.as_bool().map(AnyValue::Boolean).unwrap_or(AnyValue::Null),
        DataType::Int64 => v.as_i64().map(AnyValue::Int64).unwrap_or(AnyValue::Null),
        DataType::Float64 => v.as_f64().map(AnyValue::Float64).unwrap_or(AnyValue::Null),
        _ => match v {
            Value::String(s) => AnyValue::String(s.as_str().into()),
            other => AnyValue::String(other.to_string().into()),
        },
    }
}

/// Write a `DataFrame` as a single JSON document under the given orientation.
pub fn write_json(df: &DataFrame, path: impl AsRef<Path>, opts: &JsonWriteOptions) -> ColframeResult<()> {
    let value = match opts.orientation {
        JsonOrientation::Records => dataframe_to_records(df)?,
        JsonOrientation::Columns => dataframe_to_columns(df)?,
        JsonOrientation::Values => dataframe_to_values(df)?,
    };
    let mut writer = open_writer(path.as_ref())?;
    if opts.pretty {
        let rendered = serde_json::to_string_pretty(&value)?;
        let rendered = if opts.indent != 2 {
            rendered.replace("\n  ", &format!("\n{}", " ".repeat(opts.indent)))
        } else {
            rendered
        };
        writer.write_all(rendered.as_bytes())?;
    } else {
        serde_json::to_writer(&mut writer, &value)?;
    }
    writer.flush()?;
    Ok(())
}

fn dataframe_to_records(df: &DataFrame) -> ColframeResult<Value> {
    let rows = dataframe_to_rows(df)?;
    let height = rows.first().map(|(_, _, v)| v.len()).unwrap_or(0);
    let mut records = Vec::with_capacity(height);
    for row_idx in 0..height {
        let mut obj = serde_json::Map::new();
        for (name, _, values) in &rows {
            obj.insert(name.to_string(), any_value_to_json(&values[row_idx]));
        }
        records.push(Value::Object(obj));
    }
    Ok(Value::Array(records))
}

fn dataframe_to_columns(df: &DataFrame) -> ColframeResult<Value> {
    let rows = dataframe_to_rows(df)?;
    let mut obj = serde_json::Map::new();
    for (name, _, values) in rows {
        obj.insert(name.to_string(), Value::Array(values.iter().map(any_value_to_json).collect()));
    }
    Ok(Value::Object(obj))
}

fn dataframe_to_values(df: &DataFrame) -> ColframeResult<Value> {
    let rows = dataframe_to_rows(df)?;
    let names: Vec<Value> = rows.iter().map(|(n, _, _)| Value::String(n.to_string())).collect();
    let height = rows.first().map(|(_, _, v)| v.len()).unwrap_or(0);
    let data: Vec<Value> = (0..height)
        .map(|row_idx| Value::Array(rows.iter().map(|(_, _, values)| any_value_to_json(&values[row_idx])).collect()))
        .collect();
    let mut obj = serde_json::Map::new();
    obj.insert("columns".to_string(), Value::Array(names));
    obj.insert("data".to_string(), Value::Array(data));
    Ok(Value::Object(obj))
}

fn any_value_to_json(v: &AnyValue) -> Value {
    match v {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(*b),
        AnyValue::Int8(x) => (*x).into(),
        AnyValue::Int16(x) => (*x).into(),
        AnyValue::Int32(x) => (*x).into(),
        AnyValue::Int64(x) => (*x).into(),
        AnyValue::UInt8(x) => (*x).into(),
        AnyValue::UInt16(x) => (*x).into(),
        AnyValue::UInt32(x) => (*x).into(),
        AnyValue::UInt64(x) => (*x).into(),
        AnyValue::Float32(x) => serde_json::Number::from_f64(*x as f64).map(Value::Number).unwrap_or(Value::Null),
        AnyValue::Float64(x) => serde_json::Number::from_f64(*x).map(Value::Number).unwrap_or(Value::Null),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::Binary(b) => Value::String(format!("{b:?}")),
    }
}

/// Read a newline-delimited JSON file to completion.
pub fn read_ndjson(path: impl AsRef<Path>, opts: &NdjsonReadOptions) -> ColframeResult<DataFrame> {
    let mut records = Vec::new();
    read_ndjson_chunked(path, opts, usize::MAX, |chunk| {
        records.extend(chunk);
        Ok(())
    })?;
    build_from_records(records)
}

/// Stream an NDJSON file in chunks of up to `chunk_size` records, invoking
/// `on_chunk` for each chunk (spec §6: "ndjson reads may be chunked/streamed
/// rather than materializing the whole file").
pub fn read_ndjson_chunked(
    path: impl AsRef<Path>,
    opts: &NdjsonReadOptions,
    chunk_size: usize,
    mut on_chunk: impl FnMut(Vec<Value>) -> ColframeResult<()>,
) -> ColframeResult<()> {
    let reader = BufReader::new(open_reader(path.as_ref())?);
    let mut chunk = Vec::with_capacity(chunk_size.min(1024));
    let mut total = 0usize;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(value) => {
                chunk.push(flatten_record(value));
                total += 1;
            }
            Err(e) => {
                if !opts.skip_invalid_line {
                    return Err(ColframeError::ParseError(format!("ndjson line: {e}")));
                }
            }
        }
        if chunk.len() >= chunk_size {
            on_chunk(std::mem::take(&mut chunk))?;
        }
        if let Some(max) = opts.max_records {
            if total >= max {
                break;
            }
        }
    }
    if !chunk.is_empty() {
        on_chunk(chunk)?;
    }
    Ok(())
}

/// Write a `DataFrame` as newline-delimited JSON, one record object per line.
pub fn write_ndjson(df: &DataFrame, path: impl AsRef<Path>) -> ColframeResult<()> {
    let rows = dataframe_to_rows(df)?;
    let height = rows.first().map(|(_, _, v)| v.len()).unwrap_or(0);
    let mut writer = open_writer(path.as_ref())?;
    for row_idx in 0..height {
        let mut obj = serde_json::Map::new();
        for (name, _, values) in &rows {
            obj.insert(name.to_string(), any_value_to_json(&values[row_idx]));
        }
        serde_json::to_writer(&mut writer, &Value::Object(obj))?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

impl From<serde_json::Error> for ColframeError {
    fn from(e: serde_json::Error) -> Self {
        ColframeError::ParseError(format!("json: {e}"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flattens_nested_objects_with_dotted_keys() {
        let record: Value = serde_json::from_str(r#"{"a": 1, "b": {"c": 2, "d": 3}}"#).unwrap();
        let flat = flatten_record(record);
        assert_eq!(flat.get("b.c"), Some(&Value::Number(2.into())));
        assert_eq!(flat.get("b.d"), Some(&Value::Number(3.into())));
    }

    #[test]
    fn stringifies_nested_arrays_instead_of_flattening() {
        let record: Value = serde_json::from_str(r#"{"a": [1, 2, 3]}"#).unwrap();
        let flat = flatten_record(record);
        assert!(matches!(flat.get("a"), Some(Value::String(_))));
    }

    #[test]
    fn records_round_trip_through_a_dataframe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        use colframe_core::chunked_array::ChunkedArray;
        use colframe_core::Series;
        let df = DataFrame::new(vec![Series::Int64(ChunkedArray::from_vec("a", vec![1, 2]))]).unwrap();
        write_json(&df, &path, &JsonWriteOptions::default()).unwrap();
        let read_back = read_json(&path, &JsonReadOptions::default()).unwrap();
        assert_eq!(read_back.height(), 2);
    }

    #[test]
    fn ndjson_chunked_reader_invokes_callback_per_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ndjson");
        std::fs::write(&path, "{\"a\":1}\n{\"a\":2}\n{\"a\":3}\n").unwrap();

        let mut chunks = Vec::new();
        read_ndjson_chunked(&path, &NdjsonReadOptions::default(), 2, |chunk| {
            chunks.push(chunk.len());
            Ok(())
        })
        .unwrap();
        assert_eq!(chunks, vec![2, 1]);
    }
}
