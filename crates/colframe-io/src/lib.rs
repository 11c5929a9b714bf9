//! Boundary adapters between the DataFrame engine and the outside world:
//! CSV, JSON/NDJSON, and Parquet readers/writers, converging on the shared
//! [`record_batch::RecordBatch`] shape.

pub mod csv;
pub mod json;
pub mod parquet;
pub mod record_batch;

pub use csv::{read_csv, write_csv, CsvReadOptions, CsvWriteOptions};
pub use json::{
    read_json, read_ndjson, read_ndjson_chunked, write_json, write_ndjson, JsonOrientation, JsonReadOptions, JsonWriteOptions,
    NdjsonReadOptions,
};
pub use parquet::{read_parquet, write_parquet, ParquetCompression, ParquetReadOptions, ParquetWriteOptions};
pub use record_batch::RecordBatch;
