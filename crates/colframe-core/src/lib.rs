//! Columnar storage substrate: dtypes, schemas, chunked arrays, the
//! type-erased [`series::Series`], and [`dataframe::DataFrame`] (spec §3,
//! §4.1–§4.4).
//!
//! Mirrors `polars-core`'s role in the workspace: every other crate above
//! this one (`colframe-expr`, `colframe-ops`, `colframe-plan`, `colframe-io`)
//! builds on the invariants this crate enforces at construction time rather
//! than re-checking them in kernels.

pub mod chunk;
pub mod chunked_array;
pub mod dataframe;
pub mod dtype;
pub mod field;
pub mod series;

pub use chunked_array::ChunkedArray;
pub use dataframe::DataFrame;
pub use dtype::{DataType, TimeUnit};
pub use field::{Field, Schema};
pub use series::{AnyValue, Series};
