//! Free-function constructors spec §6 names that don't belong to any one
//! lower crate: `make_dataframe`, `from_map`, `from_rows`,
//! `series_with_nulls`, and the [`NamedFrom`] trait backing "column
//! constructors per DType".
//!
//! `NamedFrom` mirrors `polars`'s own trait of the same name and shape
//! (`Series::new(name, vec![...])` dispatching on the value type): one
//! trait, one impl per physical type/nullability combination, so callers
//! never have to spell out a `DataType` to build a column from a plain
//! `Vec<T>`.

use indexmap::IndexMap;

use colframe_core::chunked_array::{BinaryChunked, BooleanChunked, ChunkedArray, StringChunked};
use colframe_core::series::AnyValue;
use colframe_core::{DataFrame, DataType, Schema, Series};
use colframe_error::{ColframeError, ColframeResult};
use colframe_utils::SmallStr;

/// Build a `Series` named `name` from `values`, dispatching on `T` to the
/// right physical `ChunkedArray` (spec §6 "column constructors per
/// DType").
pub trait NamedFrom<T> {
    fn named(name: impl Into<SmallStr>, values: T) -> Series;
}

macro_rules! impl_named_from_numeric {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl NamedFrom<Vec<$t>> for Series {
                fn named(name: impl Into<SmallStr>, values: Vec<$t>) -> Series {
                    Series::$variant(ChunkedArray::from_vec(name, values))
                }
            }

            impl NamedFrom<Vec<Option<$t>>> for Series {
                fn named(name: impl Into<SmallStr>, values: Vec<Option<$t>>) -> Series {
                    Series::$variant(ChunkedArray::from_slice_options(name, &values))
                }
            }

            impl NamedFrom<&[$t]> for Series {
                fn named(name: impl Into<SmallStr>, values: &[$t]) -> Series {
                    Series::$variant(ChunkedArray::from_vec(name, values.to_vec()))
                }
            }
        )*
    };
}

impl_named_from_numeric!(
    i8 => Int8, i16 => Int16, i32 => Int32, i64 => Int64,
    u8 => UInt8, u16 => UInt16, u32 => UInt32, u64 => UInt64,
    f32 => Float32, f64 => Float64,
);

impl NamedFrom<Vec<bool>> for Series {
    fn named(name: impl Into<SmallStr>, values: Vec<bool>) -> Series {
        let opts: Vec<Option<bool>> = values.into_iter().map(Some).collect();
        Series::Boolean(BooleanChunked::from_slice_options(name, &opts))
    }
}

impl NamedFrom<Vec<Option<bool>>> for Series {
    fn named(name: impl Into<SmallStr>, values: Vec<Option<bool>>) -> Series {
        Series::Boolean(BooleanChunked::from_slice_options(name, &values))
    }
}

impl NamedFrom<Vec<String>> for Series {
    fn named(name: impl Into<SmallStr>, values: Vec<String>) -> Series {
        let opts: Vec<Option<String>> = values.into_iter().map(Some).collect();
        Series::String(StringChunked::from_opt_vec(name, opts))
    }
}

impl NamedFrom<Vec<Option<String>>> for Series {
    fn named(name: impl Into<SmallStr>, values: Vec<Option<String>>) -> Series {
        Series::String(StringChunked::from_opt_vec(name, values))
    }
}

impl NamedFrom<Vec<&str>> for Series {
    fn named(name: impl Into<SmallStr>, values: Vec<&str>) -> Series {
        let opts: Vec<Option<String>> = values.into_iter().map(|s| Some(s.to_string())).collect();
        Series::String(StringChunked::from_opt_vec(name, opts))
    }
}

impl NamedFrom<Vec<Option<&str>>> for Series {
    fn named(name: impl Into<SmallStr>, values: Vec<Option<&str>>) -> Series {
        let opts: Vec<Option<String>> = values.into_iter().map(|s| s.map(|v| v.to_string())).collect();
        Series::String(StringChunked::from_opt_vec(name, opts))
    }
}

impl NamedFrom<Vec<Vec<u8>>> for Series {
    fn named(name: impl Into<SmallStr>, values: Vec<Vec<u8>>) -> Series {
        let opts: Vec<Option<Vec<u8>>> = values.into_iter().map(Some).collect();
        Series::Binary(BinaryChunked::from_opt_vec(name, opts))
    }
}

impl NamedFrom<Vec<Option<Vec<u8>>>> for Series {
    fn named(name: impl Into<SmallStr>, values: Vec<Option<Vec<u8>>>) -> Series {
        Series::Binary(BinaryChunked::from_opt_vec(name, values))
    }
}

/// Build a `DataFrame` from an ordered list of columns (spec §6
/// `make_dataframe`) — a thin, more discoverable name for
/// [`DataFrame::new`].
pub fn make_dataframe(columns: Vec<Series>) -> ColframeResult<DataFrame> {
    DataFrame::new(columns)
}

/// Build a `DataFrame` from a name-ordered map of already-built columns
/// (spec §6 `from_map`, "map name->typed slice" — build each value with
/// [`NamedFrom::named`], then hand the whole map to this constructor).
/// Column order is the map's iteration order; use `IndexMap` to control it.
pub fn from_map(columns: IndexMap<String, Series>) -> ColframeResult<DataFrame> {
    let series = columns
        .into_iter()
        .map(|(name, mut s)| {
            s.rename(name);
            s
        })
        .collect();
    DataFrame::new(series)
}

/// Build a `DataFrame` from row-major data plus the schema those rows are
/// shaped to (spec §6 `from_rows`). Every row must have exactly
/// `schema.len()` values, in field order.
pub fn from_rows(schema: &Schema, rows: &[Vec<AnyValue>]) -> ColframeResult<DataFrame> {
    let width = schema.len();
    let mut columns: Vec<Vec<AnyValue>> = vec![Vec::with_capacity(rows.len()); width];
    for row in rows {
        if row.len() != width {
            return Err(ColframeError::LengthMismatch(format!(
                "row has {} values but schema declares {width} columns",
                row.len()
            )));
        }
        for (col, value) in columns.iter_mut().zip(row.iter()) {
            col.push(value.clone());
        }
    }

    schema
        .iter()
        .zip(columns.into_iter())
        .map(|(field, values)| series_with_nulls_from_values(field.name(), &values, field.dtype()))
        .collect::<ColframeResult<Vec<_>>>()
        .and_then(DataFrame::new)
}

/// Build a `Series` from parallel `values`/`validity_mask` vectors and an
/// explicit `dtype` (spec §6 `series_with_nulls`) — unlike
/// `colframe_expr::eval::series_from_any_values`, this does not need to
/// infer the dtype from the first non-null value, so it also works for an
/// all-null column.
pub fn series_with_nulls(name: &str, values: &[AnyValue], validity_mask: &[bool], dtype: &DataType) -> ColframeResult<Series> {
    if values.len() != validity_mask.len() {
        return Err(ColframeError::LengthMismatch(format!(
            "values has {} entries but validity_mask has {}",
            values.len(),
            validity_mask.len()
        )));
    }
    let masked: Vec<AnyValue> = values
        .iter()
        .zip(validity_mask.iter())
        .map(|(v, valid)| if *valid { v.clone() } else { AnyValue::Null })
        .collect();
    series_with_nulls_from_values(name, &masked, dtype)
}

/// Shared by `from_rows` (already-masked-by-construction values, nothing
/// additional to drop) and `series_with_nulls` (values already masked by
/// the caller's validity vector above).
fn series_with_nulls_from_values(name: &str, values: &[AnyValue], dtype: &DataType) -> ColframeResult<Series> {
    use DataType::*;
    let len = values.len();
    macro_rules! numeric_column {
        ($variant:ident, $t:ty) => {{
            let opts: Vec<Option<$t>> = values
                .iter()
                .map(|v| match v {
                    AnyValue::Null => Ok(None),
                    other => as_numeric::<$t>(other).map(Some),
                })
                .collect::<ColframeResult<_>>()?;
            Series::$variant(ChunkedArray::from_slice_options(name, &opts))
        }};
    }
    Ok(match dtype {
        Boolean => {
            let opts: Vec<Option<bool>> = values
                .iter()
                .map(|v| match v {
                    AnyValue::Null => Ok(None),
                    AnyValue::Boolean(b) => Ok(Some(*b)),
                    other => Err(ColframeError::TypeMismatch(format!("expected Boolean, got {other:?}"))),
                })
                .collect::<ColframeResult<_>>()?;
            Series::Boolean(BooleanChunked::from_slice_options(name, &opts))
        },
        Int8 => numeric_column!(Int8, i8),
        Int16 => numeric_column!(Int16, i16),
        Int32 | Date => numeric_column!(Int32, i32),
        Int64 | Time | Datetime(_, _) | Duration(_) => numeric_column!(Int64, i64),
        UInt8 => numeric_column!(UInt8, u8),
        UInt16 => numeric_column!(UInt16, u16),
        UInt32 => numeric_column!(UInt32, u32),
        UInt64 => numeric_column!(UInt64, u64),
        Float32 => numeric_column!(Float32, f32),
        Float64 => numeric_column!(Float64, f64),
        String => {
            let opts: Vec<Option<String>> = values
                .iter()
                .map(|v| match v {
                    AnyValue::Null => None,
                    AnyValue::String(s) => Some(s.to_string()),
                    other => Some(other.to_string()),
                })
                .collect();
            Series::String(StringChunked::from_opt_vec(name, opts))
        },
        Binary => {
            let opts: Vec<Option<Vec<u8>>> = values
                .iter()
                .map(|v| match v {
                    AnyValue::Binary(b) => Some(b.to_vec()),
                    _ => None,
                })
                .collect();
            Series::Binary(BinaryChunked::from_opt_vec(name, opts))
        },
        Null => Series::Boolean(BooleanChunked::from_slice_options(name, &vec![None; len])),
        other => {
            return Err(ColframeError::UnsupportedCast(format!(
                "series_with_nulls does not support constructing a {other:?} column from scalar values"
            )))
        },
    })
}

fn as_numeric<T: num_traits::NumCast>(v: &AnyValue) -> ColframeResult<T> {
    let f = match v {
        AnyValue::Int8(x) => *x as f64,
        AnyValue::Int16(x) => *x as f64,
        AnyValue::Int32(x) => *x as f64,
        AnyValue::Int64(x) => *x as f64,
        AnyValue::UInt8(x) => *x as f64,
        AnyValue::UInt16(x) => *x as f64,
        AnyValue::UInt32(x) => *x as f64,
        AnyValue::UInt64(x) => *x as f64,
        AnyValue::Float32(x) => *x as f64,
        AnyValue::Float64(x) => *x,
        other => return Err(ColframeError::TypeMismatch(format!("expected a numeric value, got {other:?}"))),
    };
    T::from(f).ok_or_else(|| ColframeError::TypeMismatch(format!("value {f} does not fit the target numeric type")))
}

#[cfg(test)]
mod test {
    use super::*;
    use colframe_core::DataType;

    #[test]
    fn named_from_dispatches_on_value_type() {
        let ints = Series::named("a", vec![1i32, 2, 3]);
        assert_eq!(ints.data_type(), DataType::Int32);
        let strs = Series::named("b", vec!["x", "y"]);
        assert_eq!(strs.data_type(), DataType::String);
        let opt_ints = Series::named("c", vec![Some(1i64), None, Some(3)]);
        assert_eq!(opt_ints.null_count(), 1);
    }

    #[test]
    fn from_map_preserves_insertion_order() {
        let mut cols = IndexMap::new();
        cols.insert("b".to_string(), Series::named("b", vec![1i32, 2]));
        cols.insert("a".to_string(), Series::named("a", vec![3i32, 4]));
        let df = from_map(cols).unwrap();
        assert_eq!(df.get_column_names(), vec!["b", "a"]);
    }

    #[test]
    fn series_with_nulls_handles_all_null_column() {
        let values = vec![AnyValue::Null, AnyValue::Null];
        let mask = vec![false, false];
        let s = series_with_nulls("x", &values, &mask, &DataType::Int32).unwrap();
        assert_eq!(s.null_count(), 2);
        assert_eq!(s.data_type(), DataType::Int32);
    }

    #[test]
    fn from_rows_transposes_row_major_data_into_columns() {
        let schema = Schema::try_from_fields(vec![
            colframe_core::Field::new("id", DataType::Int32),
            colframe_core::Field::new("name", DataType::String),
        ])
        .unwrap();
        let rows = vec![
            vec![AnyValue::Int32(1), AnyValue::String("a".into())],
            vec![AnyValue::Int32(2), AnyValue::String("b".into())],
        ];
        let df = from_rows(&schema, &rows).unwrap();
        assert_eq!(df.shape(), (2, 2));
    }
}
