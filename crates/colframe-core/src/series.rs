//! [`Series`]: a type-erased column (spec §3, §9).
//!
//! Polars represents this with an object-safe `dyn SeriesTrait` plus a macro
//! generated impl per physical type (see
//! `reference/polars-core_series_trait.rs`). Spec §9 explicitly licenses a
//! simpler shape for this engine: a tagged enum over the physical
//! `ChunkedArray` variants. Dispatch is a `match` instead of a vtable call,
//! which is the right tradeoff for a closed, fixed set of physical types.

use std::fmt;
use std::sync::Arc;

use colframe_error::{ColframeError, ColframeResult};
use colframe_utils::SmallStr;

use crate::chunked_array::{BinaryChunked, BooleanChunked, ChunkedArray, StringChunked};
use crate::dtype::DataType;

/// A single scalar value read out of a `Series`, tagged by physical type.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyValue {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(Arc<str>),
    Binary(Arc<[u8]>),
}

impl fmt::Display for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyValue::Null => write!(f, "null"),
            AnyValue::Boolean(v) => write!(f, "{v}"),
            AnyValue::Int8(v) => write!(f, "{v}"),
            AnyValue::Int16(v) => write!(f, "{v}"),
            AnyValue::Int32(v) => write!(f, "{v}"),
            AnyValue::Int64(v) => write!(f, "{v}"),
            AnyValue::UInt8(v) => write!(f, "{v}"),
            AnyValue::UInt16(v) => write!(f, "{v}"),
            AnyValue::UInt32(v) => write!(f, "{v}"),
            AnyValue::UInt64(v) => write!(f, "{v}"),
            AnyValue::Float32(v) => write!(f, "{v}"),
            AnyValue::Float64(v) => write!(f, "{v}"),
            AnyValue::String(v) => write!(f, "{v}"),
            AnyValue::Binary(v) => write!(f, "{v:?}"),
        }
    }
}

/// A named, type-erased column. Every variant shares one invariant: its
/// logical length is the column's row count, checked by
/// [`crate::dataframe::DataFrame`] on construction.
#[derive(Clone)]
pub enum Series {
    Boolean(BooleanChunked),
    Int8(ChunkedArray<i8>),
    Int16(ChunkedArray<i16>),
    Int32(ChunkedArray<i32>),
    Int64(ChunkedArray<i64>),
    UInt8(ChunkedArray<u8>),
    UInt16(ChunkedArray<u16>),
    UInt32(ChunkedArray<u32>),
    UInt64(ChunkedArray<u64>),
    Float32(ChunkedArray<f32>),
    Float64(ChunkedArray<f64>),
    String(StringChunked),
    Binary(BinaryChunked),
}

macro_rules! dispatch {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            Series::Boolean($inner) => $body,
            Series::Int8($inner) => $body,
            Series::Int16($inner) => $body,
            Series::Int32($inner) => $body,
            Series::Int64($inner) => $body,
            Series::UInt8($inner) => $body,
            Series::UInt16($inner) => $body,
            Series::UInt32($inner) => $body,
            Series::UInt64($inner) => $body,
            Series::Float32($inner) => $body,
            Series::Float64($inner) => $body,
            Series::String($inner) => $body,
            Series::Binary($inner) => $body,
        }
    };
}

impl Series {
    pub fn name(&self) -> &str {
        dispatch!(self, s => s.name())
    }

    pub fn rename(&mut self, name: impl Into<SmallStr>) {
        let name = name.into();
        dispatch!(self, s => s.rename(name))
    }

    pub fn len(&self) -> usize {
        dispatch!(self, s => s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        dispatch!(self, s => s.null_count())
    }

    pub fn is_null_at(&self, i: usize) -> bool {
        !dispatch!(self, s => s.is_valid(i))
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Series::Boolean(_) => DataType::Boolean,
            Series::Int8(_) => DataType::Int8,
            Series::Int16(_) => DataType::Int16,
            Series::Int32(_) => DataType::Int32,
            Series::Int64(_) => DataType::Int64,
            Series::UInt8(_) => DataType::UInt8,
            Series::UInt16(_) => DataType::UInt16,
            Series::UInt32(_) => DataType::UInt32,
            Series::UInt64(_) => DataType::UInt64,
            Series::Float32(_) => DataType::Float32,
            Series::Float64(_) => DataType::Float64,
            Series::String(_) => DataType::String,
            Series::Binary(_) => DataType::Binary,
        }
    }

    pub fn get(&self, i: usize) -> ColframeResult<AnyValue> {
        if i >= self.len() {
            return Err(ColframeError::oob(i, self.len()));
        }
        Ok(match self {
            Series::Boolean(s) => s.get(i)?.map(AnyValue::Boolean).unwrap_or(AnyValue::Null),
            Series::Int8(s) => s.get(i)?.map(AnyValue::Int8).unwrap_or(AnyValue::Null),
            Series::Int16(s) => s.get(i)?.map(AnyValue::Int16).unwrap_or(AnyValue::Null),
            Series::Int32(s) => s.get(i)?.map(AnyValue::Int32).unwrap_or(AnyValue::Null),
            Series::Int64(s) => s.get(i)?.map(AnyValue::Int64).unwrap_or(AnyValue::Null),
            Series::UInt8(s) => s.get(i)?.map(AnyValue::UInt8).unwrap_or(AnyValue::Null),
            Series::UInt16(s) => s.get(i)?.map(AnyValue::UInt16).unwrap_or(AnyValue::Null),
            Series::UInt32(s) => s.get(i)?.map(AnyValue::UInt32).unwrap_or(AnyValue::Null),
            Series::UInt64(s) => s.get(i)?.map(AnyValue::UInt64).unwrap_or(AnyValue::Null),
            Series::Float32(s) => s.get(i)?.map(AnyValue::Float32).unwrap_or(AnyValue::Null),
            Series::Float64(s) => s.get(i)?.map(AnyValue::Float64).unwrap_or(AnyValue::Null),
            Series::String(s) => s
                .get(i)?
                .map(|v| AnyValue::String(Arc::from(v)))
                .unwrap_or(AnyValue::Null),
            Series::Binary(s) => s
                .get(i)?
                .map(|v| AnyValue::Binary(Arc::from(v)))
                .unwrap_or(AnyValue::Null),
        })
    }

    pub fn slice(&self, offset: usize, length: usize) -> Series {
        match self {
            Series::Boolean(s) => Series::Boolean(s.slice(offset, length)),
            Series::Int8(s) => Series::Int8(s.slice(offset, length)),
            Series::Int16(s) => Series::Int16(s.slice(offset, length)),
            Series::Int32(s) => Series::Int32(s.slice(offset, length)),
            Series::Int64(s) => Series::Int64(s.slice(offset, length)),
            Series::UInt8(s) => Series::UInt8(s.slice(offset, length)),
            Series::UInt16(s) => Series::UInt16(s.slice(offset, length)),
            Series::UInt32(s) => Series::UInt32(s.slice(offset, length)),
            Series::UInt64(s) => Series::UInt64(s.slice(offset, length)),
            Series::Float32(s) => Series::Float32(s.slice(offset, length)),
            Series::Float64(s) => Series::Float64(s.slice(offset, length)),
            Series::String(s) => Series::String(s.slice(offset, length)),
            Series::Binary(s) => Series::Binary(s.slice(offset, length)),
        }
    }

    /// Gather rows by index; `None` entries (or out-of-range, in permissive
    /// callers) become nulls in the output (spec §5 `take`).
    pub fn take(&self, indices: &[Option<u32>]) -> ColframeResult<Series> {
        Ok(match self {
            Series::Boolean(s) => {
                let vals: ColframeResult<Vec<Option<bool>>> = indices
                    .iter()
                    .map(|i| match i {
                        Some(i) => s.get(*i as usize),
                        None => Ok(None),
                    })
                    .collect();
                Series::Boolean(BooleanChunked::from_slice_options(s.name(), &vals?))
            },
            Series::Int8(s) => Series::Int8(s.take_opt(indices)?),
            Series::Int16(s) => Series::Int16(s.take_opt(indices)?),
            Series::Int32(s) => Series::Int32(s.take_opt(indices)?),
            Series::Int64(s) => Series::Int64(s.take_opt(indices)?),
            Series::UInt8(s) => Series::UInt8(s.take_opt(indices)?),
            Series::UInt16(s) => Series::UInt16(s.take_opt(indices)?),
            Series::UInt32(s) => Series::UInt32(s.take_opt(indices)?),
            Series::UInt64(s) => Series::UInt64(s.take_opt(indices)?),
            Series::Float32(s) => Series::Float32(s.take_opt(indices)?),
            Series::Float64(s) => Series::Float64(s.take_opt(indices)?),
            Series::String(s) => Series::String(s.take_opt(indices)?),
            Series::Binary(s) => {
                let vals: ColframeResult<Vec<Option<Vec<u8>>>> = indices
                    .iter()
                    .map(|i| match i {
                        Some(i) => Ok(s.get(*i as usize)?.map(|b| b.to_vec())),
                        None => Ok(None),
                    })
                    .collect();
                Series::Binary(BinaryChunked::from_opt_vec(s.name(), vals?))
            },
        })
    }

    /// Build a boolean-masked selection (spec §4.3 `filter`).
    pub fn filter(&self, mask: &BooleanChunked) -> ColframeResult<Series> {
        if mask.len() != self.len() {
            return Err(ColframeError::LengthMismatch(format!(
                "filter mask has length {} but series has length {}",
                mask.len(),
                self.len()
            )));
        }
        let indices: Vec<Option<u32>> = (0..self.len())
            .filter(|&i| mask.get(i).ok().flatten().unwrap_or(false))
            .map(|i| Some(i as u32))
            .collect();
        self.take(&indices)
    }

    pub fn is_numeric(&self) -> bool {
        self.data_type().is_numeric()
    }

    pub fn rechunk(&self) -> Series {
        match self {
            Series::Boolean(s) => Series::Boolean(s.rechunk()),
            Series::Int8(s) => Series::Int8(s.rechunk()),
            Series::Int16(s) => Series::Int16(s.rechunk()),
            Series::Int32(s) => Series::Int32(s.rechunk()),
            Series::Int64(s) => Series::Int64(s.rechunk()),
            Series::UInt8(s) => Series::UInt8(s.rechunk()),
            Series::UInt16(s) => Series::UInt16(s.rechunk()),
            Series::UInt32(s) => Series::UInt32(s.rechunk()),
            Series::UInt64(s) => Series::UInt64(s.rechunk()),
            Series::Float32(s) => Series::Float32(s.rechunk()),
            Series::Float64(s) => Series::Float64(s.rechunk()),
            other => other.clone(),
        }
    }

    /// Append `other`'s chunks after this series' own (spec §4.4
    /// `concat_rows`/`vstack`); errors if dtypes differ.
    pub fn append(&mut self, other: &Series) -> ColframeResult<()> {
        macro_rules! app {
            ($a:expr, $b:expr, $variant:ident) => {
                if let Series::$variant(b) = $b {
                    $a.append(b);
                    return Ok(());
                }
            };
        }
        match self {
            Series::Boolean(a) => app!(a, other, Boolean),
            Series::Int8(a) => app!(a, other, Int8),
            Series::Int16(a) => app!(a, other, Int16),
            Series::Int32(a) => app!(a, other, Int32),
            Series::Int64(a) => app!(a, other, Int64),
            Series::UInt8(a) => app!(a, other, UInt8),
            Series::UInt16(a) => app!(a, other, UInt16),
            Series::UInt32(a) => app!(a, other, UInt32),
            Series::UInt64(a) => app!(a, other, UInt64),
            Series::Float32(a) => app!(a, other, Float32),
            Series::Float64(a) => app!(a, other, Float64),
            Series::String(a) => app!(a, other, String),
            Series::Binary(a) => app!(a, other, Binary),
        }
        Err(ColframeError::SchemaMismatch(format!(
            "cannot append {:?} onto {:?}",
            other.data_type(),
            self.data_type()
        )))
    }
}

impl fmt::Debug for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Series[{}: {}; len={}]", self.name(), self.data_type(), self.len())
    }
}

/// Numeric dispatch: arithmetic, comparison, aggregation, and sort all
/// bottom out in a single chunk so `colframe-compute`'s kernels (which
/// operate on plain `&[T]`/`Bitmap` pairs, spec §5) can stay chunk-agnostic.
macro_rules! numeric_binary_op {
    ($name:ident, $kernel:path) => {
        pub fn $name(&self, other: &Series) -> ColframeResult<Series> {
            let lhs = self.rechunk();
            let rhs = other.rechunk();
            match (&lhs, &rhs) {
                (Series::Int8(a), Series::Int8(b)) => {
                    let (v, validity) = $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity(), b.chunks()[0].values_slice(), b.chunks()[0].validity())?;
                    Ok(Series::Int8(ChunkedArray::from_slice_options(a.name(), &zip_opt(&v, validity.as_ref()))))
                },
                (Series::Int16(a), Series::Int16(b)) => {
                    let (v, validity) = $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity(), b.chunks()[0].values_slice(), b.chunks()[0].validity())?;
                    Ok(Series::Int16(ChunkedArray::from_slice_options(a.name(), &zip_opt(&v, validity.as_ref()))))
                },
                (Series::Int32(a), Series::Int32(b)) => {
                    let (v, validity) = $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity(), b.chunks()[0].values_slice(), b.chunks()[0].validity())?;
                    Ok(Series::Int32(ChunkedArray::from_slice_options(a.name(), &zip_opt(&v, validity.as_ref()))))
                },
                (Series::Int64(a), Series::Int64(b)) => {
                    let (v, validity) = $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity(), b.chunks()[0].values_slice(), b.chunks()[0].validity())?;
                    Ok(Series::Int64(ChunkedArray::from_slice_options(a.name(), &zip_opt(&v, validity.as_ref()))))
                },
                (Series::UInt8(a), Series::UInt8(b)) => {
                    let (v, validity) = $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity(), b.chunks()[0].values_slice(), b.chunks()[0].validity())?;
                    Ok(Series::UInt8(ChunkedArray::from_slice_options(a.name(), &zip_opt(&v, validity.as_ref()))))
                },
                (Series::UInt16(a), Series::UInt16(b)) => {
                    let (v, validity) = $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity(), b.chunks()[0].values_slice(), b.chunks()[0].validity())?;
                    Ok(Series::UInt16(ChunkedArray::from_slice_options(a.name(), &zip_opt(&v, validity.as_ref()))))
                },
                (Series::UInt32(a), Series::UInt32(b)) => {
                    let (v, validity) = $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity(), b.chunks()[0].values_slice(), b.chunks()[0].validity())?;
                    Ok(Series::UInt32(ChunkedArray::from_slice_options(a.name(), &zip_opt(&v, validity.as_ref()))))
                },
                (Series::UInt64(a), Series::UInt64(b)) => {
                    let (v, validity) = $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity(), b.chunks()[0].values_slice(), b.chunks()[0].validity())?;
                    Ok(Series::UInt64(ChunkedArray::from_slice_options(a.name(), &zip_opt(&v, validity.as_ref()))))
                },
                (Series::Float32(a), Series::Float32(b)) => {
                    let (v, validity) = $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity(), b.chunks()[0].values_slice(), b.chunks()[0].validity())?;
                    Ok(Series::Float32(ChunkedArray::from_slice_options(a.name(), &zip_opt(&v, validity.as_ref()))))
                },
                (Series::Float64(a), Series::Float64(b)) => {
                    let (v, validity) = $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity(), b.chunks()[0].values_slice(), b.chunks()[0].validity())?;
                    Ok(Series::Float64(ChunkedArray::from_slice_options(a.name(), &zip_opt(&v, validity.as_ref()))))
                },
                _ => Err(ColframeError::TypeMismatch(format!(
                    "cannot apply {} between {:?} and {:?}",
                    stringify!($name),
                    lhs.data_type(),
                    rhs.data_type()
                ))),
            }
        }
    };
}

/// Zips raw values back up with a validity bitmap into `&[Option<T>]`-shaped
/// input for `ChunkedArray::from_slice_options`.
fn zip_opt<T: Copy>(values: &[T], validity: Option<&Bitmap>) -> Vec<Option<T>> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if validity.map(|b| b.get(i)).unwrap_or(true) {
                Some(v)
            } else {
                None
            }
        })
        .collect()
}

macro_rules! numeric_comparison_op {
    ($name:ident, $kernel:path) => {
        pub fn $name(&self, other: &Series) -> ColframeResult<Series> {
            let lhs = self.rechunk();
            let rhs = other.rechunk();
            macro_rules! cmp {
                ($a:expr, $b:expr) => {{
                    let (mask, validity) = $kernel(
                        $a.chunks()[0].values_slice(),
                        $a.chunks()[0].validity(),
                        $b.chunks()[0].values_slice(),
                        $b.chunks()[0].validity(),
                    )?;
                    let opts: Vec<Option<bool>> = (0..mask.len())
                        .map(|i| validity.as_ref().map(|v| v.get(i)).unwrap_or(true).then(|| mask.get(i)))
                        .collect();
                    Ok(Series::Boolean(BooleanChunked::from_slice_options($a.name(), &opts)))
                }};
            }
            match (&lhs, &rhs) {
                (Series::Int8(a), Series::Int8(b)) => cmp!(a, b),
                (Series::Int16(a), Series::Int16(b)) => cmp!(a, b),
                (Series::Int32(a), Series::Int32(b)) => cmp!(a, b),
                (Series::Int64(a), Series::Int64(b)) => cmp!(a, b),
                (Series::UInt8(a), Series::UInt8(b)) => cmp!(a, b),
                (Series::UInt16(a), Series::UInt16(b)) => cmp!(a, b),
                (Series::UInt32(a), Series::UInt32(b)) => cmp!(a, b),
                (Series::UInt64(a), Series::UInt64(b)) => cmp!(a, b),
                (Series::Float32(a), Series::Float32(b)) => cmp!(a, b),
                (Series::Float64(a), Series::Float64(b)) => cmp!(a, b),
                _ => Err(ColframeError::TypeMismatch(format!(
                    "cannot compare {:?} with {:?}",
                    lhs.data_type(),
                    rhs.data_type()
                ))),
            }
        }
    };
}

impl Series {
    numeric_binary_op!(add, colframe_compute::arithmetic::add);
    numeric_binary_op!(sub, colframe_compute::arithmetic::sub);
    numeric_binary_op!(mul, colframe_compute::arithmetic::mul);
    numeric_binary_op!(div, colframe_compute::arithmetic::div);

    numeric_comparison_op!(eq, colframe_compute::comparison::eq);
    numeric_comparison_op!(neq, colframe_compute::comparison::ne);
    numeric_comparison_op!(lt, colframe_compute::comparison::lt);
    numeric_comparison_op!(lte, colframe_compute::comparison::le);
    numeric_comparison_op!(gt, colframe_compute::comparison::gt);
    numeric_comparison_op!(gte, colframe_compute::comparison::ge);

    /// Argsort indices (spec §5 `sort`/`arg_sort`); non-numeric series sort
    /// by their natural `Ord` via a string-keyed fallback.
    pub fn arg_sort(&self, descending: bool, nulls_last: bool) -> Vec<u32> {
        use colframe_compute::sort::{arg_sort, NullsOrder};
        let nulls = if nulls_last { NullsOrder::Last } else { NullsOrder::First };
        let s = self.rechunk();
        match &s {
            Series::Int8(a) => arg_sort(a.chunks()[0].values_slice(), a.chunks()[0].validity(), descending, nulls),
            Series::Int16(a) => arg_sort(a.chunks()[0].values_slice(), a.chunks()[0].validity(), descending, nulls),
            Series::Int32(a) => arg_sort(a.chunks()[0].values_slice(), a.chunks()[0].validity(), descending, nulls),
            Series::Int64(a) => arg_sort(a.chunks()[0].values_slice(), a.chunks()[0].validity(), descending, nulls),
            Series::UInt8(a) => arg_sort(a.chunks()[0].values_slice(), a.chunks()[0].validity(), descending, nulls),
            Series::UInt16(a) => arg_sort(a.chunks()[0].values_slice(), a.chunks()[0].validity(), descending, nulls),
            Series::UInt32(a) => arg_sort(a.chunks()[0].values_slice(), a.chunks()[0].validity(), descending, nulls),
            Series::UInt64(a) => arg_sort(a.chunks()[0].values_slice(), a.chunks()[0].validity(), descending, nulls),
            Series::Float32(a) => arg_sort(a.chunks()[0].values_slice(), a.chunks()[0].validity(), descending, nulls),
            Series::Float64(a) => arg_sort(a.chunks()[0].values_slice(), a.chunks()[0].validity(), descending, nulls),
            other => {
                let mut idx: Vec<u32> = (0..other.len() as u32).collect();
                idx.sort_by(|&a, &b| {
                    let av = other.get(a as usize).unwrap_or(AnyValue::Null);
                    let bv = other.get(b as usize).unwrap_or(AnyValue::Null);
                    let ord = av.to_string().cmp(&bv.to_string());
                    if descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                });
                idx
            },
        }
    }

    pub fn sort(&self, descending: bool, nulls_last: bool) -> ColframeResult<Series> {
        let idx = self.arg_sort(descending, nulls_last);
        let idx_opt: Vec<Option<u32>> = idx.into_iter().map(Some).collect();
        self.take(&idx_opt)
    }

    /// Indices of the first occurrence of each distinct value, in row order
    /// (spec supplement `arg_unique`/`unique`/`n_unique`).
    pub fn arg_unique(&self) -> ColframeResult<Vec<u32>> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for i in 0..self.len() {
            let v = self.get(i)?;
            if seen.insert(format!("{v:?}")) {
                out.push(i as u32);
            }
        }
        Ok(out)
    }

    pub fn unique(&self) -> ColframeResult<Series> {
        let idx = self.arg_unique()?;
        let idx_opt: Vec<Option<u32>> = idx.into_iter().map(Some).collect();
        self.take(&idx_opt)
    }

    pub fn n_unique(&self) -> ColframeResult<usize> {
        Ok(self.arg_unique()?.len())
    }

    /// Shift values down (`periods > 0`) or up (`periods < 0`) by `periods`
    /// rows, filling vacated rows with null (spec supplement `shift`).
    pub fn shift(&self, periods: i64) -> ColframeResult<Series> {
        let len = self.len() as i64;
        let idx_opt: Vec<Option<u32>> = (0..len)
            .map(|i| {
                let src = i - periods;
                (src >= 0 && src < len).then_some(src as u32)
            })
            .collect();
        self.take(&idx_opt)
    }

    /// Append `other`'s rows after this series' own, returning a new value
    /// (spec §4.3 `concat`; the mutating sibling is [`Series::append`]).
    pub fn concat(&self, other: &Series) -> ColframeResult<Series> {
        let mut out = self.clone();
        out.append(other)?;
        Ok(out)
    }

    pub fn is_duplicated(&self) -> ColframeResult<Vec<bool>> {
        let mut seen = std::collections::HashSet::new();
        let mut first_seen = std::collections::HashSet::new();
        for i in 0..self.len() {
            let key = format!("{:?}", self.get(i)?);
            if !first_seen.insert(key.clone()) {
                seen.insert(key);
            }
        }
        (0..self.len())
            .map(|i| Ok(seen.contains(&format!("{:?}", self.get(i)?))))
            .collect()
    }
}

macro_rules! numeric_reduce_opt {
    ($self:expr, $kernel:path) => {{
        let s = $self.rechunk();
        let opt = match &s {
            Series::Int8(a) => $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity()),
            Series::Int16(a) => $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity()),
            Series::Int32(a) => $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity()),
            Series::Int64(a) => $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity()),
            Series::UInt8(a) => $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity()),
            Series::UInt16(a) => $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity()),
            Series::UInt32(a) => $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity()),
            Series::UInt64(a) => $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity()),
            Series::Float32(a) => $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity()),
            Series::Float64(a) => $kernel(a.chunks()[0].values_slice(), a.chunks()[0].validity()),
            other => {
                return Err(ColframeError::TypeMismatch(format!(
                    "statistic is not defined for {:?}",
                    other.data_type()
                )))
            },
        };
        opt.map(AnyValue::Float64).unwrap_or(AnyValue::Null)
    }};
}

/// Statistics (spec §4.3/§4.5): nulls are skipped; an all-null or empty
/// numeric input yields `Null`. `sum`/`min`/`max` preserve the input's
/// physical dtype; `mean`/`std`/`var`/`median` are always `Float64`.
impl Series {
    pub fn sum(&self) -> ColframeResult<AnyValue> {
        let s = self.rechunk();
        Ok(match &s {
            Series::Int8(a) => colframe_compute::aggregate::sum(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Int8)
                .unwrap_or(AnyValue::Null),
            Series::Int16(a) => colframe_compute::aggregate::sum(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Int16)
                .unwrap_or(AnyValue::Null),
            Series::Int32(a) => colframe_compute::aggregate::sum(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Int32)
                .unwrap_or(AnyValue::Null),
            Series::Int64(a) => colframe_compute::aggregate::sum(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Int64)
                .unwrap_or(AnyValue::Null),
            Series::UInt8(a) => colframe_compute::aggregate::sum(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::UInt8)
                .unwrap_or(AnyValue::Null),
            Series::UInt16(a) => colframe_compute::aggregate::sum(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::UInt16)
                .unwrap_or(AnyValue::Null),
            Series::UInt32(a) => colframe_compute::aggregate::sum(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::UInt32)
                .unwrap_or(AnyValue::Null),
            Series::UInt64(a) => colframe_compute::aggregate::sum(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::UInt64)
                .unwrap_or(AnyValue::Null),
            Series::Float32(a) => colframe_compute::aggregate::sum(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Float32)
                .unwrap_or(AnyValue::Null),
            Series::Float64(a) => colframe_compute::aggregate::sum(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Float64)
                .unwrap_or(AnyValue::Null),
            Series::Boolean(a) => {
                let n: i64 = a.iter().filter(|v| v.unwrap_or(false)).count() as i64;
                if a.iter().all(|v| v.is_none()) {
                    AnyValue::Null
                } else {
                    AnyValue::Int64(n)
                }
            },
            other => {
                return Err(ColframeError::TypeMismatch(format!(
                    "sum is not defined for {:?}",
                    other.data_type()
                )))
            },
        })
    }

    pub fn mean(&self) -> ColframeResult<AnyValue> {
        Ok(numeric_reduce_opt!(self, colframe_compute::aggregate::mean))
    }

    pub fn min(&self) -> ColframeResult<AnyValue> {
        let s = self.rechunk();
        Ok(match &s {
            Series::Int8(a) => colframe_compute::aggregate::min(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Int8)
                .unwrap_or(AnyValue::Null),
            Series::Int16(a) => colframe_compute::aggregate::min(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Int16)
                .unwrap_or(AnyValue::Null),
            Series::Int32(a) => colframe_compute::aggregate::min(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Int32)
                .unwrap_or(AnyValue::Null),
            Series::Int64(a) => colframe_compute::aggregate::min(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Int64)
                .unwrap_or(AnyValue::Null),
            Series::UInt8(a) => colframe_compute::aggregate::min(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::UInt8)
                .unwrap_or(AnyValue::Null),
            Series::UInt16(a) => colframe_compute::aggregate::min(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::UInt16)
                .unwrap_or(AnyValue::Null),
            Series::UInt32(a) => colframe_compute::aggregate::min(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::UInt32)
                .unwrap_or(AnyValue::Null),
            Series::UInt64(a) => colframe_compute::aggregate::min(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::UInt64)
                .unwrap_or(AnyValue::Null),
            Series::Float32(a) => colframe_compute::aggregate::min(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Float32)
                .unwrap_or(AnyValue::Null),
            Series::Float64(a) => colframe_compute::aggregate::min(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Float64)
                .unwrap_or(AnyValue::Null),
            Series::String(a) => a.iter().flatten().min().map(|v| AnyValue::String(v.into())).unwrap_or(AnyValue::Null),
            other => {
                return Err(ColframeError::TypeMismatch(format!(
                    "min is not defined for {:?}",
                    other.data_type()
                )))
            },
        })
    }

    pub fn max(&self) -> ColframeResult<AnyValue> {
        let s = self.rechunk();
        Ok(match &s {
            Series::Int8(a) => colframe_compute::aggregate::max(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Int8)
                .unwrap_or(AnyValue::Null),
            Series::Int16(a) => colframe_compute::aggregate::max(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Int16)
                .unwrap_or(AnyValue::Null),
            Series::Int32(a) => colframe_compute::aggregate::max(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Int32)
                .unwrap_or(AnyValue::Null),
            Series::Int64(a) => colframe_compute::aggregate::max(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Int64)
                .unwrap_or(AnyValue::Null),
            Series::UInt8(a) => colframe_compute::aggregate::max(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::UInt8)
                .unwrap_or(AnyValue::Null),
            Series::UInt16(a) => colframe_compute::aggregate::max(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::UInt16)
                .unwrap_or(AnyValue::Null),
            Series::UInt32(a) => colframe_compute::aggregate::max(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::UInt32)
                .unwrap_or(AnyValue::Null),
            Series::UInt64(a) => colframe_compute::aggregate::max(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::UInt64)
                .unwrap_or(AnyValue::Null),
            Series::Float32(a) => colframe_compute::aggregate::max(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Float32)
                .unwrap_or(AnyValue::Null),
            Series::Float64(a) => colframe_compute::aggregate::max(a.chunks()[0].values_slice(), a.chunks()[0].validity())
                .map(AnyValue::Float64)
                .unwrap_or(AnyValue::Null),
            Series::String(a) => a.iter().flatten().max().map(|v| AnyValue::String(v.into())).unwrap_or(AnyValue::Null),
            other => {
                return Err(ColframeError::TypeMismatch(format!(
                    "max is not defined for {:?}",
                    other.data_type()
                )))
            },
        })
    }

    pub fn std(&self) -> ColframeResult<AnyValue> {
        Ok(numeric_reduce_opt!(self, colframe_compute::aggregate::std))
    }

    pub fn var(&self) -> ColframeResult<AnyValue> {
        Ok(numeric_reduce_opt!(self, colframe_compute::aggregate::var))
    }

    pub fn median(&self) -> ColframeResult<AnyValue> {
        Ok(numeric_reduce_opt!(self, colframe_compute::aggregate::median))
    }

    /// Count of non-null rows (spec §4.3/§4.5 `count`).
    pub fn count(&self) -> usize {
        self.len() - self.null_count()
    }
}

/// Casting (spec §4.3 `cast`): numeric widening/narrowing, float↔int
/// truncation, string↔primitive via parse/format. Row-level parse failures
/// become null (lossy cast policy); structural mismatches (e.g. a nested
/// dtype this engine doesn't model) fail with `UnsupportedCast`.
impl Series {
    pub fn cast(&self, target: &DataType) -> ColframeResult<Series> {
        if &self.data_type() == target {
            return Ok(self.clone());
        }
        use DataType::*;
        match target {
            Boolean => self.cast_to_bool(),
            Int8 => self.cast_to_i64().map(|v| cast_i64_to(v, target, self.name())),
            Int16 => self.cast_to_i64().map(|v| cast_i64_to(v, target, self.name())),
            Int32 => self.cast_to_i64().map(|v| cast_i64_to(v, target, self.name())),
            Int64 => self.cast_to_i64().map(|v| cast_i64_to(v, target, self.name())),
            UInt8 => self.cast_to_i64().map(|v| cast_i64_to(v, target, self.name())),
            UInt16 => self.cast_to_i64().map(|v| cast_i64_to(v, target, self.name())),
            UInt32 => self.cast_to_i64().map(|v| cast_i64_to(v, target, self.name())),
            UInt64 => self.cast_to_i64().map(|v| cast_i64_to(v, target, self.name())),
            Float32 => self
                .cast_to_f64()
                .map(|v| Series::Float32(ChunkedArray::from_slice_options(self.name(), &opt_f32(&v)))),
            Float64 => self
                .cast_to_f64()
                .map(|v| Series::Float64(ChunkedArray::from_slice_options(self.name(), &v))),
            String => Ok(self.cast_to_string()),
            other => Err(ColframeError::UnsupportedCast(format!(
                "cannot cast {:?} to {:?}",
                self.data_type(),
                other
            ))),
        }
    }

    fn cast_to_bool(&self) -> ColframeResult<Series> {
        let vals: ColframeResult<Vec<Option<bool>>> = (0..self.len())
            .map(|i| {
                Ok(match self.get(i)? {
                    AnyValue::Null => None,
                    AnyValue::Boolean(b) => Some(b),
                    AnyValue::Int8(v) => Some(v != 0),
                    AnyValue::Int16(v) => Some(v != 0),
                    AnyValue::Int32(v) => Some(v != 0),
                    AnyValue::Int64(v) => Some(v != 0),
                    AnyValue::UInt8(v) => Some(v != 0),
                    AnyValue::UInt16(v) => Some(v != 0),
                    AnyValue::UInt32(v) => Some(v != 0),
                    AnyValue::UInt64(v) => Some(v != 0),
                    AnyValue::Float32(v) => Some(v != 0.0),
                    AnyValue::Float64(v) => Some(v != 0.0),
                    AnyValue::String(s) => match s.to_ascii_lowercase().as_str() {
                        "true" | "1" | "yes" => Some(true),
                        "false" | "0" | "no" => Some(false),
                        _ => None,
                    },
                    AnyValue::Binary(_) => {
                        return Err(ColframeError::UnsupportedCast("cannot cast binary to bool".into()))
                    },
                })
            })
            .collect();
        Ok(Series::Boolean(BooleanChunked::from_slice_options(self.name(), &vals?)))
    }

    /// Row-wise cast to `f64`, losslessly for numerics, by `str::parse` for
    /// strings (parse failure nulls the row per the lossy-cast policy).
    fn cast_to_f64(&self) -> ColframeResult<Vec<Option<f64>>> {
        (0..self.len())
            .map(|i| {
                Ok(match self.get(i)? {
                    AnyValue::Null => None,
                    AnyValue::Boolean(v) => Some(v as i64 as f64),
                    AnyValue::Int8(v) => Some(v as f64),
                    AnyValue::Int16(v) => Some(v as f64),
                    AnyValue::Int32(v) => Some(v as f64),
                    AnyValue::Int64(v) => Some(v as f64),
                    AnyValue::UInt8(v) => Some(v as f64),
                    AnyValue::UInt16(v) => Some(v as f64),
                    AnyValue::UInt32(v) => Some(v as f64),
                    AnyValue::UInt64(v) => Some(v as f64),
                    AnyValue::Float32(v) => Some(v as f64),
                    AnyValue::Float64(v) => Some(v),
                    AnyValue::String(s) => s.parse::<f64>().ok(),
                    AnyValue::Binary(_) => {
                        return Err(ColframeError::UnsupportedCast("cannot cast binary to a numeric type".into()))
                    },
                })
            })
            .collect()
    }

    /// Row-wise cast to `i64` (truncating floats toward zero), used as the
    /// common path before narrowing to the requested integer width.
    fn cast_to_i64(&self) -> ColframeResult<Vec<Option<i64>>> {
        (0..self.len())
            .map(|i| {
                Ok(match self.get(i)? {
                    AnyValue::Null => None,
                    AnyValue::Boolean(v) => Some(v as i64),
                    AnyValue::Int8(v) => Some(v as i64),
                    AnyValue::Int16(v) => Some(v as i64),
                    AnyValue::Int32(v) => Some(v as i64),
                    AnyValue::Int64(v) => Some(v),
                    AnyValue::UInt8(v) => Some(v as i64),
                    AnyValue::UInt16(v) => Some(v as i64),
                    AnyValue::UInt32(v) => Some(v as i64),
                    AnyValue::UInt64(v) => i64::try_from(v).ok(),
                    AnyValue::Float32(v) => Some(v.trunc() as i64),
                    AnyValue::Float64(v) => Some(v.trunc() as i64),
                    AnyValue::String(s) => s.trim().parse::<i64>().ok(),
                    AnyValue::Binary(_) => {
                        return Err(ColframeError::UnsupportedCast("cannot cast binary to a numeric type".into()))
                    },
                })
            })
            .collect()
    }

    fn cast_to_string(&self) -> Series {
        let vals: Vec<Option<String>> = (0..self.len())
            .map(|i| match self.get(i).unwrap_or(AnyValue::Null) {
                AnyValue::Null => None,
                other => Some(other.to_string()),
            })
            .collect();
        Series::String(StringChunked::from_opt_vec(self.name(), vals))
    }
}

fn opt_f32(values: &[Option<f64>]) -> Vec<Option<f32>> {
    values.iter().map(|v| v.map(|x| x as f32)).collect()
}

/// Narrow/widen an already-`i64` row set into the requested integer dtype.
/// Values that don't fit the target width become null (lossy cast policy,
/// spec §4.3).
fn cast_i64_to(values: Vec<Option<i64>>, target: &DataType, name: &str) -> Series {
    use DataType::*;
    match target {
        Int8 => Series::Int8(ChunkedArray::from_slice_options(name, &narrow(&values, i8::try_from))),
        Int16 => Series::Int16(ChunkedArray::from_slice_options(name, &narrow(&values, i16::try_from))),
        Int32 => Series::Int32(ChunkedArray::from_slice_options(name, &narrow(&values, i32::try_from))),
        Int64 => Series::Int64(ChunkedArray::from_slice_options(name, &values)),
        UInt8 => Series::UInt8(ChunkedArray::from_slice_options(name, &narrow(&values, u8::try_from))),
        UInt16 => Series::UInt16(ChunkedArray::from_slice_options(name, &narrow(&values, u16::try_from))),
        UInt32 => Series::UInt32(ChunkedArray::from_slice_options(name, &narrow(&values, u32::try_from))),
        UInt64 => Series::UInt64(ChunkedArray::from_slice_options(name, &narrow(&values, u64::try_from))),
        _ => unreachable!("cast_i64_to only called for integer targets"),
    }
}

fn narrow<T, E>(values: &[Option<i64>], f: impl Fn(i64) -> Result<T, E>) -> Vec<Option<T>> {
    values.iter().map(|v| v.and_then(|x| f(x).ok())).collect()
}
