//! [`DataFrame`]: an ordered, equal-length, name-unique column collection
//! (spec §3, §4.4).
//!
//! Relational operators (filter-by-expression, group-by, join) and the
//! expression-driven `with_column`/`sort_by` helpers live one layer up, in
//! `colframe-expr`/`colframe-ops`, as extension traits over this type — this
//! crate only owns the invariants every downstream operator depends on:
//! equal column lengths and unique names.

use colframe_error::{ColframeError, ColframeResult};
use colframe_utils::SmallStr;

use crate::chunked_array::BooleanChunked;
use crate::field::{Field, Schema};
use crate::series::Series;

/// An ordered list of same-length, uniquely-named [`Series`] (spec §3).
#[derive(Clone)]
pub struct DataFrame {
    columns: Vec<Series>,
}

impl DataFrame {
    /// Build from columns, checking the two invariants every mutating
    /// helper below re-checks: pairwise equal length, pairwise unique
    /// names (spec §4.4).
    pub fn new(columns: Vec<Series>) -> ColframeResult<Self> {
        let height = columns.first().map(|c| c.len()).unwrap_or(0);
        let mut seen = std::collections::HashSet::with_capacity(columns.len());
        for c in &columns {
            if c.len() != height {
                return Err(ColframeError::LengthMismatch(format!(
                    "column '{}' has length {} but frame height is {}",
                    c.name(),
                    c.len(),
                    height
                )));
            }
            if !seen.insert(c.name().to_string()) {
                return Err(ColframeError::DuplicateColumnName(c.name().to_string()));
            }
        }
        Ok(Self { columns })
    }

    /// An empty frame: zero rows, zero columns.
    pub fn empty() -> Self {
        Self { columns: Vec::new() }
    }

    pub fn height(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    pub fn columns(&self) -> &[Series] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Series> {
        self.columns
    }

    pub fn schema(&self) -> Schema {
        Schema::try_from_fields(
            self.columns
                .iter()
                .map(|c| Field::new(c.name(), c.data_type()))
                .collect(),
        )
        .expect("DataFrame already guarantees unique column names")
    }

    pub fn get_column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    fn index_of(&self, name: &str) -> ColframeResult<usize> {
        self.columns
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| ColframeError::column_not_found(name))
    }

    pub fn column(&self, name: &str) -> ColframeResult<&Series> {
        Ok(&self.columns[self.index_of(name)?])
    }

    pub fn column_at(&self, i: usize) -> ColframeResult<&Series> {
        self.columns
            .get(i)
            .ok_or_else(|| ColframeError::IndexOutOfRange(format!("column index {i} out of bounds for width {}", self.width())))
    }

    /// Rename a column in place order, producing a new frame (spec §4.4
    /// `rename`; rejects a rename that would collide with an existing name).
    pub fn rename(&self, old: &str, new: impl Into<SmallStr>) -> ColframeResult<Self> {
        let new = new.into();
        let idx = self.index_of(old)?;
        if self.columns.iter().enumerate().any(|(i, c)| i != idx && c.name() == new) {
            return Err(ColframeError::DuplicateColumnName(new.to_string()));
        }
        let mut columns = self.columns.clone();
        columns[idx].rename(new);
        Ok(Self { columns })
    }

    /// Project down to the named columns, in the order requested (spec
    /// §4.4 `select`).
    pub fn select(&self, names: &[&str]) -> ColframeResult<Self> {
        let columns = names
            .iter()
            .map(|n| self.column(n).cloned())
            .collect::<ColframeResult<Vec<_>>>()?;
        Ok(Self { columns })
    }

    /// Drop the named columns, keeping the rest in their original order
    /// (spec §4.4 `drop`).
    pub fn drop(&self, names: &[&str]) -> ColframeResult<Self> {
        for n in names {
            self.index_of(n)?;
        }
        let columns = self
            .columns
            .iter()
            .filter(|c| !names.contains(&c.name()))
            .cloned()
            .collect();
        Ok(Self { columns })
    }

    /// Replace a column by name, or append it if the name is new (spec
    /// §4.4 `with_column`).
    pub fn with_column(&self, series: Series) -> ColframeResult<Self> {
        if !self.columns.is_empty() && series.len() != self.height() {
            return Err(ColframeError::LengthMismatch(format!(
                "new column '{}' has length {} but frame height is {}",
                series.name(),
                series.len(),
                self.height()
            )));
        }
        let mut columns = self.columns.clone();
        match columns.iter().position(|c| c.name() == series.name()) {
            Some(idx) => columns[idx] = series,
            None => columns.push(series),
        }
        Ok(Self { columns })
    }

    /// Keep rows where `mask` is valid-and-true; nulls in the mask drop the
    /// row (spec §4.7 `Filter`).
    pub fn filter_mask(&self, mask: &BooleanChunked) -> ColframeResult<Self> {
        if mask.len() != self.height() {
            return Err(ColframeError::LengthMismatch(format!(
                "filter mask has length {} but frame height is {}",
                mask.len(),
                self.height()
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|c| c.filter(mask))
            .collect::<ColframeResult<Vec<_>>>()?;
        Ok(Self { columns })
    }

    fn take_rows(&self, indices: &[Option<u32>]) -> ColframeResult<Self> {
        let columns = self
            .columns
            .iter()
            .map(|c| c.take(indices))
            .collect::<ColframeResult<Vec<_>>>()?;
        Ok(Self { columns })
    }

    /// Gather rows by position; `None` produces an all-null row (spec §4.8
    /// join/group-by row materialization — both build their output frames
    /// by gathering from one or both input frames via an index list).
    pub fn take(&self, indices: &[Option<u32>]) -> ColframeResult<Self> {
        self.take_rows(indices)
    }

    /// Ascending sort by a single column name (spec §4.4 `sort`).
    pub fn sort(&self, by: &str) -> ColframeResult<Self> {
        self.sort_by(&[by], &[false], false)
    }

    /// Descending sort by a single column name (spec §4.4 `sort_desc`).
    pub fn sort_desc(&self, by: &str) -> ColframeResult<Self> {
        self.sort_by(&[by], &[true], false)
    }

    /// Multi-key sort; `descending` is parallel to `by`, `nulls_last`
    /// applies uniformly to every key (spec §4.4 `sort_by`). Keys after the
    /// first only break ties among equal-valued rows of preceding keys, so
    /// this composes the per-column stable permutations back to front.
    pub fn sort_by(&self, by: &[&str], descending: &[bool], nulls_last: bool) -> ColframeResult<Self> {
        if by.is_empty() {
            return Ok(self.clone());
        }
        if descending.len() != by.len() {
            return Err(ColframeError::InvalidArgument(format!(
                "sort_by got {} keys but {} descending flags",
                by.len(),
                descending.len()
            )));
        }
        let mut perm: Vec<u32> = (0..self.height() as u32).collect();
        for (key, desc) in by.iter().zip(descending.iter()).rev() {
            let col = self.column(key)?;
            let reordered = col.take(&perm.iter().map(|&i| Some(i)).collect::<Vec<_>>())?;
            let local = reordered.arg_sort(*desc, nulls_last);
            perm = local.into_iter().map(|i| perm[i as usize]).collect();
        }
        self.take_rows(&perm.into_iter().map(Some).collect::<Vec<_>>())
    }

    pub fn head(&self, n: usize) -> ColframeResult<Self> {
        self.slice(0, n.min(self.height()))
    }

    pub fn tail(&self, n: usize) -> ColframeResult<Self> {
        let n = n.min(self.height());
        self.slice(self.height() - n, n)
    }

    pub fn slice(&self, offset: usize, length: usize) -> ColframeResult<Self> {
        if offset + length > self.height() {
            return Err(ColframeError::IndexOutOfRange(format!(
                "slice [{offset}, {offset}+{length}) out of bounds for height {}",
                self.height()
            )));
        }
        let columns = self.columns.iter().map(|c| c.slice(offset, length)).collect();
        Ok(Self { columns })
    }

    /// Append `other`'s rows; schemas must match name-for-name (spec §4.4
    /// `concat_rows`, aliased `vstack`).
    pub fn concat_rows(&self, other: &Self) -> ColframeResult<Self> {
        if self.width() != other.width() {
            return Err(ColframeError::SchemaMismatch(format!(
                "concat_rows: frames have {} and {} columns",
                self.width(),
                other.width()
            )));
        }
        let mut columns = Vec::with_capacity(self.width());
        for c in &self.columns {
            let rhs = other.column(c.name())?;
            if rhs.data_type() != c.data_type() {
                return Err(ColframeError::SchemaMismatch(format!(
                    "concat_rows: column '{}' has dtype {:?} on the left and {:?} on the right",
                    c.name(),
                    c.data_type(),
                    rhs.data_type()
                )));
            }
            columns.push(c.concat(rhs)?);
        }
        Ok(Self { columns })
    }

    pub fn vstack(&self, other: &Self) -> ColframeResult<Self> {
        self.concat_rows(other)
    }

    /// Side-by-side column union; both frames must have the same height
    /// and disjoint names (spec §4.4 `concat_cols`).
    pub fn concat_cols(&self, other: &Self) -> ColframeResult<Self> {
        if !self.is_empty() && !other.is_empty() && self.height() != other.height() {
            return Err(ColframeError::LengthMismatch(format!(
                "concat_cols: frames have heights {} and {}",
                self.height(),
                other.height()
            )));
        }
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        Self::new(columns)
    }

    pub fn hstack(&self, other: &Self) -> ColframeResult<Self> {
        self.concat_cols(other)
    }

    /// Row mask over every column's null-ness; a row is dropped if any of
    /// `subset` (or, when empty, any column) is null (spec supplement,
    /// `DataFrame::drop_nulls`).
    pub fn drop_nulls(&self, subset: &[&str]) -> ColframeResult<Self> {
        let cols: Vec<&Series> = if subset.is_empty() {
            self.columns.iter().collect()
        } else {
            subset.iter().map(|n| self.column(n)).collect::<ColframeResult<_>>()?
        };
        let keep: Vec<bool> = (0..self.height()).map(|i| cols.iter().all(|c| !c.is_null_at(i))).collect();
        let mask = BooleanChunked::from_slice_options("mask", &keep.iter().map(|&b| Some(b)).collect::<Vec<_>>());
        self.filter_mask(&mask)
    }

    /// Eager engine — already materialized, so `collect` is the identity
    /// (spec §4.4 `collect`, contrasted with the lazy plan's `collect`).
    pub fn collect(self) -> ColframeResult<Self> {
        Ok(self)
    }

    /// Summary statistics per numeric column: count/mean/std/min/max, plus
    /// a `count`/`null_count` row for every column (spec supplement
    /// `describe`, grounded on `DataFrame::describe`).
    pub fn describe(&self) -> ColframeResult<Self> {
        use crate::series::AnyValue;
        let stat_names = ["count", "null_count", "mean", "std", "min", "max"];
        let mut out_columns = vec![Series::String(crate::chunked_array::StringChunked::from_opt_vec(
            "statistic",
            stat_names.iter().map(|s| Some(s.to_string())).collect(),
        ))];
        for col in &self.columns {
            let values = if col.is_numeric() {
                vec![
                    AnyValue::Int64(col.count() as i64),
                    AnyValue::Int64(col.null_count() as i64),
                    col.mean()?,
                    col.std()?,
                    col.min()?,
                    col.max()?,
                ]
            } else {
                vec![
                    AnyValue::Int64(col.count() as i64),
                    AnyValue::Int64(col.null_count() as i64),
                    AnyValue::Null,
                    AnyValue::Null,
                    col.min().unwrap_or(AnyValue::Null),
                    col.max().unwrap_or(AnyValue::Null),
                ]
            };
            let opts: Vec<Option<String>> = values
                .into_iter()
                .map(|v| match v {
                    AnyValue::Null => None,
                    other => Some(other.to_string()),
                })
                .collect();
            out_columns.push(Series::String(crate::chunked_array::StringChunked::from_opt_vec(
                col.name(),
                opts,
            )));
        }
        Self::new(out_columns)
    }
}

impl std::fmt::Debug for DataFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "DataFrame[{} x {}]", self.height(), self.width())?;
        for c in &self.columns {
            writeln!(f, "  {c:?}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chunked_array::ChunkedArray;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::String(crate::chunked_array::StringChunked::from_opt_vec(
                "name",
                vec![Some("A".into()), Some("B".into()), Some("C".into())],
            )),
            Series::Int64(ChunkedArray::from_vec("age", vec![25, 30, 35])),
            Series::Float64(ChunkedArray::from_vec("score", vec![95.5, 87.0, 92.3])),
        ])
        .unwrap()
    }

    #[test]
    fn construction_checks_height_and_names() {
        let df = frame();
        assert_eq!(df.shape(), (3, 3));
        match df.column("score").unwrap().sum().unwrap() {
            crate::series::AnyValue::Float64(v) => assert!((v - 274.8).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_length_mismatch() {
        let a = Series::Int64(ChunkedArray::from_vec("a", vec![1, 2, 3]));
        let b = Series::Int64(ChunkedArray::from_vec("b", vec![1, 2]));
        assert!(matches!(DataFrame::new(vec![a, b]), Err(ColframeError::LengthMismatch(_))));
    }

    #[test]
    fn rejects_duplicate_names() {
        let a = Series::Int64(ChunkedArray::from_vec("a", vec![1, 2]));
        let b = Series::Int64(ChunkedArray::from_vec("a", vec![3, 4]));
        assert!(matches!(DataFrame::new(vec![a, b]), Err(ColframeError::DuplicateColumnName(_))));
    }

    #[test]
    fn select_and_drop_roundtrip() {
        let df = frame();
        let selected = df.select(&["name", "age"]).unwrap();
        assert_eq!(selected.get_column_names(), vec!["name", "age"]);
        let dropped = df.drop(&["score"]).unwrap();
        assert_eq!(dropped.get_column_names(), vec!["name", "age"]);
    }

    #[test]
    fn head_tail_slice() {
        let df = frame();
        assert_eq!(df.head(2).unwrap().height(), 2);
        assert_eq!(df.tail(1).unwrap().height(), 1);
        assert_eq!(df.slice(1, 2).unwrap().height(), 2);
    }

    #[test]
    fn sort_by_is_stable_and_respects_descending() {
        let df = DataFrame::new(vec![Series::Int64(ChunkedArray::from_vec("k", vec![3, 1, 3, 1, 3, 1]))]).unwrap();
        let sorted = df.sort(&"k").unwrap();
        let vals: Vec<_> = (0..sorted.height())
            .map(|i| sorted.column("k").unwrap().get(i).unwrap())
            .collect();
        assert_eq!(
            vals,
            vec![
                crate::series::AnyValue::Int64(1),
                crate::series::AnyValue::Int64(1),
                crate::series::AnyValue::Int64(1),
                crate::series::AnyValue::Int64(3),
                crate::series::AnyValue::Int64(3),
                crate::series::AnyValue::Int64(3),
            ]
        );
    }

    #[test]
    fn concat_rows_and_cols() {
        let df = frame();
        let stacked = df.concat_rows(&df).unwrap();
        assert_eq!(stacked.height(), 6);
        let extra = DataFrame::new(vec![Series::Int64(ChunkedArray::from_vec("flag", vec![1, 1, 1]))]).unwrap();
        let widened = df.concat_cols(&extra).unwrap();
        assert_eq!(widened.width(), 4);
    }
}
