//! `Expr`: a pure, composable tree (spec §4.6). Constructing and inspecting
//! an `Expr` never touches data — it only builds the tree `eval::evaluate`
//! and `colframe-plan`'s rewrites later walk.

use std::sync::Arc;

use colframe_core::series::AnyValue;
use colframe_core::{DataType, Schema};
use colframe_error::{ColframeError, ColframeResult};
use colframe_utils::SmallStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Aggregation functions an `Aggregate` node may apply (spec §4.5/§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFn {
    Sum,
    Mean,
    Min,
    Max,
    Count,
    Std,
    Var,
    Median,
}

/// A node in the expression tree (spec §4.6's variant list, one-to-one).
#[derive(Debug, Clone)]
pub enum Expr {
    ColumnRef(SmallStr),
    Literal(AnyValue),
    BinaryOp(BinaryOp, Arc<Expr>, Arc<Expr>),
    UnaryOp(UnaryOp, Arc<Expr>),
    Cast(Arc<Expr>, DataType),
    Aggregate(AggFn, Arc<Expr>),
    When {
        cond: Arc<Expr>,
        then: Arc<Expr>,
        otherwise: Arc<Expr>,
    },
    Alias(Arc<Expr>, SmallStr),
    IsNull(Arc<Expr>),
    IsNotNull(Arc<Expr>),
}

/// A value that can become an `Expr::Literal` (spec §6 `lit(value)`).
pub trait IntoLiteral {
    fn into_any_value(self) -> AnyValue;
}

macro_rules! into_literal {
    ($t:ty, $variant:ident) => {
        impl IntoLiteral for $t {
            fn into_any_value(self) -> AnyValue {
                AnyValue::$variant(self)
            }
        }
    };
}
into_literal!(bool, Boolean);
into_literal!(i8, Int8);
into_literal!(i16, Int16);
into_literal!(i32, Int32);
into_literal!(i64, Int64);
into_literal!(u8, UInt8);
into_literal!(u16, UInt16);
into_literal!(u32, UInt32);
into_literal!(u64, UInt64);
into_literal!(f32, Float32);
into_literal!(f64, Float64);

impl IntoLiteral for &str {
    fn into_any_value(self) -> AnyValue {
        AnyValue::String(Arc::from(self))
    }
}

impl IntoLiteral for String {
    fn into_any_value(self) -> AnyValue {
        AnyValue::String(Arc::from(self.as_str()))
    }
}

/// Reference a column by name (spec §6 `col(name)`).
pub fn col(name: impl Into<SmallStr>) -> Expr {
    Expr::ColumnRef(name.into())
}

/// A constant value, broadcast to every row at evaluation time (spec §6
/// `lit(value)`).
pub fn lit(value: impl IntoLiteral) -> Expr {
    Expr::Literal(value.into_any_value())
}

/// Start a `when(cond).then(x).otherwise(y)` builder (spec §6).
pub fn when(cond: Expr) -> WhenBuilder {
    WhenBuilder { cond: Arc::new(cond) }
}

pub struct WhenBuilder {
    cond: Arc<Expr>,
}

impl WhenBuilder {
    pub fn then(self, then: Expr) -> ThenBuilder {
        ThenBuilder {
            cond: self.cond,
            then: Arc::new(then),
        }
    }
}

pub struct ThenBuilder {
    cond: Arc<Expr>,
    then: Arc<Expr>,
}

impl ThenBuilder {
    pub fn otherwise(self, otherwise: Expr) -> Expr {
        Expr::When {
            cond: self.cond,
            then: self.then,
            otherwise: Arc::new(otherwise),
        }
    }
}

macro_rules! binary_ctor {
    ($name:ident, $op:ident) => {
        pub fn $name(self, other: Expr) -> Expr {
            Expr::BinaryOp(BinaryOp::$op, Arc::new(self), Arc::new(other))
        }
    };
}

impl Expr {
    binary_ctor!(add, Add);
    binary_ctor!(sub, Sub);
    binary_ctor!(mul, Mul);
    binary_ctor!(div, Div);
    binary_ctor!(eq, Eq);
    binary_ctor!(neq, NotEq);
    binary_ctor!(lt, Lt);
    binary_ctor!(lt_eq, LtEq);
    binary_ctor!(gt, Gt);
    binary_ctor!(gt_eq, GtEq);
    binary_ctor!(and, And);
    binary_ctor!(or, Or);

    pub fn not(self) -> Expr {
        Expr::UnaryOp(UnaryOp::Not, Arc::new(self))
    }

    pub fn neg(self) -> Expr {
        Expr::UnaryOp(UnaryOp::Neg, Arc::new(self))
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull(Arc::new(self))
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNotNull(Arc::new(self))
    }

    pub fn alias(self, name: impl Into<SmallStr>) -> Expr {
        Expr::Alias(Arc::new(self), name.into())
    }

    pub fn cast(self, dtype: DataType) -> Expr {
        Expr::Cast(Arc::new(self), dtype)
    }

    pub fn sum(self) -> Expr {
        Expr::Aggregate(AggFn::Sum, Arc::new(self))
    }

    pub fn mean(self) -> Expr {
        Expr::Aggregate(AggFn::Mean, Arc::new(self))
    }

    pub fn min(self) -> Expr {
        Expr::Aggregate(AggFn::Min, Arc::new(self))
    }

    pub fn max(self) -> Expr {
        Expr::Aggregate(AggFn::Max, Arc::new(self))
    }

    pub fn count(self) -> Expr {
        Expr::Aggregate(AggFn::Count, Arc::new(self))
    }

    pub fn std(self) -> Expr {
        Expr::Aggregate(AggFn::Std, Arc::new(self))
    }

    pub fn var(self) -> Expr {
        Expr::Aggregate(AggFn::Var, Arc::new(self))
    }

    pub fn median(self) -> Expr {
        Expr::Aggregate(AggFn::Median, Arc::new(self))
    }

    /// Enumerate this node's direct children (spec §4.8's "tree with
    /// uniform child accessor" shape, used by `colframe-plan`'s rewrites
    /// when they need to look inside a `WithColumn`/`Filter` expression).
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::ColumnRef(_) | Expr::Literal(_) => vec![],
            Expr::BinaryOp(_, l, r) => vec![l, r],
            Expr::UnaryOp(_, e) | Expr::Cast(e, _) | Expr::Aggregate(_, e) | Expr::Alias(e, _) | Expr::IsNull(e) | Expr::IsNotNull(e) => {
                vec![e]
            },
            Expr::When { cond, then, otherwise } => vec![cond, then, otherwise],
        }
    }

    /// Column names this expression reads directly (spec §4.8 pushdown:
    /// the "needed column set").
    pub fn leaf_column_names(&self) -> Vec<SmallStr> {
        let mut out = Vec::new();
        self.collect_leaf_names(&mut out);
        out
    }

    fn collect_leaf_names(&self, out: &mut Vec<SmallStr>) {
        if let Expr::ColumnRef(name) = self {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        for child in self.children() {
            child.collect_leaf_names(out);
        }
    }

    /// The name this expression's output column should carry: an `Alias`
    /// wins; otherwise the root column name; otherwise a synthesized name.
    pub fn output_name(&self) -> SmallStr {
        match self {
            Expr::Alias(_, name) => name.clone(),
            Expr::ColumnRef(name) => name.clone(),
            Expr::Aggregate(_, inner) => inner.output_name(),
            Expr::Cast(inner, _) => inner.output_name(),
            _ => SmallStr::from("literal"),
        }
    }

    /// Does this expression's root contain an `Aggregate`? Used by
    /// group-by to validate that every output expression reduces its
    /// group (spec §4.7).
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expr::Aggregate(_, _)) || matches!(self, Expr::Alias(inner, _) if inner.is_aggregate())
    }

    /// Unwrap an (optionally aliased) `Aggregate` root into its function and
    /// child expression, for callers — group-by's `agg()` — that need to
    /// evaluate the child over a group and reduce it themselves rather than
    /// through `eval::evaluate`'s whole-frame broadcast.
    pub fn as_aggregate(&self) -> Option<(AggFn, &Expr)> {
        match self {
            Expr::Alias(inner, _) => inner.as_aggregate(),
            Expr::Aggregate(func, child) => Some((*func, child)),
            _ => None,
        }
    }

    /// Infer this expression's output dtype against a schema (spec §4.6:
    /// "each node reports its inferred output DType"). Numeric binary ops
    /// widen per [`crate::coerce::promote`]; comparisons and logical ops
    /// are always `Boolean`; `When` unifies its two branch types.
    pub fn output_dtype(&self, schema: &Schema) -> ColframeResult<DataType> {
        match self {
            Expr::ColumnRef(name) => schema
                .get(name)
                .map(|f| f.dtype().clone())
                .ok_or_else(|| ColframeError::column_not_found(name)),
            Expr::Literal(v) => Ok(literal_dtype(v)),
            Expr::BinaryOp(op, l, r) => {
                let (lt, rt) = (l.output_dtype(schema)?, r.output_dtype(schema)?);
                if op.is_comparison() || op.is_logical() {
                    Ok(DataType::Boolean)
                } else {
                    crate::coerce::promote(&lt, &rt)
                }
            },
            Expr::UnaryOp(UnaryOp::Not, e) => {
                let _ = e.output_dtype(schema)?;
                Ok(DataType::Boolean)
            },
            Expr::UnaryOp(UnaryOp::Neg, e) => e.output_dtype(schema),
            Expr::Cast(_, dtype) => Ok(dtype.clone()),
            Expr::Aggregate(func, e) => {
                let inner = e.output_dtype(schema)?;
                Ok(match func {
                    AggFn::Count => DataType::Int64,
                    AggFn::Sum | AggFn::Min | AggFn::Max => inner,
                    AggFn::Mean | AggFn::Std | AggFn::Var | AggFn::Median => DataType::Float64,
                })
            },
            Expr::When { then, otherwise, .. } => {
                let (tt, ot) = (then.output_dtype(schema)?, otherwise.output_dtype(schema)?);
                if tt == ot {
                    Ok(tt)
                } else {
                    crate::coerce::promote(&tt, &ot)
                }
            },
            Expr::Alias(e, _) => e.output_dtype(schema),
            Expr::IsNull(_) | Expr::IsNotNull(_) => Ok(DataType::Boolean),
        }
    }
}

fn literal_dtype(v: &AnyValue) -> DataType {
    match v {
        AnyValue::Null => DataType::Null,
        AnyValue::Boolean(_) => DataType::Boolean,
        AnyValue::Int8(_) => DataType::Int8,
        AnyValue::Int16(_) => DataType::Int16,
        AnyValue::Int32(_) => DataType::Int32,
        AnyValue::Int64(_) => DataType::Int64,
        AnyValue::UInt8(_) => DataType::UInt8,
        AnyValue::UInt16(_) => DataType::UInt16,
        AnyValue::UInt32(_) => DataType::UInt32,
        AnyValue::UInt64(_) => DataType::UInt64,
        AnyValue::Float32(_) => DataType::Float32,
        AnyValue::Float64(_) => DataType::Float64,
        AnyValue::String(_) => DataType::String,
        AnyValue::Binary(_) => DataType::Binary,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use colframe_core::Field;

    fn schema() -> Schema {
        Schema::try_from_fields(vec![Field::new("a", DataType::Int32), Field::new("b", DataType::Float64)]).unwrap()
    }

    #[test]
    fn comparison_is_always_boolean() {
        let e = col("a").gt(lit(10i32));
        assert_eq!(e.output_dtype(&schema()).unwrap(), DataType::Boolean);
    }

    #[test]
    fn arithmetic_widens_to_the_wider_operand() {
        let e = col("a").add(col("b"));
        assert_eq!(e.output_dtype(&schema()).unwrap(), DataType::Float64);
    }

    #[test]
    fn alias_carries_output_name() {
        let e = col("a").add(lit(1i32)).alias("a_plus_one");
        assert_eq!(e.output_name(), "a_plus_one");
    }

    #[test]
    fn leaf_names_deduplicate() {
        let e = col("a").add(col("a")).gt(col("b"));
        assert_eq!(e.leaf_column_names(), vec!["a", "b"]);
    }
}
