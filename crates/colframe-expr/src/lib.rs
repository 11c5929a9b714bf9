//! The expression DSL: a tree of column references, literals, operators,
//! and aggregates (spec §4.6), plus dtype inference and evaluation against
//! a [`colframe_core::DataFrame`].
//!
//! Mirrors `polars-plan`'s `dsl` module in spirit — `Expr` is a plain,
//! side-effect-free value type that composes via builder methods — but
//! skips the arena/logical-node (`AExpr`) indirection `polars-plan` uses for
//! its optimizer, since that lives one layer up in `colframe-plan` here.

pub mod coerce;
pub mod eval;
pub mod expr;

pub use expr::{col, lit, when, AggFn, BinaryOp, Expr, UnaryOp};
