//! Error kinds shared across the colframe workspace.
//!
//! Every operator in the engine returns [`ColframeResult`]; there is no retry
//! and no partial result on failure (spec §7).

use std::fmt;

/// Tagged error kinds, one per spec.md §7 entry.
#[derive(thiserror::Error, Debug)]
pub enum ColframeError {
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("duplicate column name: {0}")]
    DuplicateColumnName(String),

    #[error("length mismatch: {0}")]
    LengthMismatch(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("unsupported cast: {0}")]
    UnsupportedCast(String),

    #[error("index out of range: {0}")]
    IndexOutOfRange(String),

    #[error("division by zero: {0}")]
    DivisionByZero(String),

    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io error: {0}")]
    IoError(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error (broken invariant): {0}")]
    Internal(String),
}

pub type ColframeResult<T> = Result<T, ColframeError>;

impl From<std::io::Error> for ColframeError {
    fn from(e: std::io::Error) -> Self {
        ColframeError::IoError(e.to_string())
    }
}

impl ColframeError {
    pub fn column_not_found(name: impl fmt::Display) -> Self {
        ColframeError::ColumnNotFound(name.to_string())
    }

    pub fn oob(index: usize, len: usize) -> Self {
        ColframeError::IndexOutOfRange(format!("index {index} out of bounds for length {len}"))
    }
}

/// Build a [`ColframeError`] and return it via `?`/early return, in the
/// style of `polars_bail!`.
#[macro_export]
macro_rules! cf_bail {
    ($variant:ident = $($arg:tt)*) => {
        return Err($crate::ColframeError::$variant(format!($($arg)*)))
    };
    (Cancelled) => {
        return Err($crate::ColframeError::Cancelled)
    };
}

/// Assert a condition, bailing with the given error variant/message if false.
#[macro_export]
macro_rules! cf_ensure {
    ($cond:expr, $variant:ident = $($arg:tt)*) => {
        if !($cond) {
            $crate::cf_bail!($variant = $($arg)*);
        }
    };
}
