//! The closed, tagged set of column element types (spec §3).

use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;

use crate::field::Field;

/// Unit a temporal physical value is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
        };
        write!(f, "{s}")
    }
}

/// The closed set of element types a [`crate::series::Series`] can hold.
///
/// Nested variants carry their inner dtype by `Arc` so that `DataType`
/// remains cheap to clone (it is stored once per `Field`, and `Field`s are
/// cloned freely when building `Schema`s).
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    Binary,
    /// Days since the Unix epoch, physically `Int32`.
    Date,
    /// Nanoseconds since midnight, physically `Int64`.
    Time,
    Datetime(TimeUnit, Option<CompactString>),
    Duration(TimeUnit),
    Null,
    List(Arc<DataType>),
    FixedSizeArray(Arc<DataType>, usize),
    Struct(Vec<Field>),
}

impl Eq for DataType {}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use DataType::*;
        match self {
            Boolean => write!(f, "bool"),
            Int8 => write!(f, "i8"),
            Int16 => write!(f, "i16"),
            Int32 => write!(f, "i32"),
            Int64 => write!(f, "i64"),
            UInt8 => write!(f, "u8"),
            UInt16 => write!(f, "u16"),
            UInt32 => write!(f, "u32"),
            UInt64 => write!(f, "u64"),
            Float32 => write!(f, "f32"),
            Float64 => write!(f, "f64"),
            String => write!(f, "str"),
            Binary => write!(f, "binary"),
            Date => write!(f, "date"),
            Time => write!(f, "time"),
            Datetime(unit, tz) => match tz {
                Some(tz) => write!(f, "datetime[{unit}, {tz}]"),
                None => write!(f, "datetime[{unit}]"),
            },
            Duration(unit) => write!(f, "duration[{unit}]"),
            Null => write!(f, "null"),
            List(inner) => write!(f, "list[{inner}]"),
            FixedSizeArray(inner, width) => write!(f, "array[{inner}; {width}]"),
            Struct(fields) => {
                write!(f, "struct{{")?;
                for (i, fld) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", fld.name(), fld.dtype())?;
                }
                write!(f, "}}")
            },
        }
    }
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_integer(&self) -> bool {
        use DataType::*;
        matches!(
            self,
            Int8 | Int16 | Int32 | Int64 | UInt8 | UInt16 | UInt32 | UInt64
        )
    }

    pub fn is_signed(&self) -> bool {
        use DataType::*;
        matches!(self, Int8 | Int16 | Int32 | Int64 | Float32 | Float64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            DataType::Date | DataType::Time | DataType::Datetime(_, _) | DataType::Duration(_)
        )
    }

    pub fn is_nested(&self) -> bool {
        matches!(
            self,
            DataType::List(_) | DataType::FixedSizeArray(_, _) | DataType::Struct(_)
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DataType::Null)
    }

    /// The in-memory representation backing a logical dtype (spec §3: Date
    /// is physically Int32; Time/Datetime/Duration are physically Int64).
    pub fn to_physical(&self) -> DataType {
        match self {
            DataType::Date => DataType::Int32,
            DataType::Time | DataType::Datetime(_, _) | DataType::Duration(_) => DataType::Int64,
            other => other.clone(),
        }
    }
}
