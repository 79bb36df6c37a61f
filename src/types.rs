//! Logical types, dynamically typed values, and fixed-width element encodings.

use std::fmt;
use std::str::FromStr;

use crate::buffer::Buffer;
use crate::error::Result;

/// The kind of values a vector holds, named by the tags the query layer switches on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LogicalType {
    #[cfg_attr(feature = "serde", serde(rename = "int32"))]
    Int32,
    #[cfg_attr(feature = "serde", serde(rename = "tiny-int"))]
    TinyInt,
    #[cfg_attr(feature = "serde", serde(rename = "utf8"))]
    Utf8,
}

impl LogicalType {
    pub fn name(&self) -> &'static str {
        match self {
            LogicalType::Int32 => "int32",
            LogicalType::TinyInt => "tiny-int",
            LogicalType::Utf8 => "utf8",
        }
    }

    /// Bytes per element for fixed-width kinds.
    pub fn byte_width(&self) -> Option<usize> {
        match self {
            LogicalType::Int32 => Some(4),
            LogicalType::TinyInt => Some(1),
            LogicalType::Utf8 => None,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The tag was not one of `int32`, `tiny-int`, or `utf8`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown logical type: {0}")]
pub struct UnknownLogicalType(pub String);

impl FromStr for LogicalType {
    type Err = UnknownLogicalType;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int32" => Ok(LogicalType::Int32),
            "tiny-int" => Ok(LogicalType::TinyInt),
            "utf8" => Ok(LogicalType::Utf8),
            other => Err(UnknownLogicalType(other.to_string())),
        }
    }
}

/// A single non-null value of any supported kind.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Int(i32),
    TinyInt(i8),
    Utf8(String),
}

impl Value {
    pub fn logical_type(&self) -> LogicalType {
        match self {
            Value::Int(_) => LogicalType::Int32,
            Value::TinyInt(_) => LogicalType::TinyInt,
            Value::Utf8(_) => LogicalType::Utf8,
        }
    }
}

impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v) } }
impl From<i8> for Value { fn from(v: i8) -> Self { Value::TinyInt(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::Utf8(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::Utf8(v.to_string()) } }

/// A plain-old-data element stored little-endian at a fixed width.
pub trait FixedWidth: Copy + Default + PartialEq + fmt::Debug + bytemuck::Pod + 'static {
    /// Bytes per element.
    const WIDTH: usize;
    const LOGICAL_TYPE: LogicalType;
    fn read(buffer: &Buffer, offset: usize) -> Result<Self>;
    fn write(buffer: &mut Buffer, offset: usize, value: Self) -> Result<()>;
    fn into_value(self) -> Value;
    /// Extracts an element of this kind, or returns the value back.
    fn from_value(value: Value) -> Result<Self, Value>;
}

macro_rules! implement_fixed_width {
    ($type:ty, $width:expr, $logical:ident, $variant:ident) => {
        impl FixedWidth for $type {
            const WIDTH: usize = $width;
            const LOGICAL_TYPE: LogicalType = LogicalType::$logical;
            #[inline(always)]
            fn read(buffer: &Buffer, offset: usize) -> Result<Self> {
                buffer.read_array::<$width>(offset).map(<$type>::from_le_bytes)
            }
            #[inline(always)]
            fn write(buffer: &mut Buffer, offset: usize, value: Self) -> Result<()> {
                buffer.write_array::<$width>(offset, value.to_le_bytes())
            }
            #[inline(always)]
            fn into_value(self) -> Value { Value::$variant(self) }
            #[inline(always)]
            fn from_value(value: Value) -> Result<Self, Value> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(other),
                }
            }
        }
    };
}

implement_fixed_width!(i32, 4, Int32, Int);
implement_fixed_width!(i8, 1, TinyInt, TinyInt);
