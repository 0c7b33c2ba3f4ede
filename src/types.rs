//! Element types and typed value buffers shared by the backing store and the
//! output table.
//!
//! Values are kept column-wise in one of five physical buffers (`ColumnValues`).
//! The declared `ElementType` keeps the storage width around so NULL sentinels and
//! Arrow export can pick the right representation. Multi-element fields are stored
//! flattened row-major: row `r`, element `k` of a field with width `w` lives at
//! `r * w + k`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared element type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// 8-bit signed integer.
    I8,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 64-bit unsigned integer.
    U64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Text,
}

/// Coarse class of an element type, used for NULL-fill and casting decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    /// Signed integers.
    Signed,
    /// Unsigned integers.
    Unsigned,
    /// Floating point.
    Float,
    /// Boolean.
    Bool,
    /// Text.
    Text,
}

impl ElementType {
    /// Class of the type.
    pub fn class(self) -> TypeClass {
        match self {
            ElementType::I8 | ElementType::I16 | ElementType::I32 | ElementType::I64 => {
                TypeClass::Signed
            }
            ElementType::U8 | ElementType::U16 | ElementType::U32 | ElementType::U64 => {
                TypeClass::Unsigned
            }
            ElementType::F32 | ElementType::F64 => TypeClass::Float,
            ElementType::Bool => TypeClass::Bool,
            ElementType::Text => TypeClass::Text,
        }
    }

    /// Inclusive value range of an integer type.
    pub fn integer_range(self) -> Option<(i128, i128)> {
        let range = match self {
            ElementType::I8 => (i128::from(i8::MIN), i128::from(i8::MAX)),
            ElementType::I16 => (i128::from(i16::MIN), i128::from(i16::MAX)),
            ElementType::I32 => (i128::from(i32::MIN), i128::from(i32::MAX)),
            ElementType::I64 => (i128::from(i64::MIN), i128::from(i64::MAX)),
            ElementType::U8 => (0, i128::from(u8::MAX)),
            ElementType::U16 => (0, i128::from(u16::MAX)),
            ElementType::U32 => (0, i128::from(u32::MAX)),
            ElementType::U64 => (0, i128::from(u64::MAX)),
            _ => return None,
        };
        Some(range)
    }

    /// Largest value representable by an unsigned type, used as its NULL sentinel.
    pub fn unsigned_max(self) -> Option<u64> {
        match self {
            ElementType::U8 => Some(u64::from(u8::MAX)),
            ElementType::U16 => Some(u64::from(u16::MAX)),
            ElementType::U32 => Some(u64::from(u32::MAX)),
            ElementType::U64 => Some(u64::MAX),
            _ => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ElementType::I8 => "i8",
            ElementType::I16 => "i16",
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::U8 => "u8",
            ElementType::U16 => "u16",
            ElementType::U32 => "u32",
            ElementType::U64 => "u64",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
            ElementType::Bool => "bool",
            ElementType::Text => "text",
        };
        write!(f, "{}", label)
    }
}

/// A flat, typed buffer of field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class", content = "values", rename_all = "lowercase")]
pub enum ColumnValues {
    /// Values of any signed width.
    Signed(Vec<i64>),
    /// Values of any unsigned width.
    Unsigned(Vec<u64>),
    /// Values of any float width.
    Float(Vec<f64>),
    /// Boolean values.
    Bool(Vec<bool>),
    /// Text values.
    Text(Vec<String>),
}

/// A single element borrowed out of a `ColumnValues` buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    /// A signed integer.
    Signed(i64),
    /// An unsigned integer.
    Unsigned(u64),
    /// A float.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Borrowed text.
    Text(&'a str),
}

impl ColumnValues {
    /// Zero-initialized buffer of `len` elements for the given type.
    pub fn zeroed(dtype: ElementType, len: usize) -> Self {
        match dtype.class() {
            TypeClass::Signed => ColumnValues::Signed(vec![0; len]),
            TypeClass::Unsigned => ColumnValues::Unsigned(vec![0; len]),
            TypeClass::Float => ColumnValues::Float(vec![0.0; len]),
            TypeClass::Bool => ColumnValues::Bool(vec![false; len]),
            TypeClass::Text => ColumnValues::Text(vec![String::new(); len]),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Signed(v) => v.len(),
            ColumnValues::Unsigned(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Bool(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
        }
    }

    /// True for a buffer with no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Class of the stored values.
    pub fn class(&self) -> TypeClass {
        match self {
            ColumnValues::Signed(_) => TypeClass::Signed,
            ColumnValues::Unsigned(_) => TypeClass::Unsigned,
            ColumnValues::Float(_) => TypeClass::Float,
            ColumnValues::Bool(_) => TypeClass::Bool,
            ColumnValues::Text(_) => TypeClass::Text,
        }
    }

    /// Element `i`.
    pub fn get(&self, i: usize) -> Option<Value<'_>> {
        match self {
            ColumnValues::Signed(v) => v.get(i).map(|x| Value::Signed(*x)),
            ColumnValues::Unsigned(v) => v.get(i).map(|x| Value::Unsigned(*x)),
            ColumnValues::Float(v) => v.get(i).map(|x| Value::Float(*x)),
            ColumnValues::Bool(v) => v.get(i).map(|x| Value::Bool(*x)),
            ColumnValues::Text(v) => v.get(i).map(|x| Value::Text(x.as_str())),
        }
    }

    /// Signed values, if signed.
    pub fn as_i64(&self) -> Option<&[i64]> {
        match self {
            ColumnValues::Signed(v) => Some(v),
            _ => None,
        }
    }

    /// Unsigned values, if unsigned.
    pub fn as_u64(&self) -> Option<&[u64]> {
        match self {
            ColumnValues::Unsigned(v) => Some(v),
            _ => None,
        }
    }

    /// Float values, if float.
    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            ColumnValues::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Boolean values, if boolean.
    pub fn as_bool(&self) -> Option<&[bool]> {
        match self {
            ColumnValues::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Text values, if text.
    pub fn as_text(&self) -> Option<&[String]> {
        match self {
            ColumnValues::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Integer view of the buffer, used for shot numbers and command indices.
    ///
    /// Returns `None` for non-integer buffers. Unsigned values above `i64::MAX`
    /// saturate.
    pub fn to_i64_vec(&self) -> Option<Vec<i64>> {
        match self {
            ColumnValues::Signed(v) => Some(v.clone()),
            ColumnValues::Unsigned(v) => Some(
                v.iter()
                    .map(|x| i64::try_from(*x).unwrap_or(i64::MAX))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Gather whole rows of width `width` into a new buffer.
    ///
    /// The caller guarantees every row index is in range.
    pub fn take_rows(&self, rows: &[usize], width: usize) -> ColumnValues {
        fn gather<T: Clone>(src: &[T], rows: &[usize], width: usize) -> Vec<T> {
            let mut out = Vec::with_capacity(rows.len() * width);
            for &r in rows {
                out.extend_from_slice(&src[r * width..(r + 1) * width]);
            }
            out
        }
        match self {
            ColumnValues::Signed(v) => ColumnValues::Signed(gather(v, rows, width)),
            ColumnValues::Unsigned(v) => ColumnValues::Unsigned(gather(v, rows, width)),
            ColumnValues::Float(v) => ColumnValues::Float(gather(v, rows, width)),
            ColumnValues::Bool(v) => ColumnValues::Bool(gather(v, rows, width)),
            ColumnValues::Text(v) => ColumnValues::Text(gather(v, rows, width)),
        }
    }

    /// Convert to the buffer of `dtype`.
    ///
    /// Integers convert between signedness and widen to floats. Floats, bools and
    /// text only convert to their own class. An integer outside the range of
    /// `dtype` is an error naming the value; nothing is truncated or saturated.
    pub fn convert(self, dtype: ElementType) -> Result<ColumnValues, String> {
        let target = dtype.class();
        match (self, target) {
            (ColumnValues::Signed(v), TypeClass::Signed | TypeClass::Unsigned) => {
                check_range(v.iter().map(|&x| i128::from(x)), dtype)?;
                Ok(match target {
                    TypeClass::Signed => ColumnValues::Signed(v),
                    _ => ColumnValues::Unsigned(
                        v.into_iter().map(|x| u64::try_from(x).unwrap_or(0)).collect(),
                    ),
                })
            }
            (ColumnValues::Unsigned(v), TypeClass::Signed | TypeClass::Unsigned) => {
                check_range(v.iter().map(|&x| i128::from(x)), dtype)?;
                Ok(match target {
                    TypeClass::Unsigned => ColumnValues::Unsigned(v),
                    _ => ColumnValues::Signed(
                        v.into_iter()
                            .map(|x| i64::try_from(x).unwrap_or(i64::MAX))
                            .collect(),
                    ),
                })
            }
            (ColumnValues::Signed(v), TypeClass::Float) => Ok(ColumnValues::Float(
                v.into_iter().map(|x| x as f64).collect(),
            )),
            (ColumnValues::Unsigned(v), TypeClass::Float) => Ok(ColumnValues::Float(
                v.into_iter().map(|x| x as f64).collect(),
            )),
            (v, t) if v.class() == t => Ok(v),
            (v, _) => Err(format!("cannot store {:?} values as {}", v.class(), dtype)),
        }
    }
}

fn check_range<I: IntoIterator<Item = i128>>(values: I, dtype: ElementType) -> Result<(), String> {
    let Some((min, max)) = dtype.integer_range() else {
        return Ok(());
    };
    match values.into_iter().find(|x| *x < min || *x > max) {
        Some(x) => Err(format!("value {} does not fit {}", x, dtype)),
        None => Ok(()),
    }
}

impl From<Vec<i8>> for ColumnValues {
    fn from(v: Vec<i8>) -> Self {
        ColumnValues::Signed(v.into_iter().map(i64::from).collect())
    }
}

impl From<Vec<i16>> for ColumnValues {
    fn from(v: Vec<i16>) -> Self {
        ColumnValues::Signed(v.into_iter().map(i64::from).collect())
    }
}

impl From<Vec<i32>> for ColumnValues {
    fn from(v: Vec<i32>) -> Self {
        ColumnValues::Signed(v.into_iter().map(i64::from).collect())
    }
}

impl From<Vec<i64>> for ColumnValues {
    fn from(v: Vec<i64>) -> Self {
        ColumnValues::Signed(v)
    }
}

impl From<Vec<u8>> for ColumnValues {
    fn from(v: Vec<u8>) -> Self {
        ColumnValues::Unsigned(v.into_iter().map(u64::from).collect())
    }
}

impl From<Vec<u16>> for ColumnValues {
    fn from(v: Vec<u16>) -> Self {
        ColumnValues::Unsigned(v.into_iter().map(u64::from).collect())
    }
}

impl From<Vec<u32>> for ColumnValues {
    fn from(v: Vec<u32>) -> Self {
        ColumnValues::Unsigned(v.into_iter().map(u64::from).collect())
    }
}

impl From<Vec<u64>> for ColumnValues {
    fn from(v: Vec<u64>) -> Self {
        ColumnValues::Unsigned(v)
    }
}

impl From<Vec<f32>> for ColumnValues {
    fn from(v: Vec<f32>) -> Self {
        ColumnValues::Float(v.into_iter().map(f64::from).collect())
    }
}

impl From<Vec<f64>> for ColumnValues {
    fn from(v: Vec<f64>) -> Self {
        ColumnValues::Float(v)
    }
}

impl From<Vec<bool>> for ColumnValues {
    fn from(v: Vec<bool>) -> Self {
        ColumnValues::Bool(v)
    }
}

impl From<Vec<String>> for ColumnValues {
    fn from(v: Vec<String>) -> Self {
        ColumnValues::Text(v)
    }
}

impl From<Vec<&str>> for ColumnValues {
    fn from(v: Vec<&str>) -> Self {
        ColumnValues::Text(v.into_iter().map(str::to_string).collect())
    }
}
