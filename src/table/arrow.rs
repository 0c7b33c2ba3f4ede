//! Arrow export of extracted tables (feature `storage_arrow`).
//!
//! Scalar columns map to primitive Arrow arrays, multi-element columns to
//! `FixedSizeList` arrays. Rows a stream did not cover become Arrow nulls.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, FixedSizeListArray, Float32Array, Float64Array, Int16Array,
    Int32Array, Int64Array, Int8Array, StringArray, UInt16Array, UInt32Array, UInt64Array,
    UInt8Array,
};
use arrow::buffer::NullBuffer;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::error::{ExtractError, ExtractResult};
use crate::table::{Column, ShotTable, SHOTNUM_COLUMN};
use crate::types::{ColumnValues, ElementType};

/// Arrow type of one element.
pub fn data_type(dtype: ElementType) -> DataType {
    match dtype {
        ElementType::I8 => DataType::Int8,
        ElementType::I16 => DataType::Int16,
        ElementType::I32 => DataType::Int32,
        ElementType::I64 => DataType::Int64,
        ElementType::U8 => DataType::UInt8,
        ElementType::U16 => DataType::UInt16,
        ElementType::U32 => DataType::UInt32,
        ElementType::U64 => DataType::UInt64,
        ElementType::F32 => DataType::Float32,
        ElementType::F64 => DataType::Float64,
        ElementType::Bool => DataType::Boolean,
        ElementType::Text => DataType::Utf8,
    }
}

macro_rules! primitive {
    ($array:ty, $values:expr, $valid:expr, $conv:expr) => {{
        let values = $values.iter().map($conv);
        let array: $array = match $valid {
            Some(valid) => values
                .zip(valid.iter())
                .map(|(v, ok)| ok.then_some(v))
                .collect(),
            None => values.map(Some).collect(),
        };
        Arc::new(array) as ArrayRef
    }};
}

/// Flat element array of `column`, with per-element nulls when `valid` is given.
///
/// Integer values already fit `column.dtype`; they are range-checked when read.
fn element_array(column: &Column, valid: Option<&[bool]>) -> ExtractResult<ArrayRef> {
    let array = match (column.dtype, &column.values) {
        (ElementType::I8, ColumnValues::Signed(v)) => primitive!(Int8Array, v, valid, |x| *x as i8),
        (ElementType::I16, ColumnValues::Signed(v)) => primitive!(Int16Array, v, valid, |x| *x as i16),
        (ElementType::I32, ColumnValues::Signed(v)) => primitive!(Int32Array, v, valid, |x| *x as i32),
        (ElementType::I64, ColumnValues::Signed(v)) => primitive!(Int64Array, v, valid, |x| *x),
        (ElementType::U8, ColumnValues::Unsigned(v)) => primitive!(UInt8Array, v, valid, |x| *x as u8),
        (ElementType::U16, ColumnValues::Unsigned(v)) => primitive!(UInt16Array, v, valid, |x| *x as u16),
        (ElementType::U32, ColumnValues::Unsigned(v)) => primitive!(UInt32Array, v, valid, |x| *x as u32),
        (ElementType::U64, ColumnValues::Unsigned(v)) => primitive!(UInt64Array, v, valid, |x| *x),
        (ElementType::F32, ColumnValues::Float(v)) => primitive!(Float32Array, v, valid, |x| *x as f32),
        (ElementType::F64, ColumnValues::Float(v)) => primitive!(Float64Array, v, valid, |x| *x),
        (ElementType::Bool, ColumnValues::Bool(v)) => primitive!(BooleanArray, v, valid, |x| *x),
        (ElementType::Text, ColumnValues::Text(v)) => {
            primitive!(StringArray, v, valid, |x: &String| x.as_str())
        }
        (dtype, values) => {
            return Err(ExtractError::FieldType {
                field: column.name.clone(),
                reason: format!("{} column holds {:?} values", dtype, values.class()),
            })
        }
    };
    Ok(array)
}

impl ShotTable {
    /// Convert to an Arrow `RecordBatch`, shot number column first.
    pub fn to_record_batch(&self) -> ExtractResult<RecordBatch> {
        let mut fields = vec![Field::new(SHOTNUM_COLUMN, DataType::UInt32, false)];
        let mut arrays: Vec<ArrayRef> = vec![Arc::new(UInt32Array::from(self.shotnum().to_vec()))];

        for column in self.columns() {
            let width = column.width();
            if width == 1 {
                fields.push(Field::new(&column.name, data_type(column.dtype), true));
                arrays.push(element_array(column, Some(column.valid.as_slice()))?);
                continue;
            }
            let size = i32::try_from(width).map_err(|_| ExtractError::FieldType {
                field: column.name.clone(),
                reason: format!("{} elements per row exceed the Arrow list size", width),
            })?;
            let item = Arc::new(Field::new("item", data_type(column.dtype), false));
            let values = element_array(column, None)?;
            let nulls = NullBuffer::from(column.valid.clone());
            let list = FixedSizeListArray::try_new(item.clone(), size, values, Some(nulls))?;
            fields.push(Field::new(&column.name, DataType::FixedSizeList(item, size), true));
            arrays.push(Arc::new(list));
        }

        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }
}
