//! The aligned output table.
//!
//! A `ShotTable` holds one row per final shot number: the shot number column
//! followed by the columns of every selected stream in selection order. Columns
//! are typed buffers with a per-row validity mask; rows a stream did not cover
//! (union mode) are invalid and hold the NULL sentinel of their type.

#[cfg(feature = "storage_arrow")]
pub mod arrow;

use serde::{Deserialize, Serialize};

use crate::types::{ColumnValues, ElementType, Value};

/// Name of the shot number column.
pub const SHOTNUM_COLUMN: &str = "shotnum";

/// One output column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Output field name.
    pub name: String,
    /// Device the column was extracted from.
    pub device: String,
    /// Element type of the values.
    pub dtype: ElementType,
    /// Element shape; empty for scalars.
    pub shape: Vec<usize>,
    /// Values flattened row-major, `width()` elements per row.
    pub values: ColumnValues,
    /// False for rows the device did not record.
    pub valid: Vec<bool>,
}

impl Column {
    /// Elements per row.
    pub fn width(&self) -> usize {
        self.shape.iter().product::<usize>().max(1)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.valid.len()
    }

    /// True for a column with no rows.
    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }

    /// False for NULL-filled rows and rows out of range.
    pub fn is_valid(&self, row: usize) -> bool {
        self.valid.get(row).copied().unwrap_or(false)
    }

    /// Element `k` of row `row`.
    pub fn element(&self, row: usize, k: usize) -> Option<Value<'_>> {
        let width = self.width();
        if k >= width {
            return None;
        }
        self.values.get(row * width + k)
    }

    /// Number of rows holding a NULL sentinel.
    pub fn null_count(&self) -> usize {
        self.valid.iter().filter(|v| !**v).count()
    }
}

/// Shot-aligned table: one row per shot number, one column per output field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShotTable {
    shotnum: Vec<u32>,
    columns: Vec<Column>,
}

impl ShotTable {
    pub(crate) fn new(shotnum: Vec<u32>, columns: Vec<Column>) -> Self {
        Self { shotnum, columns }
    }

    /// The shot number axis, sorted ascending.
    pub fn shotnum(&self) -> &[u32] {
        &self.shotnum
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.shotnum.len()
    }

    /// True when no shot number survived the combination.
    pub fn is_empty(&self) -> bool {
        self.shotnum.is_empty()
    }

    /// Columns after the shot number axis.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in table order, starting with the shot number column.
    pub fn column_names(&self) -> Vec<&str> {
        std::iter::once(SHOTNUM_COLUMN)
            .chain(self.columns.iter().map(|c| c.name.as_str()))
            .collect()
    }

    /// Row holding shot number `shot`.
    pub fn row_of(&self, shot: u32) -> Option<usize> {
        self.shotnum.binary_search(&shot).ok()
    }
}
