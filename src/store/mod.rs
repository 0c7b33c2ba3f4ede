//! Read-only access to row-oriented record datasets.
//!
//! The engine never parses a file format itself. It consumes a `RecordStore`
//! that hands out `Dataset`s by path, and every dataset answers slice or
//! fancy-index reads of one named field at a time. `MemoryStore` is the
//! in-process implementation; a format backend only has to implement the two
//! traits.

pub mod memory;

pub use memory::{MemoryDataset, MemoryDatasetBuilder, MemoryStore};

use crate::error::{ExtractError, ExtractResult};
use crate::types::{ColumnValues, ElementType};

/// Type and per-row width of one dataset field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    /// Declared element type.
    pub dtype: ElementType,
    /// Number of elements stored per row (1 for scalar fields).
    pub width: usize,
}

/// Rows to read from a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSelection {
    /// `start..stop` stepping by `step`; `stop` is clamped to the row count.
    Slice {
        /// First row.
        start: usize,
        /// One past the last row.
        stop: usize,
        /// Stride, at least 1.
        step: usize,
    },
    /// Explicit row positions, in the order they should be returned.
    Indices(Vec<usize>),
}

impl RowSelection {
    /// Every row of a dataset with `row_count` rows.
    pub fn all(row_count: usize) -> Self {
        RowSelection::Slice {
            start: 0,
            stop: row_count,
            step: 1,
        }
    }

    /// Materialize the selection into row positions.
    ///
    /// Slices are clamped to `row_count`; explicit indices are checked and the
    /// first out-of-range position is returned as the error value.
    pub fn to_rows(&self, row_count: usize) -> Result<Vec<usize>, usize> {
        match self {
            RowSelection::Slice { start, stop, step } => {
                let stop = (*stop).min(row_count);
                if *start >= stop {
                    return Ok(Vec::new());
                }
                Ok((*start..stop).step_by((*step).max(1)).collect())
            }
            RowSelection::Indices(rows) => match rows.iter().find(|&&r| r >= row_count) {
                Some(&bad) => Err(bad),
                None => Ok(rows.clone()),
            },
        }
    }
}

/// A row-oriented table of named fields.
pub trait Dataset {
    /// Path or name identifying the dataset, used in error messages.
    fn name(&self) -> &str;

    /// Number of rows.
    fn row_count(&self) -> usize;

    /// Field names in storage order.
    fn field_names(&self) -> Vec<&str>;

    /// Layout of `field`, if present.
    fn field_layout(&self, field: &str) -> Option<FieldLayout>;

    /// Read `field` at the selected rows, flattened row-major.
    fn read(&self, field: &str, rows: &RowSelection) -> ExtractResult<ColumnValues>;

    /// Shot number stored in the first row.
    fn first_shotnum(&self, field: &str) -> ExtractResult<u32> {
        self.shotnum_at(field, 0)
    }

    /// Shot number stored in the last row.
    fn last_shotnum(&self, field: &str) -> ExtractResult<u32> {
        match self.row_count() {
            0 => Err(ExtractError::RowOutOfRange {
                dataset: self.name().to_string(),
                row: 0,
                row_count: 0,
            }),
            n => self.shotnum_at(field, n - 1),
        }
    }

    /// Shot number stored in row `row`.
    fn shotnum_at(&self, field: &str, row: usize) -> ExtractResult<u32> {
        let values = read_shotnums(self, field, &RowSelection::Indices(vec![row]))?;
        values.first().copied().ok_or(ExtractError::RowOutOfRange {
            dataset: self.name().to_string(),
            row,
            row_count: self.row_count(),
        })
    }
}

/// Access to datasets by path.
pub trait RecordStore {
    /// Identifier of the backing source (typically the file path).
    fn source_id(&self) -> &str;

    /// Dataset at `path`, if present.
    fn get(&self, path: &str) -> Option<&dyn Dataset>;
}

/// Read a shot number field as `u32`.
///
/// Stored values that are negative or do not fit a `u32` read as 0, which never
/// matches a normalized (strictly positive) shot number.
pub fn read_shotnums<D: Dataset + ?Sized>(
    dataset: &D,
    field: &str,
    rows: &RowSelection,
) -> ExtractResult<Vec<u32>> {
    let values = dataset.read(field, rows)?;
    let ints = values.to_i64_vec().ok_or_else(|| ExtractError::FieldType {
        field: field.to_string(),
        reason: format!(
            "shot numbers must be stored as integers in '{}'",
            dataset.name()
        ),
    })?;
    Ok(ints
        .into_iter()
        .map(|sn| u32::try_from(sn).unwrap_or(0))
        .collect())
}

/// Read a text field, trimming the trailing NULs and blanks of fixed-width strings.
pub fn read_text<D: Dataset + ?Sized>(
    dataset: &D,
    field: &str,
    rows: &RowSelection,
) -> ExtractResult<Vec<String>> {
    match dataset.read(field, rows)? {
        ColumnValues::Text(values) => Ok(values
            .into_iter()
            .map(|s| s.trim_end_matches(['\0', ' ']).to_string())
            .collect()),
        other => Err(ExtractError::FieldType {
            field: field.to_string(),
            reason: format!("expected text, found {:?} values", other.class()),
        }),
    }
}
