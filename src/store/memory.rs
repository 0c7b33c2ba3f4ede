//! In-memory columnar record store.
//!
//! Each field is kept as one flat `ColumnValues` buffer plus its per-row width,
//! which makes slice and fancy-index reads a gather over contiguous memory.

use std::collections::BTreeMap;

use crate::error::{ExtractError, ExtractResult};
use crate::store::{Dataset, FieldLayout, RecordStore, RowSelection};
use crate::types::{ColumnValues, ElementType};

#[derive(Debug, Clone)]
struct MemoryField {
    name: String,
    layout: FieldLayout,
    values: ColumnValues,
}

/// A dataset held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryDataset {
    name: String,
    row_count: usize,
    fields: Vec<MemoryField>,
}

impl MemoryDataset {
    /// Start a dataset named `name`.
    pub fn builder(name: impl Into<String>) -> MemoryDatasetBuilder {
        MemoryDatasetBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    fn field(&self, name: &str) -> ExtractResult<&MemoryField> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| ExtractError::MissingField {
                dataset: self.name.clone(),
                field: name.to_string(),
            })
    }
}

impl Dataset for MemoryDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn row_count(&self) -> usize {
        self.row_count
    }

    fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    fn field_layout(&self, field: &str) -> Option<FieldLayout> {
        self.fields.iter().find(|f| f.name == field).map(|f| f.layout)
    }

    fn read(&self, field: &str, rows: &RowSelection) -> ExtractResult<ColumnValues> {
        let field = self.field(field)?;
        let rows = rows
            .to_rows(self.row_count)
            .map_err(|row| ExtractError::RowOutOfRange {
                dataset: self.name.clone(),
                row,
                row_count: self.row_count,
            })?;
        Ok(field.values.take_rows(&rows, field.layout.width))
    }
}

/// Builder for `MemoryDataset`; lengths are checked in `build`.
#[derive(Debug)]
pub struct MemoryDatasetBuilder {
    name: String,
    fields: Vec<MemoryField>,
}

impl MemoryDatasetBuilder {
    /// Add a scalar field.
    pub fn field(self, name: &str, dtype: ElementType, values: impl Into<ColumnValues>) -> Self {
        self.array_field(name, dtype, 1, values)
    }

    /// Add a field holding `width` elements per row, flattened row-major.
    pub fn array_field(
        mut self,
        name: &str,
        dtype: ElementType,
        width: usize,
        values: impl Into<ColumnValues>,
    ) -> Self {
        self.fields.push(MemoryField {
            name: name.to_string(),
            layout: FieldLayout { dtype, width },
            values: values.into(),
        });
        self
    }

    /// Check the fields agree on row count and types.
    pub fn build(self) -> ExtractResult<MemoryDataset> {
        let mut row_count: Option<usize> = None;
        for field in &self.fields {
            if field.layout.width == 0 {
                return Err(ExtractError::FieldType {
                    field: field.name.clone(),
                    reason: "field width must be at least 1".to_string(),
                });
            }
            let values = &field.values;
            if values.class() != field.layout.dtype.class() {
                return Err(ExtractError::FieldType {
                    field: field.name.clone(),
                    reason: format!(
                        "declared {} but given {:?} values",
                        field.layout.dtype,
                        values.class()
                    ),
                });
            }
            if values.len() % field.layout.width != 0 {
                return Err(ExtractError::FieldType {
                    field: field.name.clone(),
                    reason: format!(
                        "{} values do not divide into rows of width {}",
                        values.len(),
                        field.layout.width
                    ),
                });
            }
            let rows = values.len() / field.layout.width;
            match row_count {
                None => row_count = Some(rows),
                Some(n) if n != rows => {
                    return Err(ExtractError::FieldType {
                        field: field.name.clone(),
                        reason: format!("has {} rows, expected {}", rows, n),
                    })
                }
                Some(_) => {}
            }
        }
        Ok(MemoryDataset {
            name: self.name,
            row_count: row_count.unwrap_or(0),
            fields: self.fields,
        })
    }
}

/// A record store backed by in-memory datasets, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    source: String,
    datasets: BTreeMap<String, MemoryDataset>,
}

impl MemoryStore {
    /// Empty store identified by `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            datasets: BTreeMap::new(),
        }
    }

    /// Insert a dataset under its own name.
    pub fn insert(&mut self, dataset: MemoryDataset) -> &mut Self {
        self.datasets.insert(dataset.name.clone(), dataset);
        self
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_dataset(mut self, dataset: MemoryDataset) -> Self {
        self.insert(dataset);
        self
    }

    /// Dataset paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }
}

impl RecordStore for MemoryStore {
    fn source_id(&self) -> &str {
        &self.source
    }

    fn get(&self, path: &str) -> Option<&dyn Dataset> {
        self.datasets.get(path).map(|d| d as &dyn Dataset)
    }
}
