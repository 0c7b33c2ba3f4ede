//! Custom error types for the extraction engine.
//!
//! This module defines the primary error type, `ExtractError`, for the entire crate.
//! Using the `thiserror` crate, it provides a centralized and consistent way to handle
//! the different kinds of failures an extraction call can run into, from a bad shot
//! number selection to a record stream whose layout does not match its mapping.
//!
//! ## Error Hierarchy
//!
//! `ExtractError` groups failures by the stage that raises them:
//!
//! - **Selection**: `InvalidSelection`, `EmptySelection`. The shot number input was
//!   malformed or filtered down to nothing. Raised by the normalizer.
//! - **Stream requests**: `NoStreams`, `UnknownDevice`, `DuplicateCategory`,
//!   `AmbiguousConfiguration`. Raised by the validator before any dataset is read.
//! - **Layout**: `StreamLayout`, `MissingDataset`, `MissingField`, `FieldType`,
//!   `DuplicateField`, `RowOutOfRange`. The backing store does not look like its
//!   mapping says it should.
//! - **Result**: `EmptyResult`. The intersection of all stream coverages is empty.
//! - **Ambient**: `Config`, `Manifest`, `Logging` and (with `storage_arrow`) `Arrow`.
//!
//! None of these are transient; nothing in the crate retries. Soft conditions (an
//! assumed configuration, a field type without a NULL fill) are reported as
//! `tracing` warnings instead of errors.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Every failure an extraction call can report.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The shot number selection is malformed.
    #[error("Invalid shot number selection: {0}")]
    InvalidSelection(String),

    /// Nothing positive was left in the selection.
    #[error("Shot number selection is empty after dropping values <= 0")]
    EmptySelection,

    /// The request list was empty.
    #[error("No record streams were requested")]
    NoStreams,

    /// The device name or alias is not in the registry.
    #[error("Device '{0}' is not among the mapped devices")]
    UnknownDevice(String),

    /// Two requested devices belong to the same category.
    #[error("Devices '{first}' and '{second}' share the category '{category}', only one stream per category may be requested")]
    DuplicateCategory {
        /// The shared category.
        category: String,
        /// Device requested first.
        first: String,
        /// Device requested second.
        second: String,
    },

    /// The configuration (or digitizer adc) could not be settled.
    #[error("Ambiguous configuration for device '{device}': {reason}")]
    AmbiguousConfiguration {
        /// Device being resolved.
        device: String,
        /// What was missing or unclear.
        reason: String,
    },

    /// The stream's rows do not follow its mapping.
    #[error("Record stream layout error for '{device}': {reason}")]
    StreamLayout {
        /// Device owning the stream.
        device: String,
        /// Which layout rule was broken.
        reason: String,
    },

    /// No requested shot number is covered by every stream.
    #[error("Requested shot numbers do not intersect the recorded shot numbers of every stream")]
    EmptyResult,

    /// Two streams produce a column of the same name.
    #[error("Output field '{field}' of device '{device}' collides with an existing column")]
    DuplicateField {
        /// Device contributing the second column.
        device: String,
        /// The colliding column name.
        field: String,
    },

    /// A mapped dataset path is absent from the store.
    #[error("Dataset '{0}' does not exist in the backing store")]
    MissingDataset(String),

    /// A mapped source field is absent from its dataset.
    #[error("Field '{field}' does not exist in dataset '{dataset}'")]
    MissingField {
        /// Dataset that was searched.
        dataset: String,
        /// The absent field.
        field: String,
    },

    /// Stored and declared types or shapes disagree.
    #[error("Field '{field}' has an incompatible type: {reason}")]
    FieldType {
        /// Output or source field name.
        field: String,
        /// The mismatch.
        reason: String,
    },

    /// A planned read reaches past the end of a dataset.
    #[error("Row {row} is out of range for dataset '{dataset}' with {row_count} rows")]
    RowOutOfRange {
        /// Dataset being read.
        dataset: String,
        /// First offending row.
        row: usize,
        /// Rows in the dataset.
        row_count: usize,
    },

    /// Layered configuration failed to load.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// A device manifest could not be read, parsed or registered.
    #[error("Device manifest error: {0}")]
    Manifest(String),

    /// The global subscriber could not be installed.
    #[error("Logging initialization failed: {0}")]
    Logging(String),

    /// Conversion into a record batch failed.
    #[cfg(feature = "storage_arrow")]
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl ExtractError {
    /// True for errors caused by the shot number selection itself.
    pub fn is_selection_error(&self) -> bool {
        matches!(
            self,
            ExtractError::InvalidSelection(_) | ExtractError::EmptySelection
        )
    }

    /// True for errors raised while validating stream requests, before any I/O.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            ExtractError::NoStreams
                | ExtractError::UnknownDevice(_)
                | ExtractError::DuplicateCategory { .. }
                | ExtractError::AmbiguousConfiguration { .. }
        )
    }

    /// True when the backing store disagrees with the device mapping.
    pub fn is_layout_error(&self) -> bool {
        matches!(
            self,
            ExtractError::StreamLayout { .. }
                | ExtractError::MissingDataset(_)
                | ExtractError::MissingField { .. }
                | ExtractError::FieldType { .. }
                | ExtractError::DuplicateField { .. }
                | ExtractError::RowOutOfRange { .. }
        )
    }

    pub(crate) fn layout(device: &str, reason: impl Into<String>) -> Self {
        ExtractError::StreamLayout {
            device: device.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn ambiguous(device: &str, reason: impl Into<String>) -> Self {
        ExtractError::AmbiguousConfiguration {
            device: device.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_selection_errors() {
        assert!(ExtractError::EmptySelection.is_selection_error());
        assert!(ExtractError::InvalidSelection("0".into()).is_selection_error());
        assert!(!ExtractError::EmptyResult.is_selection_error());
    }

    #[test]
    fn classifies_request_and_layout_errors() {
        let dup = ExtractError::DuplicateCategory {
            category: "control (motion)".into(),
            first: "6K Compumotor".into(),
            second: "NI_XZ".into(),
        };
        assert!(dup.is_request_error());
        assert!(!dup.is_layout_error());

        let layout = ExtractError::layout("Waveform", "no configuration field");
        assert!(layout.is_layout_error());
        assert!(layout.to_string().contains("Waveform"));
        assert!(layout.to_string().contains("no configuration field"));
    }

    #[test]
    fn duplicate_category_message_names_both_devices() {
        let err = ExtractError::DuplicateCategory {
            category: "control (motion)".into(),
            first: "6K Compumotor".into(),
            second: "NI_XZ".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("6K Compumotor"));
        assert!(msg.contains("NI_XZ"));
    }
}
