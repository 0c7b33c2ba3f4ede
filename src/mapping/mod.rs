//! Device mappings consumed by the extraction engine.
//!
//! A mapping tells the engine, per device and configuration, which dataset holds
//! the recorded rows, which field carries the shot number and which output fields
//! to build from which dataset fields. Each device category describes its
//! configurations differently, so mappings are exposed through the small
//! `ConfigProvider` capability trait instead of a shared base type:
//!
//! - `ControlMap`: motor drives, waveform generators and the like. Several
//!   configurations may be interleaved in one dataset.
//! - `DigitizerMap`: each configuration records through one or more adcs.
//! - `MsiMap`: machine state diagnostics with a single configuration and optional
//!   alias names.
//!
//! `DeviceRegistry` collects providers by name and `DeviceManifest` builds one
//! from a TOML description.

pub mod control;
pub mod digitizer;
pub mod manifest;
pub mod msi;
pub mod registry;

pub use control::ControlMap;
pub use digitizer::{DigitizerConfig, DigitizerMap};
pub use manifest::DeviceManifest;
pub use msi::MsiMap;
pub use registry::DeviceRegistry;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ExtractError, ExtractResult};
use crate::types::ElementType;

/// Kind of control device. Only one control of each kind may be extracted at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    /// Motor drives.
    Motion,
    /// Function and waveform generators.
    Waveform,
    /// Power supplies.
    Power,
    /// Timing and trigger units.
    Timing,
}

/// Category used to enforce "at most one stream per category".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceCategory {
    /// A control device; each control type is its own category.
    Control(ControlType),
    /// Any digitizer.
    Digitizer,
    /// Any machine state diagnostic.
    Msi,
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceCategory::Control(kind) => write!(f, "control ({:?})", kind),
            DeviceCategory::Digitizer => write!(f, "digitizer"),
            DeviceCategory::Msi => write!(f, "msi"),
        }
    }
}

/// Describes one output column and how to fill it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Output column name.
    pub name: String,
    /// Declared element type of the column.
    pub dtype: ElementType,
    /// Element shape; empty for scalars.
    #[serde(default)]
    pub shape: Vec<usize>,
    /// Dataset fields feeding the column. Either one field holding the whole
    /// element, or one scalar field per element of the secondary axis.
    pub source_fields: Vec<String>,
    /// Symbolic values selected by the stored integer index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_list: Option<Vec<String>>,
}

impl FieldDescriptor {
    /// One element per row, copied from `source`.
    pub fn scalar(name: &str, dtype: ElementType, source: &str) -> Self {
        Self {
            name: name.to_string(),
            dtype,
            shape: Vec::new(),
            source_fields: vec![source.to_string()],
            command_list: None,
        }
    }

    /// Multi-element field filled one element per source field.
    pub fn composed(name: &str, dtype: ElementType, sources: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            dtype,
            shape: vec![sources.len()],
            source_fields: sources.iter().map(|s| s.to_string()).collect(),
            command_list: None,
        }
    }

    /// Text field decoded from a stored command index.
    pub fn command_list(name: &str, source: &str, commands: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            dtype: ElementType::Text,
            shape: Vec::new(),
            source_fields: vec![source.to_string()],
            command_list: Some(commands.iter().map(|c| c.to_string()).collect()),
        }
    }

    /// Override the element shape.
    pub fn with_shape(mut self, shape: Vec<usize>) -> Self {
        self.shape = shape;
        self
    }

    /// Number of elements per row.
    pub fn width(&self) -> usize {
        self.shape.iter().product::<usize>().max(1)
    }

    /// Check that the sources can fill the declared shape and that command
    /// lists decode scalar indices into text.
    pub fn validate(&self) -> ExtractResult<()> {
        let bad = |reason: String| ExtractError::FieldType {
            field: self.name.clone(),
            reason,
        };
        if self.name.is_empty() {
            return Err(bad("output field name is empty".to_string()));
        }
        let n_sources = self.source_fields.len();
        if n_sources != 1 && n_sources != self.width() {
            return Err(bad(format!(
                "{} source fields cannot fill an element of width {}",
                n_sources,
                self.width()
            )));
        }
        if self.command_list.is_some() {
            if self.dtype != ElementType::Text {
                return Err(bad(format!(
                    "command list fields decode to text, declared {}",
                    self.dtype
                )));
            }
            if self.width() != 1 || n_sources != 1 {
                return Err(bad(format!(
                    "command list fields decode one scalar index per row, declared shape {:?}",
                    self.shape
                )));
            }
        }
        Ok(())
    }
}

/// Mapping record of one device configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Whether the configuration was used while recording.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Path of the dataset holding the configuration's rows.
    pub dataset_path: String,
    /// Dataset field holding the shot number of each row.
    pub shotnum_field: String,
    /// Shot numbers increase strictly from block to block (gaps allowed,
    /// repeats and reordering not). Only then may the resolver read part of a
    /// non-sequential stream.
    #[serde(default)]
    pub increasing_shotnums: bool,
    /// Output columns filled from this stream.
    pub fields: Vec<FieldDescriptor>,
}

fn default_active() -> bool {
    true
}

impl StreamConfig {
    /// Active stream with no fields and no ordering guarantee.
    pub fn new(dataset_path: &str, shotnum_field: &str) -> Self {
        Self {
            active: true,
            dataset_path: dataset_path.to_string(),
            shotnum_field: shotnum_field.to_string(),
            increasing_shotnums: false,
            fields: Vec::new(),
        }
    }

    /// Append an output column.
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Mark the configuration as unused while recording.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Assert strictly increasing shot numbers.
    pub fn with_increasing_shotnums(mut self) -> Self {
        self.increasing_shotnums = true;
        self
    }

    /// Validate every field descriptor.
    pub fn validate(&self) -> ExtractResult<()> {
        self.fields.iter().try_for_each(FieldDescriptor::validate)
    }
}

/// Capability interface every device mapping provides to the engine.
pub trait ConfigProvider: fmt::Debug + Send + Sync {
    /// Name the device is registered under.
    fn device_name(&self) -> &str;

    /// Category used for the one-stream-per-category rule.
    fn category(&self) -> DeviceCategory;

    /// Names of every configuration, active or not.
    fn config_names(&self) -> Vec<&str>;

    /// Whether `config` was used while recording.
    fn is_active(&self, config: &str) -> bool;

    /// Stream mapping for `config`; digitizers also need the adc.
    fn stream(&self, config: &str, adc: Option<&str>) -> Option<&StreamConfig>;

    /// Adcs a configuration records through. Empty for devices without adcs.
    fn adc_names(&self, _config: &str) -> Vec<&str> {
        Vec::new()
    }

    /// Distinct physical datasets backing the device.
    fn dataset_names(&self) -> Vec<&str>;

    /// False when all configurations share one dataset in a fixed row cadence.
    fn one_config_per_stream(&self) -> bool {
        true
    }

    /// Alternative names the device may be requested under.
    fn aliases(&self) -> &[String] {
        &[]
    }

    /// Names of the active configurations.
    fn active_configs(&self) -> Vec<&str> {
        self.config_names()
            .into_iter()
            .filter(|name| self.is_active(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_of_scalar_and_arrays() {
        assert_eq!(FieldDescriptor::scalar("x", ElementType::F64, "x").width(), 1);
        assert_eq!(
            FieldDescriptor::composed("xyz", ElementType::F64, &["x", "y", "z"]).width(),
            3
        );
        let grid = FieldDescriptor::scalar("grid", ElementType::F32, "grid").with_shape(vec![2, 3]);
        assert_eq!(grid.width(), 6);
    }

    #[test]
    fn command_list_must_decode_to_text() {
        let mut field = FieldDescriptor::command_list("command", "Command index", &["A", "B"]);
        assert!(field.validate().is_ok());
        field.dtype = ElementType::F64;
        assert!(field.validate().is_err());
    }

    #[test]
    fn command_list_must_be_scalar() {
        let field = FieldDescriptor::command_list("command", "Command index", &["A", "B"])
            .with_shape(vec![2]);
        assert!(matches!(field.validate(), Err(ExtractError::FieldType { .. })));

        let mut composed = FieldDescriptor::composed("commands", ElementType::Text, &["a", "b"]);
        composed.command_list = Some(vec!["A".into()]);
        assert!(composed.validate().is_err());
    }

    #[test]
    fn increasing_shotnums_default_to_false() {
        let stream: StreamConfig = toml::from_str(
            "dataset_path = \"/MSI/x\"\nshotnum_field = \"Shot number\"\nfields = []\n",
        )
        .unwrap();
        assert!(!stream.increasing_shotnums);
        assert!(stream.clone().with_increasing_shotnums().increasing_shotnums);
    }

    #[test]
    fn source_count_must_match_width() {
        let field = FieldDescriptor {
            name: "xy".into(),
            dtype: ElementType::F64,
            shape: vec![3],
            source_fields: vec!["x".into(), "y".into()],
            command_list: None,
        };
        assert!(matches!(field.validate(), Err(ExtractError::FieldType { .. })));
    }

    #[test]
    fn category_display() {
        assert_eq!(
            DeviceCategory::Control(ControlType::Motion).to_string(),
            "control (Motion)"
        );
        assert_eq!(DeviceCategory::Digitizer.to_string(), "digitizer");
    }
}
