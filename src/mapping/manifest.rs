//! TOML device manifests.
//!
//! A manifest lists the mapped devices of one recorded file so a registry can be
//! built without code. Loading goes through figment, the same way `EngineConfig`
//! is loaded, so manifest errors carry key paths.
//!
//! ```toml
//! [[controls]]
//! name = "Waveform"
//! control_type = "waveform"
//! one_config_per_dataset = false
//!
//! [controls.configs.config01]
//! dataset_path = "/Raw data + config/Waveform/Run time list"
//! shotnum_field = "Shot number"
//! increasing_shotnums = true
//!
//! [[controls.configs.config01.fields]]
//! name = "command"
//! dtype = "text"
//! source_fields = ["Command index"]
//! command_list = ["FREQ 50000.0", "FREQ 80000.0"]
//! ```

use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ExtractError, ExtractResult};
use crate::mapping::{ControlMap, DeviceRegistry, DigitizerMap, MsiMap};

/// Device mappings as stored in a manifest file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceManifest {
    /// Control devices.
    #[serde(default)]
    pub controls: Vec<ControlMap>,
    /// Digitizers.
    #[serde(default)]
    pub digitizers: Vec<DigitizerMap>,
    /// MSI diagnostics.
    #[serde(default)]
    pub msi: Vec<MsiMap>,
}

impl DeviceManifest {
    /// Load a manifest file.
    pub fn load_from(path: &Path) -> ExtractResult<Self> {
        if !path.exists() {
            return Err(ExtractError::Manifest(format!(
                "manifest file not found: {}",
                path.display()
            )));
        }
        Ok(Figment::from(Toml::file(path)).extract()?)
    }

    /// Parse a manifest from TOML text.
    pub fn from_toml_str(text: &str) -> ExtractResult<Self> {
        Ok(Figment::from(Toml::string(text)).extract()?)
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> ExtractResult<String> {
        toml::to_string_pretty(self).map_err(|e| ExtractError::Manifest(e.to_string()))
    }

    /// Build a registry holding every listed device.
    pub fn into_registry(self) -> ExtractResult<DeviceRegistry> {
        let mut registry = DeviceRegistry::new();
        for control in self.controls {
            registry.register(control)?;
        }
        for digitizer in self.digitizers {
            registry.register(digitizer)?;
        }
        for msi in self.msi {
            registry.register(msi)?;
        }
        Ok(registry)
    }
}
