//! Control device mappings (motor drives, waveform generators, ...).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::mapping::{ConfigProvider, ControlType, DeviceCategory, StreamConfig};

/// Mapping of one control device.
///
/// When `one_config_per_dataset` is false every configuration points at the same
/// dataset and rows cycle through the configurations in a fixed order, one row
/// per configuration per shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMap {
    /// Device name.
    pub name: String,
    /// Kind of control, which sets the device category.
    pub control_type: ControlType,
    /// False when all configurations share one interleaved dataset.
    #[serde(default = "default_one_config")]
    pub one_config_per_dataset: bool,
    /// Stream mapping per configuration name, in cadence order.
    pub configs: BTreeMap<String, StreamConfig>,
}

fn default_one_config() -> bool {
    true
}

impl ControlMap {
    /// Control with one dataset per configuration and no configurations yet.
    pub fn new(name: &str, control_type: ControlType) -> Self {
        Self {
            name: name.to_string(),
            control_type,
            one_config_per_dataset: true,
            configs: BTreeMap::new(),
        }
    }

    /// Add a configuration.
    pub fn with_config(mut self, config_name: &str, stream: StreamConfig) -> Self {
        self.configs.insert(config_name.to_string(), stream);
        self
    }

    /// Mark the configurations as interleaved in one shared dataset.
    pub fn interleaved(mut self) -> Self {
        self.one_config_per_dataset = false;
        self
    }
}

impl ConfigProvider for ControlMap {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> DeviceCategory {
        DeviceCategory::Control(self.control_type)
    }

    fn config_names(&self) -> Vec<&str> {
        self.configs.keys().map(String::as_str).collect()
    }

    fn is_active(&self, config: &str) -> bool {
        self.configs.get(config).is_some_and(|c| c.active)
    }

    fn stream(&self, config: &str, _adc: Option<&str>) -> Option<&StreamConfig> {
        self.configs.get(config)
    }

    fn dataset_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .configs
            .values()
            .map(|c| c.dataset_path.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    fn one_config_per_stream(&self) -> bool {
        self.one_config_per_dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_configs_share_one_dataset() {
        let path = "/Raw data + config/Waveform/Run time list";
        let map = ControlMap::new("Waveform", ControlType::Waveform)
            .interleaved()
            .with_config("config01", StreamConfig::new(path, "Shot number"))
            .with_config("config02", StreamConfig::new(path, "Shot number").inactive());

        assert_eq!(map.dataset_names(), vec![path]);
        assert!(!map.one_config_per_stream());
        assert_eq!(map.active_configs(), vec!["config01"]);
        assert_eq!(map.category(), DeviceCategory::Control(ControlType::Waveform));
    }
}
