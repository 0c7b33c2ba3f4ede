//! Digitizer mappings. A configuration records through one or more adcs and each
//! adc has its own header dataset carrying the shot numbers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::mapping::{ConfigProvider, DeviceCategory, StreamConfig};

/// One digitizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitizerConfig {
    /// Whether the configuration was used during the run.
    #[serde(default)]
    pub active: bool,
    /// Stream mapping per adc name.
    pub adcs: BTreeMap<String, StreamConfig>,
}

/// Mapping of one digitizer: configurations, each with per-adc streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitizerMap {
    /// Device name.
    pub name: String,
    /// Configurations by name.
    pub configs: BTreeMap<String, DigitizerConfig>,
}

impl DigitizerMap {
    /// Digitizer without configurations.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            configs: BTreeMap::new(),
        }
    }

    /// Add (or extend) configuration `config_name` with the stream of `adc`.
    pub fn with_adc(mut self, config_name: &str, active: bool, adc: &str, stream: StreamConfig) -> Self {
        let config = self
            .configs
            .entry(config_name.to_string())
            .or_insert_with(|| DigitizerConfig {
                active,
                adcs: BTreeMap::new(),
            });
        config.active = active;
        config.adcs.insert(adc.to_string(), stream);
        self
    }
}

impl ConfigProvider for DigitizerMap {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> DeviceCategory {
        DeviceCategory::Digitizer
    }

    fn config_names(&self) -> Vec<&str> {
        self.configs.keys().map(String::as_str).collect()
    }

    fn is_active(&self, config: &str) -> bool {
        self.configs.get(config).is_some_and(|c| c.active)
    }

    fn stream(&self, config: &str, adc: Option<&str>) -> Option<&StreamConfig> {
        let config = self.configs.get(config)?;
        config.adcs.get(adc?)
    }

    fn adc_names(&self, config: &str) -> Vec<&str> {
        self.configs
            .get(config)
            .map(|c| c.adcs.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn dataset_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .configs
            .values()
            .flat_map(|c| c.adcs.values().map(|s| s.dataset_path.as_str()))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_are_looked_up_per_adc() {
        let map = DigitizerMap::new("SIS crate")
            .with_adc(
                "run_a",
                true,
                "SIS 3302",
                StreamConfig::new("/SIS crate/run_a [3302] headers", "Shot number"),
            )
            .with_adc(
                "run_a",
                true,
                "SIS 3305",
                StreamConfig::new("/SIS crate/run_a [3305] headers", "Shot number"),
            );

        assert_eq!(map.adc_names("run_a"), vec!["SIS 3302", "SIS 3305"]);
        assert!(map.stream("run_a", None).is_none());
        assert_eq!(
            map.stream("run_a", Some("SIS 3305")).map(|s| s.dataset_path.as_str()),
            Some("/SIS crate/run_a [3305] headers")
        );
        assert_eq!(map.dataset_names().len(), 2);
    }
}
