//! MSI (machine state information) diagnostic mappings.

use serde::{Deserialize, Serialize};

use crate::mapping::{ConfigProvider, DeviceCategory, StreamConfig};

/// Name of the single configuration every MSI diagnostic exposes.
pub const MSI_CONFIG: &str = "default";

/// Mapping of one MSI diagnostic, which has a single stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsiMap {
    /// Diagnostic name.
    pub name: String,
    /// Alternative names accepted in requests.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// The diagnostic's only stream.
    pub stream: StreamConfig,
}

impl MsiMap {
    /// Diagnostic reading `stream`, without aliases.
    pub fn new(name: &str, stream: StreamConfig) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            stream,
        }
    }

    /// Accept `alias` as another name for the diagnostic.
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }
}

impl ConfigProvider for MsiMap {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> DeviceCategory {
        DeviceCategory::Msi
    }

    fn config_names(&self) -> Vec<&str> {
        vec![MSI_CONFIG]
    }

    fn is_active(&self, config: &str) -> bool {
        config == MSI_CONFIG && self.stream.active
    }

    fn stream(&self, config: &str, _adc: Option<&str>) -> Option<&StreamConfig> {
        (config == MSI_CONFIG).then_some(&self.stream)
    }

    fn dataset_names(&self) -> Vec<&str> {
        vec![self.stream.dataset_path.as_str()]
    }

    fn aliases(&self) -> &[String] {
        &self.aliases
    }
}
