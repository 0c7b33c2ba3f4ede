//! Registry of mapped devices.
//!
//! Central lookup of `ConfigProvider`s by device name or alias. The engine only
//! reads from it; a registry is typically built once per file mapping and shared
//! by every extraction call over that file.

use crate::error::{ExtractError, ExtractResult};
use crate::mapping::ConfigProvider;

/// Every mapped device, in registration order.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Box<dyn ConfigProvider>>,
}

impl DeviceRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device. Names and aliases must be unique across the registry.
    pub fn register<P: ConfigProvider + 'static>(&mut self, provider: P) -> ExtractResult<()> {
        let mut names = vec![provider.device_name()];
        names.extend(provider.aliases().iter().map(String::as_str));
        if let Some(taken) = names.iter().find(|n| self.get(n).is_some()) {
            return Err(ExtractError::Manifest(format!(
                "device name '{}' is registered twice",
                taken
            )));
        }
        for stream in provider
            .config_names()
            .into_iter()
            .flat_map(|c| configured_streams(&provider, c))
        {
            stream.validate()?;
        }
        self.devices.push(Box::new(provider));
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<P: ConfigProvider + 'static>(mut self, provider: P) -> ExtractResult<Self> {
        self.register(provider)?;
        Ok(self)
    }

    /// Look a device up by name or alias.
    pub fn get(&self, name: &str) -> Option<&dyn ConfigProvider> {
        self.devices
            .iter()
            .find(|d| d.device_name() == name || d.aliases().iter().any(|a| a == name))
            .map(|d| d.as_ref())
    }

    /// Canonical names in registration order.
    pub fn device_names(&self) -> Vec<&str> {
        self.devices.iter().map(|d| d.device_name()).collect()
    }

    /// True when no device is registered.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }
}

fn configured_streams<'a, P: ConfigProvider>(
    provider: &'a P,
    config: &'a str,
) -> Vec<&'a crate::mapping::StreamConfig> {
    let adcs = provider.adc_names(config);
    if adcs.is_empty() {
        provider.stream(config, None).into_iter().collect()
    } else {
        adcs.into_iter()
            .filter_map(|adc| provider.stream(config, Some(adc)))
            .collect()
    }
}
