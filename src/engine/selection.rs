//! Stream request validation.
//!
//! Turns the caller's list of requested devices into fully resolved streams
//! (device, configuration, adc and mapping record) before any dataset is read.

use std::collections::{HashMap, HashSet};

use crate::engine::SoftWarnings;
use crate::error::{ExtractError, ExtractResult};
use crate::mapping::{ConfigProvider, DeviceCategory, DeviceRegistry, StreamConfig};
use crate::table::SHOTNUM_COLUMN;

/// One requested record stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    /// Device name or alias.
    pub device: String,
    /// Configuration name; inferred from the active configurations when absent.
    pub config: Option<String>,
    /// Adc name for digitizers; inferred when the configuration uses exactly one.
    pub adc: Option<String>,
}

impl StreamRequest {
    /// Request for `device` with configuration and adc inferred.
    pub fn new(device: &str) -> Self {
        Self {
            device: device.to_string(),
            config: None,
            adc: None,
        }
    }

    /// Select configuration `config`.
    pub fn with_config(mut self, config: &str) -> Self {
        self.config = Some(config.to_string());
        self
    }

    /// Select adc `adc`.
    pub fn with_adc(mut self, adc: &str) -> Self {
        self.adc = Some(adc.to_string());
        self
    }
}

impl From<&str> for StreamRequest {
    fn from(device: &str) -> Self {
        StreamRequest::new(device)
    }
}

impl From<(&str, &str)> for StreamRequest {
    fn from((device, config): (&str, &str)) -> Self {
        StreamRequest::new(device).with_config(config)
    }
}

impl From<(&str, &str, &str)> for StreamRequest {
    fn from((device, config, adc): (&str, &str, &str)) -> Self {
        StreamRequest::new(device).with_config(config).with_adc(adc)
    }
}

/// A validated stream request.
#[derive(Debug, Clone)]
pub struct SelectedStream<'r> {
    /// Mapping of the requested device.
    pub provider: &'r dyn ConfigProvider,
    /// Resolved configuration name.
    pub config: String,
    /// Resolved adc, digitizers only.
    pub adc: Option<String>,
    /// Stream mapping of the configuration (and adc).
    pub stream: &'r StreamConfig,
}

impl SelectedStream<'_> {
    /// Canonical device name.
    pub fn device(&self) -> &str {
        self.provider.device_name()
    }

    /// Category of the device.
    pub fn category(&self) -> DeviceCategory {
        self.provider.category()
    }
}

/// Validate `requests` against the mapped devices.
///
/// Enforces that every device exists, that at most one stream is requested per
/// device category, and resolves the configuration (and adc) of each request.
/// Output column names must be unique across the selected streams.
pub fn validate_requests<'r>(
    registry: &'r DeviceRegistry,
    requests: &[StreamRequest],
    warnings: &mut SoftWarnings,
) -> ExtractResult<Vec<SelectedStream<'r>>> {
    if requests.is_empty() {
        return Err(ExtractError::NoStreams);
    }

    let mut categories: HashMap<DeviceCategory, &str> = HashMap::new();
    let mut selected = Vec::with_capacity(requests.len());
    for request in requests {
        let provider = registry
            .get(&request.device)
            .ok_or_else(|| ExtractError::UnknownDevice(request.device.clone()))?;

        let category = provider.category();
        if let Some(first) = categories.insert(category, provider.device_name()) {
            return Err(ExtractError::DuplicateCategory {
                category: category.to_string(),
                first: first.to_string(),
                second: provider.device_name().to_string(),
            });
        }

        let config = resolve_config(provider, request.config.as_deref(), warnings)?;
        let adc = resolve_adc(provider, &config, request.adc.as_deref(), warnings)?;
        let stream = provider
            .stream(&config, adc.as_deref())
            .ok_or_else(|| {
                ExtractError::ambiguous(
                    provider.device_name(),
                    format!("configuration '{}' has no stream mapping", config),
                )
            })?;

        selected.push(SelectedStream {
            provider,
            config,
            adc,
            stream,
        });
    }

    check_output_fields(&selected)?;
    Ok(selected)
}

fn resolve_config(
    provider: &dyn ConfigProvider,
    requested: Option<&str>,
    warnings: &mut SoftWarnings,
) -> ExtractResult<String> {
    let device = provider.device_name();
    if let Some(name) = requested {
        if !provider.config_names().contains(&name) {
            return Err(ExtractError::ambiguous(
                device,
                format!("configuration '{}' is not defined", name),
            ));
        }
        if !provider.is_active(name) {
            return Err(ExtractError::ambiguous(
                device,
                format!("configuration '{}' was not active", name),
            ));
        }
        return Ok(name.to_string());
    }

    let all = provider.config_names();
    let active = provider.active_configs();
    match active.as_slice() {
        [only] if all.len() == 1 => Ok(only.to_string()),
        [only] => {
            warnings.warn(format!(
                "No configuration specified for '{}', assuming active configuration '{}'",
                device, only
            ));
            Ok(only.to_string())
        }
        [] => Err(ExtractError::ambiguous(device, "no active configuration")),
        several => Err(ExtractError::ambiguous(
            device,
            format!(
                "several active configurations ({}), specify one",
                several.join(", ")
            ),
        )),
    }
}

fn resolve_adc(
    provider: &dyn ConfigProvider,
    config: &str,
    requested: Option<&str>,
    warnings: &mut SoftWarnings,
) -> ExtractResult<Option<String>> {
    let device = provider.device_name();
    let adcs = provider.adc_names(config);
    match (requested, adcs.as_slice()) {
        (None, []) => Ok(None),
        (Some(adc), []) => Err(ExtractError::ambiguous(
            device,
            format!("device records no adcs, got adc '{}'", adc),
        )),
        (Some(adc), known) if known.contains(&adc) => Ok(Some(adc.to_string())),
        (Some(adc), _) => Err(ExtractError::ambiguous(
            device,
            format!("adc '{}' is not used by configuration '{}'", adc, config),
        )),
        (None, [only]) => {
            warnings.warn(format!(
                "No adc specified for '{}' configuration '{}', assuming '{}'",
                device, config, only
            ));
            Ok(Some(only.to_string()))
        }
        (None, several) => Err(ExtractError::ambiguous(
            device,
            format!(
                "configuration '{}' records through several adcs ({}), specify one",
                config,
                several.join(", ")
            ),
        )),
    }
}

fn check_output_fields(selected: &[SelectedStream<'_>]) -> ExtractResult<()> {
    let mut names: HashSet<&str> = HashSet::from([SHOTNUM_COLUMN]);
    for stream in selected {
        for field in &stream.stream.fields {
            if !names.insert(field.name.as_str()) {
                return Err(ExtractError::DuplicateField {
                    device: stream.device().to_string(),
                    field: field.name.clone(),
                });
            }
        }
    }
    Ok(())
}
