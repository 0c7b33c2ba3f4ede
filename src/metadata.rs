//! Extraction metadata returned alongside every table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::CoverageMode;
use crate::mapping::DeviceCategory;

/// Describes one extraction call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractInfo {
    /// Identifier of the backing store (typically the file path).
    pub source: String,
    /// Streams in selection order.
    pub streams: Vec<StreamInfo>,
    /// Coverage mode the call ran with.
    pub coverage_mode: CoverageMode,
    /// Rows in the returned table.
    pub shot_count: usize,
    /// Soft warnings raised during the call, including silenced ones.
    pub warnings: Vec<String>,
    /// When extraction finished.
    pub extracted_at: DateTime<Utc>,
    /// Version of this crate.
    pub software_version: String,
}

/// A selected stream as it was resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamInfo {
    /// Canonical device name.
    pub device: String,
    /// Category the device was validated under.
    pub category: DeviceCategory,
    /// Configuration read.
    pub configuration: String,
    /// Adc read, digitizers only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adc: Option<String>,
    /// Dataset the rows came from.
    pub dataset_path: String,
    /// Requested shot numbers the stream recorded.
    pub covered: usize,
}

impl ExtractInfo {
    /// Info with no streams, stamped now.
    pub fn new(source: &str, coverage_mode: CoverageMode) -> Self {
        Self {
            source: source.to_string(),
            streams: Vec::new(),
            coverage_mode,
            shot_count: 0,
            warnings: Vec::new(),
            extracted_at: Utc::now(),
            software_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Stream info of `device`.
    pub fn stream(&self, device: &str) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.device == device)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ControlType;

    #[test]
    fn serializes_to_json() {
        let mut info = ExtractInfo::new("run_42.hdf5", CoverageMode::Union);
        info.streams.push(StreamInfo {
            device: "Waveform".into(),
            category: DeviceCategory::Control(ControlType::Waveform),
            configuration: "config01".into(),
            adc: None,
            dataset_path: "/Raw data + config/Waveform/Run time list".into(),
            covered: 10,
        });
        let json = info.to_json().unwrap();
        assert!(json.contains("\"coverage_mode\": \"union\""));
        assert!(json.contains("\"waveform\""));
        assert!(!json.contains("\"adc\""));

        let back: ExtractInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
        assert_eq!(back.stream("Waveform").map(|s| s.covered), Some(10));
    }
}
