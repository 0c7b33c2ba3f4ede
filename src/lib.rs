//! # shotalign
//!
//! Shot-number correlation and extraction for multi-instrument record logs.
//!
//! Every instrument on a plasma device (motor drives, waveform generators,
//! digitizers, machine state diagnostics) appends its records to its own
//! row-oriented log, and all of them share one logical clock: the shot number.
//! This crate takes a set of requested shot numbers and one or more of those logs
//! and produces a single table aligned by shot number.
//!
//! ## Crate Structure
//!
//! - **`engine`**: The extraction pipeline. Validates stream requests, normalizes
//!   the shot number selection, resolves the rows of every stream, combines their
//!   coverage and materializes the output table. `Extractor` is the entry point.
//! - **`mapping`**: Device mappings. The `ConfigProvider` capability trait with
//!   control, digitizer and MSI implementations, the `DeviceRegistry` and TOML
//!   `DeviceManifest`s.
//! - **`store`**: The read-only backing store interface (`RecordStore`,
//!   `Dataset`) and an in-memory columnar implementation.
//! - **`table`**: The output `ShotTable` and, with `storage_arrow`, its Arrow
//!   export.
//! - **`types`**: Element types and typed value buffers.
//! - **`config`**: Engine configuration loaded with figment.
//! - **`logging`**: `tracing` subscriber setup.
//! - **`metadata`**: The `ExtractInfo` record returned with every table.
//! - **`error`**: The crate error type, `ExtractError`.
//!
//! ## Example
//!
//! ```
//! use shotalign::prelude::*;
//!
//! # fn main() -> Result<(), ExtractError> {
//! let dataset = MemoryDataset::builder("/MSI/Discharge/Discharge summary")
//!     .field("Shot number", ElementType::I32, vec![1i32, 2, 3, 4])
//!     .field("Peak current", ElementType::F64, vec![4.1, 4.3, 3.9, 4.0])
//!     .build()?;
//! let store = MemoryStore::new("run_42.hdf5").with_dataset(dataset);
//!
//! let discharge = StreamConfig::new("/MSI/Discharge/Discharge summary", "Shot number")
//!     .with_field(FieldDescriptor::scalar("peak_current", ElementType::F64, "Peak current"));
//! let registry = DeviceRegistry::new().with(MsiMap::new("Discharge", discharge))?;
//!
//! let (table, info) = Extractor::new(&store, &registry).extract(
//!     ["Discharge"],
//!     vec![2i64, 4, 9],
//!     CoverageMode::Intersection,
//! )?;
//! assert_eq!(table.shotnum(), &[2, 4]);
//! assert_eq!(info.source, "run_42.hdf5");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod metadata;
pub mod store;
pub mod table;
pub mod types;

pub use engine::{extract, CoverageMode, Extractor, ShotSelection, StreamRequest};
pub use error::{ExtractError, ExtractResult};
pub use metadata::ExtractInfo;
pub use table::ShotTable;

/// Commonly used types.
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::engine::{
        CoverageMode, Extractor, ShotArray, ShotRange, ShotSelection, StrategyPolicy,
        StreamRequest,
    };
    pub use crate::error::{ExtractError, ExtractResult};
    pub use crate::mapping::{
        ConfigProvider, ControlMap, ControlType, DeviceCategory, DeviceManifest, DeviceRegistry,
        DigitizerMap, FieldDescriptor, MsiMap, StreamConfig,
    };
    pub use crate::metadata::{ExtractInfo, StreamInfo};
    pub use crate::store::{Dataset, MemoryDataset, MemoryStore, RecordStore, RowSelection};
    pub use crate::table::{Column, ShotTable};
    pub use crate::types::{ColumnValues, ElementType, Value};
}
