//! The extraction engine.
//!
//! An extraction call runs five stages, each a pure function of its inputs:
//!
//! 1. `selection`: validate the requested streams against the device registry.
//! 2. `shotnum`: normalize the shot number selection.
//! 3. `resolve`: find the rows of every stream holding the requested shots,
//!    reading as little of non-sequential streams as `strategy` allows.
//! 4. `combine`: reconcile coverage across streams (intersection or union).
//! 5. `materialize`: copy, decode and NULL-fill the output table.
//!
//! Nothing is cached between calls and the backing store is only read, so one
//! store can serve concurrent extractions.

pub mod combine;
pub mod materialize;
pub mod resolve;
pub mod selection;
pub mod shotnum;
pub mod strategy;

pub use combine::{combine, Combined, CoverageMode};
pub use materialize::{materialize, StreamRows};
pub use resolve::{resolve, Coverage};
pub use selection::{validate_requests, SelectedStream, StreamRequest};
pub use shotnum::{ShotArray, ShotRange, ShotSelection};
pub use strategy::{ReadStrategy, StrategyPolicy, StreamGeometry};

use tracing::{info, info_span, warn};

use crate::config::EngineConfig;
use crate::error::{ExtractError, ExtractResult};
use crate::mapping::DeviceRegistry;
use crate::metadata::{ExtractInfo, StreamInfo};
use crate::store::{Dataset, RecordStore};
use crate::table::ShotTable;

/// Soft warnings raised during one extraction call.
///
/// Every warning is recorded; unless silenced it is also logged.
#[derive(Debug, Default)]
pub struct SoftWarnings {
    silent: bool,
    messages: Vec<String>,
}

impl SoftWarnings {
    /// Collector that logs warnings unless `silent`.
    pub fn new(silent: bool) -> Self {
        Self {
            silent,
            messages: Vec::new(),
        }
    }

    /// Record a warning.
    pub fn warn(&mut self, message: String) {
        if !self.silent {
            warn!("{}", message);
        }
        self.messages.push(message);
    }

    /// Warnings recorded so far.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Consume the collector, keeping the warnings.
    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

/// Extracts aligned tables from one backing store.
#[derive(Debug)]
pub struct Extractor<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    registry: &'a DeviceRegistry,
    config: EngineConfig,
}

impl<'a, S: RecordStore + ?Sized> Extractor<'a, S> {
    /// Extractor over `store` using the default configuration.
    pub fn new(store: &'a S, registry: &'a DeviceRegistry) -> Self {
        Self {
            store,
            registry,
            config: EngineConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Extract with the configured default coverage mode.
    pub fn extract_default<I, R>(
        &self,
        requests: I,
        selection: impl Into<ShotSelection>,
    ) -> ExtractResult<(ShotTable, ExtractInfo)>
    where
        I: IntoIterator<Item = R>,
        R: Into<StreamRequest>,
    {
        self.extract(requests, selection, self.config.extraction.default_mode)
    }

    /// Extract `requests` at the selected shot numbers into one table.
    pub fn extract<I, R>(
        &self,
        requests: I,
        selection: impl Into<ShotSelection>,
        mode: CoverageMode,
    ) -> ExtractResult<(ShotTable, ExtractInfo)>
    where
        I: IntoIterator<Item = R>,
        R: Into<StreamRequest>,
    {
        let span = info_span!("extract", source = self.store.source_id(), %mode);
        let _enter = span.enter();

        let requests: Vec<StreamRequest> = requests.into_iter().map(Into::into).collect();
        let selection = selection.into();
        let mut warnings = SoftWarnings::new(self.config.extraction.silent);

        let selected = validate_requests(self.registry, &requests, &mut warnings)?;
        let datasets = selected
            .iter()
            .map(|s| {
                self.store
                    .get(&s.stream.dataset_path)
                    .ok_or_else(|| ExtractError::MissingDataset(s.stream.dataset_path.clone()))
            })
            .collect::<ExtractResult<Vec<&dyn Dataset>>>()?;

        let requested = info_span!("normalize")
            .in_scope(|| selection.normalize(|| recorded_max(&selected, &datasets)))?;

        let policy = self.config.extraction.read_strategy;
        let coverages = selected
            .iter()
            .zip(&datasets)
            .map(|(stream, dataset)| {
                info_span!("resolve", device = stream.device(), config = %stream.config)
                    .in_scope(|| resolve(stream, *dataset, &requested, policy))
            })
            .collect::<ExtractResult<Vec<_>>>()?;

        let combined = info_span!("combine").in_scope(|| combine(&requested, coverages, mode))?;

        let rows: Vec<StreamRows<'_, '_>> = selected
            .iter()
            .zip(&datasets)
            .zip(&combined.coverages)
            .map(|((stream, dataset), coverage)| StreamRows {
                selected: stream,
                dataset: *dataset,
                coverage,
            })
            .collect();
        let table = info_span!("materialize").in_scope(|| {
            materialize(&combined.shotnum, &rows, &self.config.null_fill, &mut warnings)
        })?;

        let mut info = ExtractInfo::new(self.store.source_id(), mode);
        info.streams = rows
            .iter()
            .map(|r| StreamInfo {
                device: r.selected.device().to_string(),
                category: r.selected.category(),
                configuration: r.selected.config.clone(),
                adc: r.selected.adc.clone(),
                dataset_path: r.selected.stream.dataset_path.clone(),
                covered: r.coverage.covered_count(),
            })
            .collect();
        info.shot_count = table.len();
        info.warnings = warnings.into_messages();
        info!(rows = table.len(), columns = table.columns().len(), "extraction complete");
        Ok((table, info))
    }
}

/// Extract `requests` from `store` with the default engine configuration.
pub fn extract<S, I, R>(
    store: &S,
    registry: &DeviceRegistry,
    requests: I,
    selection: impl Into<ShotSelection>,
    mode: CoverageMode,
) -> ExtractResult<(ShotTable, ExtractInfo)>
where
    S: RecordStore + ?Sized,
    I: IntoIterator<Item = R>,
    R: Into<StreamRequest>,
{
    Extractor::new(store, registry).extract(requests, selection, mode)
}

/// Largest shot number stored in the last row of any selected stream.
fn recorded_max(selected: &[SelectedStream<'_>], datasets: &[&dyn Dataset]) -> ExtractResult<u32> {
    let mut max = 0u32;
    for (stream, dataset) in selected.iter().zip(datasets) {
        if dataset.row_count() > 0 {
            max = max.max(dataset.last_shotnum(&stream.stream.shotnum_field)?);
        }
    }
    Ok(max)
}
