//! Row correspondence between requested shot numbers and dataset rows.
//!
//! The resolver produces a `Coverage` for one selected stream: which physical
//! rows hold which of the requested shot numbers. Single-configuration streams
//! are the `configs_per_shot == 1` case of the interleaved layout, so both go
//! through the same block arithmetic: row `N * (shot - first) + sub` for
//! sequential streams, and a strided read of the configuration's rows otherwise.

use roaring::RoaringBitmap;
use tracing::debug;

use crate::engine::selection::SelectedStream;
use crate::engine::strategy::{StrategyPolicy, StreamGeometry};
use crate::error::{ExtractError, ExtractResult};
use crate::store::{read_shotnums, read_text, Dataset, RowSelection};

/// Correspondence between requested shot numbers and dataset rows.
///
/// `shotnum` is the requested axis, `present` marks which of its entries the
/// stream covers and `index` lists the covering rows, so that
/// `shotnum[present][i]` is stored at row `index[i]`.
///
/// `index` follows the shot number axis, not the row order: on a stream whose
/// shot numbers are not increasing the rows it lists need not be ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    /// Row of each covered shot number, in axis order.
    pub index: Vec<usize>,
    /// The requested shot number axis.
    pub shotnum: Vec<u32>,
    /// Whether the stream covers the matching axis entry.
    pub present: Vec<bool>,
}

impl Coverage {
    /// Coverage of `shotnum` with no rows matched.
    pub fn empty(shotnum: &[u32]) -> Self {
        Self {
            index: Vec::new(),
            shotnum: shotnum.to_vec(),
            present: vec![false; shotnum.len()],
        }
    }

    /// Covered shot numbers in axis order.
    pub fn covered(&self) -> impl Iterator<Item = u32> + '_ {
        self.shotnum
            .iter()
            .zip(&self.present)
            .filter(|(_, present)| **present)
            .map(|(sn, _)| *sn)
    }

    /// Covered shot numbers as a set.
    pub fn covered_set(&self) -> RoaringBitmap {
        self.covered().collect()
    }

    /// Number of matched rows.
    pub fn covered_count(&self) -> usize {
        self.index.len()
    }

    /// Restrict to `keep`, which must be a subset of the covered shot numbers.
    /// The axis becomes `keep` and every entry is present.
    pub fn restrict_to(&self, keep: &RoaringBitmap) -> Coverage {
        let index = self
            .covered()
            .zip(&self.index)
            .filter(|(sn, _)| keep.contains(*sn))
            .map(|(_, row)| *row)
            .collect::<Vec<_>>();
        let shotnum: Vec<u32> = keep.iter().collect();
        let present = vec![true; shotnum.len()];
        Coverage {
            index,
            shotnum,
            present,
        }
    }
}

/// Resolve the coverage of `requested` (sorted, unique) in one selected stream.
pub fn resolve(
    selected: &SelectedStream<'_>,
    dataset: &dyn Dataset,
    requested: &[u32],
    policy: StrategyPolicy,
) -> ExtractResult<Coverage> {
    let device = selected.device();
    let field = selected.stream.shotnum_field.as_str();
    if dataset.field_layout(field).is_none() {
        return Err(ExtractError::MissingField {
            dataset: dataset.name().to_string(),
            field: field.to_string(),
        });
    }

    let row_count = dataset.row_count();
    let (Some(&min_req), Some(&max_req)) = (requested.first(), requested.last()) else {
        return Ok(Coverage::empty(requested));
    };
    if row_count == 0 {
        debug!(device, "dataset is empty");
        return Ok(Coverage::empty(requested));
    }

    let cadence = Cadence::of(selected, dataset)?;
    let geometry = StreamGeometry {
        row_count,
        configs_per_shot: cadence.configs_per_shot,
        first: dataset.first_shotnum(field)?,
        last: dataset.last_shotnum(field)?,
        increasing: selected.stream.increasing_shotnums,
    };

    let coverage = if row_count == cadence.configs_per_shot {
        // one recorded shot
        let mut coverage = Coverage::empty(requested);
        if let Ok(pos) = requested.binary_search(&geometry.first) {
            coverage.present[pos] = true;
            coverage.index.push(cadence.sub);
        }
        coverage
    } else if geometry.is_sequential() {
        debug!(device, first = geometry.first, last = geometry.last, "sequential stream");
        sequential_coverage(&geometry, cadence.sub, requested)
    } else {
        let strategy = policy.plan(&geometry, min_req, max_req);
        let rows_read = strategy.row_slice(&geometry, cadence.sub);
        debug!(device, %strategy, rows = row_count, "non-sequential stream");
        let rows = rows_read
            .to_rows(row_count)
            .map_err(|row| ExtractError::RowOutOfRange {
                dataset: dataset.name().to_string(),
                row,
                row_count,
            })?;
        let shotnums = if rows.is_empty() {
            Vec::new()
        } else {
            read_shotnums(dataset, field, &rows_read)?
        };
        match_rows(requested, &rows, &shotnums)
    };

    if let Some(tag_field) = cadence.tag_field.as_deref() {
        verify_tags(selected, dataset, tag_field, &coverage.index)?;
    }
    debug!(device, covered = coverage.covered_count(), requested = requested.len(), "resolved");
    Ok(coverage)
}

/// Block arithmetic of a sequential stream.
pub fn sequential_coverage(geometry: &StreamGeometry, sub: usize, requested: &[u32]) -> Coverage {
    let n = geometry.configs_per_shot.max(1);
    let mut coverage = Coverage::empty(requested);
    for (pos, &sn) in requested.iter().enumerate() {
        let Some(offset) = sn.checked_sub(geometry.first) else {
            continue;
        };
        let row = (offset as usize)
            .checked_mul(n)
            .and_then(|r| r.checked_add(sub));
        if let Some(row) = row.filter(|&r| r < geometry.row_count) {
            coverage.present[pos] = true;
            coverage.index.push(row);
        }
    }
    coverage
}

/// Match requested shot numbers against rows read from a dataset.
///
/// `rows[i]` stores `shotnums[i]`. A shot number recorded in several rows maps
/// to the first of them.
pub fn match_rows(requested: &[u32], rows: &[usize], shotnums: &[u32]) -> Coverage {
    let wanted: RoaringBitmap = requested.iter().copied().collect();
    let mut hits: Vec<(u32, usize)> = shotnums
        .iter()
        .zip(rows)
        .filter(|(sn, _)| wanted.contains(**sn))
        .map(|(sn, row)| (*sn, *row))
        .collect();
    hits.sort_unstable();
    hits.dedup_by_key(|(sn, _)| *sn);

    let mut coverage = Coverage::empty(requested);
    let mut hits = hits.into_iter().peekable();
    for (pos, &sn) in requested.iter().enumerate() {
        if let Some(&(hit_sn, row)) = hits.peek() {
            if hit_sn == sn {
                coverage.present[pos] = true;
                coverage.index.push(row);
                hits.next();
            }
        }
    }
    coverage
}

/// Rows per shot and the position of the selected configuration within a block.
#[derive(Debug)]
struct Cadence {
    configs_per_shot: usize,
    sub: usize,
    tag_field: Option<String>,
}

impl Cadence {
    fn single() -> Self {
        Self {
            configs_per_shot: 1,
            sub: 0,
            tag_field: None,
        }
    }

    fn of(selected: &SelectedStream<'_>, dataset: &dyn Dataset) -> ExtractResult<Self> {
        let provider = selected.provider;
        let n_configs = provider.config_names().len();
        if provider.one_config_per_stream() || n_configs <= 1 {
            return Ok(Self::single());
        }

        let device = selected.device();
        let n_datasets = provider.dataset_names().len();
        if n_datasets != 1 {
            return Err(ExtractError::layout(
                device,
                format!(
                    "{} configurations are interleaved but the device maps {} datasets",
                    n_configs, n_datasets
                ),
            ));
        }

        let tag_field = dataset
            .field_names()
            .into_iter()
            .find(|name| name.to_lowercase().contains("configuration"))
            .map(str::to_string)
            .ok_or_else(|| {
                ExtractError::layout(device, "no configuration tag field in the dataset")
            })?;

        let row_count = dataset.row_count();
        if row_count < n_configs || row_count % n_configs != 0 {
            return Err(ExtractError::layout(
                device,
                format!(
                    "{} rows do not form whole blocks of {} configurations",
                    row_count, n_configs
                ),
            ));
        }

        let tags = read_text(dataset, &tag_field, &RowSelection::all(n_configs))?;
        let matches: Vec<usize> = tags
            .iter()
            .enumerate()
            .filter(|(_, tag)| **tag == selected.config)
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [sub] => Ok(Self {
                configs_per_shot: n_configs,
                sub: *sub,
                tag_field: Some(tag_field),
            }),
            found => Err(ExtractError::layout(
                device,
                format!(
                    "configuration '{}' is tagged in {} rows of the first block, expected exactly 1",
                    selected.config,
                    found.len()
                ),
            )),
        }
    }
}

fn verify_tags(
    selected: &SelectedStream<'_>,
    dataset: &dyn Dataset,
    tag_field: &str,
    rows: &[usize],
) -> ExtractResult<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let tags = read_text(dataset, tag_field, &RowSelection::Indices(rows.to_vec()))?;
    match tags.iter().zip(rows).find(|(tag, _)| **tag != selected.config) {
        Some((tag, row)) => Err(ExtractError::layout(
            selected.device(),
            format!(
                "row {} is tagged '{}', expected configuration '{}'",
                row, tag, selected.config
            ),
        )),
        None => Ok(()),
    }
}
