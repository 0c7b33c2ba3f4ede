//! Combining per-stream coverages into the final shot number axis.

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::engine::resolve::Coverage;
use crate::error::{ExtractError, ExtractResult};

/// How partial coverage across streams is reconciled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageMode {
    /// Keep only shot numbers covered by every stream.
    #[default]
    Intersection,
    /// Keep every requested shot number and NULL-fill uncovered rows.
    Union,
}

impl fmt::Display for CoverageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageMode::Intersection => f.write_str("intersection"),
            CoverageMode::Union => f.write_str("union"),
        }
    }
}

impl FromStr for CoverageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "intersection" => Ok(CoverageMode::Intersection),
            "union" => Ok(CoverageMode::Union),
            other => Err(format!(
                "unknown coverage mode '{}', expected intersection or union",
                other
            )),
        }
    }
}

/// Final shot number axis and the coverage of each stream along it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combined {
    /// The output shot number axis.
    pub shotnum: Vec<u32>,
    /// Per-stream coverage, restricted to the axis, in request order.
    pub coverages: Vec<Coverage>,
}

/// Reconcile the coverages of all selected streams.
///
/// Every coverage must be laid over `requested`.
pub fn combine(
    requested: &[u32],
    coverages: Vec<Coverage>,
    mode: CoverageMode,
) -> ExtractResult<Combined> {
    match mode {
        CoverageMode::Union => Ok(Combined {
            shotnum: requested.to_vec(),
            coverages,
        }),
        CoverageMode::Intersection => {
            let mut common: RoaringBitmap = requested.iter().copied().collect();
            for coverage in &coverages {
                common &= coverage.covered_set();
            }
            if common.is_empty() {
                return Err(ExtractError::EmptyResult);
            }
            let coverages = coverages.iter().map(|c| c.restrict_to(&common)).collect();
            Ok(Combined {
                shotnum: common.iter().collect(),
                coverages,
            })
        }
    }
}
