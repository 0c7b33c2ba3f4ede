//! Read strategy selection for non-sequential streams.
//!
//! A stream is split into cadence blocks of `configs_per_shot` rows, one block
//! per recorded shot. When the shot numbers are not sequential the resolver has to
//! read shot numbers from the dataset, and this module decides how much of the
//! column to read. The decision only looks at the stream geometry and the
//! requested extremes, so it is testable without a backing store.
//!
//! Prefix and suffix reads rely on shot numbers increasing strictly from block to
//! block: block `k` then holds a shot number of at least `first + k`, and block
//! `total - 1 - k` one of at most `last - k`. Nothing in the first and last rows
//! proves that order, so it has to be asserted by the stream's mapping
//! (`StreamConfig::increasing_shotnums`). Streams without that assertion are
//! always read in full.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::store::RowSelection;

/// What the planner needs to know about a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamGeometry {
    /// Rows in the dataset.
    pub row_count: usize,
    /// Rows per recorded shot (the number of interleaved configurations).
    pub configs_per_shot: usize,
    /// Shot number stored in the first row.
    pub first: u32,
    /// Shot number stored in the last row.
    pub last: u32,
    /// The mapping asserts strictly increasing shot numbers from block to block.
    pub increasing: bool,
}

impl StreamGeometry {
    /// Geometry of a single-configuration stream with no ordering guarantee.
    pub fn single(row_count: usize, first: u32, last: u32) -> Self {
        Self {
            row_count,
            configs_per_shot: 1,
            first,
            last,
            increasing: false,
        }
    }

    /// Assert strictly increasing block shot numbers.
    pub fn increasing(mut self) -> Self {
        self.increasing = true;
        self
    }

    /// Number of cadence blocks, counting a trailing partial block.
    pub fn total_blocks(&self) -> usize {
        self.row_count.div_ceil(self.configs_per_shot.max(1))
    }

    /// Span of shot numbers between the first and last row, inclusive.
    pub fn span(&self) -> Option<u64> {
        (self.first <= self.last).then(|| u64::from(self.last - self.first) + 1)
    }

    /// True when every block holds the shot number `first + block`.
    pub fn is_sequential(&self) -> bool {
        self.span().is_some_and(|span| {
            span.checked_mul(self.configs_per_shot as u64) == Some(self.row_count as u64)
        })
    }

    /// True when a prefix or suffix read cannot miss a requested shot number:
    /// the order is asserted and the first and last rows are consistent with it.
    fn allows_partial_reads(&self) -> bool {
        self.increasing
            && self
                .span()
                .is_some_and(|span| self.total_blocks() as u64 <= span)
    }
}

/// How much of a non-sequential stream's shot number column to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStrategy {
    /// Every block.
    Full,
    /// The first `blocks` cadence blocks.
    Prefix {
        /// Blocks to read.
        blocks: usize,
    },
    /// The last `blocks` cadence blocks.
    Suffix {
        /// Blocks to read.
        blocks: usize,
    },
}

impl ReadStrategy {
    /// Pick the cheapest read that still covers every requested shot number in
    /// `min_req..=max_req`.
    pub fn choose(geometry: &StreamGeometry, min_req: u32, max_req: u32) -> Self {
        if !geometry.allows_partial_reads() {
            return ReadStrategy::Full;
        }
        let total = geometry.total_blocks() as i64;
        let front = i64::from(max_req) - i64::from(geometry.first);
        let end = i64::from(geometry.last) - i64::from(min_req);
        if total <= 1 + front.min(end) {
            ReadStrategy::Full
        } else if front <= end {
            ReadStrategy::Prefix {
                blocks: blocks_from(front),
            }
        } else {
            ReadStrategy::Suffix {
                blocks: blocks_from(end),
            }
        }
    }

    /// Plan the rows of configuration `sub` to read.
    pub fn row_slice(&self, geometry: &StreamGeometry, sub: usize) -> RowSelection {
        let n = geometry.configs_per_shot.max(1);
        let row_count = geometry.row_count;
        match *self {
            ReadStrategy::Full => RowSelection::Slice {
                start: sub,
                stop: row_count,
                step: n,
            },
            ReadStrategy::Prefix { blocks } => RowSelection::Slice {
                start: sub,
                stop: row_count.min(blocks.saturating_mul(n)),
                step: n,
            },
            ReadStrategy::Suffix { blocks } => RowSelection::Slice {
                start: geometry.total_blocks().saturating_sub(blocks) * n + sub,
                stop: row_count,
                step: n,
            },
        }
    }
}

fn blocks_from(offset: i64) -> usize {
    usize::try_from(offset + 1).unwrap_or(0)
}

impl fmt::Display for ReadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadStrategy::Full => write!(f, "full"),
            ReadStrategy::Prefix { blocks } => write!(f, "prefix({} blocks)", blocks),
            ReadStrategy::Suffix { blocks } => write!(f, "suffix({} blocks)", blocks),
        }
    }
}

/// Caller override of the strategy choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyPolicy {
    /// Cheapest read that covers the request.
    #[default]
    Auto,
    /// Always read every block.
    Full,
    /// Read from the first block, when the stream allows it.
    Prefix,
    /// Read up to the last block, when the stream allows it.
    Suffix,
}

impl StrategyPolicy {
    /// Strategy to use for `geometry`. Forced prefix/suffix reads are sized to
    /// cover the requested extremes and fall back to a full read when block shot
    /// numbers are not known to increase strictly.
    pub fn plan(self, geometry: &StreamGeometry, min_req: u32, max_req: u32) -> ReadStrategy {
        if self == StrategyPolicy::Auto {
            return ReadStrategy::choose(geometry, min_req, max_req);
        }
        if self == StrategyPolicy::Full || !geometry.allows_partial_reads() {
            return ReadStrategy::Full;
        }
        let front = i64::from(max_req) - i64::from(geometry.first);
        let end = i64::from(geometry.last) - i64::from(min_req);
        match self {
            StrategyPolicy::Prefix => ReadStrategy::Prefix {
                blocks: blocks_from(front),
            },
            _ => ReadStrategy::Suffix {
                blocks: blocks_from(end),
            },
        }
    }
}

impl fmt::Display for StrategyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StrategyPolicy::Auto => "auto",
            StrategyPolicy::Full => "full",
            StrategyPolicy::Prefix => "prefix",
            StrategyPolicy::Suffix => "suffix",
        };
        f.write_str(label)
    }
}

impl FromStr for StrategyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(StrategyPolicy::Auto),
            "full" => Ok(StrategyPolicy::Full),
            "prefix" => Ok(StrategyPolicy::Prefix),
            "suffix" => Ok(StrategyPolicy::Suffix),
            other => Err(format!(
                "unknown read strategy '{}', expected auto, full, prefix or suffix",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_test_scales_with_configs() {
        assert!(StreamGeometry::single(10, 100, 109).is_sequential());
        assert!(!StreamGeometry::single(8, 100, 109).is_sequential());
        let interleaved = StreamGeometry {
            row_count: 30,
            configs_per_shot: 3,
            first: 1,
            last: 10,
            increasing: false,
        };
        assert!(interleaved.is_sequential());
        assert!(!StreamGeometry::single(3, 9, 2).is_sequential());
    }

    #[test]
    fn requests_near_the_start_read_a_prefix() {
        // 500 rows spread over shots 1..=1000
        let geometry = StreamGeometry::single(500, 1, 1000).increasing();
        assert_eq!(
            ReadStrategy::choose(&geometry, 3, 20),
            ReadStrategy::Prefix { blocks: 20 }
        );
    }

    #[test]
    fn requests_near_the_end_read_a_suffix() {
        let geometry = StreamGeometry::single(500, 1, 1000).increasing();
        assert_eq!(
            ReadStrategy::choose(&geometry, 990, 995),
            ReadStrategy::Suffix { blocks: 11 }
        );
    }

    #[test]
    fn wide_requests_read_everything() {
        let geometry = StreamGeometry::single(500, 1, 1000);
        assert_eq!(ReadStrategy::choose(&geometry, 300, 700), ReadStrategy::Full);
    }

    #[test]
    fn out_of_order_streams_read_everything() {
        let geometry = StreamGeometry::single(5, 50, 10).increasing();
        assert_eq!(ReadStrategy::choose(&geometry, 1, 2), ReadStrategy::Full);
        assert_eq!(StrategyPolicy::Prefix.plan(&geometry, 1, 2), ReadStrategy::Full);
        let repeats = StreamGeometry::single(20, 1, 10).increasing();
        assert_eq!(ReadStrategy::choose(&repeats, 1, 2), ReadStrategy::Full);
    }

    #[test]
    fn unasserted_order_reads_everything() {
        // first and last rows look ordered, the rows between need not be
        let geometry = StreamGeometry::single(8, 7, 20);
        for policy in [
            StrategyPolicy::Auto,
            StrategyPolicy::Prefix,
            StrategyPolicy::Suffix,
        ] {
            assert_eq!(policy.plan(&geometry, 1, 1), ReadStrategy::Full);
            assert_eq!(policy.plan(&geometry, 20, 20), ReadStrategy::Full);
        }
        assert_eq!(
            StrategyPolicy::Auto.plan(&geometry.increasing(), 1, 1),
            ReadStrategy::Prefix { blocks: 0 }
        );
    }

    #[test]
    fn requests_outside_the_stream_read_nothing() {
        let geometry = StreamGeometry::single(50, 100, 200).increasing();
        assert_eq!(
            ReadStrategy::choose(&geometry, 1, 20),
            ReadStrategy::Prefix { blocks: 0 }
        );
        assert_eq!(
            ReadStrategy::Prefix { blocks: 0 }.row_slice(&geometry, 0).to_rows(50),
            Ok(vec![])
        );
    }

    #[test]
    fn row_slices_step_over_the_cadence() {
        let geometry = StreamGeometry {
            row_count: 12,
            configs_per_shot: 3,
            first: 1,
            last: 20,
            increasing: true,
        };
        let rows = |s: ReadStrategy| s.row_slice(&geometry, 1).to_rows(12).unwrap();
        assert_eq!(rows(ReadStrategy::Full), vec![1, 4, 7, 10]);
        assert_eq!(rows(ReadStrategy::Prefix { blocks: 2 }), vec![1, 4]);
        assert_eq!(rows(ReadStrategy::Suffix { blocks: 1 }), vec![10]);
        assert_eq!(rows(ReadStrategy::Suffix { blocks: 9 }), vec![1, 4, 7, 10]);
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("Suffix".parse::<StrategyPolicy>(), Ok(StrategyPolicy::Suffix));
        assert!("sideways".parse::<StrategyPolicy>().is_err());
        assert_eq!(StrategyPolicy::default().to_string(), "auto");
    }
}
