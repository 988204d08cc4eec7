//! Fitness facts attached to a chromosome after a run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A basic block of the crate under test: crate-relative global id plus
/// the block's local index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BasicBlock {
    pub global_id: String,
    pub block_id: u64,
}

impl BasicBlock {
    pub fn new(global_id: impl Into<String>, block_id: u64) -> Self {
        Self {
            global_id: global_id.into(),
            block_id,
        }
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.global_id, self.block_id)
    }
}

/// Branch distance achieved per basic block. A distance of `0.0` means the
/// block was covered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coverage {
    blocks: BTreeMap<BasicBlock, f64>,
}

impl Coverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a distance for `block`, keeping the smaller one if the block
    /// was already seen.
    pub fn record(&mut self, block: BasicBlock, distance: f64) {
        self.blocks
            .entry(block)
            .and_modify(|d| *d = d.min(distance))
            .or_insert(distance);
    }

    pub fn distance(&self, block: &BasicBlock) -> Option<f64> {
        self.blocks.get(block).copied()
    }

    pub fn is_covered(&self, block: &BasicBlock) -> bool {
        self.distance(block) == Some(0.0)
    }

    /// Number of blocks reached with distance zero.
    pub fn covered_blocks(&self) -> usize {
        self.blocks.values().filter(|d| **d == 0.0).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BasicBlock, f64)> {
        self.blocks.iter().map(|(b, d)| (b, *d))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Line and region coverage percentages of a plain coverage run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LlvmCoverage {
    pub line_coverage: f64,
    pub region_coverage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_minimum() {
        let mut cov = Coverage::new();
        let block = BasicBlock::new("mycrate::foo", 2);
        cov.record(block.clone(), 0.75);
        cov.record(block.clone(), 1.5);
        assert_eq!(cov.distance(&block), Some(0.75));
        cov.record(block.clone(), 0.0);
        assert!(cov.is_covered(&block));
        assert_eq!(cov.len(), 1);
    }

    #[test]
    fn test_covered_blocks_counts_zero_distance() {
        let mut cov = Coverage::new();
        cov.record(BasicBlock::new("a", 0), 0.0);
        cov.record(BasicBlock::new("a", 1), 3.0);
        cov.record(BasicBlock::new("b", 0), 0.0);
        assert_eq!(cov.covered_blocks(), 2);
    }

    #[test]
    fn test_block_display() {
        assert_eq!(BasicBlock::new("mycrate::foo", 4).to_string(), "mycrate::foo#4");
    }
}
