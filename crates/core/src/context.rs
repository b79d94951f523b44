//! Per-block execution context.

use std::fmt;

/// Block information supplied by the host for the transaction being applied.
///
/// This is the only source of time the keeper consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockContext {
    /// Height of the block being executed.
    pub block_height: u64,

    /// Block timestamp, unix seconds.
    pub block_time: u64,
}

impl BlockContext {
    pub fn new(block_height: u64, block_time: u64) -> Self {
        Self {
            block_height,
            block_time,
        }
    }

    /// Context of the following block, `block_interval_secs` later.
    pub fn next_block(self, block_interval_secs: u64) -> Self {
        Self {
            block_height: self.block_height + 1,
            block_time: self.block_time + block_interval_secs,
        }
    }
}

impl fmt::Display for BlockContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({} @ {}s)", self.block_height, self.block_time)
    }
}
