//! Block states and block entities.

use crate::id::{BlockEntityKind, BlockId};
use crate::pos::BlockPos;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// BlockState
// ---------------------------------------------------------------------------

/// An immutable block type plus its metadata bits. Compared by value to
/// detect whether the grid actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockState {
    pub block: BlockId,
    pub meta: u8,
}

impl BlockState {
    /// The empty block. Always block id 0.
    pub const AIR: BlockState = BlockState {
        block: BlockId(0),
        meta: 0,
    };

    pub const fn new(block: BlockId, meta: u8) -> Self {
        Self { block, meta }
    }

    /// Default state (meta 0) of a block.
    pub const fn of(block: BlockId) -> Self {
        Self { block, meta: 0 }
    }

    pub fn is_air(&self) -> bool {
        self.block == BlockId(0)
    }

    /// Whether two states belong to the same block type, ignoring metadata.
    pub fn is_same_block(&self, other: &BlockState) -> bool {
        self.block == other.block
    }

    /// Return a copy with the given metadata.
    pub fn with_meta(self, meta: u8) -> Self {
        Self { meta, ..self }
    }
}

impl Default for BlockState {
    fn default() -> Self {
        Self::AIR
    }
}

// ---------------------------------------------------------------------------
// BlockEntity
// ---------------------------------------------------------------------------

/// Extra per-position data attached to certain blocks (chests, signs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEntity {
    pub kind: BlockEntityKind,
    pub pos: BlockPos,
    /// Free-form integer fields (contents count, timers, ...).
    pub data: BTreeMap<String, i64>,
}

impl BlockEntity {
    pub fn new(kind: BlockEntityKind, pos: BlockPos) -> Self {
        Self {
            kind,
            pos,
            data: BTreeMap::new(),
        }
    }

    /// Builder-style helper to set a data field.
    pub fn with_data(mut self, key: &str, value: i64) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }
}

/// How a block-entity lookup treats a missing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityCreationType {
    /// Create the block entity if the state supports one and none exists.
    Immediate,
    /// Look only. Never create.
    Check,
}
