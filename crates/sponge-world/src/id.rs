use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a loaded level (world) in [`Levels`](crate::level::Levels).
    pub struct LevelId;

    /// Identifies a loaded chunk within a level.
    pub struct ChunkId;

    /// Identifies an entity (player, item, mob) within a level.
    pub struct EntityId;
}

/// Identifies a block type in the registry. Block 0 is always air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u16);

/// Identifies an item type in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u32);

/// Identifies a kind of block entity (chest, furnace, sign, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockEntityKind(pub u16);
