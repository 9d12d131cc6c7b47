use crate::id::{EntityId, ItemId};
use crate::pos::BlockPos;
use serde::{Deserialize, Serialize};

/// A quantity of a single item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: ItemId,
    pub count: u32,
}

impl ItemStack {
    pub fn new(item: ItemId, count: u32) -> Self {
        Self { item, count }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Remove up to `n` items. Returns how many were actually removed.
    pub fn shrink(&mut self, n: u32) -> u32 {
        let taken = n.min(self.count);
        self.count -= taken;
        taken
    }
}

/// An item waiting to be spawned into the level as the result of a block
/// change, attributed to the entity that caused it (if any).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDrop {
    pub pos: BlockPos,
    pub stack: ItemStack,
    pub source: Option<EntityId>,
}

impl ItemDrop {
    pub fn new(pos: BlockPos, stack: ItemStack, source: Option<EntityId>) -> Self {
        Self { pos, stack, source }
    }
}
