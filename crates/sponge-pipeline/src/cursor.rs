//! The value threaded through a block-change chain.

use sponge_world::block::{BlockEntity, BlockState};
use sponge_world::id::EntityId;
use sponge_world::item::ItemDrop;
use sponge_world::pos::BlockPos;

/// Where a pipeline run currently stands.
///
/// Side effects only ever see a shared reference. When a run needs to
/// carry something new forward (drops), the pipeline builds a fresh cursor
/// from the old one instead of editing it, so an effect holding "the
/// cursor as of when I ran" never sees it change underneath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineCursor {
    /// The state considered "before this step".
    pub state: BlockState,
    /// Light opacity of `state` at `pos`, computed once at pipeline entry.
    pub opacity: u8,
    pub pos: BlockPos,
    /// Block entity attached at `pos` before the change, if any.
    pub block_entity: Option<BlockEntity>,
    /// Entity responsible for the change, for drop attribution.
    pub destroyer: Option<EntityId>,
    /// Pending item drops, in the order they were produced.
    pub drops: Vec<ItemDrop>,
    /// Remaining propagation budget for nested changes.
    pub limit: u32,
}

impl PipelineCursor {
    pub fn new(
        state: BlockState,
        opacity: u8,
        pos: BlockPos,
        block_entity: Option<BlockEntity>,
        destroyer: Option<EntityId>,
        limit: u32,
    ) -> Self {
        Self::with_drops(state, opacity, pos, block_entity, destroyer, Vec::new(), limit)
    }

    pub fn with_drops(
        state: BlockState,
        opacity: u8,
        pos: BlockPos,
        block_entity: Option<BlockEntity>,
        destroyer: Option<EntityId>,
        drops: Vec<ItemDrop>,
        limit: u32,
    ) -> Self {
        Self {
            state,
            opacity,
            pos,
            block_entity,
            destroyer,
            drops,
            limit,
        }
    }

    /// A new cursor identical to this one but carrying `drops`.
    pub fn carrying_drops(self, drops: Vec<ItemDrop>) -> Self {
        Self::with_drops(
            self.state,
            self.opacity,
            self.pos,
            self.block_entity,
            self.destroyer,
            drops,
            self.limit,
        )
    }
}
