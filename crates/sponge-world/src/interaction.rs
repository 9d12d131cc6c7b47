//! Right-click interaction value types.

use crate::pos::{BlockPos, Direction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionHand {
    MainHand,
    OffHand,
}

/// Where a player's click hit a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHitResult {
    pub pos: BlockPos,
    pub face: Direction,
    /// The click originated inside the block (e.g. from within a tall plant).
    pub inside: bool,
}

impl BlockHitResult {
    pub fn new(pos: BlockPos, face: Direction) -> Self {
        Self {
            pos,
            face,
            inside: false,
        }
    }

    /// The position a block placed against this hit would occupy, or
    /// `None` when the face points past the edge of the coordinate space.
    pub fn placement_pos(&self) -> Option<BlockPos> {
        if self.inside {
            Some(self.pos)
        } else {
            self.pos.checked_offset(self.face)
        }
    }
}

/// Outcome of an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InteractionResult {
    /// The interaction happened and the hand should swing.
    Success,
    /// The interaction happened without a swing.
    Consume,
    /// Nothing happened; let the next handler try.
    #[default]
    Pass,
    /// The interaction was refused.
    Fail,
}

impl InteractionResult {
    pub fn consumes_action(self) -> bool {
        matches!(self, InteractionResult::Success | InteractionResult::Consume)
    }
}
