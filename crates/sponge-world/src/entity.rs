//! Entities that can cause or result from a block change.

use crate::interaction::InteractionHand;
use crate::item::ItemStack;
use crate::pos::BlockPos;
use crate::id::EntityId;

/// A player's per-hand inventory and game mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerData {
    pub name: String,
    pub creative: bool,
    pub main_hand: Option<ItemStack>,
    pub off_hand: Option<ItemStack>,
}

impl PlayerData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            creative: false,
            main_hand: None,
            off_hand: None,
        }
    }

    /// The live stack held in a hand.
    pub fn held(&self, hand: InteractionHand) -> Option<&ItemStack> {
        match hand {
            InteractionHand::MainHand => self.main_hand.as_ref(),
            InteractionHand::OffHand => self.off_hand.as_ref(),
        }
    }

    pub fn held_mut(&mut self, hand: InteractionHand) -> &mut Option<ItemStack> {
        match hand {
            InteractionHand::MainHand => &mut self.main_hand,
            InteractionHand::OffHand => &mut self.off_hand,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    Player(PlayerData),
    /// A dropped item lying in the level.
    Item {
        stack: ItemStack,
        /// The entity whose action produced this item, if any.
        source: Option<EntityId>,
    },
    Mob { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub pos: BlockPos,
    pub kind: EntityKind,
}

impl Entity {
    pub fn player(&self) -> Option<&PlayerData> {
        match &self.kind {
            EntityKind::Player(data) => Some(data),
            _ => None,
        }
    }

    pub fn player_mut(&mut self) -> Option<&mut PlayerData> {
        match &mut self.kind {
            EntityKind::Player(data) => Some(data),
            _ => None,
        }
    }
}
