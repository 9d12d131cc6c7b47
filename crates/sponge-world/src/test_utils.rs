//! Shared fixtures for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so downstream
//! crates can enable them via the `test-utils` feature.

use crate::block::BlockState;
use crate::id::{BlockEntityKind, BlockId, EntityId, ItemId, LevelId};
use crate::item::ItemStack;
use crate::level::{Level, Levels};
use crate::pos::BlockPos;
use crate::registry::{BlockDef, BlockRegistry, BlockRegistryBuilder, UseAction};
use std::sync::Arc;

pub const CHEST_ENTITY: BlockEntityKind = BlockEntityKind(1);
pub const SIGN_ENTITY: BlockEntityKind = BlockEntityKind(2);

/// A small registry covering every behavior the pipelines care about.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub registry: Arc<BlockRegistry>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        let mut b = BlockRegistryBuilder::new();
        let stone = b.register_block(BlockDef::solid("stone"));
        let dirt = b.register_block(BlockDef::solid("dirt"));
        let glass = b.register_block(BlockDef {
            opacity: 0,
            ..BlockDef::solid("glass")
        });
        let torch = b.register_block(BlockDef {
            opacity: 0,
            light_emission: 14,
            needs_support: true,
            ..BlockDef::solid("torch")
        });
        let chest = b.register_block(BlockDef {
            opacity: 0,
            block_entity: Some(CHEST_ENTITY),
            ..BlockDef::solid("chest")
        });
        b.register_block(BlockDef {
            opacity: 0,
            use_action: UseAction::ToggleMeta(0b1000),
            ..BlockDef::solid("lever")
        });
        b.register_block(BlockDef {
            opacity: 0,
            block_entity: Some(SIGN_ENTITY),
            needs_support: true,
            ..BlockDef::solid("sign")
        });

        let cobble = b.register_item("cobblestone", Some(stone));
        let dirt_item = b.register_item("dirt", Some(dirt));
        b.register_item("glass", Some(glass));
        let torch_item = b.register_item("torch", Some(torch));
        b.register_item("chest", Some(chest));
        b.register_item("stick", None);

        for (name, item) in [("stone", cobble), ("dirt", dirt_item), ("torch", torch_item)] {
            b.mutate_block(name, |def| def.drops = Some(item))
                .expect("fixture block registered above");
        }

        Self {
            registry: Arc::new(b.build().expect("fixture registry is valid")),
        }
    }

    fn block(&self, name: &str) -> BlockId {
        self.registry
            .block_id(name)
            .unwrap_or_else(|| panic!("fixture block {name} missing"))
    }

    pub fn item(&self, name: &str) -> ItemId {
        self.registry
            .item_id(name)
            .unwrap_or_else(|| panic!("fixture item {name} missing"))
    }

    pub fn stone(&self) -> BlockState {
        BlockState::of(self.block("stone"))
    }
    pub fn dirt(&self) -> BlockState {
        BlockState::of(self.block("dirt"))
    }
    pub fn glass(&self) -> BlockState {
        BlockState::of(self.block("glass"))
    }
    pub fn torch(&self) -> BlockState {
        BlockState::of(self.block("torch"))
    }
    pub fn chest(&self) -> BlockState {
        BlockState::of(self.block("chest"))
    }
    pub fn lever(&self) -> BlockState {
        BlockState::of(self.block("lever"))
    }
    pub fn sign(&self) -> BlockState {
        BlockState::of(self.block("sign"))
    }

    /// A fresh set of levels holding one empty level named `overworld`.
    pub fn levels_with_level(&self) -> (Levels, LevelId) {
        let mut levels = Levels::new();
        let id = levels.create_level("overworld", self.registry.clone());
        (levels, id)
    }

    /// A fresh level with a 16x16 stone floor at `y` in chunk (0, 0).
    pub fn levels_with_floor(&self, y: i32) -> (Levels, LevelId) {
        let (mut levels, id) = self.levels_with_level();
        let level = levels.level_mut(id).expect("level just created");
        fill_floor(level, y, self.stone());
        (levels, id)
    }
}

/// Fill the 16x16 layer at `y` of chunk (0, 0) with `state`, bypassing
/// every side effect.
pub fn fill_floor(level: &mut Level, y: i32, state: BlockState) {
    for x in 0..16 {
        for z in 0..16 {
            level.set_block_raw(BlockPos::new(x, y, z), state);
        }
    }
}

/// Give a player a stack in their main hand.
pub fn give(level: &mut Level, player: EntityId, item: ItemId, count: u32) {
    if let Some(data) = level.player_mut(player) {
        data.main_hand = Some(ItemStack::new(item, count));
    }
}
