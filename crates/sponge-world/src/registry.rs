use crate::block::BlockState;
use crate::id::{BlockEntityKind, BlockId, ItemId};
use std::collections::HashMap;

/// What right-clicking a block does, absent any item behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UseAction {
    /// The block has no interaction; the click passes through.
    #[default]
    None,
    /// Flip the given metadata bits (levers, doors, trapdoors).
    ToggleMeta(u8),
}

/// A block type definition in the registry.
#[derive(Debug, Clone)]
pub struct BlockDef {
    pub name: String,
    /// How much light the block absorbs, 0-15.
    pub opacity: u8,
    /// Light the block emits, 0-15.
    pub light_emission: u8,
    /// The block entity kind created alongside this block, if any.
    pub block_entity: Option<BlockEntityKind>,
    /// Item dropped when the block is destroyed.
    pub drops: Option<ItemId>,
    /// Breaks when the block below it stops being solid.
    pub needs_support: bool,
    pub use_action: UseAction,
}

impl BlockDef {
    /// A plain opaque block with no extras.
    pub fn solid(name: &str) -> Self {
        Self {
            name: name.to_string(),
            opacity: 15,
            light_emission: 0,
            block_entity: None,
            drops: None,
            needs_support: false,
            use_action: UseAction::None,
        }
    }
}

/// An item type definition in the registry.
#[derive(Debug, Clone)]
pub struct ItemDef {
    pub name: String,
    /// The block placed when the item is used on a block face.
    pub places: Option<BlockId>,
}

/// Errors from registry construction and lookup.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate name: {0}")]
    DuplicateName(String),
    #[error("block {block} drops unknown item {item:?}")]
    InvalidItemRef { block: String, item: ItemId },
    #[error("item {item} places unknown block {block:?}")]
    InvalidBlockRef { item: String, block: BlockId },
}

/// Builder for constructing an immutable [`BlockRegistry`].
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug)]
pub struct BlockRegistryBuilder {
    blocks: Vec<BlockDef>,
    block_name_to_id: HashMap<String, BlockId>,
    items: Vec<ItemDef>,
    item_name_to_id: HashMap<String, ItemId>,
    duplicate: Option<String>,
}

impl Default for BlockRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockRegistryBuilder {
    /// Create a builder with `air` pre-registered as block 0.
    pub fn new() -> Self {
        let mut builder = Self {
            blocks: Vec::new(),
            block_name_to_id: HashMap::new(),
            items: Vec::new(),
            item_name_to_id: HashMap::new(),
            duplicate: None,
        };
        builder.register_block(BlockDef {
            opacity: 0,
            ..BlockDef::solid("air")
        });
        builder
    }

    /// Phase 1: Register a block type. Returns its ID.
    pub fn register_block(&mut self, def: BlockDef) -> BlockId {
        let id = BlockId(self.blocks.len() as u16);
        if self.block_name_to_id.insert(def.name.clone(), id).is_some() {
            self.duplicate.get_or_insert_with(|| def.name.clone());
        }
        self.blocks.push(def);
        id
    }

    /// Phase 1: Register an item type. Returns its ID.
    pub fn register_item(&mut self, name: &str, places: Option<BlockId>) -> ItemId {
        let id = ItemId(self.items.len() as u32);
        if self.item_name_to_id.insert(name.to_string(), id).is_some() {
            self.duplicate.get_or_insert_with(|| name.to_string());
        }
        self.items.push(ItemDef {
            name: name.to_string(),
            places,
        });
        id
    }

    /// Phase 2: Mutate an existing block definition by name.
    pub fn mutate_block<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut BlockDef),
    {
        let id = self
            .block_name_to_id
            .get(name)
            .ok_or(RegistryError::NotFound(name.to_string()))?;
        f(&mut self.blocks[id.0 as usize]);
        Ok(())
    }

    pub fn block_id(&self, name: &str) -> Option<BlockId> {
        self.block_name_to_id.get(name).copied()
    }

    pub fn item_id(&self, name: &str) -> Option<ItemId> {
        self.item_name_to_id.get(name).copied()
    }

    /// Phase 3: Finalize and build the immutable registry.
    pub fn build(self) -> Result<BlockRegistry, RegistryError> {
        if let Some(name) = self.duplicate {
            return Err(RegistryError::DuplicateName(name));
        }
        for block in &self.blocks {
            if let Some(item) = block.drops {
                if item.0 as usize >= self.items.len() {
                    return Err(RegistryError::InvalidItemRef {
                        block: block.name.clone(),
                        item,
                    });
                }
            }
        }
        for item in &self.items {
            if let Some(block) = item.places {
                if block.0 as usize >= self.blocks.len() {
                    return Err(RegistryError::InvalidBlockRef {
                        item: item.name.clone(),
                        block,
                    });
                }
            }
        }

        Ok(BlockRegistry {
            blocks: self.blocks,
            block_name_to_id: self.block_name_to_id,
            items: self.items,
            item_name_to_id: self.item_name_to_id,
        })
    }
}

/// Immutable registry. Frozen after build(). Thread-safe to share.
#[derive(Debug)]
pub struct BlockRegistry {
    blocks: Vec<BlockDef>,
    block_name_to_id: HashMap<String, BlockId>,
    items: Vec<ItemDef>,
    item_name_to_id: HashMap<String, ItemId>,
}

impl BlockRegistry {
    pub fn get_block(&self, id: BlockId) -> Option<&BlockDef> {
        self.blocks.get(id.0 as usize)
    }

    pub fn get_item(&self, id: ItemId) -> Option<&ItemDef> {
        self.items.get(id.0 as usize)
    }

    pub fn block_id(&self, name: &str) -> Option<BlockId> {
        self.block_name_to_id.get(name).copied()
    }

    pub fn item_id(&self, name: &str) -> Option<ItemId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Light opacity of a state. Unknown blocks are treated as fully opaque.
    pub fn opacity(&self, state: BlockState) -> u8 {
        self.get_block(state.block).map_or(15, |def| def.opacity)
    }

    pub fn light_emission(&self, state: BlockState) -> u8 {
        self.get_block(state.block).map_or(0, |def| def.light_emission)
    }

    pub fn block_entity_kind(&self, state: BlockState) -> Option<BlockEntityKind> {
        self.get_block(state.block).and_then(|def| def.block_entity)
    }

    pub fn needs_support(&self, state: BlockState) -> bool {
        self.get_block(state.block).is_some_and(|def| def.needs_support)
    }

    pub fn use_action(&self, state: BlockState) -> UseAction {
        self.get_block(state.block)
            .map_or(UseAction::None, |def| def.use_action)
    }

    pub fn drops(&self, state: BlockState) -> Option<ItemId> {
        self.get_block(state.block).and_then(|def| def.drops)
    }
}
