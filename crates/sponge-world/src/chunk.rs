//! Chunk columns and their lazily-allocated 16x16x16 sections.

use crate::block::{BlockEntity, BlockState, EntityCreationType};
use crate::pos::{BlockPos, ChunkPos, MIN_BUILD_HEIGHT, SECTION_COUNT};
use crate::registry::BlockRegistry;
use std::collections::BTreeMap;

const SECTION_VOLUME: usize = 16 * 16 * 16;

// ---------------------------------------------------------------------------
// ChunkSection
// ---------------------------------------------------------------------------

/// Dense storage for one 16x16x16 cube of block states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSection {
    states: Vec<BlockState>,
    non_air: u16,
}

impl Default for ChunkSection {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkSection {
    /// A section filled with air.
    pub fn new() -> Self {
        Self {
            states: vec![BlockState::AIR; SECTION_VOLUME],
            non_air: 0,
        }
    }

    fn index(x: usize, y: usize, z: usize) -> usize {
        (y << 8) | (z << 4) | x
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> BlockState {
        self.states[Self::index(x, y, z)]
    }

    /// Store a state and return the one it replaced.
    pub fn set(&mut self, x: usize, y: usize, z: usize, state: BlockState) -> BlockState {
        let slot = &mut self.states[Self::index(x, y, z)];
        let old = std::mem::replace(slot, state);
        match (old.is_air(), state.is_air()) {
            (true, false) => self.non_air += 1,
            (false, true) => self.non_air -= 1,
            _ => {}
        }
        old
    }

    pub fn has_only_air(&self) -> bool {
        self.non_air == 0
    }

    pub fn non_air_count(&self) -> u16 {
        self.non_air
    }
}

// ---------------------------------------------------------------------------
// Heightmap
// ---------------------------------------------------------------------------

/// Per-column height of the topmost non-air block, stored as `y + 1`
/// (`MIN_BUILD_HEIGHT` for an empty column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heightmap {
    heights: Vec<i32>,
}

impl Default for Heightmap {
    fn default() -> Self {
        Self {
            heights: vec![MIN_BUILD_HEIGHT; 256],
        }
    }
}

impl Heightmap {
    pub fn height(&self, pos: BlockPos) -> i32 {
        self.heights[pos.column_index()]
    }

    pub(crate) fn set_height(&mut self, pos: BlockPos, height: i32) {
        self.heights[pos.column_index()] = height;
    }
}

// ---------------------------------------------------------------------------
// LevelChunk
// ---------------------------------------------------------------------------

/// A full-height chunk column: sections, block entities and heightmap.
#[derive(Debug, Clone)]
pub struct LevelChunk {
    pos: ChunkPos,
    sections: Vec<Option<ChunkSection>>,
    block_entities: BTreeMap<BlockPos, BlockEntity>,
    heightmap: Heightmap,
    /// Set when the chunk differs from what was last saved.
    pub unsaved: bool,
}

impl LevelChunk {
    /// An empty chunk with no sections allocated.
    pub fn new(pos: ChunkPos) -> Self {
        Self {
            pos,
            sections: vec![None; SECTION_COUNT],
            block_entities: BTreeMap::new(),
            heightmap: Heightmap::default(),
            unsaved: false,
        }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    // -- Sections --

    pub fn section(&self, index: usize) -> Option<&ChunkSection> {
        self.sections.get(index).and_then(Option::as_ref)
    }

    pub fn section_mut(&mut self, index: usize) -> Option<&mut ChunkSection> {
        self.sections.get_mut(index).and_then(Option::as_mut)
    }

    /// Return the section, allocating an air-filled one if absent.
    ///
    /// # Panics
    ///
    /// Panics if `index >= SECTION_COUNT`. Callers derive the index from
    /// [`BlockPos::section_index`], which is bounds-checked.
    pub fn get_or_create_section(&mut self, index: usize) -> &mut ChunkSection {
        self.sections[index].get_or_insert_with(ChunkSection::new)
    }

    /// Number of allocated sections.
    pub fn section_count(&self) -> usize {
        self.sections.iter().filter(|s| s.is_some()).count()
    }

    // -- Blocks --

    /// The state at `pos`. Air when the section is missing or out of bounds.
    pub fn get_block_state(&self, pos: BlockPos) -> BlockState {
        let Some(index) = pos.section_index() else {
            return BlockState::AIR;
        };
        let (x, y, z) = pos.local();
        self.section(index)
            .map_or(BlockState::AIR, |section| section.get(x, y, z))
    }

    pub fn heightmap(&self) -> &Heightmap {
        &self.heightmap
    }

    /// Update the column height after `state` was written at `pos`.
    /// Returns `true` if the column height changed.
    pub fn update_heightmap(&mut self, pos: BlockPos, state: BlockState) -> bool {
        let current = self.heightmap.height(pos);
        let new_height = if !state.is_air() {
            current.max(pos.y + 1)
        } else if pos.y + 1 == current {
            let mut y = pos.y - 1;
            while y >= MIN_BUILD_HEIGHT
                && self
                    .get_block_state(BlockPos::new(pos.x, y, pos.z))
                    .is_air()
            {
                y -= 1;
            }
            y + 1
        } else {
            current
        };
        if new_height != current {
            self.heightmap.set_height(pos, new_height);
            true
        } else {
            false
        }
    }

    // -- Block entities --

    /// Look up the block entity at `pos` without creating one.
    pub fn block_entity(&self, pos: BlockPos) -> Option<&BlockEntity> {
        self.block_entities.get(&pos)
    }

    /// Look up the block entity at `pos`, creating it from the registry when
    /// `mode` is [`EntityCreationType::Immediate`] and the current state
    /// supports one.
    pub fn get_block_entity(
        &mut self,
        pos: BlockPos,
        mode: EntityCreationType,
        registry: &BlockRegistry,
    ) -> Option<&BlockEntity> {
        if mode == EntityCreationType::Immediate && !self.block_entities.contains_key(&pos) {
            let state = self.get_block_state(pos);
            if let Some(kind) = registry.block_entity_kind(state) {
                self.block_entities.insert(pos, BlockEntity::new(kind, pos));
            }
        }
        self.block_entities.get(&pos)
    }

    /// Attach a block entity at its position, returning the one it replaced.
    pub fn set_block_entity(&mut self, entity: BlockEntity) -> Option<BlockEntity> {
        self.block_entities.insert(entity.pos, entity)
    }

    pub fn remove_block_entity(&mut self, pos: BlockPos) -> Option<BlockEntity> {
        self.block_entities.remove(&pos)
    }

    pub fn block_entities(&self) -> impl Iterator<Item = &BlockEntity> {
        self.block_entities.values()
    }
}
