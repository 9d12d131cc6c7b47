//! Loaded levels and the thread that owns them.
//!
//! A [`Level`] stores its chunks and entities in generational slot maps so
//! that handles to unloaded chunks can be detected. [`Levels`] owns every
//! loaded level and remembers the thread it was created on: all mutation
//! is expected to happen there.

use crate::block::{BlockEntity, BlockState, EntityCreationType};
use crate::chunk::LevelChunk;
use crate::entity::{Entity, EntityKind, PlayerData};
use crate::id::{BlockId, ChunkId, EntityId, LevelId};
use crate::item::ItemStack;
use crate::pos::{BlockPos, ChunkPos, SectionPos};
use crate::registry::BlockRegistry;
use slotmap::SlotMap;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::thread::ThreadId;

// ---------------------------------------------------------------------------
// Observable side channels
// ---------------------------------------------------------------------------

/// A block was told that one of its neighbors changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborUpdate {
    /// The block receiving the notification.
    pub pos: BlockPos,
    /// The block that changed.
    pub source: BlockPos,
    /// Block type at `source` after the change.
    pub source_block: BlockId,
}

/// A one-shot level event broadcast to nearby clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelEvent {
    /// Block-break particles and sound for the given (previous) state.
    BlockDestroyed { pos: BlockPos, state: BlockState },
}

/// Minimal light engine: records which positions and sections need
/// relighting. The actual propagation is outside this crate.
#[derive(Debug, Clone, Default)]
pub struct LightEngine {
    pub pending_checks: Vec<BlockPos>,
    /// Section emptiness transitions: `(section, now_empty)`.
    pub section_changes: Vec<(SectionPos, bool)>,
}

impl LightEngine {
    pub fn check_block(&mut self, pos: BlockPos) {
        self.pending_checks.push(pos);
    }

    pub fn update_section_status(&mut self, pos: BlockPos, empty: bool) {
        self.section_changes.push((SectionPos::of(pos), empty));
    }
}

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// A single loaded world.
#[derive(Debug)]
pub struct Level {
    pub name: String,
    registry: Arc<BlockRegistry>,
    chunks: SlotMap<ChunkId, LevelChunk>,
    chunk_index: HashMap<ChunkPos, ChunkId>,
    pub entities: SlotMap<EntityId, Entity>,
    pub light: LightEngine,
    pub neighbor_updates: Vec<NeighborUpdate>,
    /// Positions whose new state was sent to clients.
    pub client_updates: Vec<BlockPos>,
    pub level_events: Vec<LevelEvent>,
    pub ticking_block_entities: BTreeSet<BlockPos>,
}

impl Level {
    pub fn new(name: &str, registry: Arc<BlockRegistry>) -> Self {
        Self {
            name: name.to_string(),
            registry,
            chunks: SlotMap::with_key(),
            chunk_index: HashMap::new(),
            entities: SlotMap::with_key(),
            light: LightEngine::default(),
            neighbor_updates: Vec::new(),
            client_updates: Vec::new(),
            level_events: Vec::new(),
            ticking_block_entities: BTreeSet::new(),
        }
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    // -- Chunks --

    /// Load (or return the already loaded) chunk at `pos`.
    pub fn load_chunk(&mut self, pos: ChunkPos) -> ChunkId {
        if let Some(&id) = self.chunk_index.get(&pos) {
            return id;
        }
        let id = self.chunks.insert(LevelChunk::new(pos));
        self.chunk_index.insert(pos, id);
        id
    }

    /// Unload the chunk at `pos`. Outstanding handles to it become stale.
    pub fn unload_chunk(&mut self, pos: ChunkPos) -> Option<LevelChunk> {
        let id = self.chunk_index.remove(&pos)?;
        self.chunks.remove(id)
    }

    pub fn chunk_id(&self, pos: ChunkPos) -> Option<ChunkId> {
        self.chunk_index.get(&pos).copied()
    }

    pub fn chunk(&self, id: ChunkId) -> Option<&LevelChunk> {
        self.chunks.get(id)
    }

    pub fn chunk_mut(&mut self, id: ChunkId) -> Option<&mut LevelChunk> {
        self.chunks.get_mut(id)
    }

    /// The loaded chunk containing `pos`, if any.
    pub fn chunk_at(&self, pos: BlockPos) -> Option<&LevelChunk> {
        self.chunk_id(pos.chunk_pos()).and_then(|id| self.chunks.get(id))
    }

    pub fn chunk_at_mut(&mut self, pos: BlockPos) -> Option<&mut LevelChunk> {
        let id = self.chunk_id(pos.chunk_pos())?;
        self.chunks.get_mut(id)
    }

    pub fn loaded_chunk_count(&self) -> usize {
        self.chunks.len()
    }

    // -- Blocks --

    /// The state at `pos`. Air for unloaded chunks or out-of-bounds positions.
    pub fn get_block_state(&self, pos: BlockPos) -> BlockState {
        self.chunk_at(pos)
            .map_or(BlockState::AIR, |chunk| chunk.get_block_state(pos))
    }

    /// How much light `state` blocks when placed at `pos`.
    pub fn light_block(&self, state: BlockState, _pos: BlockPos) -> u8 {
        self.registry.opacity(state)
    }

    /// Look up the block entity at `pos`.
    pub fn get_block_entity(
        &mut self,
        pos: BlockPos,
        mode: EntityCreationType,
    ) -> Option<&BlockEntity> {
        let registry = Arc::clone(&self.registry);
        self.chunk_at_mut(pos)?.get_block_entity(pos, mode, &registry)
    }

    /// Non-creating block-entity lookup usable through a shared borrow.
    pub fn block_entity(&self, pos: BlockPos) -> Option<&BlockEntity> {
        self.chunk_at(pos)?.block_entity(pos)
    }

    /// Write a state straight into storage, bypassing every side effect.
    /// Loads the chunk and allocates the section as needed. Used for world
    /// setup and transaction restoration. Returns the replaced state, or
    /// `None` if `pos` is out of bounds.
    pub fn set_block_raw(&mut self, pos: BlockPos, state: BlockState) -> Option<BlockState> {
        let index = pos.section_index()?;
        let chunk_id = self.load_chunk(pos.chunk_pos());
        let chunk = &mut self.chunks[chunk_id];
        let (x, y, z) = pos.local();
        let old = if state.is_air() && chunk.section(index).is_none() {
            BlockState::AIR
        } else {
            chunk.get_or_create_section(index).set(x, y, z, state)
        };
        chunk.update_heightmap(pos, state);
        Some(old)
    }

    /// Record that the block at `pos` heard about a change at `source`.
    pub fn neighbor_changed(&mut self, pos: BlockPos, source: BlockPos, source_block: BlockId) {
        self.neighbor_updates.push(NeighborUpdate {
            pos,
            source,
            source_block,
        });
    }

    // -- Entities --

    pub fn spawn_entity(&mut self, entity: Entity) -> EntityId {
        self.entities.insert(entity)
    }

    /// Spawn a survival-mode player with an empty inventory.
    pub fn add_player(&mut self, name: &str, pos: BlockPos) -> EntityId {
        self.spawn_entity(Entity {
            pos,
            kind: EntityKind::Player(PlayerData::new(name)),
        })
    }

    pub fn player(&self, id: EntityId) -> Option<&PlayerData> {
        self.entities.get(id).and_then(Entity::player)
    }

    pub fn player_mut(&mut self, id: EntityId) -> Option<&mut PlayerData> {
        self.entities.get_mut(id).and_then(Entity::player_mut)
    }

    /// All dropped item entities, in spawn order.
    pub fn item_entities(&self) -> impl Iterator<Item = (&ItemStack, Option<EntityId>)> {
        self.entities.values().filter_map(|e| match &e.kind {
            EntityKind::Item { stack, source } => Some((stack, *source)),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Levels
// ---------------------------------------------------------------------------

/// Every loaded level, owned by the single thread allowed to mutate them.
#[derive(Debug)]
pub struct Levels {
    levels: SlotMap<LevelId, Level>,
    owner: ThreadId,
}

impl Default for Levels {
    fn default() -> Self {
        Self::new()
    }
}

impl Levels {
    /// Create an empty set of levels owned by the calling thread.
    pub fn new() -> Self {
        Self {
            levels: SlotMap::with_key(),
            owner: std::thread::current().id(),
        }
    }

    pub fn create_level(&mut self, name: &str, registry: Arc<BlockRegistry>) -> LevelId {
        self.levels.insert(Level::new(name, registry))
    }

    /// Unload a level. Outstanding handles into it become stale.
    pub fn unload_level(&mut self, id: LevelId) -> Option<Level> {
        self.levels.remove(id)
    }

    pub fn level(&self, id: LevelId) -> Option<&Level> {
        self.levels.get(id)
    }

    pub fn level_mut(&mut self, id: LevelId) -> Option<&mut Level> {
        self.levels.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// The thread that owns world mutation.
    pub fn owner_thread(&self) -> ThreadId {
        self.owner
    }

    pub fn is_owner_thread(&self) -> bool {
        std::thread::current().id() == self.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Fixture;

    #[test]
    fn load_chunk_is_idempotent() {
        let fixture = Fixture::new();
        let mut level = Level::new("overworld", fixture.registry.clone());
        let a = level.load_chunk(ChunkPos::new(0, 0));
        let b = level.load_chunk(ChunkPos::new(0, 0));
        assert_eq!(a, b);
        assert_eq!(level.loaded_chunk_count(), 1);
    }

    #[test]
    fn unloaded_chunk_reads_as_air() {
        let fixture = Fixture::new();
        let mut level = Level::new("overworld", fixture.registry.clone());
        let pos = BlockPos::new(3, 4, 5);
        level.set_block_raw(pos, fixture.stone());
        assert_eq!(level.get_block_state(pos), fixture.stone());
        level.unload_chunk(pos.chunk_pos());
        assert_eq!(level.get_block_state(pos), BlockState::AIR);
    }

    #[test]
    fn set_block_raw_air_does_not_allocate() {
        let fixture = Fixture::new();
        let mut level = Level::new("overworld", fixture.registry.clone());
        let pos = BlockPos::new(0, 100, 0);
        assert_eq!(level.set_block_raw(pos, BlockState::AIR), Some(BlockState::AIR));
        assert_eq!(level.chunk_at(pos).unwrap().section_count(), 0);
    }

    #[test]
    fn set_block_raw_out_of_bounds() {
        let fixture = Fixture::new();
        let mut level = Level::new("overworld", fixture.registry.clone());
        assert_eq!(level.set_block_raw(BlockPos::new(0, 300, 0), fixture.stone()), None);
    }

    #[test]
    fn levels_remember_owner_thread() {
        let levels = Levels::new();
        assert!(levels.is_owner_thread());
        let owner = levels.owner_thread();
        let other = std::thread::spawn(move || std::thread::current().id() == owner)
            .join()
            .unwrap();
        assert!(!other);
    }

    #[test]
    fn unload_level_removes_it() {
        let fixture = Fixture::new();
        let mut levels = Levels::new();
        let id = levels.create_level("nether", fixture.registry.clone());
        assert_eq!(levels.len(), 1);
        assert!(levels.unload_level(id).is_some());
        assert!(levels.level(id).is_none());
        assert!(levels.is_empty());
    }
}
