//! Non-owning, generation-checked references to levels, chunks and sections.
//!
//! Pipelines never borrow world storage across their lifetime. They hold
//! these handles and resolve them against [`Levels`] at each use. A handle
//! whose target was unloaded resolves to [`StaleReference`]: the caller gets
//! a loud error, never a recycled slot.

use crate::chunk::{ChunkSection, LevelChunk};
use crate::id::{ChunkId, LevelId};
use crate::level::{Level, Levels};
use crate::pos::{BlockPos, ChunkPos};
use serde::{Deserialize, Serialize};

/// A handle outlived the storage it points into.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StaleReference {
    #[error("level {0:?} was unloaded while still referenced")]
    Level(LevelId),
    #[error("chunk {pos} ({chunk:?}) of level {level:?} was unloaded while still referenced")]
    Chunk {
        level: LevelId,
        chunk: ChunkId,
        pos: ChunkPos,
    },
}

fn stale(err: StaleReference) -> StaleReference {
    tracing::error!(error = %err, "dereferenced a stale world handle");
    err
}

// ---------------------------------------------------------------------------
// LevelRef
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelRef(pub LevelId);

impl LevelRef {
    pub fn id(self) -> LevelId {
        self.0
    }

    pub fn resolve(self, levels: &Levels) -> Result<&Level, StaleReference> {
        levels
            .level(self.0)
            .ok_or_else(|| stale(StaleReference::Level(self.0)))
    }

    pub fn resolve_mut(self, levels: &mut Levels) -> Result<&mut Level, StaleReference> {
        levels
            .level_mut(self.0)
            .ok_or_else(|| stale(StaleReference::Level(self.0)))
    }
}

// ---------------------------------------------------------------------------
// ChunkRef
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkRef {
    pub level: LevelId,
    pub chunk: ChunkId,
    pub pos: ChunkPos,
}

impl ChunkRef {
    /// Handle to the loaded chunk containing `pos`, if it is loaded.
    pub fn at(levels: &Levels, level: LevelId, pos: BlockPos) -> Result<Option<Self>, StaleReference> {
        let resolved = LevelRef(level).resolve(levels)?;
        let chunk_pos = pos.chunk_pos();
        Ok(resolved.chunk_id(chunk_pos).map(|chunk| ChunkRef {
            level,
            chunk,
            pos: chunk_pos,
        }))
    }

    pub fn level(self) -> LevelRef {
        LevelRef(self.level)
    }

    fn stale_error(self) -> StaleReference {
        stale(StaleReference::Chunk {
            level: self.level,
            chunk: self.chunk,
            pos: self.pos,
        })
    }

    pub fn resolve(self, levels: &Levels) -> Result<&LevelChunk, StaleReference> {
        let level = self.level().resolve(levels)?;
        self.resolve_in(level)
    }

    pub fn resolve_mut(self, levels: &mut Levels) -> Result<&mut LevelChunk, StaleReference> {
        let level = self.level().resolve_mut(levels)?;
        self.resolve_in_mut(level)
    }

    /// Resolve against an already resolved level.
    pub fn resolve_in(self, level: &Level) -> Result<&LevelChunk, StaleReference> {
        level.chunk(self.chunk).ok_or_else(|| self.stale_error())
    }

    pub fn resolve_in_mut(self, level: &mut Level) -> Result<&mut LevelChunk, StaleReference> {
        match level.chunk_mut(self.chunk) {
            Some(chunk) => Ok(chunk),
            None => Err(self.stale_error()),
        }
    }
}

// ---------------------------------------------------------------------------
// SectionRef
// ---------------------------------------------------------------------------

/// A section slot of a chunk. The slot may be empty: sections are created
/// lazily by the first write that needs one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionRef {
    pub chunk: ChunkRef,
    pub index: usize,
}

impl SectionRef {
    pub fn new(chunk: ChunkRef, index: usize) -> Self {
        Self { chunk, index }
    }

    /// The section, or `Ok(None)` if it has not been allocated yet.
    pub fn resolve(self, levels: &Levels) -> Result<Option<&ChunkSection>, StaleReference> {
        Ok(self.chunk.resolve(levels)?.section(self.index))
    }

    /// `true` if the section is missing or holds only air.
    pub fn is_empty(self, levels: &Levels) -> Result<bool, StaleReference> {
        Ok(self
            .resolve(levels)?
            .is_none_or(ChunkSection::has_only_air))
    }
}
