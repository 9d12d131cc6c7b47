//! The innermost stage: chunk-scoped effects for one block change.

use super::{BlockPipeline, ChainOutcome, drive_block_chain, warn_fell_through};
use crate::context::PhaseContext;
use crate::cursor::PipelineCursor;
use crate::effect::{BlockChangeArgs, BlockEffect, ProcessingSideEffect};
use crate::error::{BuildError, PipelineError};
use crate::transaction::{BlockChange, ResultingTransactionBySideEffect};
use sponge_world::block::{BlockState, EntityCreationType};
use sponge_world::handle::{ChunkRef, LevelRef, SectionRef};
use sponge_world::level::Levels;
use sponge_world::pos::BlockPos;

/// Result of [`ChunkPipeline::process_change`].
///
/// The two ways of producing no state are kept apart so diagnostics can
/// tell a deliberate no-op pipeline from a chain missing its terminal
/// effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// No effects are registered (the degenerate pipeline).
    NoEffects,
    /// Every effect ran and none produced a definitive result.
    FellThrough,
    /// An effect resolved the chain. `None` means the change was a no-op.
    Resolved(Option<BlockState>),
}

impl ChunkOutcome {
    /// The resulting block state, if the chain produced one.
    pub fn state(self) -> Option<BlockState> {
        match self {
            ChunkOutcome::Resolved(state) => state,
            ChunkOutcome::NoEffects | ChunkOutcome::FellThrough => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ChunkPipeline
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ChunkPipeline {
    world: LevelRef,
    chunk: Option<ChunkRef>,
    section: Option<SectionRef>,
    transaction: Option<BlockChange>,
    effects: Vec<ResultingTransactionBySideEffect<BlockEffect>>,
    was_empty: bool,
}

impl ChunkPipeline {
    pub fn builder() -> ChunkPipelineBuilder {
        ChunkPipelineBuilder::default()
    }

    /// A pipeline with no effects and no triggering change. Processing it
    /// always reports [`ChunkOutcome::NoEffects`]. Used for positions the
    /// chunk layer should skip entirely: outside every section, or in a
    /// chunk that is not loaded.
    pub fn empty(world: LevelRef, chunk: Option<ChunkRef>) -> Self {
        Self {
            world,
            chunk,
            section: None,
            transaction: None,
            effects: Vec::new(),
            was_empty: true,
        }
    }

    /// Whether the section had only air (or did not exist) when the
    /// pipeline was built.
    pub fn was_empty(&self) -> bool {
        self.was_empty
    }

    pub fn transaction(&self) -> Option<&BlockChange> {
        self.transaction.as_ref()
    }

    pub fn is_degenerate(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn effects(&self) -> &[ResultingTransactionBySideEffect<BlockEffect>] {
        &self.effects
    }

    /// Run the chunk chain for changing `current` into `proposed` at `pos`.
    pub fn process_change(
        &self,
        ctx: &PhaseContext,
        levels: &mut Levels,
        current: BlockState,
        proposed: BlockState,
        pos: BlockPos,
        limit: u32,
    ) -> Result<ChunkOutcome, PipelineError> {
        if self.effects.is_empty() {
            return Ok(ChunkOutcome::NoEffects);
        }
        let transaction = self
            .transaction
            .as_ref()
            .ok_or(BuildError::MissingTransaction)?;
        if let Some(chunk) = self.chunk {
            chunk.resolve(levels)?;
        }

        let level = self.world.resolve_mut(levels)?;
        let opacity = level.light_block(current, pos);
        let block_entity = level
            .get_block_entity(pos, EntityCreationType::Check)
            .cloned();
        let cursor = PipelineCursor::new(current, opacity, pos, block_entity, None, limit);
        let args = BlockChangeArgs {
            new_state: proposed,
            flags: transaction.flags,
            limit,
        };

        match drive_block_chain(self, &self.effects, ctx, levels, cursor, &args)? {
            ChainOutcome::Resolved(state) => Ok(ChunkOutcome::Resolved(state)),
            ChainOutcome::FellThrough => {
                warn_fell_through("chunk", pos);
                Ok(ChunkOutcome::FellThrough)
            }
        }
    }
}

impl BlockPipeline for ChunkPipeline {
    fn server_world(&self) -> LevelRef {
        self.world
    }

    fn affected_chunk(&self) -> Option<ChunkRef> {
        self.chunk
    }

    fn affected_section(&self) -> Option<SectionRef> {
        self.section
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ChunkPipelineBuilder {
    transaction: Option<BlockChange>,
    world: Option<LevelRef>,
    chunk: Option<ChunkRef>,
    section: Option<SectionRef>,
    effects: Vec<ResultingTransactionBySideEffect<BlockEffect>>,
}

impl ChunkPipelineBuilder {
    /// Set the triggering change.
    pub fn kick_off(mut self, change: BlockChange) -> Self {
        self.transaction = Some(change);
        self
    }

    pub fn world(mut self, world: LevelRef) -> Self {
        self.world = Some(world);
        self
    }

    pub fn chunk(mut self, chunk: ChunkRef) -> Self {
        self.chunk = Some(chunk);
        self
    }

    pub fn chunk_section(mut self, section: SectionRef) -> Self {
        self.section = Some(section);
        self
    }

    pub fn add_effect<T>(mut self, effect: T) -> Self
    where
        T: ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
            + 'static,
    {
        self.effects.push(crate::effect::block_effect(effect));
        self
    }

    pub fn add_effects(
        mut self,
        effects: impl IntoIterator<Item = ResultingTransactionBySideEffect<BlockEffect>>,
    ) -> Self {
        self.effects.extend(effects);
        self
    }

    /// Finish the pipeline. Every accessor and the triggering change are
    /// mandatory; the section emptiness flag is captured here.
    pub fn build(self, levels: &Levels) -> Result<ChunkPipeline, BuildError> {
        let transaction = self.transaction.ok_or(BuildError::MissingTransaction)?;
        let world = self.world.ok_or(BuildError::MissingLevel)?;
        let chunk = self.chunk.ok_or(BuildError::MissingChunk)?;
        let section = self.section.ok_or(BuildError::MissingSection)?;
        if section.chunk != chunk || chunk.level != world.id() {
            return Err(BuildError::SectionChunkMismatch);
        }
        let was_empty = section.is_empty(levels)?;
        Ok(ChunkPipeline {
            world,
            chunk: Some(chunk),
            section: Some(section),
            transaction: Some(transaction),
            effects: self.effects,
            was_empty,
        })
    }
}
