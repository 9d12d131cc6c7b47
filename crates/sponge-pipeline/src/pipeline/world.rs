//! World-scoped propagation layered over a chunk pipeline.

use super::{BlockPipeline, ChainOutcome, ChunkOutcome, ChunkPipeline, drive_block_chain, warn_fell_through};
use crate::context::PhaseContext;
use crate::cursor::PipelineCursor;
use crate::effect::{BlockChangeArgs, BlockEffect, ProcessingSideEffect};
use crate::error::PipelineError;
use crate::transaction::ResultingTransactionBySideEffect;
use sponge_world::block::{BlockState, EntityCreationType};
use sponge_world::flags::BlockChangeFlags;
use sponge_world::handle::{ChunkRef, LevelRef, SectionRef, StaleReference};
use sponge_world::id::EntityId;
use sponge_world::level::Levels;
use sponge_world::pos::BlockPos;

/// Result of [`WorldPipeline::process_effects_detailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectsOutcome {
    /// No world effects are registered; the chunk stage was not run.
    NoEffects,
    /// The chunk stage produced no state, so no world effect ran.
    ChunkRejected(ChunkOutcome),
    /// Every world effect ran and none was definitive.
    FellThrough,
    /// A world effect resolved the chain; `true` if it carried a state.
    Resolved(bool),
}

impl EffectsOutcome {
    pub fn happened(self) -> bool {
        matches!(self, EffectsOutcome::Resolved(true))
    }
}

// ---------------------------------------------------------------------------
// WorldPipeline
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct WorldPipeline {
    chunk_pipeline: ChunkPipeline,
    effects: Vec<ResultingTransactionBySideEffect<BlockEffect>>,
}

impl WorldPipeline {
    pub fn builder(chunk_pipeline: ChunkPipeline) -> WorldPipelineBuilder {
        WorldPipelineBuilder {
            chunk_pipeline,
            effects: Vec::new(),
        }
    }

    pub fn chunk_pipeline(&self) -> &ChunkPipeline {
        &self.chunk_pipeline
    }

    /// Whether the affected section is missing or holds only air right
    /// now, read from the section handle rather than the chunk stage's
    /// cached flag.
    pub fn was_empty(&self, levels: &Levels) -> Result<bool, StaleReference> {
        match self.chunk_pipeline.affected_section() {
            Some(section) => section.is_empty(levels),
            None => Ok(true),
        }
    }

    /// Run the chunk stage, then the world effects. Returns `true` only if
    /// a world effect produced a definitive non-null result.
    #[allow(clippy::too_many_arguments)]
    pub fn process_effects(
        &self,
        ctx: &PhaseContext,
        levels: &mut Levels,
        current: BlockState,
        proposed: BlockState,
        pos: BlockPos,
        destroyer: Option<EntityId>,
        flags: BlockChangeFlags,
        limit: u32,
    ) -> Result<bool, PipelineError> {
        self.process_effects_detailed(ctx, levels, current, proposed, pos, destroyer, flags, limit)
            .map(EffectsOutcome::happened)
    }

    /// Like [`process_effects`](Self::process_effects) but reports why
    /// nothing happened.
    #[allow(clippy::too_many_arguments)]
    pub fn process_effects_detailed(
        &self,
        ctx: &PhaseContext,
        levels: &mut Levels,
        current: BlockState,
        proposed: BlockState,
        pos: BlockPos,
        destroyer: Option<EntityId>,
        flags: BlockChangeFlags,
        limit: u32,
    ) -> Result<EffectsOutcome, PipelineError> {
        if self.effects.is_empty() {
            return Ok(EffectsOutcome::NoEffects);
        }
        let world = self.server_world();
        // Snapshot before the chunk stage gets a chance to replace it.
        let existing = world
            .resolve_mut(levels)?
            .get_block_entity(pos, EntityCreationType::Check)
            .cloned();

        let chunk_outcome =
            self.chunk_pipeline
                .process_change(ctx, levels, current, proposed, pos, limit)?;
        let Some(resulting) = chunk_outcome.state() else {
            tracing::debug!(%pos, ?chunk_outcome, "chunk stage produced no state");
            return Ok(EffectsOutcome::ChunkRejected(chunk_outcome));
        };

        let opacity = world.resolve(levels)?.light_block(resulting, pos);
        let cursor = PipelineCursor::new(resulting, opacity, pos, existing, destroyer, limit);
        let args = BlockChangeArgs {
            new_state: proposed,
            flags,
            limit,
        };
        match drive_block_chain(self, &self.effects, ctx, levels, cursor, &args)? {
            ChainOutcome::Resolved(result) => Ok(EffectsOutcome::Resolved(result.is_some())),
            ChainOutcome::FellThrough => {
                warn_fell_through("world", pos);
                Ok(EffectsOutcome::FellThrough)
            }
        }
    }
}

impl BlockPipeline for WorldPipeline {
    fn server_world(&self) -> LevelRef {
        self.chunk_pipeline.server_world()
    }

    fn affected_chunk(&self) -> Option<ChunkRef> {
        self.chunk_pipeline.affected_chunk()
    }

    fn affected_section(&self) -> Option<SectionRef> {
        self.chunk_pipeline.affected_section()
    }
}

#[derive(Debug)]
pub struct WorldPipelineBuilder {
    chunk_pipeline: ChunkPipeline,
    effects: Vec<ResultingTransactionBySideEffect<BlockEffect>>,
}

impl WorldPipelineBuilder {
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

    /// The chunk pipeline already validated every accessor, so this cannot
    /// fail.
    pub fn build(self) -> WorldPipeline {
        WorldPipeline {
            chunk_pipeline: self.chunk_pipeline,
            effects: self.effects,
        }
    }
}
