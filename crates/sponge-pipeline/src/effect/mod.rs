//! Side effects: the units of work a pipeline chains together.
//!
//! A side effect receives the pipeline it runs in, the phase context, the
//! levels, the current cursor and the change arguments, and answers with an
//! [`EffectResult`]: either "keep going" (optionally producing drops) or a
//! definitive result that stops the chain.
//!
//! The standard chains are assembled here. Registration order is part of
//! their contract: storage is written before light, neighbors and clients
//! hear about it, and every chain ends with a terminal effect.

pub mod chunk;
pub mod interaction;
pub mod tile_entity;
pub mod world;

use crate::context::PhaseContext;
use crate::cursor::PipelineCursor;
use crate::error::{BuildError, PipelineError};
use crate::pipeline::BlockPipeline;
use crate::transaction::ResultingTransactionBySideEffect;
use sponge_world::block::BlockState;
use sponge_world::flags::BlockChangeFlags;
use sponge_world::handle::{ChunkRef, SectionRef};
use sponge_world::item::ItemDrop;
use sponge_world::level::Levels;

// ---------------------------------------------------------------------------
// EffectResult
// ---------------------------------------------------------------------------

/// What a side effect tells the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectResult<R> {
    /// No definitive result; run the next effect. Any drops produced here
    /// are folded into the cursor if it carries none yet.
    Continue { drops: Vec<ItemDrop> },
    /// Stop the chain. `None` means the change is treated as a no-op.
    Done(Option<R>),
}

impl<R> EffectResult<R> {
    pub fn pass() -> Self {
        EffectResult::Continue { drops: Vec::new() }
    }

    pub fn with_drops(drops: Vec<ItemDrop>) -> Self {
        EffectResult::Continue { drops }
    }

    pub fn done(result: R) -> Self {
        EffectResult::Done(Some(result))
    }

    pub fn null_return() -> Self {
        EffectResult::Done(None)
    }

    pub fn is_definitive(&self) -> bool {
        matches!(self, EffectResult::Done(_))
    }
}

// ---------------------------------------------------------------------------
// ProcessingSideEffect
// ---------------------------------------------------------------------------

/// One step of a pipeline.
///
/// `P` is the pipeline type the effect runs in, `C` the cursor it reads,
/// `A` the fixed argument bundle and `R` the payload of a definitive
/// result. Effects are stateless; everything they touch comes in through
/// the arguments.
pub trait ProcessingSideEffect<P: ?Sized, C, A, R> {
    /// Name recorded in the transaction ledger and in logs.
    fn name(&self) -> &'static str {
        short_type_name::<Self>()
    }

    fn process_side_effect(
        &self,
        pipeline: &P,
        ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &C,
        args: &A,
    ) -> Result<EffectResult<R>, PipelineError>;
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Arguments shared by every effect in a block-state chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockChangeArgs {
    pub new_state: BlockState,
    pub flags: BlockChangeFlags,
    pub limit: u32,
}

/// A side effect in a chunk, world or block-entity chain.
pub type BlockEffect =
    dyn ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>;

/// Wrap a block effect for registration in a pipeline.
pub fn block_effect<T>(effect: T) -> ResultingTransactionBySideEffect<BlockEffect>
where
    T: ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
        + 'static,
{
    ResultingTransactionBySideEffect::named(effect.name(), Box::new(effect))
}

pub(crate) fn affected_chunk(pipeline: &dyn BlockPipeline) -> Result<ChunkRef, PipelineError> {
    pipeline
        .affected_chunk()
        .ok_or(PipelineError::Build(BuildError::MissingChunk))
}

pub(crate) fn affected_section(pipeline: &dyn BlockPipeline) -> Result<SectionRef, PipelineError> {
    pipeline
        .affected_section()
        .ok_or(PipelineError::Build(BuildError::MissingSection))
}

// ---------------------------------------------------------------------------
// Standard chains
// ---------------------------------------------------------------------------

/// Chunk-scoped chain for any block change.
pub fn chunk_effects() -> Vec<ResultingTransactionBySideEffect<BlockEffect>> {
    vec![
        block_effect(chunk::SetBlockToChunkSection),
        block_effect(chunk::UpdateHeightMap),
        block_effect(chunk::UpdateChunkLightManager),
        block_effect(chunk::OldBlockOnReplace),
        block_effect(chunk::CheckBlockPostPlacementIsSame),
        block_effect(chunk::UpdateOrCreateBlockEntityPostPlacement),
    ]
}

fn world_propagation() -> Vec<ResultingTransactionBySideEffect<BlockEffect>> {
    vec![
        block_effect(world::UpdateLight),
        block_effect(world::CheckWorldStateIsSame),
        block_effect(world::NotifyClient),
        block_effect(world::NotifyNeighbors),
        block_effect(world::UpdateConnectingBlocks),
    ]
}

/// World-scoped chain for a plain block change.
pub fn world_effects() -> Vec<ResultingTransactionBySideEffect<BlockEffect>> {
    let mut effects = world_propagation();
    effects.push(block_effect(world::WorldBlockChangeComplete));
    effects
}

/// World-scoped chain for destroying a block. Drops are only computed when
/// `drop` is set.
pub fn destroy_effects(drop: bool) -> Vec<ResultingTransactionBySideEffect<BlockEffect>> {
    let mut effects = world_propagation();
    if drop {
        effects.push(block_effect(world::PerformBlockDropsFromDestruction));
    }
    effects.push(block_effect(world::SpawnDestructBlocks));
    effects.push(block_effect(world::WorldDestroyBlockLevelEvent));
    effects.push(block_effect(world::WorldBlockChangeComplete));
    effects
}

/// Chain for attaching a block entity at a position.
pub fn set_block_entity_effects() -> Vec<ResultingTransactionBySideEffect<BlockEffect>> {
    vec![
        block_effect(tile_entity::RemoveBlockEntityFromTickers),
        block_effect(tile_entity::SetAndRegisterBlockEntityToChunk),
        block_effect(tile_entity::RegisterBlockEntityTicker),
        block_effect(tile_entity::BlockEntityChangeComplete),
    ]
}

/// Chain for detaching the block entity at a position.
pub fn remove_block_entity_effects() -> Vec<ResultingTransactionBySideEffect<BlockEffect>> {
    vec![
        block_effect(tile_entity::RemoveBlockEntityFromTickers),
        block_effect(tile_entity::RemoveBlockEntityFromChunk),
        block_effect(tile_entity::BlockEntityChangeComplete),
    ]
}
