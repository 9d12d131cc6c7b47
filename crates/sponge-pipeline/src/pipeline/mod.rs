//! Pipelines: ordered side-effect chains at chunk, world, block-entity
//! and interaction granularity.
//!
//! Every block pipeline drives its chain the same way. For each effect a
//! transaction scope is opened, the effect runs against the current cursor,
//! and a definitive result ends the run immediately. Otherwise the first
//! non-empty set of drops an effect produces is carried forward on a fresh
//! cursor; later drops never replace it.

pub mod chunk;
pub mod interaction;
pub mod tile_entity;
pub mod world;

pub use chunk::{ChunkOutcome, ChunkPipeline, ChunkPipelineBuilder};
pub use interaction::{
    InteractionEffect, InteractionPipeline, UseBlockArgs, UseBlockPipeline, UseItemOnBlockArgs,
    UseItemOnBlockPipeline,
};
pub use tile_entity::{TileEntityPipeline, TileEntityPipelineBuilder};
pub use world::{EffectsOutcome, WorldPipeline, WorldPipelineBuilder};

use crate::context::PhaseContext;
use crate::cursor::PipelineCursor;
use crate::effect::{BlockChangeArgs, BlockEffect, EffectResult};
use crate::error::PipelineError;
use crate::transaction::ResultingTransactionBySideEffect;
use sponge_world::block::BlockState;
use sponge_world::handle::{ChunkRef, LevelRef, SectionRef};
use sponge_world::level::Levels;
use sponge_world::pos::BlockPos;

/// Introspection shared by chunk, world and block-entity pipelines. This is
/// what block side effects see of the pipeline they run in.
pub trait BlockPipeline {
    fn server_world(&self) -> LevelRef;

    /// `None` only for the degenerate pipeline over an unloaded chunk.
    fn affected_chunk(&self) -> Option<ChunkRef>;

    /// `None` when the position lies outside every section. A present
    /// handle may still resolve to no section until the first write.
    fn affected_section(&self) -> Option<SectionRef>;
}

/// How a chain run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChainOutcome<R> {
    /// An effect returned a definitive result.
    Resolved(Option<R>),
    /// Every effect ran and none was definitive.
    FellThrough,
}

pub(crate) fn drive_block_chain(
    pipeline: &(dyn BlockPipeline + 'static),
    effects: &[ResultingTransactionBySideEffect<BlockEffect>],
    ctx: &PhaseContext,
    levels: &mut Levels,
    mut cursor: PipelineCursor,
    args: &BlockChangeArgs,
) -> Result<ChainOutcome<BlockState>, PipelineError> {
    for effect in effects {
        let _scope = ctx.transactor().push_effect(effect);
        tracing::trace!(effect = effect.name(), pos = %cursor.pos, "running side effect");
        match effect
            .effect()
            .process_side_effect(pipeline, ctx, levels, &cursor, args)?
        {
            EffectResult::Done(result) => {
                tracing::debug!(
                    effect = effect.name(),
                    pos = %cursor.pos,
                    resolved = result.is_some(),
                    "chain resolved"
                );
                return Ok(ChainOutcome::Resolved(result));
            }
            EffectResult::Continue { drops } => {
                if cursor.drops.is_empty() && !drops.is_empty() {
                    cursor = cursor.carrying_drops(drops);
                }
            }
        }
    }
    Ok(ChainOutcome::FellThrough)
}

pub(crate) fn warn_fell_through(stage: &'static str, pos: BlockPos) {
    tracing::warn!(
        stage,
        %pos,
        "side-effect chain ran out without a definitive result; is the terminal effect missing?"
    );
}
