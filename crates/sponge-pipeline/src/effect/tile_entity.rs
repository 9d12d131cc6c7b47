//! Block-entity bookkeeping effects.
//!
//! The cursor's `block_entity` is the entity being attached; removal chains
//! run with `None` there.

use super::{BlockChangeArgs, EffectResult, ProcessingSideEffect, affected_chunk};
use crate::context::PhaseContext;
use crate::cursor::PipelineCursor;
use crate::error::PipelineError;
use crate::pipeline::BlockPipeline;
use crate::transaction::GameTransaction;
use sponge_world::block::BlockState;
use sponge_world::level::Levels;

type Outcome = Result<EffectResult<BlockState>, PipelineError>;

#[derive(Debug, Clone, Copy)]
pub struct RemoveBlockEntityFromTickers;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for RemoveBlockEntityFromTickers
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        _args: &BlockChangeArgs,
    ) -> Outcome {
        let world = pipeline.server_world();
        let level = world.resolve_mut(levels)?;
        if level.ticking_block_entities.remove(&cursor.pos) {
            ctx.transactor().log(GameTransaction::Ticker {
                level: world.id(),
                pos: cursor.pos,
                ticking: false,
            });
        }
        Ok(EffectResult::pass())
    }
}

/// Attach the cursor's block entity to the chunk, recording what it
/// replaced. Resolves to null when there is nothing to attach.
#[derive(Debug, Clone, Copy)]
pub struct SetAndRegisterBlockEntityToChunk;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for SetAndRegisterBlockEntityToChunk
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        _args: &BlockChangeArgs,
    ) -> Outcome {
        let Some(entity) = &cursor.block_entity else {
            return Ok(EffectResult::null_return());
        };
        let world = pipeline.server_world();
        let chunk = affected_chunk(pipeline)?.resolve_mut(levels)?;
        let mut entity = entity.clone();
        entity.pos = cursor.pos;
        let previous = chunk.set_block_entity(entity.clone());
        chunk.unsaved = true;
        ctx.transactor().log(GameTransaction::AddBlockEntity {
            level: world.id(),
            pos: cursor.pos,
            entity,
            previous,
        });
        Ok(EffectResult::pass())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RegisterBlockEntityTicker;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for RegisterBlockEntityTicker
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        _args: &BlockChangeArgs,
    ) -> Outcome {
        if cursor.block_entity.is_some() {
            let world = pipeline.server_world();
            let level = world.resolve_mut(levels)?;
            if level.ticking_block_entities.insert(cursor.pos) {
                ctx.transactor().log(GameTransaction::Ticker {
                    level: world.id(),
                    pos: cursor.pos,
                    ticking: true,
                });
            }
        }
        Ok(EffectResult::pass())
    }
}

/// Detach the block entity at the cursor. Resolves to null when there was
/// none.
#[derive(Debug, Clone, Copy)]
pub struct RemoveBlockEntityFromChunk;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for RemoveBlockEntityFromChunk
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        _args: &BlockChangeArgs,
    ) -> Outcome {
        let world = pipeline.server_world();
        let chunk = affected_chunk(pipeline)?.resolve_mut(levels)?;
        let Some(entity) = chunk.remove_block_entity(cursor.pos) else {
            return Ok(EffectResult::null_return());
        };
        chunk.unsaved = true;
        ctx.transactor().log(GameTransaction::RemoveBlockEntity {
            level: world.id(),
            pos: cursor.pos,
            entity,
        });
        Ok(EffectResult::pass())
    }
}

/// Terminal block-entity effect.
#[derive(Debug, Clone, Copy)]
pub struct BlockEntityChangeComplete;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for BlockEntityChangeComplete
{
    fn process_side_effect(
        &self,
        _pipeline: &dyn BlockPipeline,
        _ctx: &PhaseContext,
        _levels: &mut Levels,
        cursor: &PipelineCursor,
        _args: &BlockChangeArgs,
    ) -> Outcome {
        Ok(EffectResult::done(cursor.state))
    }
}
