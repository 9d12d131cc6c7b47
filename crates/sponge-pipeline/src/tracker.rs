//! Entry points fired when the server is about to change the world.
//!
//! Each hook checks that it runs on the thread owning the levels, records
//! the triggering transaction and then builds and drives the matching
//! pipelines with the standard effect chains.

use crate::context::PhaseContext;
use crate::cursor::PipelineCursor;
use crate::effect::{self, interaction::InteractionUseBlock, interaction::InteractionUseItemOnBlock};
use crate::error::{BuildError, PipelineError};
use crate::pipeline::{
    ChunkPipeline, TileEntityPipeline, UseBlockArgs, UseBlockPipeline, UseItemOnBlockArgs,
    UseItemOnBlockPipeline, WorldPipeline,
};
use crate::transaction::{BlockChange, GameTransaction};
use sponge_world::block::{BlockEntity, BlockState};
use sponge_world::flags::BlockChangeFlags;
use sponge_world::handle::{ChunkRef, LevelRef, SectionRef};
use sponge_world::id::EntityId;
use sponge_world::interaction::{BlockHitResult, InteractionHand, InteractionResult};
use sponge_world::level::Levels;
use sponge_world::pos::BlockPos;

/// The chunk pipeline for `change`: the standard chunk chain, or the
/// degenerate empty pipeline when the position is outside every section or
/// its chunk is not loaded.
pub fn chunk_pipeline_for(levels: &Levels, change: BlockChange) -> Result<ChunkPipeline, PipelineError> {
    let world = LevelRef(change.level);
    world.resolve(levels)?;
    let chunk = ChunkRef::at(levels, change.level, change.pos)?;
    let (Some(chunk), Some(index)) = (chunk, change.pos.section_index()) else {
        tracing::trace!(pos = %change.pos, "no chunk section for change; using empty pipeline");
        return Ok(ChunkPipeline::empty(world, chunk));
    };
    Ok(ChunkPipeline::builder()
        .kick_off(change)
        .world(world)
        .chunk(chunk)
        .chunk_section(SectionRef::new(chunk, index))
        .add_effects(effect::chunk_effects())
        .build(levels)?)
}

/// Change the block at `pos` with the configured default update budget.
/// Returns `true` if the change happened.
pub fn set_block(
    ctx: &PhaseContext,
    levels: &mut Levels,
    level: LevelRef,
    pos: BlockPos,
    state: BlockState,
    flags: BlockChangeFlags,
) -> Result<bool, PipelineError> {
    set_block_with_limit(ctx, levels, level, pos, state, flags, ctx.config().default_limit)
}

pub fn set_block_with_limit(
    ctx: &PhaseContext,
    levels: &mut Levels,
    level: LevelRef,
    pos: BlockPos,
    state: BlockState,
    flags: BlockChangeFlags,
    limit: u32,
) -> Result<bool, PipelineError> {
    run_block_change(ctx, levels, level, pos, state, flags, None, None, limit)
}

/// Replace the block at `pos` with air, spawning drops when `drop` is set
/// and the phase allows it.
pub fn destroy_block(
    ctx: &PhaseContext,
    levels: &mut Levels,
    level: LevelRef,
    pos: BlockPos,
    drop: bool,
    destroyer: Option<EntityId>,
) -> Result<bool, PipelineError> {
    destroy_block_with_limit(ctx, levels, level, pos, drop, destroyer, ctx.config().default_limit)
}

pub fn destroy_block_with_limit(
    ctx: &PhaseContext,
    levels: &mut Levels,
    level: LevelRef,
    pos: BlockPos,
    drop: bool,
    destroyer: Option<EntityId>,
    limit: u32,
) -> Result<bool, PipelineError> {
    destroy_block_with_flags(
        ctx,
        levels,
        level,
        pos,
        drop,
        destroyer,
        BlockChangeFlags::DEFAULT,
        limit,
    )
}

/// Destroy with explicit change flags. Cascades pass the flags of the
/// change that broke the support, so `SUPPRESS_DROPS` holds for every
/// block the cascade reaches.
#[allow(clippy::too_many_arguments)]
pub fn destroy_block_with_flags(
    ctx: &PhaseContext,
    levels: &mut Levels,
    level: LevelRef,
    pos: BlockPos,
    drop: bool,
    destroyer: Option<EntityId>,
    flags: BlockChangeFlags,
    limit: u32,
) -> Result<bool, PipelineError> {
    if level.resolve(levels)?.get_block_state(pos).is_air() {
        return Ok(false);
    }
    let drops = drop && ctx.phase().does_drops();
    run_block_change(
        ctx,
        levels,
        level,
        pos,
        BlockState::AIR,
        flags,
        Some(drops),
        destroyer,
        limit,
    )
}

/// `destroy` is `Some(drops)` for the destroy chain.
#[allow(clippy::too_many_arguments)]
fn run_block_change(
    ctx: &PhaseContext,
    levels: &mut Levels,
    level: LevelRef,
    pos: BlockPos,
    state: BlockState,
    flags: BlockChangeFlags,
    destroy: Option<bool>,
    destroyer: Option<EntityId>,
    limit: u32,
) -> Result<bool, PipelineError> {
    ctx.check_thread(levels, pos)?;
    let current = level.resolve(levels)?.get_block_state(pos);
    let change = BlockChange {
        level: level.id(),
        pos,
        original: current,
        new: state,
        flags,
    };
    let chunk_pipeline = chunk_pipeline_for(levels, change.clone())?;
    if chunk_pipeline.is_degenerate() {
        return Ok(false);
    }
    let world_effects = match destroy {
        Some(drops) => effect::destroy_effects(drops),
        None => effect::world_effects(),
    };
    let pipeline = WorldPipeline::builder(chunk_pipeline)
        .add_effects(world_effects)
        .build();

    ctx.transactor().log(GameTransaction::ChangeBlock(change));
    let happened =
        pipeline.process_effects(ctx, levels, current, state, pos, destroyer, flags, limit)?;
    tracing::debug!(%pos, ?current, new = ?state, happened, "block change processed");
    Ok(happened)
}

/// Attach `entity` at `pos`. The block there must support that kind of
/// block entity.
pub fn set_block_entity(
    ctx: &PhaseContext,
    levels: &mut Levels,
    level: LevelRef,
    pos: BlockPos,
    entity: BlockEntity,
) -> Result<bool, PipelineError> {
    ctx.check_thread(levels, pos)?;
    let resolved = level.resolve(levels)?;
    let state = resolved.get_block_state(pos);
    let opacity = resolved.light_block(state, pos);
    if resolved.registry().block_entity_kind(state) != Some(entity.kind) {
        tracing::warn!(%pos, kind = ?entity.kind, ?state, "block does not accept this block entity");
        return Ok(false);
    }
    let pipeline = match TileEntityPipeline::kick_off(levels, level, pos) {
        Ok(builder) => builder.add_effects(effect::set_block_entity_effects()).build(levels)?,
        Err(BuildError::MissingChunk | BuildError::MissingSection) => return Ok(false),
        Err(err) => return Err(err.into()),
    };
    let cursor = PipelineCursor::new(
        state,
        opacity,
        pos,
        Some(entity),
        None,
        ctx.config().default_limit,
    );
    pipeline.process_effects(ctx, levels, cursor)
}

/// Detach the block entity at `pos`, if any.
pub fn remove_block_entity(
    ctx: &PhaseContext,
    levels: &mut Levels,
    level: LevelRef,
    pos: BlockPos,
) -> Result<bool, PipelineError> {
    ctx.check_thread(levels, pos)?;
    let resolved = level.resolve(levels)?;
    let state = resolved.get_block_state(pos);
    let opacity = resolved.light_block(state, pos);
    let pipeline = match TileEntityPipeline::kick_off(levels, level, pos) {
        Ok(builder) => builder
            .add_effects(effect::remove_block_entity_effects())
            .build(levels)?,
        Err(BuildError::MissingChunk | BuildError::MissingSection) => return Ok(false),
        Err(err) => return Err(err.into()),
    };
    let cursor = PipelineCursor::new(state, opacity, pos, None, None, ctx.config().default_limit);
    pipeline.process_effects(ctx, levels, cursor)
}

/// Right-click a block with an empty-handed use.
pub fn use_block(
    ctx: &PhaseContext,
    levels: &mut Levels,
    level: LevelRef,
    player: EntityId,
    hand: InteractionHand,
    hit: BlockHitResult,
) -> Result<InteractionResult, PipelineError> {
    ctx.check_thread(levels, hit.pos)?;
    let args = UseBlockArgs::capture(levels, level, player, hand, hit)?;
    let result = UseBlockPipeline::new(args)
        .add_effect(InteractionUseBlock)
        .process_interaction(ctx, levels)?;
    log_interaction(ctx, level, player, hand, hit.pos, result);
    Ok(result)
}

/// Right-click a block face with the held item.
pub fn use_item_on_block(
    ctx: &PhaseContext,
    levels: &mut Levels,
    level: LevelRef,
    player: EntityId,
    hand: InteractionHand,
    hit: BlockHitResult,
) -> Result<InteractionResult, PipelineError> {
    ctx.check_thread(levels, hit.pos)?;
    let args = UseItemOnBlockArgs::capture(levels, level, player, hand, hit)?;
    let result = UseItemOnBlockPipeline::new(args)
        .add_effect(InteractionUseItemOnBlock)
        .process_interaction(ctx, levels)?;
    log_interaction(ctx, level, player, hand, hit.pos, result);
    Ok(result)
}

/// Try the block's own use action first, then the held item.
pub fn interact_with_block(
    ctx: &PhaseContext,
    levels: &mut Levels,
    level: LevelRef,
    player: EntityId,
    hand: InteractionHand,
    hit: BlockHitResult,
) -> Result<InteractionResult, PipelineError> {
    let used = use_block(ctx, levels, level, player, hand, hit)?;
    if used.consumes_action() {
        return Ok(used);
    }
    use_item_on_block(ctx, levels, level, player, hand, hit)
}

fn log_interaction(
    ctx: &PhaseContext,
    level: LevelRef,
    player: EntityId,
    hand: InteractionHand,
    pos: BlockPos,
    result: InteractionResult,
) {
    ctx.transactor().log(GameTransaction::Interaction {
        level: level.id(),
        player,
        hand,
        pos,
        result,
    });
}
