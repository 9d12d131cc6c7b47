//! Chunk-scoped side effects: storage, heightmap, section light status and
//! block entities.

use super::{BlockChangeArgs, EffectResult, ProcessingSideEffect, affected_chunk, affected_section};
use crate::context::PhaseContext;
use crate::cursor::PipelineCursor;
use crate::error::PipelineError;
use crate::pipeline::BlockPipeline;
use crate::transaction::GameTransaction;
use sponge_world::block::{BlockState, EntityCreationType};
use sponge_world::chunk::ChunkSection;
use sponge_world::level::Levels;
use std::sync::Arc;

type Outcome = Result<EffectResult<BlockState>, PipelineError>;

/// Write the new state into the section, allocating the section on first
/// write. Resolves to null when nothing would change.
#[derive(Debug, Clone, Copy)]
pub struct SetBlockToChunkSection;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for SetBlockToChunkSection
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        _ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        args: &BlockChangeArgs,
    ) -> Outcome {
        let section = affected_section(pipeline)?;
        let chunk = affected_chunk(pipeline)?.resolve_mut(levels)?;
        if args.new_state.is_air() && chunk.section(section.index).is_none() {
            return Ok(EffectResult::null_return());
        }
        let (x, y, z) = cursor.pos.local();
        let old = chunk
            .get_or_create_section(section.index)
            .set(x, y, z, args.new_state);
        if old == args.new_state {
            return Ok(EffectResult::null_return());
        }
        Ok(EffectResult::pass())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UpdateHeightMap;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for UpdateHeightMap
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        _ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        args: &BlockChangeArgs,
    ) -> Outcome {
        let chunk = affected_chunk(pipeline)?.resolve_mut(levels)?;
        chunk.update_heightmap(cursor.pos, args.new_state);
        Ok(EffectResult::pass())
    }
}

/// Tell the light engine when the write flipped the section between empty
/// and non-empty.
#[derive(Debug, Clone, Copy)]
pub struct UpdateChunkLightManager;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for UpdateChunkLightManager
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        _ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        args: &BlockChangeArgs,
    ) -> Outcome {
        let now = affected_section(pipeline)?
            .resolve(levels)?
            .map_or(0, ChunkSection::non_air_count);
        let before = match (cursor.state.is_air(), args.new_state.is_air()) {
            (true, false) => now.saturating_sub(1),
            (false, true) => now + 1,
            _ => now,
        };
        let (was_empty, is_empty) = (before == 0, now == 0);
        if was_empty != is_empty {
            let level = pipeline.server_world().resolve_mut(levels)?;
            level.light.update_section_status(cursor.pos, is_empty);
        }
        Ok(EffectResult::pass())
    }
}

/// Drop the old block entity when the block type changes.
#[derive(Debug, Clone, Copy)]
pub struct OldBlockOnReplace;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for OldBlockOnReplace
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        args: &BlockChangeArgs,
    ) -> Outcome {
        if cursor.state.is_same_block(&args.new_state) {
            return Ok(EffectResult::pass());
        }
        let world = pipeline.server_world();
        let level = world.resolve_mut(levels)?;
        let removed = affected_chunk(pipeline)?
            .resolve_in_mut(level)?
            .remove_block_entity(cursor.pos);
        if let Some(entity) = removed {
            let was_ticking = level.ticking_block_entities.remove(&cursor.pos);
            tracing::debug!(pos = %cursor.pos, kind = ?entity.kind, "removed replaced block entity");
            ctx.transactor().log(GameTransaction::RemoveBlockEntity {
                level: world.id(),
                pos: cursor.pos,
                entity,
            });
            if was_ticking {
                ctx.transactor().log(GameTransaction::Ticker {
                    level: world.id(),
                    pos: cursor.pos,
                    ticking: false,
                });
            }
        }
        Ok(EffectResult::pass())
    }
}

/// Resolve to null if storage does not hold the proposed state after the
/// write.
#[derive(Debug, Clone, Copy)]
pub struct CheckBlockPostPlacementIsSame;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for CheckBlockPostPlacementIsSame
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        _ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        args: &BlockChangeArgs,
    ) -> Outcome {
        let stored = affected_chunk(pipeline)?
            .resolve(levels)?
            .get_block_state(cursor.pos);
        if stored != args.new_state {
            return Ok(EffectResult::null_return());
        }
        Ok(EffectResult::pass())
    }
}

/// Terminal chunk effect: make sure the new block has its block entity,
/// mark the chunk unsaved and resolve to the previous state.
#[derive(Debug, Clone, Copy)]
pub struct UpdateOrCreateBlockEntityPostPlacement;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for UpdateOrCreateBlockEntityPostPlacement
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        args: &BlockChangeArgs,
    ) -> Outcome {
        let world = pipeline.server_world();
        let level = world.resolve_mut(levels)?;
        let registry = Arc::clone(level.registry());
        let chunk_ref = affected_chunk(pipeline)?;
        let chunk = chunk_ref.resolve_in_mut(level)?;
        chunk.unsaved = true;

        if registry.block_entity_kind(args.new_state).is_some()
            && chunk.block_entity(cursor.pos).is_none()
        {
            let created = chunk
                .get_block_entity(cursor.pos, EntityCreationType::Immediate, &registry)
                .cloned();
            if let Some(entity) = created {
                ctx.transactor().log(GameTransaction::AddBlockEntity {
                    level: world.id(),
                    pos: cursor.pos,
                    entity,
                    previous: None,
                });
                if level.ticking_block_entities.insert(cursor.pos) {
                    ctx.transactor().log(GameTransaction::Ticker {
                        level: world.id(),
                        pos: cursor.pos,
                        ticking: true,
                    });
                }
            }
        }
        Ok(EffectResult::done(cursor.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PhaseState;
    use crate::effect::block_effect;
    use crate::pipeline::ChunkOutcome;
    use crate::test_utils::chunk_pipeline_with;
    use sponge_world::pos::BlockPos;
    use sponge_world::test_utils::Fixture;

    #[test]
    fn heightmap_drops_when_top_block_removed() {
        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_floor(0);
        let ctx = PhaseContext::new(PhaseState::Tick);
        let pos = BlockPos::new(2, 5, 2);
        levels.level_mut(level).unwrap().set_block_raw(pos, fixture.stone());
        let pipeline = chunk_pipeline_with(
            &levels,
            level,
            pos,
            BlockState::AIR,
            vec![
                block_effect(SetBlockToChunkSection),
                block_effect(UpdateHeightMap),
                block_effect(UpdateOrCreateBlockEntityPostPlacement),
            ],
        );
        pipeline
            .process_change(&ctx, &mut levels, fixture.stone(), BlockState::AIR, pos, 4)
            .unwrap();
        let chunk = levels.level(level).unwrap().chunk_at(pos).unwrap();
        assert_eq!(chunk.heightmap().height(pos), 1);
    }

    #[test]
    fn emptying_a_section_is_reported_to_light_engine() {
        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_level();
        let ctx = PhaseContext::new(PhaseState::Tick);
        let pos = BlockPos::new(1, 70, 1);
        levels.level_mut(level).unwrap().set_block_raw(pos, fixture.dirt());
        let pipeline = chunk_pipeline_with(
            &levels,
            level,
            pos,
            BlockState::AIR,
            vec![
                block_effect(SetBlockToChunkSection),
                block_effect(UpdateChunkLightManager),
                block_effect(UpdateOrCreateBlockEntityPostPlacement),
            ],
        );
        let outcome = pipeline
            .process_change(&ctx, &mut levels, fixture.dirt(), BlockState::AIR, pos, 4)
            .unwrap();
        assert_eq!(outcome, ChunkOutcome::Resolved(Some(fixture.dirt())));
        let changes = &levels.level(level).unwrap().light.section_changes;
        assert_eq!(changes.len(), 1);
        assert!(changes[0].1, "section became empty");
    }

    #[test]
    fn replacing_within_a_nonempty_section_is_silent() {
        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_floor(0);
        let ctx = PhaseContext::new(PhaseState::Tick);
        let pos = BlockPos::new(1, 0, 1);
        let pipeline = chunk_pipeline_with(
            &levels,
            level,
            pos,
            fixture.dirt(),
            vec![
                block_effect(SetBlockToChunkSection),
                block_effect(UpdateChunkLightManager),
                block_effect(UpdateOrCreateBlockEntityPostPlacement),
            ],
        );
        pipeline
            .process_change(&ctx, &mut levels, fixture.stone(), fixture.dirt(), pos, 4)
            .unwrap();
        assert!(levels.level(level).unwrap().light.section_changes.is_empty());
    }

    #[test]
    fn same_block_type_keeps_block_entity() {
        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_floor(0);
        let ctx = PhaseContext::new(PhaseState::Tick);
        let pos = BlockPos::new(6, 1, 6);
        {
            let l = levels.level_mut(level).unwrap();
            l.set_block_raw(pos, fixture.chest());
            let registry = Arc::clone(l.registry());
            l.chunk_at_mut(pos)
                .unwrap()
                .get_block_entity(pos, EntityCreationType::Immediate, &registry);
        }
        let rotated = fixture.chest().with_meta(2);
        let pipeline = chunk_pipeline_with(
            &levels,
            level,
            pos,
            rotated,
            crate::effect::chunk_effects(),
        );
        pipeline
            .process_change(&ctx, &mut levels, fixture.chest(), rotated, pos, 4)
            .unwrap();
        assert!(levels.level(level).unwrap().block_entity(pos).is_some());
        assert!(ctx.transactor().transactions().is_empty());
    }
}
