//! Cross-crate scenarios: pipelines and hooks over unloaded storage.

use sponge_pipeline::context::{PhaseContext, PhaseState};
use sponge_pipeline::effect;
use sponge_pipeline::error::PipelineError;
use sponge_pipeline::pipeline::WorldPipeline;
use sponge_pipeline::test_utils::standard_chunk_pipeline;
use sponge_pipeline::tracker;
use sponge_world::block::BlockState;
use sponge_world::flags::BlockChangeFlags;
use sponge_world::handle::{ChunkRef, LevelRef, StaleReference};
use sponge_world::pos::BlockPos;
use sponge_world::test_utils::Fixture;

const POS: BlockPos = BlockPos::new(4, 1, 4);

#[test]
fn pipeline_over_an_unloaded_chunk_reports_stale() {
    let fixture = Fixture::new();
    let (mut levels, level) = fixture.levels_with_floor(0);
    let pipeline = WorldPipeline::builder(standard_chunk_pipeline(&levels, level, POS, fixture.dirt()))
        .add_effects(effect::world_effects())
        .build();
    levels.level_mut(level).unwrap().unload_chunk(POS.chunk_pos());
    let ctx = PhaseContext::new(PhaseState::Tick);

    let err = pipeline
        .process_effects(
            &ctx,
            &mut levels,
            BlockState::AIR,
            fixture.dirt(),
            POS,
            None,
            BlockChangeFlags::DEFAULT,
            8,
        )
        .unwrap_err();

    assert!(matches!(err, PipelineError::Stale(StaleReference::Chunk { .. })));
    assert_eq!(ctx.transactor().pushes(), ctx.transactor().pops());
}

#[test]
fn reloaded_chunk_does_not_revive_old_handles() {
    let fixture = Fixture::new();
    let (mut levels, level) = fixture.levels_with_floor(0);
    let handle = ChunkRef::at(&levels, level, POS).unwrap().unwrap();
    let l = levels.level_mut(level).unwrap();
    l.unload_chunk(POS.chunk_pos());
    l.load_chunk(POS.chunk_pos());

    assert!(handle.resolve(&levels).is_err());
    let fresh = ChunkRef::at(&levels, level, POS).unwrap().unwrap();
    assert!(fresh.resolve(&levels).is_ok());
}

#[test]
fn hooks_on_an_unloaded_level_report_stale() {
    let fixture = Fixture::new();
    let (mut levels, level) = fixture.levels_with_floor(0);
    levels.unload_level(level);
    let ctx = PhaseContext::new(PhaseState::Tick);
    let world = LevelRef(level);

    let err = tracker::set_block(&ctx, &mut levels, world, POS, fixture.dirt(), BlockChangeFlags::DEFAULT)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Stale(StaleReference::Level(id)) if id == level));

    let err = tracker::destroy_block(&ctx, &mut levels, world, POS, true, None).unwrap_err();
    assert!(matches!(err, PipelineError::Stale(_)));
    assert!(ctx.transactor().transactions().is_empty());
}

#[test]
fn hooks_on_an_unloaded_chunk_change_nothing() {
    let fixture = Fixture::new();
    let (mut levels, level) = fixture.levels_with_floor(0);
    levels.level_mut(level).unwrap().unload_chunk(POS.chunk_pos());
    let ctx = PhaseContext::new(PhaseState::Tick);

    let happened =
        tracker::set_block(&ctx, &mut levels, LevelRef(level), POS, fixture.dirt(), BlockChangeFlags::DEFAULT)
            .unwrap();

    assert!(!happened);
    assert_eq!(levels.level(level).unwrap().loaded_chunk_count(), 0);
}
