//! Block-entity-only changes, decoupled from the block-state chain.

use super::{BlockPipeline, ChainOutcome, drive_block_chain, warn_fell_through};
use crate::context::PhaseContext;
use crate::cursor::PipelineCursor;
use crate::effect::{BlockChangeArgs, BlockEffect, ProcessingSideEffect};
use crate::error::{BuildError, PipelineError};
use crate::transaction::ResultingTransactionBySideEffect;
use sponge_world::block::BlockState;
use sponge_world::flags::BlockChangeFlags;
use sponge_world::handle::{ChunkRef, LevelRef, SectionRef};
use sponge_world::level::Levels;
use sponge_world::pos::BlockPos;

#[derive(Debug)]
pub struct TileEntityPipeline {
    world: LevelRef,
    chunk: ChunkRef,
    section: SectionRef,
    effects: Vec<ResultingTransactionBySideEffect<BlockEffect>>,
}

impl TileEntityPipeline {
    pub fn builder() -> TileEntityPipelineBuilder {
        TileEntityPipelineBuilder::default()
    }

    /// Start a builder with the chunk and section handles for `pos`
    /// already resolved.
    pub fn kick_off(
        levels: &Levels,
        world: LevelRef,
        pos: BlockPos,
    ) -> Result<TileEntityPipelineBuilder, BuildError> {
        let chunk = ChunkRef::at(levels, world.id(), pos)?.ok_or(BuildError::MissingChunk)?;
        let index = pos.section_index().ok_or(BuildError::MissingSection)?;
        Ok(Self::builder()
            .world(world)
            .chunk(chunk)
            .chunk_section(SectionRef::new(chunk, index)))
    }

    /// Run the chain against `cursor`. Block-entity changes carry no block
    /// change flags. Returns `true` only if an effect produced a definitive
    /// non-null result; an empty chain reports `false`.
    pub fn process_effects(
        &self,
        ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: PipelineCursor,
    ) -> Result<bool, PipelineError> {
        if self.effects.is_empty() {
            return Ok(false);
        }
        let pos = cursor.pos;
        let args = BlockChangeArgs {
            new_state: cursor.state,
            flags: BlockChangeFlags::NONE,
            limit: cursor.limit,
        };
        match drive_block_chain(self, &self.effects, ctx, levels, cursor, &args)? {
            ChainOutcome::Resolved(result) => Ok(result.is_some()),
            ChainOutcome::FellThrough => {
                warn_fell_through("block entity", pos);
                Ok(false)
            }
        }
    }
}

impl BlockPipeline for TileEntityPipeline {
    fn server_world(&self) -> LevelRef {
        self.world
    }

    fn affected_chunk(&self) -> Option<ChunkRef> {
        Some(self.chunk)
    }

    fn affected_section(&self) -> Option<SectionRef> {
        Some(self.section)
    }
}

#[derive(Debug, Default)]
pub struct TileEntityPipelineBuilder {
    world: Option<LevelRef>,
    chunk: Option<ChunkRef>,
    section: Option<SectionRef>,
    effects: Vec<ResultingTransactionBySideEffect<BlockEffect>>,
}

impl TileEntityPipelineBuilder {
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

    pub fn build(self, levels: &Levels) -> Result<TileEntityPipeline, BuildError> {
        let world = self.world.ok_or(BuildError::MissingLevel)?;
        let chunk = self.chunk.ok_or(BuildError::MissingChunk)?;
        let section = self.section.ok_or(BuildError::MissingSection)?;
        if section.chunk != chunk || chunk.level != world.id() {
            return Err(BuildError::SectionChunkMismatch);
        }
        chunk.resolve(levels)?;
        Ok(TileEntityPipeline {
            world,
            chunk,
            section,
            effects: self.effects,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PhaseState;
    use crate::effect::{remove_block_entity_effects, set_block_entity_effects};
    use crate::test_utils::*;
    use sponge_world::block::BlockEntity;
    use sponge_world::test_utils::{CHEST_ENTITY, Fixture};

    #[test]
    fn kick_off_requires_loaded_chunk() {
        let fixture = Fixture::new();
        let (levels, level) = fixture.levels_with_level();
        let err = TileEntityPipeline::kick_off(&levels, LevelRef(level), BlockPos::new(0, 1, 0))
            .unwrap_err();
        assert_eq!(err, BuildError::MissingChunk);
    }

    #[test]
    fn kick_off_rejects_out_of_bounds() {
        let fixture = Fixture::new();
        let (levels, level) = fixture.levels_with_floor(0);
        let err = TileEntityPipeline::kick_off(&levels, LevelRef(level), BlockPos::new(0, -1, 0))
            .unwrap_err();
        assert_eq!(err, BuildError::MissingSection);
    }

    #[test]
    fn empty_chain_reports_false() {
        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_floor(0);
        let ctx = PhaseContext::new(PhaseState::Tick);
        let pos = BlockPos::new(0, 0, 0);
        let pipeline = TileEntityPipeline::kick_off(&levels, LevelRef(level), pos)
            .unwrap()
            .build(&levels)
            .unwrap();
        let cursor = PipelineCursor::new(fixture.stone(), 15, pos, None, None, 4);
        assert!(!pipeline.process_effects(&ctx, &mut levels, cursor).unwrap());
    }

    #[test]
    fn effects_see_no_flags() {
        #[derive(Debug)]
        struct AssertNoFlags;
        impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
            for AssertNoFlags
        {
            fn process_side_effect(
                &self,
                _pipeline: &dyn BlockPipeline,
                _ctx: &PhaseContext,
                _levels: &mut Levels,
                cursor: &PipelineCursor,
                args: &BlockChangeArgs,
            ) -> Result<crate::effect::EffectResult<BlockState>, PipelineError> {
                assert_eq!(args.flags, BlockChangeFlags::NONE);
                assert_eq!(args.new_state, cursor.state);
                Ok(crate::effect::EffectResult::done(cursor.state))
            }
        }

        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_floor(0);
        let ctx = PhaseContext::new(PhaseState::Tick);
        let pos = BlockPos::new(0, 0, 0);
        let pipeline = TileEntityPipeline::kick_off(&levels, LevelRef(level), pos)
            .unwrap()
            .add_effect(AssertNoFlags)
            .build(&levels)
            .unwrap();
        let cursor = PipelineCursor::new(fixture.stone(), 15, pos, None, None, 4);
        assert!(pipeline.process_effects(&ctx, &mut levels, cursor).unwrap());
    }

    #[test]
    fn set_then_remove_block_entity() {
        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_floor(0);
        let ctx = PhaseContext::new(PhaseState::Tick);
        let pos = BlockPos::new(4, 1, 4);
        levels.level_mut(level).unwrap().set_block_raw(pos, fixture.chest());
        let entity = BlockEntity::new(CHEST_ENTITY, pos).with_data("count", 2);

        let set = TileEntityPipeline::kick_off(&levels, LevelRef(level), pos)
            .unwrap()
            .add_effects(set_block_entity_effects())
            .build(&levels)
            .unwrap();
        let cursor = PipelineCursor::new(fixture.chest(), 0, pos, Some(entity.clone()), None, 4);
        assert!(set.process_effects(&ctx, &mut levels, cursor).unwrap());
        {
            let l = levels.level(level).unwrap();
            assert_eq!(l.block_entity(pos), Some(&entity));
            assert!(l.ticking_block_entities.contains(&pos));
        }

        let remove = TileEntityPipeline::kick_off(&levels, LevelRef(level), pos)
            .unwrap()
            .add_effects(remove_block_entity_effects())
            .build(&levels)
            .unwrap();
        let cursor = PipelineCursor::new(fixture.chest(), 0, pos, None, None, 4);
        assert!(remove.process_effects(&ctx, &mut levels, cursor.clone()).unwrap());
        let l = levels.level(level).unwrap();
        assert!(l.block_entity(pos).is_none());
        assert!(!l.ticking_block_entities.contains(&pos));

        // Nothing left to remove: the chain resolves to null.
        assert!(!remove.process_effects(&ctx, &mut levels, cursor).unwrap());
    }

    #[test]
    fn missing_terminal_reports_false() {
        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_floor(0);
        let ctx = PhaseContext::new(PhaseState::Tick);
        let pos = BlockPos::new(0, 0, 0);
        let log = invocation_log();
        let pipeline = TileEntityPipeline::kick_off(&levels, LevelRef(level), pos)
            .unwrap()
            .add_effect(StubEffect::new("a", StubBehavior::Pass, &log))
            .build(&levels)
            .unwrap();
        let cursor = PipelineCursor::new(fixture.stone(), 15, pos, None, None, 4);
        assert!(!pipeline.process_effects(&ctx, &mut levels, cursor).unwrap());
        assert_eq!(labels(&log), vec!["a"]);
    }
}
