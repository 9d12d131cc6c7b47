//! Shared helpers for pipeline tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::context::PhaseContext;
use crate::cursor::PipelineCursor;
use crate::effect::{self, BlockChangeArgs, EffectResult, ProcessingSideEffect};
use crate::error::PipelineError;
use crate::pipeline::{BlockPipeline, ChunkPipeline, WorldPipeline};
use crate::transaction::BlockChange;
use sponge_world::block::BlockState;
use sponge_world::flags::BlockChangeFlags;
use sponge_world::handle::{ChunkRef, LevelRef, SectionRef};
use sponge_world::id::LevelId;
use sponge_world::item::ItemDrop;
use sponge_world::level::Levels;
use sponge_world::pos::BlockPos;
use std::cell::RefCell;
use std::rc::Rc;

// ===========================================================================
// Recording stub effect
// ===========================================================================

/// What a [`StubEffect`] answers when invoked.
#[derive(Debug, Clone)]
pub enum StubBehavior {
    Pass,
    Drops(Vec<ItemDrop>),
    Done(Option<BlockState>),
    Fail,
    Panic,
}

/// One observed invocation: which stub ran and the cursor it saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub label: &'static str,
    pub cursor: PipelineCursor,
    pub transactor_depth: u64,
}

pub type InvocationLog = Rc<RefCell<Vec<Invocation>>>;

pub fn invocation_log() -> InvocationLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Labels of every recorded invocation, in order.
pub fn labels(log: &InvocationLog) -> Vec<&'static str> {
    log.borrow().iter().map(|i| i.label).collect()
}

/// A side effect that records each call and answers with a fixed behavior.
#[derive(Debug, Clone)]
pub struct StubEffect {
    pub label: &'static str,
    pub behavior: StubBehavior,
    pub log: InvocationLog,
}

impl StubEffect {
    pub fn new(label: &'static str, behavior: StubBehavior, log: &InvocationLog) -> Self {
        Self {
            label,
            behavior,
            log: Rc::clone(log),
        }
    }
}

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for StubEffect
{
    fn name(&self) -> &'static str {
        self.label
    }

    fn process_side_effect(
        &self,
        _pipeline: &dyn BlockPipeline,
        ctx: &PhaseContext,
        _levels: &mut Levels,
        cursor: &PipelineCursor,
        _args: &BlockChangeArgs,
    ) -> Result<EffectResult<BlockState>, PipelineError> {
        self.log.borrow_mut().push(Invocation {
            label: self.label,
            cursor: cursor.clone(),
            transactor_depth: ctx.transactor().depth(),
        });
        match &self.behavior {
            StubBehavior::Pass => Ok(EffectResult::pass()),
            StubBehavior::Drops(drops) => Ok(EffectResult::with_drops(drops.clone())),
            StubBehavior::Done(state) => Ok(EffectResult::Done(*state)),
            StubBehavior::Fail => Err(PipelineError::Effect {
                effect: self.label,
                reason: "stub failure".to_string(),
            }),
            StubBehavior::Panic => panic!("stub effect {} panicked", self.label),
        }
    }
}

/// A side effect that removes the block entity at the cursor position,
/// standing in for a chunk stage that replaces it.
#[derive(Debug, Clone, Copy)]
pub struct RemoveBlockEntityStub;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for RemoveBlockEntityStub
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        _ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        _args: &BlockChangeArgs,
    ) -> Result<EffectResult<BlockState>, PipelineError> {
        let chunk = effect::affected_chunk(pipeline)?.resolve_mut(levels)?;
        chunk.remove_block_entity(cursor.pos);
        Ok(EffectResult::done(cursor.state))
    }
}

// ===========================================================================
// Pipeline builders
// ===========================================================================

/// A change descriptor for `pos` reading the current state from storage.
pub fn change(levels: &Levels, level: LevelId, pos: BlockPos, new: BlockState) -> BlockChange {
    let original = levels
        .level(level)
        .map_or(BlockState::AIR, |l| l.get_block_state(pos));
    BlockChange {
        level,
        pos,
        original,
        new,
        flags: BlockChangeFlags::DEFAULT,
    }
}

/// A chunk pipeline over the loaded chunk holding `pos`, with the given
/// effects.
pub fn chunk_pipeline_with(
    levels: &Levels,
    level: LevelId,
    pos: BlockPos,
    new: BlockState,
    effects: Vec<crate::transaction::ResultingTransactionBySideEffect<effect::BlockEffect>>,
) -> ChunkPipeline {
    let chunk = ChunkRef::at(levels, level, pos)
        .expect("level loaded")
        .expect("chunk loaded");
    let section = SectionRef::new(chunk, pos.section_index().expect("position in bounds"));
    ChunkPipeline::builder()
        .kick_off(change(levels, level, pos, new))
        .world(LevelRef(level))
        .chunk(chunk)
        .chunk_section(section)
        .add_effects(effects)
        .build(levels)
        .expect("pipeline builds")
}

/// A chunk pipeline running the standard chunk chain.
pub fn standard_chunk_pipeline(
    levels: &Levels,
    level: LevelId,
    pos: BlockPos,
    new: BlockState,
) -> ChunkPipeline {
    chunk_pipeline_with(levels, level, pos, new, effect::chunk_effects())
}

/// A world pipeline running the standard chunk and world chains.
pub fn standard_world_pipeline(
    levels: &Levels,
    level: LevelId,
    pos: BlockPos,
    new: BlockState,
) -> WorldPipeline {
    WorldPipeline::builder(standard_chunk_pipeline(levels, level, pos, new))
        .add_effects(effect::world_effects())
        .build()
}
