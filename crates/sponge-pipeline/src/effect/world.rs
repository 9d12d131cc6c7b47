//! World-scoped side effects: light, clients, neighbors, cascades, drops.

use super::{BlockChangeArgs, EffectResult, ProcessingSideEffect};
use crate::context::PhaseContext;
use crate::cursor::PipelineCursor;
use crate::error::PipelineError;
use crate::pipeline::BlockPipeline;
use crate::tracker;
use crate::transaction::GameTransaction;
use sponge_world::block::{BlockEntity, BlockState};
use sponge_world::entity::{Entity, EntityKind};
use sponge_world::id::ItemId;
use sponge_world::item::{ItemDrop, ItemStack};
use sponge_world::level::{LevelEvent, Levels};
use sponge_world::pos::Direction;

type Outcome = Result<EffectResult<BlockState>, PipelineError>;

/// Queue a light check when the change alters opacity or emission.
#[derive(Debug, Clone, Copy)]
pub struct UpdateLight;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for UpdateLight
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        _ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        args: &BlockChangeArgs,
    ) -> Outcome {
        if !args.flags.update_lighting() {
            return Ok(EffectResult::pass());
        }
        let level = pipeline.server_world().resolve_mut(levels)?;
        let registry = level.registry();
        let opacity_changed = level.light_block(args.new_state, cursor.pos) != cursor.opacity;
        let emission_changed =
            registry.light_emission(args.new_state) != registry.light_emission(cursor.state);
        if opacity_changed || emission_changed {
            level.light.check_block(cursor.pos);
        }
        Ok(EffectResult::pass())
    }
}

/// Resolve to null if the world no longer holds the proposed state.
#[derive(Debug, Clone, Copy)]
pub struct CheckWorldStateIsSame;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for CheckWorldStateIsSame
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        _ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        args: &BlockChangeArgs,
    ) -> Outcome {
        let current = pipeline
            .server_world()
            .resolve(levels)?
            .get_block_state(cursor.pos);
        if current != args.new_state {
            tracing::debug!(pos = %cursor.pos, "world state diverged from proposed state");
            return Ok(EffectResult::null_return());
        }
        Ok(EffectResult::pass())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NotifyClient;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for NotifyClient
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        args: &BlockChangeArgs,
    ) -> Outcome {
        if args.flags.notify_clients() && ctx.phase().notifies_clients() {
            let level = pipeline.server_world().resolve_mut(levels)?;
            level.client_updates.push(cursor.pos);
        }
        Ok(EffectResult::pass())
    }
}

/// Notify all six neighbors that the block at the cursor changed.
#[derive(Debug, Clone, Copy)]
pub struct NotifyNeighbors;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for NotifyNeighbors
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        args: &BlockChangeArgs,
    ) -> Outcome {
        if !args.flags.notify_neighbors() || !ctx.phase().does_block_physics() {
            return Ok(EffectResult::pass());
        }
        let world = pipeline.server_world();
        let level = world.resolve_mut(levels)?;
        for target in Direction::all()
            .into_iter()
            .filter_map(|dir| cursor.pos.checked_offset(dir))
        {
            level.neighbor_changed(target, cursor.pos, args.new_state.block);
            ctx.transactor().log(GameTransaction::NeighborNotification {
                level: world.id(),
                source: cursor.pos,
                target,
            });
        }
        tracing::trace!(pos = %cursor.pos, "neighbors notified");
        Ok(EffectResult::pass())
    }
}

/// Break an unsupported block resting on top of the changed position. The
/// nested change runs with one less unit of budget and is refused once the
/// budget is spent.
#[derive(Debug, Clone, Copy)]
pub struct UpdateConnectingBlocks;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for UpdateConnectingBlocks
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        args: &BlockChangeArgs,
    ) -> Outcome {
        if !args.flags.update_neighbor_shapes() || !ctx.phase().does_block_physics() {
            return Ok(EffectResult::pass());
        }
        let world = pipeline.server_world();
        let Some(above) = cursor.pos.checked_offset(Direction::Up) else {
            return Ok(EffectResult::pass());
        };
        let unsupported = {
            let level = world.resolve(levels)?;
            level.get_block_state(cursor.pos).is_air()
                && level.registry().needs_support(level.get_block_state(above))
        };
        if !unsupported {
            return Ok(EffectResult::pass());
        }
        if args.limit == 0 {
            tracing::debug!(pos = %above, "update limit reached; not breaking unsupported block");
            return Ok(EffectResult::pass());
        }
        tracker::destroy_block_with_flags(
            ctx,
            levels,
            world,
            above,
            args.flags.neighbor_drops(),
            cursor.destroyer,
            args.flags,
            args.limit - 1,
        )?;
        Ok(EffectResult::pass())
    }
}

/// Compute what the destroyed block drops: its registered item plus any
/// contents its block entity held.
#[derive(Debug, Clone, Copy)]
pub struct PerformBlockDropsFromDestruction;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for PerformBlockDropsFromDestruction
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        _ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        _args: &BlockChangeArgs,
    ) -> Outcome {
        let level = pipeline.server_world().resolve(levels)?;
        let mut drops = Vec::new();
        if let Some(item) = level.registry().drops(cursor.state) {
            drops.push(ItemDrop::new(
                cursor.pos,
                ItemStack::new(item, 1),
                cursor.destroyer,
            ));
        }
        let contents = cursor.block_entity.as_ref().and_then(stored_contents);
        if let Some(stack) = contents.filter(|s| level.registry().get_item(s.item).is_some()) {
            drops.push(ItemDrop::new(cursor.pos, stack, cursor.destroyer));
        }
        Ok(EffectResult::with_drops(drops))
    }
}

/// The stack a container entity holds. Values that do not fit an item id
/// or a positive count mean no contents.
fn stored_contents(entity: &BlockEntity) -> Option<ItemStack> {
    let item = u32::try_from(*entity.data.get("item")?).ok()?;
    let count = u32::try_from(entity.data.get("count").copied().unwrap_or(0)).ok()?;
    (count > 0).then(|| ItemStack::new(ItemId(item), count))
}

/// Spawn the drops the cursor carries as item entities.
#[derive(Debug, Clone, Copy)]
pub struct SpawnDestructBlocks;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for SpawnDestructBlocks
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        _args: &BlockChangeArgs,
    ) -> Outcome {
        if cursor.drops.is_empty() {
            return Ok(EffectResult::pass());
        }
        let world = pipeline.server_world();
        let level = world.resolve_mut(levels)?;
        let entities: Vec<_> = cursor
            .drops
            .iter()
            .map(|drop| {
                level.spawn_entity(Entity {
                    pos: drop.pos,
                    kind: EntityKind::Item {
                        stack: drop.stack,
                        source: drop.source,
                    },
                })
            })
            .collect();
        tracing::debug!(pos = %cursor.pos, count = cursor.drops.len(), "spawned block drops");
        ctx.transactor().log(GameTransaction::SpawnDrops {
            level: world.id(),
            entities,
            drops: cursor.drops.clone(),
        });
        Ok(EffectResult::pass())
    }
}

/// Emit the block-break level event for the destroyed state.
#[derive(Debug, Clone, Copy)]
pub struct WorldDestroyBlockLevelEvent;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for WorldDestroyBlockLevelEvent
{
    fn process_side_effect(
        &self,
        pipeline: &dyn BlockPipeline,
        _ctx: &PhaseContext,
        levels: &mut Levels,
        cursor: &PipelineCursor,
        _args: &BlockChangeArgs,
    ) -> Outcome {
        if !cursor.state.is_air() {
            let level = pipeline.server_world().resolve_mut(levels)?;
            level.level_events.push(LevelEvent::BlockDestroyed {
                pos: cursor.pos,
                state: cursor.state,
            });
        }
        Ok(EffectResult::pass())
    }
}

/// Terminal world effect.
#[derive(Debug, Clone, Copy)]
pub struct WorldBlockChangeComplete;

impl ProcessingSideEffect<dyn BlockPipeline, PipelineCursor, BlockChangeArgs, BlockState>
    for WorldBlockChangeComplete
{
    fn process_side_effect(
        &self,
        _pipeline: &dyn BlockPipeline,
        _ctx: &PhaseContext,
        _levels: &mut Levels,
        _cursor: &PipelineCursor,
        args: &BlockChangeArgs,
    ) -> Outcome {
        Ok(EffectResult::done(args.new_state))
    }
}
