//! Right-click effects.

use super::{EffectResult, ProcessingSideEffect};
use crate::context::PhaseContext;
use crate::error::PipelineError;
use crate::pipeline::{UseBlockArgs, UseBlockPipeline, UseItemOnBlockArgs, UseItemOnBlockPipeline};
use crate::tracker;
use crate::transaction::GameTransaction;
use sponge_world::block::BlockState;
use sponge_world::flags::BlockChangeFlags;
use sponge_world::interaction::InteractionResult;
use sponge_world::level::Levels;
use sponge_world::registry::UseAction;

/// Apply the clicked block's own use action.
#[derive(Debug, Clone, Copy)]
pub struct InteractionUseBlock;

impl ProcessingSideEffect<UseBlockPipeline, InteractionResult, UseBlockArgs, InteractionResult>
    for InteractionUseBlock
{
    fn process_side_effect(
        &self,
        _pipeline: &UseBlockPipeline,
        ctx: &PhaseContext,
        levels: &mut Levels,
        _cursor: &InteractionResult,
        args: &UseBlockArgs,
    ) -> Result<EffectResult<InteractionResult>, PipelineError> {
        let action = args.level.resolve(levels)?.registry().use_action(args.state);
        match action {
            UseAction::None => Ok(EffectResult::null_return()),
            UseAction::ToggleMeta(mask) => {
                let toggled = args.state.with_meta(args.state.meta ^ mask);
                let changed = tracker::set_block(
                    ctx,
                    levels,
                    args.level,
                    args.hit.pos,
                    toggled,
                    BlockChangeFlags::DEFAULT,
                )?;
                Ok(EffectResult::done(if changed {
                    InteractionResult::Success
                } else {
                    InteractionResult::Fail
                }))
            }
        }
    }
}

/// Place the held item's block against the clicked face.
#[derive(Debug, Clone, Copy)]
pub struct InteractionUseItemOnBlock;

impl
    ProcessingSideEffect<
        UseItemOnBlockPipeline,
        InteractionResult,
        UseItemOnBlockArgs,
        InteractionResult,
    > for InteractionUseItemOnBlock
{
    fn process_side_effect(
        &self,
        _pipeline: &UseItemOnBlockPipeline,
        ctx: &PhaseContext,
        levels: &mut Levels,
        _cursor: &InteractionResult,
        args: &UseItemOnBlockArgs,
    ) -> Result<EffectResult<InteractionResult>, PipelineError> {
        let use_args = &args.interaction;
        let Some(stack) = use_args.copied_stack.filter(|s| !s.is_empty()) else {
            return Ok(EffectResult::null_return());
        };
        let Some(target) = use_args.hit.placement_pos() else {
            return Ok(EffectResult::done(InteractionResult::Fail));
        };
        let (block, target_free) = {
            let level = use_args.level.resolve(levels)?;
            let block = level
                .registry()
                .get_item(stack.item)
                .and_then(|item| item.places);
            (block, level.get_block_state(target).is_air())
        };
        let Some(block) = block else {
            return Ok(EffectResult::null_return());
        };
        if !target.is_in_bounds() || !target_free {
            return Ok(EffectResult::done(InteractionResult::Fail));
        }

        let placed = tracker::set_block(
            ctx,
            levels,
            use_args.level,
            target,
            BlockState::of(block),
            BlockChangeFlags::DEFAULT,
        )?;
        if !placed {
            return Ok(EffectResult::done(InteractionResult::Fail));
        }
        if !args.creative {
            let level = use_args.level.resolve_mut(levels)?;
            if let Some(player) = level.player_mut(use_args.player) {
                let slot = player.held_mut(use_args.hand);
                if let Some(live) = slot.as_mut() {
                    let before = *live;
                    live.shrink(1);
                    if live.is_empty() {
                        *slot = None;
                    }
                    ctx.transactor().log(GameTransaction::ConsumeItem {
                        level: use_args.level.id(),
                        player: use_args.player,
                        hand: use_args.hand,
                        before,
                    });
                }
            }
        }
        Ok(EffectResult::done(InteractionResult::Success))
    }
}
