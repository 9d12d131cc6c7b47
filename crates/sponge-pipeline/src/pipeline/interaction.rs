//! Right-click interaction pipelines.
//!
//! Unlike block pipelines these never stop early: every registered effect
//! runs, and each definitive result replaces the running interaction
//! result. In practice a single effect is registered.

use crate::context::PhaseContext;
use crate::effect::{EffectResult, ProcessingSideEffect};
use crate::error::PipelineError;
use crate::transaction::ResultingTransactionBySideEffect;
use sponge_world::block::BlockState;
use sponge_world::handle::LevelRef;
use sponge_world::id::EntityId;
use sponge_world::interaction::{BlockHitResult, InteractionHand, InteractionResult};
use sponge_world::item::ItemStack;
use sponge_world::level::Levels;

/// A side effect in an interaction pipeline over arguments `A`. The cursor
/// is the running interaction result.
pub type InteractionEffect<A> =
    dyn ProcessingSideEffect<InteractionPipeline<A>, InteractionResult, A, InteractionResult>;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Everything a use-block effect needs, captured when the pipeline is
/// built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseBlockArgs {
    pub level: LevelRef,
    pub player: EntityId,
    pub hand: InteractionHand,
    pub hit: BlockHitResult,
    /// State of the clicked block.
    pub state: BlockState,
    /// Copy of the held stack, insulated from changes to the live one.
    pub copied_stack: Option<ItemStack>,
}

impl UseBlockArgs {
    /// Read the clicked state and copy the player's held stack.
    pub fn capture(
        levels: &Levels,
        level: LevelRef,
        player: EntityId,
        hand: InteractionHand,
        hit: BlockHitResult,
    ) -> Result<Self, PipelineError> {
        let resolved = level.resolve(levels)?;
        let data = resolved
            .player(player)
            .ok_or(PipelineError::NotAPlayer(player))?;
        Ok(Self {
            level,
            player,
            hand,
            hit,
            state: resolved.get_block_state(hit.pos),
            copied_stack: data.held(hand).copied(),
        })
    }
}

/// Use-item-on-block arguments: the use-block bundle plus the player's
/// game mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseItemOnBlockArgs {
    pub interaction: UseBlockArgs,
    pub creative: bool,
}

impl UseItemOnBlockArgs {
    pub fn capture(
        levels: &Levels,
        level: LevelRef,
        player: EntityId,
        hand: InteractionHand,
        hit: BlockHitResult,
    ) -> Result<Self, PipelineError> {
        let interaction = UseBlockArgs::capture(levels, level, player, hand, hit)?;
        let creative = level
            .resolve(levels)?
            .player(player)
            .is_some_and(|p| p.creative);
        Ok(Self {
            interaction,
            creative,
        })
    }
}

// ---------------------------------------------------------------------------
// InteractionPipeline
// ---------------------------------------------------------------------------

pub struct InteractionPipeline<A> {
    args: A,
    effects: Vec<ResultingTransactionBySideEffect<InteractionEffect<A>>>,
}

pub type UseBlockPipeline = InteractionPipeline<UseBlockArgs>;
pub type UseItemOnBlockPipeline = InteractionPipeline<UseItemOnBlockArgs>;

impl<A: std::fmt::Debug> std::fmt::Debug for InteractionPipeline<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionPipeline")
            .field("args", &self.args)
            .field("effects", &self.effects)
            .finish()
    }
}

impl<A: 'static> InteractionPipeline<A> {
    pub fn new(args: A) -> Self {
        Self {
            args,
            effects: Vec::new(),
        }
    }

    pub fn add_effect<T>(mut self, effect: T) -> Self
    where
        T: ProcessingSideEffect<InteractionPipeline<A>, InteractionResult, A, InteractionResult>
            + 'static,
    {
        self.effects
            .push(ResultingTransactionBySideEffect::named(effect.name(), Box::new(effect)));
        self
    }

    pub fn args(&self) -> &A {
        &self.args
    }

    /// Run every effect, folding definitive results into a running value
    /// that starts at [`InteractionResult::Pass`]. A definitive `None`
    /// keeps the previous value.
    pub fn process_interaction(
        &self,
        ctx: &PhaseContext,
        levels: &mut Levels,
    ) -> Result<InteractionResult, PipelineError> {
        let mut result = InteractionResult::Pass;
        for effect in &self.effects {
            let _scope = ctx.transactor().push_effect(effect);
            match effect
                .effect()
                .process_side_effect(self, ctx, levels, &result, &self.args)?
            {
                EffectResult::Done(next) => result = next.unwrap_or(result),
                EffectResult::Continue { .. } => {}
            }
            tracing::trace!(effect = effect.name(), ?result, "interaction effect ran");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PhaseState;
    use sponge_world::pos::{BlockPos, Direction};
    use sponge_world::test_utils::{Fixture, give};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Answers a fixed result and records the running value it was given.
    struct Scripted {
        answer: EffectResult<InteractionResult>,
        seen: Rc<RefCell<Vec<InteractionResult>>>,
    }

    impl ProcessingSideEffect<UseBlockPipeline, InteractionResult, UseBlockArgs, InteractionResult>
        for Scripted
    {
        fn process_side_effect(
            &self,
            _pipeline: &UseBlockPipeline,
            _ctx: &PhaseContext,
            _levels: &mut Levels,
            cursor: &InteractionResult,
            _args: &UseBlockArgs,
        ) -> Result<EffectResult<InteractionResult>, PipelineError> {
            self.seen.borrow_mut().push(*cursor);
            Ok(self.answer.clone())
        }
    }

    fn setup() -> (Fixture, Levels, UseBlockArgs) {
        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_floor(0);
        let l = levels.level_mut(level).unwrap();
        let player = l.add_player("steve", BlockPos::new(0, 1, 0));
        give(l, player, fixture.item("dirt"), 5);
        let hit = BlockHitResult::new(BlockPos::new(1, 0, 1), Direction::Up);
        let args = UseBlockArgs::capture(
            &levels,
            LevelRef(level),
            player,
            InteractionHand::MainHand,
            hit,
        )
        .unwrap();
        (fixture, levels, args)
    }

    #[test]
    fn capture_copies_state_and_stack() {
        let (fixture, _levels, args) = setup();
        assert_eq!(args.state, fixture.stone());
        assert_eq!(args.copied_stack, Some(ItemStack::new(fixture.item("dirt"), 5)));
    }

    #[test]
    fn capture_rejects_non_players() {
        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_floor(0);
        let mob = levels.level_mut(level).unwrap().spawn_entity(sponge_world::entity::Entity {
            pos: BlockPos::new(0, 1, 0),
            kind: sponge_world::entity::EntityKind::Mob { name: "zombie".into() },
        });
        let err = UseBlockArgs::capture(
            &levels,
            LevelRef(level),
            mob,
            InteractionHand::MainHand,
            BlockHitResult::new(BlockPos::new(0, 0, 0), Direction::Up),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::NotAPlayer(id) if id == mob));
    }

    #[test]
    fn no_effects_pass() {
        let (_, mut levels, args) = setup();
        let ctx = PhaseContext::new(PhaseState::PlayerInteraction);
        let result = UseBlockPipeline::new(args)
            .process_interaction(&ctx, &mut levels)
            .unwrap();
        assert_eq!(result, InteractionResult::Pass);
    }

    #[test]
    fn runs_every_effect_without_early_exit() {
        let (_, mut levels, args) = setup();
        let ctx = PhaseContext::new(PhaseState::PlayerInteraction);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let pipeline = UseBlockPipeline::new(args)
            .add_effect(Scripted {
                answer: EffectResult::done(InteractionResult::Success),
                seen: Rc::clone(&seen),
            })
            .add_effect(Scripted {
                answer: EffectResult::null_return(),
                seen: Rc::clone(&seen),
            })
            .add_effect(Scripted {
                answer: EffectResult::pass(),
                seen: Rc::clone(&seen),
            });
        let result = pipeline.process_interaction(&ctx, &mut levels).unwrap();
        assert_eq!(result, InteractionResult::Success);
        assert_eq!(
            *seen.borrow(),
            vec![
                InteractionResult::Pass,
                InteractionResult::Success,
                InteractionResult::Success
            ]
        );
        assert_eq!(ctx.transactor().pushes(), 3);
        assert_eq!(ctx.transactor().pops(), 3);
    }

    #[test]
    fn later_definitive_result_replaces_earlier() {
        let (_, mut levels, args) = setup();
        let ctx = PhaseContext::new(PhaseState::PlayerInteraction);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let pipeline = UseBlockPipeline::new(args)
            .add_effect(Scripted {
                answer: EffectResult::done(InteractionResult::Success),
                seen: Rc::clone(&seen),
            })
            .add_effect(Scripted {
                answer: EffectResult::done(InteractionResult::Fail),
                seen: Rc::clone(&seen),
            });
        let result = pipeline.process_interaction(&ctx, &mut levels).unwrap();
        assert_eq!(result, InteractionResult::Fail);
    }
}
