//! Property-based tests for chain driving.
//!
//! Generates random stub sequences and checks that the observed run
//! matches a straightforward model of the chain.

use proptest::prelude::*;
use sponge_pipeline::context::{PhaseContext, PhaseState};
use sponge_pipeline::effect::block_effect;
use sponge_pipeline::pipeline::ChunkOutcome;
use sponge_pipeline::test_utils::*;
use sponge_world::block::BlockState;
use sponge_world::item::{ItemDrop, ItemStack};
use sponge_world::pos::BlockPos;
use sponge_world::test_utils::Fixture;

const POS: BlockPos = BlockPos::new(5, 1, 5);
const LABELS: [&str; 10] = ["e0", "e1", "e2", "e3", "e4", "e5", "e6", "e7", "e8", "e9"];

// ===========================================================================
// Generators
// ===========================================================================

#[derive(Debug, Clone, Copy)]
enum Step {
    Pass,
    Drops,
    EmptyDrops,
    DoneState,
    DoneNull,
    Fail,
}

fn arb_steps(max: usize) -> impl Strategy<Value = Vec<Step>> {
    proptest::collection::vec(
        prop_oneof![
            4 => Just(Step::Pass),
            2 => Just(Step::Drops),
            1 => Just(Step::EmptyDrops),
            1 => Just(Step::DoneState),
            1 => Just(Step::DoneNull),
            1 => Just(Step::Fail),
        ],
        1..=max,
    )
}

fn drops_for(fixture: &Fixture, index: usize) -> Vec<ItemDrop> {
    vec![ItemDrop::new(
        POS,
        ItemStack::new(fixture.item("dirt"), index as u32 + 1),
        None,
    )]
}

fn behavior(fixture: &Fixture, index: usize, step: Step) -> StubBehavior {
    match step {
        Step::Pass => StubBehavior::Pass,
        Step::Drops => StubBehavior::Drops(drops_for(fixture, index)),
        Step::EmptyDrops => StubBehavior::Drops(Vec::new()),
        Step::DoneState => StubBehavior::Done(Some(fixture.stone())),
        Step::DoneNull => StubBehavior::Done(None),
        Step::Fail => StubBehavior::Fail,
    }
}

/// Index of the last stub expected to run.
fn last_run(steps: &[Step]) -> usize {
    steps
        .iter()
        .position(|s| matches!(s, Step::DoneState | Step::DoneNull | Step::Fail))
        .unwrap_or(steps.len() - 1)
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Stubs run in order and the chain stops at the first definitive
    /// result or error.
    #[test]
    fn chain_runs_a_prefix_in_order(steps in arb_steps(10)) {
        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_floor(0);
        let log = invocation_log();
        let effects = steps
            .iter()
            .enumerate()
            .map(|(i, step)| block_effect(StubEffect::new(LABELS[i], behavior(&fixture, i, *step), &log)))
            .collect();
        let pipeline = chunk_pipeline_with(&levels, level, POS, fixture.stone(), effects);
        let ctx = PhaseContext::new(PhaseState::Tick);

        let result = pipeline.process_change(&ctx, &mut levels, BlockState::AIR, fixture.stone(), POS, 8);

        let last = last_run(&steps);
        prop_assert_eq!(labels(&log), LABELS[..=last].to_vec());
        prop_assert_eq!(ctx.transactor().pushes(), last as u64 + 1);
        prop_assert_eq!(ctx.transactor().depth(), 0);

        match steps[last] {
            Step::Fail => prop_assert!(result.is_err()),
            Step::DoneState => prop_assert_eq!(result.unwrap(), ChunkOutcome::Resolved(Some(fixture.stone()))),
            Step::DoneNull => prop_assert_eq!(result.unwrap(), ChunkOutcome::Resolved(None)),
            _ => prop_assert_eq!(result.unwrap(), ChunkOutcome::FellThrough),
        }
    }

    /// Each stub sees the drops of the first earlier stub that produced a
    /// non-empty list, and nothing else of the cursor changes.
    #[test]
    fn drops_fold_at_most_once(steps in arb_steps(10)) {
        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_floor(0);
        let log = invocation_log();
        let effects = steps
            .iter()
            .enumerate()
            .map(|(i, step)| block_effect(StubEffect::new(LABELS[i], behavior(&fixture, i, *step), &log)))
            .collect();
        let pipeline = chunk_pipeline_with(&levels, level, POS, fixture.stone(), effects);
        let ctx = PhaseContext::new(PhaseState::Tick);

        let _ = pipeline.process_change(&ctx, &mut levels, BlockState::AIR, fixture.stone(), POS, 8);

        let seen = log.borrow();
        let mut expected: Vec<ItemDrop> = Vec::new();
        for (i, invocation) in seen.iter().enumerate() {
            prop_assert_eq!(&invocation.cursor.drops, &expected);
            prop_assert_eq!(invocation.cursor.state, BlockState::AIR);
            prop_assert_eq!(invocation.cursor.pos, POS);
            if expected.is_empty() && matches!(steps[i], Step::Drops) {
                expected = drops_for(&fixture, i);
            }
        }
    }
}
