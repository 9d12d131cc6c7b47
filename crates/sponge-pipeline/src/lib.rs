//! Sponge Pipeline -- ordered side-effect chains for block changes.
//!
//! Every block change made through [`tracker`] is expressed as a chain of
//! small side effects run in a fixed order. The chunk stage writes the
//! section, heightmap, light counters and block entity; the world stage
//! propagates light, client updates, neighbor notifications and support
//! cascades. Block-entity placement/removal and player interactions use
//! their own chains built the same way.
//!
//! # Driving a chain
//!
//! Each effect returns an [`effect::EffectResult`]: either continue with the
//! same cursor, or stop with a result. The first definitive result ends the
//! chain. Every invocation runs inside a scope opened on the
//! [`transaction::Transactor`], which records the
//! [`transaction::GameTransaction`]s the effect logs and closes the scope
//! on every exit path.
//!
//! ```rust,ignore
//! let ctx = PhaseContext::new(PhaseState::Tick);
//! tracker::set_block(&ctx, &mut levels, LevelRef(level), pos, stone, BlockChangeFlags::DEFAULT)?;
//! ctx.transactor().undo(&mut levels)?;
//! ```
//!
//! # Key Types
//!
//! - [`pipeline::ChunkPipeline`] / [`pipeline::WorldPipeline`] -- the two block-change stages.
//! - [`pipeline::TileEntityPipeline`] -- block-entity placement and removal.
//! - [`pipeline::InteractionPipeline`] -- use-block and use-item-on-block.
//! - [`cursor::PipelineCursor`] -- immutable snapshot passed to every effect.
//! - [`context::PhaseContext`] -- phase, config and transactor for one run.
//! - [`ledger::LedgerLog`] -- binary export of recorded transactions.

pub mod config;
pub mod context;
pub mod cursor;
pub mod effect;
pub mod error;
pub mod ledger;
pub mod pipeline;
pub mod tracker;
pub mod transaction;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
