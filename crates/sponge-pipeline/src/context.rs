//! The ambient phase a block change runs under.

use crate::config::{PipelineConfig, ThreadPolicy};
use crate::error::PipelineError;
use crate::transaction::Transactor;
use sponge_world::level::Levels;
use sponge_world::pos::BlockPos;
use std::backtrace::Backtrace;

/// What the server is doing while a change is processed. Side effects
/// consult it to skip work that does not apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseState {
    /// Regular simulation tick.
    Tick,
    /// Chunk generation. No physics, no client sync.
    WorldGeneration,
    /// Handling a player's click.
    PlayerInteraction,
    /// Restoring previously captured blocks. No drops.
    BlockRestoration,
    /// A plugin is changing the world directly.
    Plugin,
}

impl PhaseState {
    /// Neighbor notifications and shape cascades apply.
    pub fn does_block_physics(self) -> bool {
        !matches!(self, PhaseState::WorldGeneration)
    }

    pub fn does_drops(self) -> bool {
        !matches!(
            self,
            PhaseState::BlockRestoration | PhaseState::WorldGeneration
        )
    }

    pub fn notifies_clients(self) -> bool {
        !matches!(self, PhaseState::WorldGeneration)
    }
}

/// Phase state, transaction ledger and configuration for one batch of
/// block changes.
#[derive(Debug)]
pub struct PhaseContext {
    phase: PhaseState,
    transactor: Transactor,
    config: PipelineConfig,
}

impl PhaseContext {
    pub fn new(phase: PhaseState) -> Self {
        Self::with_config(phase, PipelineConfig::default())
    }

    pub fn with_config(phase: PhaseState, config: PipelineConfig) -> Self {
        Self {
            phase,
            transactor: Transactor::new(config.record_transactions),
            config,
        }
    }

    pub fn phase(&self) -> PhaseState {
        self.phase
    }

    pub fn transactor(&self) -> &Transactor {
        &self.transactor
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Verify the calling thread owns `levels`. Off-thread use is always
    /// logged with full context; under [`ThreadPolicy::Deny`] it is also
    /// refused.
    pub fn check_thread(&self, levels: &Levels, pos: BlockPos) -> Result<(), PipelineError> {
        if levels.is_owner_thread() {
            return Ok(());
        }
        let current = std::thread::current();
        tracing::error!(
            %pos,
            chunk = %pos.chunk_pos(),
            thread = ?current.id(),
            thread_name = current.name().unwrap_or("<unnamed>"),
            owner = ?levels.owner_thread(),
            phase = ?self.phase,
            backtrace = %Backtrace::force_capture(),
            "block change attempted off the owning thread"
        );
        match self.config.thread_policy {
            ThreadPolicy::Warn => Ok(()),
            ThreadPolicy::Deny => Err(PipelineError::OffThread {
                pos,
                chunk: pos.chunk_pos(),
            }),
        }
    }
}
