use sponge_world::handle::StaleReference;
use sponge_world::id::EntityId;
use sponge_world::pos::{BlockPos, ChunkPos};

/// A pipeline builder was finalized without a mandatory piece.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("pipeline built without a triggering block change")]
    MissingTransaction,
    #[error("pipeline built without a level")]
    MissingLevel,
    #[error("pipeline built without a chunk")]
    MissingChunk,
    #[error("pipeline built without a chunk section")]
    MissingSection,
    #[error("chunk section belongs to a different chunk than the pipeline")]
    SectionChunkMismatch,
    #[error(transparent)]
    Stale(#[from] StaleReference),
}

/// Errors surfaced while building or running a pipeline.
///
/// A chain that runs out of effects without a definitive result is *not*
/// an error: it is reported through the pipeline outcome and logged.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A world, chunk or section handle was used after unload.
    #[error(transparent)]
    Stale(#[from] StaleReference),

    #[error(transparent)]
    Build(#[from] BuildError),

    /// Execution was attempted off the thread that owns the levels.
    #[error("block change at {pos} (chunk {chunk}) attempted off the owning thread")]
    OffThread { pos: BlockPos, chunk: ChunkPos },

    /// A side effect failed in a way it could not express as a result.
    #[error("side effect {effect} failed: {reason}")]
    Effect { effect: &'static str, reason: String },

    #[error("entity {0:?} is not a player")]
    NotAPlayer(EntityId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use sponge_world::id::LevelId;

    #[test]
    fn build_error_display_messages() {
        let msg = format!("{}", BuildError::MissingTransaction);
        assert!(msg.contains("triggering block change"), "got: {msg}");
        let msg = format!("{}", BuildError::MissingChunk);
        assert!(msg.contains("chunk"), "got: {msg}");
    }

    #[test]
    fn stale_reference_converts_transparently() {
        let mut sm = SlotMap::<LevelId, ()>::with_key();
        let id = sm.insert(());
        let err: PipelineError = StaleReference::Level(id).into();
        assert!(matches!(err, PipelineError::Stale(StaleReference::Level(_))));
        assert!(format!("{err}").contains("unloaded"));
    }

    #[test]
    fn off_thread_message_names_position() {
        let err = PipelineError::OffThread {
            pos: BlockPos::new(1, 2, 3),
            chunk: ChunkPos::new(0, 0),
        };
        let msg = format!("{err}");
        assert!(msg.contains("(1, 2, 3)"), "got: {msg}");
        assert!(msg.contains("[0, 0]"), "got: {msg}");
    }
}
