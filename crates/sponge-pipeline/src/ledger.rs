//! Binary export of the transaction ledger for later replay.
//!
//! A [`LedgerLog`] is the flattened, chronological list of transactions a
//! [`Transactor`] recorded, prefixed with a versioned header and encoded
//! with `bitcode`.

use crate::error::PipelineError;
use crate::transaction::{GameTransaction, Transactor};
use serde::{Deserialize, Serialize};
use sponge_world::level::Levels;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a ledger export.
pub const LEDGER_MAGIC: u32 = 0x5350_4C01;

/// Current format version. Increment when breaking the wire format.
pub const LEDGER_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", LEDGER_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported ledger version: expected {}, got {}", LEDGER_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("header counts {header} transactions, log holds {actual}")]
    CountMismatch { header: u32, actual: usize },
    #[error("{0} transactions do not fit a ledger header")]
    TooLarge(usize),
    #[error("replay failed: {0}")]
    Replay(#[from] PipelineError),
}

// ---------------------------------------------------------------------------
// Header + log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerHeader {
    pub magic: u32,
    pub version: u32,
    /// Number of transactions in the log.
    pub count: u32,
}

impl LedgerHeader {
    pub fn new(count: usize) -> Result<Self, LedgerError> {
        Ok(Self {
            magic: LEDGER_MAGIC,
            version: LEDGER_VERSION,
            count: u32::try_from(count).map_err(|_| LedgerError::TooLarge(count))?,
        })
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.magic != LEDGER_MAGIC {
            return Err(LedgerError::InvalidMagic(self.magic));
        }
        if self.version != LEDGER_VERSION {
            return Err(LedgerError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLog {
    pub header: LedgerHeader,
    pub transactions: Vec<GameTransaction>,
}

impl LedgerLog {
    /// Snapshot every closed transaction in `transactor`.
    pub fn capture(transactor: &Transactor) -> Result<Self, LedgerError> {
        let transactions = transactor.transactions();
        Ok(Self {
            header: LedgerHeader::new(transactions.len())?,
            transactions,
        })
    }

    /// Check the header and that it counts the transactions actually held.
    pub fn validate(&self) -> Result<(), LedgerError> {
        self.header.validate()?;
        if usize::try_from(self.header.count).ok() != Some(self.transactions.len()) {
            return Err(LedgerError::CountMismatch {
                header: self.header.count,
                actual: self.transactions.len(),
            });
        }
        Ok(())
    }

    pub fn serialize(&self) -> Result<Vec<u8>, LedgerError> {
        bitcode::serialize(self).map_err(|e| LedgerError::Encode(e.to_string()))
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, LedgerError> {
        let log: LedgerLog =
            bitcode::deserialize(data).map_err(|e| LedgerError::Decode(e.to_string()))?;
        log.validate()?;
        Ok(log)
    }

    /// Re-apply every transaction in order, directly in storage. Returns
    /// the number of transactions that changed storage.
    pub fn replay(&self, levels: &mut Levels) -> Result<usize, LedgerError> {
        self.validate()?;
        let mut applied = 0;
        for tx in &self.transactions {
            if tx.apply(levels)? {
                applied += 1;
            }
        }
        tracing::debug!(applied, total = self.transactions.len(), "ledger replayed");
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{PhaseContext, PhaseState};
    use crate::tracker;
    use sponge_world::flags::BlockChangeFlags;
    use sponge_world::handle::LevelRef;
    use sponge_world::pos::BlockPos;
    use sponge_world::test_utils::Fixture;

    #[test]
    fn header_validation() {
        let header = LedgerHeader::new(0).unwrap();
        assert!(header.validate().is_ok());
        let bad_magic = LedgerHeader {
            magic: 0xDEAD_BEEF,
            ..header.clone()
        };
        assert!(matches!(bad_magic.validate(), Err(LedgerError::InvalidMagic(0xDEAD_BEEF))));
        let future = LedgerHeader {
            version: LEDGER_VERSION + 1,
            ..header
        };
        assert!(matches!(future.validate(), Err(LedgerError::UnsupportedVersion(_))));
    }

    #[test]
    fn header_count_must_match_transactions() {
        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_floor(0);
        let ctx = PhaseContext::new(PhaseState::Tick);
        tracker::set_block(&ctx, &mut levels, LevelRef(level), BlockPos::new(2, 1, 2), fixture.glass(), BlockChangeFlags::DEFAULT)
            .unwrap();
        let mut log = LedgerLog::capture(ctx.transactor()).unwrap();
        let actual = log.transactions.len();
        log.header.count += 1;

        let bytes = log.serialize().unwrap();
        assert!(matches!(
            LedgerLog::deserialize(&bytes),
            Err(LedgerError::CountMismatch { actual: a, .. }) if a == actual
        ));
        assert!(matches!(log.replay(&mut levels), Err(LedgerError::CountMismatch { .. })));

        log.header.count = 0;
        log.transactions.clear();
        assert!(LedgerLog::deserialize(&log.serialize().unwrap()).is_ok());
    }

    #[test]
    fn oversized_count_is_refused() {
        if let Ok(count) = usize::try_from(u64::from(u32::MAX) + 1) {
            assert!(matches!(LedgerHeader::new(count), Err(LedgerError::TooLarge(c)) if c == count));
        }
        assert_eq!(LedgerHeader::new(3).unwrap().count, 3);
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(
            LedgerLog::deserialize(&[1, 2, 3]),
            Err(LedgerError::Decode(_))
        ));
    }

    #[test]
    fn undo_then_replay_restores_the_change() {
        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_floor(0);
        let ctx = PhaseContext::new(PhaseState::Tick);
        let world = LevelRef(level);
        let pos = BlockPos::new(9, 1, 9);
        tracker::set_block(&ctx, &mut levels, world, pos, fixture.chest(), BlockChangeFlags::DEFAULT)
            .unwrap();

        let bytes = LedgerLog::capture(ctx.transactor()).unwrap().serialize().unwrap();
        let log = LedgerLog::deserialize(&bytes).unwrap();
        assert_eq!(log.header.count as usize, log.transactions.len());

        ctx.transactor().undo(&mut levels).unwrap();
        {
            let l = levels.level(level).unwrap();
            assert!(l.get_block_state(pos).is_air());
            assert!(l.block_entity(pos).is_none());
        }

        log.replay(&mut levels).unwrap();
        let l = levels.level(level).unwrap();
        assert_eq!(l.get_block_state(pos), fixture.chest());
        assert!(l.block_entity(pos).is_some());
    }
}
