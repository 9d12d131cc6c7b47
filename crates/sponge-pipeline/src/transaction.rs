//! Transaction bookkeeping around side-effect execution.
//!
//! Every effect invocation runs inside a scope opened with
//! [`Transactor::push_effect`]. The returned [`EffectTransactor`] closes the
//! scope when dropped, so the ledger stays balanced on every exit path:
//! definitive results, `?` error propagation and panics alike.
//!
//! Facts about the world that an effect changes are recorded as
//! [`GameTransaction`]s attached to the innermost open scope. The resulting
//! tree can be inspected, undone, or flattened into a
//! [`LedgerLog`](crate::ledger::LedgerLog) for replay.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use sponge_world::block::{BlockEntity, BlockState};
use sponge_world::entity::{Entity, EntityKind};
use sponge_world::flags::BlockChangeFlags;
use sponge_world::handle::LevelRef;
use sponge_world::id::{EntityId, LevelId};
use sponge_world::interaction::{InteractionHand, InteractionResult};
use sponge_world::item::{ItemDrop, ItemStack};
use sponge_world::level::{Level, Levels};
use sponge_world::pos::BlockPos;
use std::cell::{Cell, RefCell};

// ---------------------------------------------------------------------------
// ResultingTransactionBySideEffect
// ---------------------------------------------------------------------------

/// A side effect paired with the name the ledger records it under.
/// Immutable once built.
pub struct ResultingTransactionBySideEffect<E: ?Sized> {
    name: &'static str,
    effect: Box<E>,
}

impl<E: ?Sized> ResultingTransactionBySideEffect<E> {
    pub fn named(name: &'static str, effect: Box<E>) -> Self {
        Self { name, effect }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn effect(&self) -> &E {
        &self.effect
    }
}

impl<E: ?Sized> std::fmt::Debug for ResultingTransactionBySideEffect<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ResultingTransactionBySideEffect")
            .field(&self.name)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// GameTransaction
// ---------------------------------------------------------------------------

/// The triggering change of a chunk/world pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockChange {
    pub level: LevelId,
    pub pos: BlockPos,
    pub original: BlockState,
    pub new: BlockState,
    pub flags: BlockChangeFlags,
}

/// A recorded fact about a world mutation. Each variant carries what is
/// needed to reverse it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameTransaction {
    ChangeBlock(BlockChange),
    AddBlockEntity {
        level: LevelId,
        pos: BlockPos,
        entity: BlockEntity,
        previous: Option<BlockEntity>,
    },
    RemoveBlockEntity {
        level: LevelId,
        pos: BlockPos,
        entity: BlockEntity,
    },
    /// Ticker membership of `pos` switched to `ticking`.
    Ticker {
        level: LevelId,
        pos: BlockPos,
        ticking: bool,
    },
    NeighborNotification {
        level: LevelId,
        source: BlockPos,
        target: BlockPos,
    },
    SpawnDrops {
        level: LevelId,
        entities: Vec<EntityId>,
        drops: Vec<ItemDrop>,
    },
    Interaction {
        level: LevelId,
        player: EntityId,
        hand: InteractionHand,
        pos: BlockPos,
        result: InteractionResult,
    },
    /// One item was taken from the player's hand; `before` is the slot
    /// as it was.
    ConsumeItem {
        level: LevelId,
        player: EntityId,
        hand: InteractionHand,
        before: ItemStack,
    },
}

fn set_ticking(level: &mut Level, pos: BlockPos, ticking: bool) {
    if ticking {
        level.ticking_block_entities.insert(pos);
    } else {
        level.ticking_block_entities.remove(&pos);
    }
}

impl GameTransaction {
    pub fn level(&self) -> LevelId {
        match self {
            GameTransaction::ChangeBlock(change) => change.level,
            GameTransaction::AddBlockEntity { level, .. }
            | GameTransaction::RemoveBlockEntity { level, .. }
            | GameTransaction::Ticker { level, .. }
            | GameTransaction::NeighborNotification { level, .. }
            | GameTransaction::SpawnDrops { level, .. }
            | GameTransaction::Interaction { level, .. }
            | GameTransaction::ConsumeItem { level, .. } => *level,
        }
    }

    /// Reverse this transaction in storage. Returns `false` for
    /// transactions that leave nothing to reverse.
    pub fn revert(&self, levels: &mut Levels) -> Result<bool, PipelineError> {
        let level = LevelRef(self.level()).resolve_mut(levels)?;
        match self {
            GameTransaction::ChangeBlock(change) => {
                level.set_block_raw(change.pos, change.original);
            }
            GameTransaction::AddBlockEntity { pos, previous, .. } => {
                if let Some(chunk) = level.chunk_at_mut(*pos) {
                    match previous {
                        Some(previous) => {
                            chunk.set_block_entity(previous.clone());
                        }
                        None => {
                            chunk.remove_block_entity(*pos);
                        }
                    }
                }
            }
            GameTransaction::RemoveBlockEntity { pos, entity, .. } => {
                if let Some(chunk) = level.chunk_at_mut(*pos) {
                    chunk.set_block_entity(entity.clone());
                }
            }
            GameTransaction::Ticker { pos, ticking, .. } => {
                set_ticking(level, *pos, !*ticking);
            }
            GameTransaction::SpawnDrops { entities, .. } => {
                for id in entities {
                    level.entities.remove(*id);
                }
            }
            GameTransaction::ConsumeItem {
                player,
                hand,
                before,
                ..
            } => {
                let Some(player) = level.player_mut(*player) else {
                    return Ok(false);
                };
                *player.held_mut(*hand) = Some(*before);
            }
            GameTransaction::NeighborNotification { .. } | GameTransaction::Interaction { .. } => {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Apply this transaction forward again. Returns `false` for
    /// transactions that only describe what happened.
    pub fn apply(&self, levels: &mut Levels) -> Result<bool, PipelineError> {
        let level = LevelRef(self.level()).resolve_mut(levels)?;
        match self {
            GameTransaction::ChangeBlock(change) => {
                level.set_block_raw(change.pos, change.new);
            }
            GameTransaction::AddBlockEntity { pos, entity, .. } => {
                level.load_chunk(pos.chunk_pos());
                if let Some(chunk) = level.chunk_at_mut(*pos) {
                    chunk.set_block_entity(entity.clone());
                }
            }
            GameTransaction::RemoveBlockEntity { pos, .. } => {
                if let Some(chunk) = level.chunk_at_mut(*pos) {
                    chunk.remove_block_entity(*pos);
                }
            }
            GameTransaction::Ticker { pos, ticking, .. } => {
                set_ticking(level, *pos, *ticking);
            }
            GameTransaction::ConsumeItem {
                player,
                hand,
                before,
                ..
            } => {
                let Some(player) = level.player_mut(*player) else {
                    return Ok(false);
                };
                let mut after = *before;
                after.shrink(1);
                *player.held_mut(*hand) = (!after.is_empty()).then_some(after);
            }
            GameTransaction::SpawnDrops { drops, .. } => {
                for drop in drops {
                    level.spawn_entity(Entity {
                        pos: drop.pos,
                        kind: EntityKind::Item {
                            stack: drop.stack,
                            source: drop.source,
                        },
                    });
                }
            }
            GameTransaction::NeighborNotification { .. } | GameTransaction::Interaction { .. } => {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Ledger tree
// ---------------------------------------------------------------------------

/// One side-effect invocation and everything recorded while it was open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectRecord {
    pub effect: &'static str,
    pub entries: Vec<LedgerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEntry {
    Transaction(GameTransaction),
    Effect(EffectRecord),
}

fn flatten_into(entries: &[LedgerEntry], out: &mut Vec<GameTransaction>) {
    for entry in entries {
        match entry {
            LedgerEntry::Transaction(tx) => out.push(tx.clone()),
            LedgerEntry::Effect(record) => flatten_into(&record.entries, out),
        }
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    roots: Vec<LedgerEntry>,
    open: Vec<EffectRecord>,
}

// ---------------------------------------------------------------------------
// Transactor
// ---------------------------------------------------------------------------

/// Single-threaded ledger of side-effect scopes and the transactions
/// recorded inside them.
#[derive(Debug)]
pub struct Transactor {
    recording: bool,
    state: RefCell<LedgerState>,
    pushes: Cell<u64>,
    pops: Cell<u64>,
}

impl Default for Transactor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Transactor {
    /// A transactor that records transactions only when `recording` is set.
    /// Scope counters are kept either way.
    pub fn new(recording: bool) -> Self {
        Self {
            recording,
            state: RefCell::new(LedgerState::default()),
            pushes: Cell::new(0),
            pops: Cell::new(0),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Open a scope for one side-effect invocation. The scope closes when
    /// the returned guard is dropped.
    pub fn push_effect<E: ?Sized>(
        &self,
        effect: &ResultingTransactionBySideEffect<E>,
    ) -> EffectTransactor<'_> {
        self.pushes.set(self.pushes.get() + 1);
        if self.recording {
            self.state.borrow_mut().open.push(EffectRecord {
                effect: effect.name(),
                entries: Vec::new(),
            });
        }
        tracing::trace!(effect = effect.name(), depth = self.depth(), "effect scope opened");
        EffectTransactor {
            transactor: self,
            effect: effect.name(),
        }
    }

    fn pop_effect(&self, effect: &'static str) {
        self.pops.set(self.pops.get() + 1);
        if self.recording {
            let mut state = self.state.borrow_mut();
            if let Some(record) = state.open.pop() {
                debug_assert_eq!(record.effect, effect, "effect scopes closed out of order");
                let entry = LedgerEntry::Effect(record);
                match state.open.last_mut() {
                    Some(parent) => parent.entries.push(entry),
                    None => state.roots.push(entry),
                }
            }
        }
        tracing::trace!(effect, depth = self.depth(), "effect scope closed");
    }

    /// Record a transaction under the innermost open scope.
    pub fn log(&self, transaction: GameTransaction) {
        if !self.recording {
            return;
        }
        let mut state = self.state.borrow_mut();
        let entry = LedgerEntry::Transaction(transaction);
        match state.open.last_mut() {
            Some(record) => record.entries.push(entry),
            None => state.roots.push(entry),
        }
    }

    pub fn pushes(&self) -> u64 {
        self.pushes.get()
    }

    pub fn pops(&self) -> u64 {
        self.pops.get()
    }

    /// Number of scopes currently open.
    pub fn depth(&self) -> u64 {
        self.pushes.get() - self.pops.get()
    }

    /// The closed part of the ledger as a tree.
    pub fn records(&self) -> Vec<LedgerEntry> {
        self.state.borrow().roots.clone()
    }

    /// Every closed transaction in the order it was recorded.
    pub fn transactions(&self) -> Vec<GameTransaction> {
        let mut out = Vec::new();
        flatten_into(&self.state.borrow().roots, &mut out);
        out
    }

    /// Drop every closed record.
    pub fn clear(&self) {
        self.state.borrow_mut().roots.clear();
    }

    /// Reverse every closed transaction, newest first, then clear the
    /// ledger. Returns the number of transactions that changed storage.
    ///
    /// On error the transactions that were not reverted stay in the ledger,
    /// flattened, and the ones already reverted are gone from it.
    pub fn undo(&self, levels: &mut Levels) -> Result<usize, PipelineError> {
        let transactions = self.transactions();
        let mut reverted = 0;
        for (index, tx) in transactions.iter().enumerate().rev() {
            match tx.revert(levels) {
                Ok(true) => reverted += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(reverted, remaining = index + 1, %err, "undo stopped");
                    self.state.borrow_mut().roots = transactions[..=index]
                        .iter()
                        .cloned()
                        .map(LedgerEntry::Transaction)
                        .collect();
                    return Err(err);
                }
            }
        }
        self.clear();
        tracing::debug!(reverted, total = transactions.len(), "ledger undone");
        Ok(reverted)
    }
}

/// Guard for an open side-effect scope.
#[must_use = "the effect scope closes as soon as the guard is dropped"]
pub struct EffectTransactor<'a> {
    transactor: &'a Transactor,
    effect: &'static str,
}

impl EffectTransactor<'_> {
    pub fn effect(&self) -> &'static str {
        self.effect
    }
}

impl Drop for EffectTransactor<'_> {
    fn drop(&mut self) {
        self.transactor.pop_effect(self.effect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sponge_world::test_utils::Fixture;

    fn wrapped(name: &'static str) -> ResultingTransactionBySideEffect<()> {
        ResultingTransactionBySideEffect::named(name, Box::new(()))
    }

    fn neighbor(level: LevelId, y: i32) -> GameTransaction {
        GameTransaction::NeighborNotification {
            level,
            source: BlockPos::new(0, 0, 0),
            target: BlockPos::new(0, y, 0),
        }
    }

    #[test]
    fn scopes_balance_and_nest() {
        let (_, level) = Fixture::new().levels_with_level();
        let transactor = Transactor::default();
        {
            let _outer = transactor.push_effect(&wrapped("Outer"));
            transactor.log(neighbor(level, 1));
            {
                let _inner = transactor.push_effect(&wrapped("Inner"));
                assert_eq!(transactor.depth(), 2);
                transactor.log(neighbor(level, 2));
            }
            transactor.log(neighbor(level, 3));
        }
        assert_eq!(transactor.pushes(), 2);
        assert_eq!(transactor.pops(), 2);
        assert_eq!(transactor.depth(), 0);

        let records = transactor.records();
        assert_eq!(records.len(), 1);
        let LedgerEntry::Effect(outer) = &records[0] else {
            panic!("expected an effect record");
        };
        assert_eq!(outer.effect, "Outer");
        assert_eq!(outer.entries.len(), 3);
        assert!(matches!(&outer.entries[1], LedgerEntry::Effect(r) if r.effect == "Inner"));

        let flat = transactor.transactions();
        assert_eq!(flat, vec![neighbor(level, 1), neighbor(level, 2), neighbor(level, 3)]);
    }

    #[test]
    fn log_without_scope_goes_to_root() {
        let (_, level) = Fixture::new().levels_with_level();
        let transactor = Transactor::default();
        transactor.log(neighbor(level, 1));
        assert_eq!(transactor.records(), vec![LedgerEntry::Transaction(neighbor(level, 1))]);
    }

    #[test]
    fn disabled_recording_still_counts_scopes() {
        let (_, level) = Fixture::new().levels_with_level();
        let transactor = Transactor::new(false);
        {
            let _scope = transactor.push_effect(&wrapped("Effect"));
            transactor.log(neighbor(level, 1));
        }
        assert_eq!(transactor.pushes(), 1);
        assert_eq!(transactor.pops(), 1);
        assert!(transactor.records().is_empty());
    }

    #[test]
    fn scope_closes_on_error_return() {
        let transactor = Transactor::default();
        let run = || -> Result<(), PipelineError> {
            let _scope = transactor.push_effect(&wrapped("Failing"));
            Err(PipelineError::Effect {
                effect: "Failing",
                reason: "boom".into(),
            })
        };
        assert!(run().is_err());
        assert_eq!(transactor.pushes(), transactor.pops());
    }

    #[test]
    fn undo_restores_blocks_and_entities() {
        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_floor(0);
        let pos = BlockPos::new(1, 0, 1);
        let transactor = Transactor::default();

        let l = levels.level_mut(level).unwrap();
        l.set_block_raw(pos, fixture.chest());
        let entity = BlockEntity::new(sponge_world::test_utils::CHEST_ENTITY, pos);
        l.chunk_at_mut(pos).unwrap().set_block_entity(entity.clone());
        transactor.log(GameTransaction::ChangeBlock(BlockChange {
            level,
            pos,
            original: fixture.stone(),
            new: fixture.chest(),
            flags: BlockChangeFlags::DEFAULT,
        }));
        transactor.log(GameTransaction::AddBlockEntity {
            level,
            pos,
            entity,
            previous: None,
        });
        transactor.log(neighbor(level, 1));

        assert_eq!(transactor.undo(&mut levels).unwrap(), 2);
        let l = levels.level(level).unwrap();
        assert_eq!(l.get_block_state(pos), fixture.stone());
        assert!(l.block_entity(pos).is_none());
        assert!(transactor.records().is_empty());
    }

    #[test]
    fn failed_undo_keeps_unreverted_transactions() {
        let fixture = Fixture::new();
        let (mut levels, first) = fixture.levels_with_floor(0);
        let second = levels.create_level("nether", fixture.registry.clone());
        let change = |level, x| {
            GameTransaction::ChangeBlock(BlockChange {
                level,
                pos: BlockPos::new(x, 0, 0),
                original: fixture.stone(),
                new: fixture.glass(),
                flags: BlockChangeFlags::DEFAULT,
            })
        };
        let transactor = Transactor::default();
        for (level, x) in [(first, 1), (second, 2), (first, 3)] {
            let pos = BlockPos::new(x, 0, 0);
            levels.level_mut(level).unwrap().set_block_raw(pos, fixture.glass());
            transactor.log(change(level, x));
        }
        levels.unload_level(second);

        assert!(matches!(transactor.undo(&mut levels), Err(PipelineError::Stale(_))));
        assert_eq!(transactor.transactions(), vec![change(first, 1), change(second, 2)]);
        let l = levels.level(first).unwrap();
        assert_eq!(l.get_block_state(BlockPos::new(3, 0, 0)), fixture.stone());
        assert_eq!(l.get_block_state(BlockPos::new(1, 0, 0)), fixture.glass());
    }

    #[test]
    fn ticker_membership_reverts_and_reapplies() {
        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_level();
        let pos = BlockPos::new(2, 1, 2);
        let tx = GameTransaction::Ticker {
            level,
            pos,
            ticking: true,
        };
        levels.level_mut(level).unwrap().ticking_block_entities.insert(pos);

        assert!(tx.revert(&mut levels).unwrap());
        assert!(!levels.level(level).unwrap().ticking_block_entities.contains(&pos));
        assert!(tx.apply(&mut levels).unwrap());
        assert!(levels.level(level).unwrap().ticking_block_entities.contains(&pos));
    }

    #[test]
    fn consumed_item_returns_to_hand() {
        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_level();
        let dirt = fixture.item("dirt");
        let player = levels
            .level_mut(level)
            .unwrap()
            .add_player("alex", BlockPos::new(0, 1, 0));
        let tx = GameTransaction::ConsumeItem {
            level,
            player,
            hand: InteractionHand::MainHand,
            before: ItemStack::new(dirt, 1),
        };

        assert!(tx.revert(&mut levels).unwrap());
        let held = |levels: &Levels| {
            let l = levels.level(level).unwrap();
            l.player(player).unwrap().held(InteractionHand::MainHand).copied()
        };
        assert_eq!(held(&levels), Some(ItemStack::new(dirt, 1)));
        assert!(tx.apply(&mut levels).unwrap());
        assert_eq!(held(&levels), None);
    }

    #[test]
    fn revert_on_unloaded_level_is_stale() {
        let fixture = Fixture::new();
        let (mut levels, level) = fixture.levels_with_level();
        let tx = neighbor(level, 1);
        levels.unload_level(level);
        assert!(matches!(tx.revert(&mut levels), Err(PipelineError::Stale(_))));
    }
}
