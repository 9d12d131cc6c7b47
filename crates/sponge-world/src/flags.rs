//! Caller-supplied options for a single block change.

use serde::{Deserialize, Serialize};

/// Bitset controlling what a block change triggers beyond the write itself.
/// Opaque to the pipeline orchestration; individual side effects consult it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockChangeFlags(pub u16);

impl BlockChangeFlags {
    pub const NONE: BlockChangeFlags = BlockChangeFlags(0);
    pub const NOTIFY_NEIGHBORS: BlockChangeFlags = BlockChangeFlags(1);
    pub const NOTIFY_CLIENTS: BlockChangeFlags = BlockChangeFlags(1 << 1);
    pub const IGNORE_RENDER: BlockChangeFlags = BlockChangeFlags(1 << 2);
    pub const FORCE_RERENDER: BlockChangeFlags = BlockChangeFlags(1 << 3);
    pub const DENY_NEIGHBOR_SHAPE_UPDATE: BlockChangeFlags = BlockChangeFlags(1 << 4);
    pub const SUPPRESS_DROPS: BlockChangeFlags = BlockChangeFlags(1 << 5);
    pub const BLOCK_MOVING: BlockChangeFlags = BlockChangeFlags(1 << 6);
    pub const LIGHTING_UPDATES: BlockChangeFlags = BlockChangeFlags(1 << 7);

    /// Neighbors, clients and lighting: what an ordinary placement does.
    pub const DEFAULT: BlockChangeFlags = BlockChangeFlags(
        Self::NOTIFY_NEIGHBORS.0 | Self::NOTIFY_CLIENTS.0 | Self::LIGHTING_UPDATES.0,
    );

    pub fn contains(self, other: BlockChangeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: BlockChangeFlags) -> Self {
        Self(self.0 | other.0)
    }

    pub fn without(self, other: BlockChangeFlags) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn notify_neighbors(self) -> bool {
        self.contains(Self::NOTIFY_NEIGHBORS)
    }

    pub fn notify_clients(self) -> bool {
        self.contains(Self::NOTIFY_CLIENTS)
    }

    pub fn update_neighbor_shapes(self) -> bool {
        !self.contains(Self::DENY_NEIGHBOR_SHAPE_UPDATE)
    }

    /// Whether blocks broken as a consequence of this change drop items.
    pub fn neighbor_drops(self) -> bool {
        !self.contains(Self::SUPPRESS_DROPS)
    }

    pub fn update_lighting(self) -> bool {
        self.contains(Self::LIGHTING_UPDATES)
    }

    pub fn is_moving(self) -> bool {
        self.contains(Self::BLOCK_MOVING)
    }
}

impl Default for BlockChangeFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::ops::BitOr for BlockChangeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_contains_expected_bits() {
        let flags = BlockChangeFlags::DEFAULT;
        assert!(flags.notify_neighbors());
        assert!(flags.notify_clients());
        assert!(flags.update_lighting());
        assert!(flags.update_neighbor_shapes());
        assert!(flags.neighbor_drops());
        assert!(!(flags | BlockChangeFlags::SUPPRESS_DROPS).neighbor_drops());
    }

    #[test]
    fn none_disables_everything() {
        let flags = BlockChangeFlags::NONE;
        assert!(!flags.notify_neighbors());
        assert!(!flags.notify_clients());
        assert!(!flags.update_lighting());
    }

    #[test]
    fn with_and_without() {
        let flags = BlockChangeFlags::DEFAULT | BlockChangeFlags::DENY_NEIGHBOR_SHAPE_UPDATE;
        assert!(!flags.update_neighbor_shapes());
        let flags = flags.without(BlockChangeFlags::NOTIFY_CLIENTS);
        assert!(!flags.notify_clients());
        assert!(flags.notify_neighbors());
    }
}
