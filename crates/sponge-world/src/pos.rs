//! Grid coordinates: block positions, chunk columns, and chunk sections.

use serde::{Deserialize, Serialize};

/// Lowest buildable y coordinate.
pub const MIN_BUILD_HEIGHT: i32 = 0;

/// Number of 16-block sections stacked in a chunk column.
pub const SECTION_COUNT: usize = 16;

/// One past the highest buildable y coordinate.
pub const MAX_BUILD_HEIGHT: i32 = MIN_BUILD_HEIGHT + (SECTION_COUNT as i32) * 16;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// The six faces of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    /// All six directions, in neighbor-update order.
    pub fn all() -> [Direction; 6] {
        [
            Direction::West,
            Direction::East,
            Direction::Down,
            Direction::Up,
            Direction::North,
            Direction::South,
        ]
    }

    /// Unit offset for this direction.
    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            Direction::Down => (0, -1, 0),
            Direction::Up => (0, 1, 0),
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::West => (-1, 0, 0),
            Direction::East => (1, 0, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }
}

// ---------------------------------------------------------------------------
// BlockPos
// ---------------------------------------------------------------------------

/// Absolute position of a block in a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The neighbor in `dir`. Coordinates wrap at the `i32` edges; use
    /// [`BlockPos::checked_offset`] where positions come from outside.
    pub fn offset(self, dir: Direction) -> Self {
        let (dx, dy, dz) = dir.offset();
        Self::new(
            self.x.wrapping_add(dx),
            self.y.wrapping_add(dy),
            self.z.wrapping_add(dz),
        )
    }

    /// The neighbor in `dir`, or `None` past the edge of the coordinate
    /// space.
    pub fn checked_offset(self, dir: Direction) -> Option<Self> {
        let (dx, dy, dz) = dir.offset();
        Some(Self::new(
            self.x.checked_add(dx)?,
            self.y.checked_add(dy)?,
            self.z.checked_add(dz)?,
        ))
    }

    pub fn above(self) -> Self {
        self.offset(Direction::Up)
    }

    pub fn below(self) -> Self {
        self.offset(Direction::Down)
    }

    /// The chunk column containing this position.
    pub fn chunk_pos(self) -> ChunkPos {
        ChunkPos::new(self.x >> 4, self.z >> 4)
    }

    /// Whether the y coordinate is inside the buildable range.
    pub fn is_in_bounds(self) -> bool {
        (MIN_BUILD_HEIGHT..MAX_BUILD_HEIGHT).contains(&self.y)
    }

    /// Index of the section holding this position, or `None` when the
    /// position is outside the buildable range.
    pub fn section_index(self) -> Option<usize> {
        if !self.is_in_bounds() {
            return None;
        }
        Some(((self.y - MIN_BUILD_HEIGHT) >> 4) as usize)
    }

    /// Coordinates relative to the containing section, each in `0..16`.
    pub fn local(self) -> (usize, usize, usize) {
        (
            (self.x & 15) as usize,
            (self.y & 15) as usize,
            (self.z & 15) as usize,
        )
    }

    /// Column index (`0..256`) within the chunk, used by heightmaps.
    pub fn column_index(self) -> usize {
        (((self.z & 15) << 4) | (self.x & 15)) as usize
    }
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// ChunkPos / SectionPos
// ---------------------------------------------------------------------------

/// Position of a chunk column, in chunk units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl std::fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// Position of a 16x16x16 section, in section units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl SectionPos {
    pub fn of(pos: BlockPos) -> Self {
        Self {
            x: pos.x >> 4,
            y: pos.y >> 4,
            z: pos.z >> 4,
        }
    }
}
