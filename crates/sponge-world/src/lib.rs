//! Sponge World -- the host storage layer that block-change pipelines act on.
//!
//! This crate models the slice of a block-based game server that the
//! pipeline core consumes: block states and their registry, chunk sections,
//! chunks, levels, entities, and the change flags callers pass along with a
//! block change. Nothing here knows about pipelines; it only offers the
//! primitive reads and writes that side effects compose.
//!
//! # Handles
//!
//! Levels, chunks and entities live in generational [`slotmap`] storage.
//! Code that must not keep them alive holds a [`handle::LevelRef`],
//! [`handle::ChunkRef`] or [`handle::SectionRef`] instead of a borrow.
//! Resolving a handle after its target was unloaded fails with
//! [`handle::StaleReference`] rather than returning stale data:
//!
//! ```rust,ignore
//! let chunk = ChunkRef::at(&levels, level_id, pos)?.expect("chunk loaded");
//! levels.unload_level(level_id);
//! assert!(chunk.resolve(&levels).is_err());
//! ```
//!
//! # Key Types
//!
//! - [`block::BlockState`] -- immutable block type + metadata value.
//! - [`registry::BlockRegistry`] -- frozen block/item definitions.
//! - [`chunk::LevelChunk`] / [`chunk::ChunkSection`] -- block storage.
//! - [`level::Level`] / [`level::Levels`] -- loaded worlds and their owner thread.
//! - [`flags::BlockChangeFlags`] -- caller options for a block change.

pub mod block;
pub mod chunk;
pub mod entity;
pub mod flags;
pub mod handle;
pub mod id;
pub mod interaction;
pub mod item;
pub mod level;
pub mod pos;
pub mod registry;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
