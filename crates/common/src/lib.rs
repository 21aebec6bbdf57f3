//! Shared types for the movequeue workspace: world identities, locations,
//! relative offsets, and the narrow facade through which the pipeline
//! mutates a host world.
//!
//! # Invariants
//! - Every type here is a plain value; nothing holds a reference into host state.
//! - Offsets compare and hash by bit pattern, so they are usable as map keys.

pub mod access;
pub mod types;

pub use access::{AccessError, WorldAccess};
pub use types::{BlockPos, BlockState, EntityId, Location, Offset, WorldId};
