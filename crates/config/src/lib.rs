//! Typed configuration: a read-only, hierarchical key/value table loaded
//! once from YAML, with required and defaulting getters.
//!
//! # Invariants
//! - Loading never fails; unreadable or malformed files yield an empty table.
//! - Required getters fail with a message naming the key.

mod data;

pub use data::{ConfigError, TypeData};
