//! World Kernel: a single-threaded, mutation-only reference world.
//!
//! Stands in for the host server in tests and the CLI. All mutation goes
//! through `&mut World`, which keeps writes on whichever thread owns it.
//!
//! # Invariants
//! - All state mutations flow through explicit operations and are logged.
//! - Player displacement is accumulated, never applied by teleport.

pub mod world;

pub use world::{EntityData, World, WorldEvent};
