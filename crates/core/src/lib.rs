//! # triad core
//!
//! Domain types and error definitions shared by every triad crate:
//! the memory entry model, the JSON target helpers and the error taxonomy.
//! Engines live in their own crates and depend inward on this one.

pub mod error;
pub mod memory;
pub mod target;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, PillarError, Result};
pub use memory::{MemoryEntry, MemoryType};
pub use target::{Context, Target};
