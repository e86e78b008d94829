//! Memory store implementation for triad.

pub mod store;

pub use store::{MemoryStatistics, MemoryStore, PartitionStats};
pub use triad_core::memory::{MemoryEntry, MemoryType};
