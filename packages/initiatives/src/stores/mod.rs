//! Storage implementations.

mod memory;

pub use memory::{MemoryIndex, MemoryStore};
