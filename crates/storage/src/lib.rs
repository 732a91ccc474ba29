#![forbid(unsafe_code)]

mod memory;
mod store;

pub use memory::{MemoryStore, MemoryUnit};
pub use store::{EventRow, SqliteStore, SqliteUnit, StoreError};
