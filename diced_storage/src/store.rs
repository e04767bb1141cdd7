//! Block stores.

mod memory_block_store;
pub use memory_block_store::MemoryBlockStore;
