//! `VectorStore` backends: a Redis hash store and an in-memory double.

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
