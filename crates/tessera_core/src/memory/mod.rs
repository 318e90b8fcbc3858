//! # Memory Management
//!
//! Slot bookkeeping shared by the entity and component stores.

mod pool;

pub use pool::IdPool;
