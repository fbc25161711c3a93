//! Storage for homegate
//!
//! [`AccessStore`] is the seam the services work against. MongoDB backs it
//! in production; the in-memory store backs dev mode and tests.

pub mod memory;
pub mod mongo;
pub mod mongo_store;
pub mod schemas;
pub mod store;

pub use memory::MemoryAccessStore;
pub use mongo::{MongoClient, MongoCollection};
pub use mongo_store::MongoAccessStore;
pub use store::AccessStore;
