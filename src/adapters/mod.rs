// Adapters layer: concrete implementations of the domain ports.

pub mod graphql;
pub mod memory;
pub mod storage;

pub use graphql::GraphQlContentSource;
pub use memory::{CallCounts, MemoryContentSource};
pub use storage::LocalStorage;
