pub mod error;
pub mod graph;
pub mod index_data;
pub mod persistence;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use graph::CallGraph;
pub use index_data::IndexData;
pub use persistence::IndexPersistence;
pub use store::{MemoryProfileStore, ProfileStore};
