pub mod indexer;
pub mod resolver;
pub mod walker;

pub use indexer::{IndexOutcome, IndexStats, WorkspaceIndexer};
pub use resolver::Resolver;
pub use walker::FileWalker;
