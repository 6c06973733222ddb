//! codatlas: semantic code index with ranked drilldown navigation.
//!
//! Pipeline: source files are extracted into structural profiles, linked
//! into a call graph, ranked by importance, and asynchronously enriched
//! with generated summaries; the trail cache gives a stateless request
//! layer continuous multi-step navigation.

pub mod config;
pub mod error;
pub mod indexing;
pub mod logging;
pub mod parsing;
pub mod pipeline;
pub mod profile;
pub mod ranking;
pub mod storage;
pub mod trail;
pub mod types;

pub use config::Settings;
pub use error::{IndexError, IndexResult};
pub use indexing::{IndexOutcome, IndexStats, Resolver, WorkspaceIndexer};
pub use parsing::PythonParser;
pub use profile::{CallEdge, EnrichmentRecord, Param, Profile};
pub use storage::{CallGraph, IndexData, IndexPersistence, MemoryProfileStore, ProfileStore};
pub use trail::{BreadcrumbCache, Hop, MemoryTrailStore, Trail, TrailStore};
pub use types::{Confidence, EnrichmentState, FileId, ProfileId, ProfileKind, Range};
