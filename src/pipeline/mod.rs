//! Asynchronous enrichment pipeline.
//!
//! The dispatcher scans persisted profiles for pending work, claims each
//! through a single compare-and-set, and publishes one task per claim to a
//! durable at-least-once queue. Independent workers consume tasks, call
//! the external generation service under a timeout, and persist results
//! with bounded retry. The per-profile claim is the only synchronization
//! primitive in the subsystem.

pub mod context;
pub mod dispatcher;
pub mod queue;
pub mod summarizer;
pub mod task;
pub mod worker;

pub use context::ContextBuilder;
pub use dispatcher::Dispatcher;
pub use queue::{Delivery, MemoryQueue, TaskQueue};
pub use summarizer::{GenerateRequest, SummarizeError, Summarizer};
pub use task::{Task, TaskPayload};
pub use worker::WorkerPool;

/// Drive dispatch/worker rounds until no pending work remains: every
/// summarizable profile has reached `Done` or terminal `Failed`. Returns
/// the total number of tasks published.
pub async fn enrich_until_settled(dispatcher: &Dispatcher, pool: &WorkerPool) -> usize {
    let mut published = 0;
    loop {
        let round = dispatcher.dispatch(None);
        if round == 0 {
            break;
        }
        published += round;
        pool.run_until_idle().await;
    }
    published
}
