//! Task dispatcher: scans for pending profiles and claims them.
//!
//! The claim is a conditional `Pending -> InProgress` transition executed
//! as a single compare-and-set against the store, so overlapping dispatch
//! cycles can never double-claim a profile. Only claimed profiles are
//! published to the queue.

use crate::pipeline::{Task, TaskPayload, TaskQueue};
use crate::storage::ProfileStore;
use crate::{EnrichmentState, ProfileId, ProfileKind};
use std::sync::Arc;

/// Kinds worth summarizing by default; functions and methods are folded
/// into their containers' summaries.
pub const DEFAULT_SUMMARY_KINDS: &[ProfileKind] = &[ProfileKind::File, ProfileKind::Class];

pub struct Dispatcher {
    store: Arc<dyn ProfileStore>,
    queue: Arc<dyn TaskQueue>,
    kinds: Vec<ProfileKind>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn ProfileStore>, queue: Arc<dyn TaskQueue>) -> Self {
        Self::with_kinds(store, queue, DEFAULT_SUMMARY_KINDS.to_vec())
    }

    pub fn with_kinds(
        store: Arc<dyn ProfileStore>,
        queue: Arc<dyn TaskQueue>,
        kinds: Vec<ProfileKind>,
    ) -> Self {
        Self {
            store,
            queue,
            kinds,
        }
    }

    /// One dispatch cycle: claim pending profiles (up to `limit`) and
    /// publish one task per claim. Returns the number published.
    pub fn dispatch(&self, limit: Option<usize>) -> usize {
        let mut published = 0;

        for id in self.store.scan(&self.kinds, EnrichmentState::Pending) {
            if limit.is_some_and(|l| published >= l) {
                break;
            }

            let claimed = match self.store.try_transition(
                id,
                EnrichmentState::Pending,
                EnrichmentState::InProgress,
            ) {
                Ok(claimed) => claimed,
                Err(e) => {
                    tracing::warn!("Claim failed for profile {}: {e}", id.value());
                    continue;
                }
            };
            // Lost to a concurrent cycle; the winner publishes.
            if !claimed {
                continue;
            }

            let Some(profile) = self.store.get(id) else {
                continue;
            };
            let payload = if profile.kind == ProfileKind::Directory {
                TaskPayload::DirectorySummary { profile_id: id }
            } else {
                TaskPayload::ProfileSummary { profile_id: id }
            };

            self.queue.publish(Task::new(
                payload,
                profile.enrichment.attempts,
                profile.enrichment.last_error,
            ));
            published += 1;
            tracing::debug!("Enqueued enrichment task for profile {}", id.value());
        }

        if published > 0 {
            tracing::info!("Dispatched {published} enrichment tasks");
        }
        published
    }

    /// List the profiles a dispatch cycle would claim, without claiming
    /// or enqueuing anything.
    pub fn dry_run(&self, limit: Option<usize>) -> Vec<ProfileId> {
        let mut ids = self.store.scan(&self.kinds, EnrichmentState::Pending);
        if let Some(limit) = limit {
            ids.truncate(limit);
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::MemoryQueue;
    use crate::storage::MemoryProfileStore;
    use crate::{EnrichmentRecord, FileId, Profile, Range};
    use std::time::Duration;

    fn profile(id: u32, kind: ProfileKind) -> Profile {
        Profile {
            id: ProfileId::new(id).unwrap(),
            kind,
            name: format!("p{id}"),
            qualified_name: format!("app.py::p{id}"),
            file_path: "app.py".into(),
            file_id: FileId::new(1),
            range: Range::new(1, 1, 0, 1),
            doc: None,
            params: Vec::new(),
            calls: Vec::new(),
            parent_id: None,
            enrichment: EnrichmentRecord::default(),
            score: None,
        }
    }

    fn setup() -> (Arc<MemoryProfileStore>, Arc<MemoryQueue>, Dispatcher) {
        let store = Arc::new(MemoryProfileStore::new());
        let queue = Arc::new(MemoryQueue::new(Duration::from_secs(60)));
        let dispatcher = Dispatcher::new(
            Arc::clone(&store) as Arc<dyn ProfileStore>,
            Arc::clone(&queue) as Arc<dyn TaskQueue>,
        );
        (store, queue, dispatcher)
    }

    #[test]
    fn test_dispatch_claims_and_publishes_summarizable_kinds() {
        let (store, queue, dispatcher) = setup();
        store.insert(profile(1, ProfileKind::File));
        store.insert(profile(2, ProfileKind::Function));
        store.insert(profile(3, ProfileKind::Class));

        assert_eq!(dispatcher.dispatch(None), 2);
        assert_eq!(queue.outstanding(), 2);

        // Claimed profiles left Pending; functions were never eligible.
        assert!(
            store
                .scan(DEFAULT_SUMMARY_KINDS, EnrichmentState::Pending)
                .is_empty()
        );
        assert_eq!(
            store.get(ProfileId::new(1).unwrap()).unwrap().enrichment.state,
            EnrichmentState::InProgress
        );
        assert_eq!(
            store.get(ProfileId::new(2).unwrap()).unwrap().enrichment.state,
            EnrichmentState::Pending
        );
    }

    #[test]
    fn test_second_cycle_publishes_nothing() {
        let (store, queue, dispatcher) = setup();
        store.insert(profile(1, ProfileKind::File));

        assert_eq!(dispatcher.dispatch(None), 1);
        assert_eq!(dispatcher.dispatch(None), 0);
        assert_eq!(queue.outstanding(), 1);
    }

    #[test]
    fn test_dispatch_respects_limit() {
        let (store, queue, dispatcher) = setup();
        for i in 1..=5 {
            store.insert(profile(i, ProfileKind::File));
        }

        assert_eq!(dispatcher.dispatch(Some(2)), 2);
        assert_eq!(queue.outstanding(), 2);
        // The remaining three are still pending for the next cycle.
        assert_eq!(dispatcher.dry_run(None).len(), 3);
    }

    #[test]
    fn test_dry_run_claims_nothing() {
        let (store, queue, dispatcher) = setup();
        store.insert(profile(1, ProfileKind::File));

        let would = dispatcher.dry_run(None);
        assert_eq!(would, vec![ProfileId::new(1).unwrap()]);
        assert_eq!(queue.outstanding(), 0);
        assert_eq!(
            store.get(ProfileId::new(1).unwrap()).unwrap().enrichment.state,
            EnrichmentState::Pending
        );
    }

    #[test]
    fn test_directory_profiles_get_directory_payload() {
        let store = Arc::new(MemoryProfileStore::new());
        let queue = Arc::new(MemoryQueue::new(Duration::from_secs(60)));
        let dispatcher = Dispatcher::with_kinds(
            Arc::clone(&store) as Arc<dyn ProfileStore>,
            Arc::clone(&queue) as Arc<dyn TaskQueue>,
            vec![ProfileKind::Directory],
        );
        store.insert(profile(1, ProfileKind::Directory));

        assert_eq!(dispatcher.dispatch(None), 1);
        let delivery = queue.consume().unwrap();
        assert!(matches!(
            delivery.task.payload,
            TaskPayload::DirectorySummary { .. }
        ));
    }

    #[test]
    fn test_concurrent_dispatch_cycles_never_double_claim() {
        let (store, queue, _) = setup();
        store.insert(profile(1, ProfileKind::File));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let dispatcher = Dispatcher::new(
                Arc::clone(&store) as Arc<dyn ProfileStore>,
                Arc::clone(&queue) as Arc<dyn TaskQueue>,
            );
            handles.push(std::thread::spawn(move || dispatcher.dispatch(None)));
        }

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 1, "exactly one cycle wins the claim");
        assert_eq!(queue.outstanding(), 1);
    }
}
