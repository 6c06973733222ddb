//! Profile store: point reads, filtered scans, and the atomic conditional
//! state transition the dispatcher claims work through.
//!
//! The store is the only synchronization point between the dispatcher and
//! the worker pool. Everything else in the enrichment pipeline is
//! coordination-free, so any backend that can do a per-key compare-and-set
//! satisfies the trait.

use crate::{EnrichmentState, Profile, ProfileId, ProfileKind};
use crate::storage::{StorageError, StorageResult};
use dashmap::DashMap;

pub trait ProfileStore: Send + Sync {
    /// Insert or replace a profile.
    fn insert(&self, profile: Profile);

    fn get(&self, id: ProfileId) -> Option<Profile>;

    /// All profiles ordered by id. Extraction assigns ids in file and
    /// source order, so this is also the deterministic workspace order.
    fn all(&self) -> Vec<Profile>;

    /// Ids of profiles matching any of `kinds` in `state`, ordered by id.
    fn scan(&self, kinds: &[ProfileKind], state: EnrichmentState) -> Vec<ProfileId>;

    /// Atomically transition the enrichment state from `from` to `to`.
    /// Returns true iff the profile was in `from` and is now in `to`.
    /// Two concurrent callers can never both succeed for the same `from`.
    fn try_transition(
        &self,
        id: ProfileId,
        from: EnrichmentState,
        to: EnrichmentState,
    ) -> StorageResult<bool>;

    /// Persist a successful enrichment: store the summary and move to
    /// `Done`. A profile already in `Done` keeps its existing summary
    /// (duplicate deliveries are no-ops).
    fn complete(&self, id: ProfileId, summary: String) -> StorageResult<()>;

    /// Record a failed attempt atomically: increment the persisted attempt
    /// count, remember the error, and move back to `Pending` while attempts
    /// remain or to terminal `Failed` once `max_attempts` is reached.
    /// Returns the resulting state.
    fn record_failure(
        &self,
        id: ProfileId,
        error: &str,
        max_attempts: u32,
    ) -> StorageResult<EnrichmentState>;

    /// Mark a profile terminally failed regardless of remaining attempts.
    fn fail(&self, id: ProfileId, error: &str) -> StorageResult<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct containment children of a profile, ordered by id.
    fn children(&self, id: ProfileId) -> Vec<Profile> {
        self.all()
            .into_iter()
            .filter(|p| p.parent_id == Some(id))
            .collect()
    }
}

/// In-memory reference implementation. DashMap's per-entry locking makes
/// every mutating method a single atomic read-modify-write.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: DashMap<ProfileId, Profile>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self {
            profiles: DashMap::new(),
        }
    }

    /// Populate a store from a persisted index snapshot.
    pub fn from_index(data: &crate::storage::IndexData) -> Self {
        let store = Self::new();
        for profile in &data.profiles {
            store.insert(profile.clone());
        }
        store
    }
}

impl ProfileStore for MemoryProfileStore {
    fn insert(&self, profile: Profile) {
        self.profiles.insert(profile.id, profile);
    }

    fn get(&self, id: ProfileId) -> Option<Profile> {
        self.profiles.get(&id).map(|p| p.value().clone())
    }

    fn all(&self) -> Vec<Profile> {
        let mut profiles: Vec<Profile> = self.profiles.iter().map(|p| p.value().clone()).collect();
        profiles.sort_by_key(|p| p.id);
        profiles
    }

    fn scan(&self, kinds: &[ProfileKind], state: EnrichmentState) -> Vec<ProfileId> {
        let mut ids: Vec<ProfileId> = self
            .profiles
            .iter()
            .filter(|p| kinds.contains(&p.kind) && p.enrichment.state == state)
            .map(|p| p.id)
            .collect();
        ids.sort();
        ids
    }

    fn try_transition(
        &self,
        id: ProfileId,
        from: EnrichmentState,
        to: EnrichmentState,
    ) -> StorageResult<bool> {
        let mut entry = self
            .profiles
            .get_mut(&id)
            .ok_or(StorageError::ProfileNotFound(id.value()))?;

        if entry.enrichment.state != from {
            return Ok(false);
        }
        entry.enrichment.state = to;
        Ok(true)
    }

    fn complete(&self, id: ProfileId, summary: String) -> StorageResult<()> {
        let mut entry = self
            .profiles
            .get_mut(&id)
            .ok_or(StorageError::ProfileNotFound(id.value()))?;

        if entry.enrichment.state == EnrichmentState::Done {
            return Ok(());
        }
        entry.enrichment.state = EnrichmentState::Done;
        entry.enrichment.summary = Some(summary);
        entry.enrichment.last_error = None;
        Ok(())
    }

    fn record_failure(
        &self,
        id: ProfileId,
        error: &str,
        max_attempts: u32,
    ) -> StorageResult<EnrichmentState> {
        let mut entry = self
            .profiles
            .get_mut(&id)
            .ok_or(StorageError::ProfileNotFound(id.value()))?;

        entry.enrichment.attempts += 1;
        entry.enrichment.last_error = Some(error.to_string());
        entry.enrichment.state = if entry.enrichment.attempts >= max_attempts {
            EnrichmentState::Failed
        } else {
            EnrichmentState::Pending
        };
        Ok(entry.enrichment.state)
    }

    fn fail(&self, id: ProfileId, error: &str) -> StorageResult<()> {
        let mut entry = self
            .profiles
            .get_mut(&id)
            .ok_or(StorageError::ProfileNotFound(id.value()))?;

        entry.enrichment.state = EnrichmentState::Failed;
        entry.enrichment.last_error = Some(error.to_string());
        Ok(())
    }

    fn len(&self) -> usize {
        self.profiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EnrichmentRecord, FileId, Range};
    use std::sync::Arc;

    fn profile(id: u32, kind: ProfileKind) -> Profile {
        Profile {
            id: ProfileId::new(id).unwrap(),
            kind,
            name: format!("p{id}"),
            qualified_name: format!("src/app.py::p{id}"),
            file_path: "src/app.py".into(),
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

    #[test]
    fn test_insert_and_get() {
        let store = MemoryProfileStore::new();
        store.insert(profile(1, ProfileKind::File));

        let id = ProfileId::new(1).unwrap();
        assert_eq!(store.get(id).unwrap().name, "p1");
        assert!(store.get(ProfileId::new(2).unwrap()).is_none());
    }

    #[test]
    fn test_scan_filters_kind_and_state() {
        let store = MemoryProfileStore::new();
        store.insert(profile(1, ProfileKind::File));
        store.insert(profile(2, ProfileKind::Function));
        store.insert(profile(3, ProfileKind::Class));

        let pending = store.scan(
            &[ProfileKind::File, ProfileKind::Class],
            EnrichmentState::Pending,
        );
        assert_eq!(
            pending,
            vec![ProfileId::new(1).unwrap(), ProfileId::new(3).unwrap()]
        );

        store
            .try_transition(
                ProfileId::new(1).unwrap(),
                EnrichmentState::Pending,
                EnrichmentState::InProgress,
            )
            .unwrap();
        let pending = store.scan(
            &[ProfileKind::File, ProfileKind::Class],
            EnrichmentState::Pending,
        );
        assert_eq!(pending, vec![ProfileId::new(3).unwrap()]);
    }

    #[test]
    fn test_transition_requires_expected_state() {
        let store = MemoryProfileStore::new();
        store.insert(profile(1, ProfileKind::File));
        let id = ProfileId::new(1).unwrap();

        assert!(
            store
                .try_transition(id, EnrichmentState::Pending, EnrichmentState::InProgress)
                .unwrap()
        );
        // Second claim loses.
        assert!(
            !store
                .try_transition(id, EnrichmentState::Pending, EnrichmentState::InProgress)
                .unwrap()
        );
    }

    #[test]
    fn test_concurrent_claims_yield_exactly_one_winner() {
        let store = Arc::new(MemoryProfileStore::new());
        store.insert(profile(1, ProfileKind::File));
        let id = ProfileId::new(1).unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store
                    .try_transition(id, EnrichmentState::Pending, EnrichmentState::InProgress)
                    .unwrap()
            }));
        }

        let wins: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(wins, 1);
    }

    #[test]
    fn test_complete_is_idempotent() {
        let store = MemoryProfileStore::new();
        store.insert(profile(1, ProfileKind::File));
        let id = ProfileId::new(1).unwrap();

        store.complete(id, "first summary".into()).unwrap();
        store.complete(id, "second summary".into()).unwrap();

        let p = store.get(id).unwrap();
        assert_eq!(p.enrichment.state, EnrichmentState::Done);
        assert_eq!(p.enrichment.summary.as_deref(), Some("first summary"));
    }

    #[test]
    fn test_record_failure_reaches_terminal_state() {
        let store = MemoryProfileStore::new();
        store.insert(profile(1, ProfileKind::File));
        let id = ProfileId::new(1).unwrap();

        assert_eq!(
            store.record_failure(id, "boom", 2).unwrap(),
            EnrichmentState::Pending
        );
        assert_eq!(
            store.record_failure(id, "boom again", 2).unwrap(),
            EnrichmentState::Failed
        );

        let p = store.get(id).unwrap();
        assert_eq!(p.enrichment.attempts, 2);
        assert_eq!(p.enrichment.last_error.as_deref(), Some("boom again"));
    }
}
