//! Enrichment task records carried through the queue.
//!
//! Payloads are a closed set of tagged variants, decoded by kind before
//! dispatch to a handler; the queue never carries untyped blobs.

use crate::ProfileId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskPayload {
    /// Summarize one unit profile (file or class by default).
    ProfileSummary { profile_id: ProfileId },
    /// Summarize a directory by aggregating its children's summaries.
    DirectorySummary { profile_id: ProfileId },
}

impl TaskPayload {
    pub fn profile_id(&self) -> ProfileId {
        match *self {
            Self::ProfileSummary { profile_id } | Self::DirectorySummary { profile_id } => {
                profile_id
            }
        }
    }
}

/// One enrichment unit of work. The attempt count mirrors the persisted
/// count on the profile at claim time, so a crashed worker's successor
/// resumes from stored progress rather than zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub payload: TaskPayload,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub claimed_at: DateTime<Utc>,
}

impl Task {
    pub fn new(payload: TaskPayload, attempts: u32, last_error: Option<String>) -> Self {
        Self {
            payload,
            attempts,
            last_error,
            claimed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_tagging_roundtrip() {
        let payload = TaskPayload::DirectorySummary {
            profile_id: ProfileId::new(7).unwrap(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"kind\":\"directory_summary\""));

        let back: TaskPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
        assert_eq!(back.profile_id().value(), 7);
    }
}
