use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::debug;

use crate::errors::Result;
use crate::types::{AccountId, CallId, MediaType, RecordingId};

/// Metadata of a finished call recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub id: RecordingId,
    pub account_id: AccountId,
    pub call_id: Option<CallId>,
    pub duration_secs: f64,
    pub api_version: String,
    /// Resource URI, `/{api}/Accounts/{account}/Recordings/{recording}`
    pub uri: String,
    pub media_type: MediaType,
    pub date_created: DateTime<Utc>,
}

impl Recording {
    pub fn resource_uri(api_version: &str, account_id: &AccountId, recording_id: &RecordingId) -> String {
        format!(
            "/{}/Accounts/{}/Recordings/{}",
            api_version, account_id, recording_id
        )
    }
}

/// Persistence for recording metadata
#[async_trait]
pub trait RecordingStore: Send + Sync + Debug {
    async fn add_recording(&self, recording: Recording) -> Result<()>;
}

/// In-memory store keyed by recording id
#[derive(Debug, Default)]
pub struct MemoryRecordingStore {
    recordings: DashMap<RecordingId, Recording>,
}

impl MemoryRecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &RecordingId) -> Option<Recording> {
        self.recordings.get(id).map(|entry| entry.value().clone())
    }

    pub fn list(&self) -> Vec<Recording> {
        self.recordings.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }
}

#[async_trait]
impl RecordingStore for MemoryRecordingStore {
    async fn add_recording(&self, recording: Recording) -> Result<()> {
        debug!("Storing recording {} ({}s)", recording.id, recording.duration_secs);
        self.recordings.insert(recording.id.clone(), recording);
        Ok(())
    }
}
