//! Call recording
//!
//! [`RecordingCoordinator`] owns the recording and DTMF-collect flags of one
//! controller, issues record/stop commands to the media group and, when a
//! recording is stopped with `create_record`, measures the file and hands a
//! [`Recording`] to the configured [`RecordingStore`].

pub mod duration;
pub mod store;

pub use duration::{AudioDurationProbe, ProbeError, WavDurationProbe};
pub use store::{MemoryRecordingStore, Recording, RecordingStore};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::adapters::MediaGroup;
use crate::config::{ControllerConfig, RecordingConfig, RuntimeSettings};
use crate::controller::messages::{StartRecording, StopRecording};
use crate::errors::{ControllerError, Result};
use crate::types::{AccountId, CallId, MediaType, Record, RecordingId, Stop};

#[derive(Debug)]
pub struct RecordingCoordinator {
    settings: RecordingConfig,
    default_api_version: String,
    probe: Arc<dyn AudioDurationProbe>,

    // Captured from the first recording request that carries them
    runtime_settings: Option<RuntimeSettings>,
    store: Option<Arc<dyn RecordingStore>>,
    account_id: Option<AccountId>,

    call_id: Option<CallId>,
    recording_id: Option<RecordingId>,
    recording_uri: Option<String>,
    record_started: Option<DateTime<Utc>>,

    recording: bool,
    collecting: bool,
}

impl RecordingCoordinator {
    pub fn new(config: &ControllerConfig, probe: Arc<dyn AudioDurationProbe>) -> Self {
        Self {
            settings: config.recording.clone(),
            default_api_version: config.api_version.clone(),
            probe,
            runtime_settings: None,
            store: None,
            account_id: None,
            call_id: None,
            recording_id: None,
            recording_uri: None,
            record_started: None,
            recording: false,
            collecting: false,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    /// A generic `Record` was forwarded to the media group
    pub fn mark_recording(&mut self) {
        self.recording = true;
    }

    /// A `Collect` was forwarded to the media group
    pub fn mark_collecting(&mut self) {
        self.collecting = true;
    }

    /// API version used for recording URIs
    pub fn api_version(&self) -> &str {
        self.runtime_settings
            .as_ref()
            .map(|settings| settings.api_version.as_str())
            .unwrap_or(&self.default_api_version)
    }

    fn capture(
        &mut self,
        runtime_settings: Option<RuntimeSettings>,
        store: Option<Arc<dyn RecordingStore>>,
        account_id: Option<AccountId>,
    ) {
        if self.runtime_settings.is_none() {
            self.runtime_settings = runtime_settings;
        }
        if self.store.is_none() {
            self.store = store;
        }
        if self.account_id.is_none() {
            self.account_id = account_id;
        }
    }

    /// Start recording the call into `message.recording_uri`
    pub async fn start(
        &mut self,
        message: StartRecording,
        media_group: Option<&Arc<dyn MediaGroup>>,
    ) -> Result<()> {
        self.capture(message.runtime_settings, message.store, message.account_id);
        let media_group = media_group.ok_or(ControllerError::MissingResource("media group"))?;

        self.call_id = message.call_id;
        self.recording_id = Some(message.recording_id);
        self.recording_uri = message.recording_uri;

        match self.recording_uri.as_deref() {
            Some(uri) => info!("Start recording call into {}", uri),
            None => info!("Start recording call into the media server's default location"),
        }
        self.record_started = Some(Utc::now());
        self.recording = true;

        media_group
            .record(Record {
                uri: self.recording_uri.clone(),
                timeout_secs: self.settings.timeout_secs,
                max_length_secs: self.settings.max_length_secs,
                finish_on_key: self.settings.finish_on_key.clone(),
                media_type: MediaType::AudioOnly,
            })
            .await
    }

    /// Stop an ongoing recording without persisting it
    pub async fn stop_recording(
        &mut self,
        message: StopRecording,
        media_group: Option<&Arc<dyn MediaGroup>>,
    ) -> Result<()> {
        if !self.recording {
            debug!("StopRecording ignored, not recording");
            return Ok(());
        }
        self.capture(message.runtime_settings, message.store, message.account_id);
        self.stop(Stop { create_record: false }, media_group).await
    }

    /// Stop whatever media operation is running: the recording first, a
    /// DTMF collect otherwise
    pub async fn stop(&mut self, stop: Stop, media_group: Option<&Arc<dyn MediaGroup>>) -> Result<()> {
        if self.recording {
            self.stop_recording_call(stop, media_group).await
        } else if self.collecting {
            info!("Stop DTMF collect");
            if let Some(group) = media_group {
                group.stop_media(stop).await?;
            }
            self.collecting = false;
            Ok(())
        } else {
            Ok(())
        }
    }

    async fn stop_recording_call(&mut self, stop: Stop, media_group: Option<&Arc<dyn MediaGroup>>) -> Result<()> {
        let Some(group) = media_group else {
            info!("Tried to stop recording but the media group is gone");
            return Ok(());
        };

        match self.record_started.take() {
            Some(started) => info!("Stop recording call started at {}", started),
            None => info!("Stop recording call"),
        }
        group.stop_media(stop).await?;
        self.recording = false;

        if !stop.create_record {
            return Ok(());
        }
        let Some(uri) = self.recording_uri.clone() else {
            debug!("No recording destination, nothing to persist");
            return Ok(());
        };

        let duration = match self.probe.duration_secs(&uri).await {
            Ok(duration) => duration,
            Err(e) => {
                error!("Could not measure recording duration of {}: {}", uri, e);
                0.0
            }
        };

        if duration == 0.0 {
            info!("Recording {} is empty, not persisting it", uri);
            return Ok(());
        }
        info!("Wrapping up recording {}, duration: {}", uri, duration);
        self.persist(duration).await
    }

    async fn persist(&self, duration_secs: f64) -> Result<()> {
        let Some(store) = self.store.as_ref() else {
            warn!("No recording store configured, dropping recording metadata");
            return Ok(());
        };
        let (Some(recording_id), Some(account_id)) = (self.recording_id.clone(), self.account_id.clone()) else {
            warn!("Recording without recording or account id, not persisting it");
            return Ok(());
        };

        let api_version = self.api_version().to_string();
        let uri = Recording::resource_uri(&api_version, &account_id, &recording_id);
        store
            .add_recording(Recording {
                id: recording_id,
                account_id,
                call_id: self.call_id.clone(),
                duration_secs,
                api_version,
                uri,
                media_type: MediaType::AudioOnly,
                date_created: Utc::now(),
            })
            .await
    }
}
