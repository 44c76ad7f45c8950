use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while measuring a recording
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Unsupported audio file: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Probe task failed: {0}")]
    Task(String),
}

/// Measures the length of a recorded audio file
#[async_trait]
pub trait AudioDurationProbe: Send + Sync + Debug {
    /// Duration in seconds of the audio behind `uri`
    async fn duration_secs(&self, uri: &str) -> Result<f64, ProbeError>;
}

/// Reads the header of a WAV file with `hound`
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDurationProbe;

impl WavDurationProbe {
    pub fn new() -> Self {
        Self
    }

    /// Map a recording URI to a local path; `file://` URIs lose their scheme
    pub fn path_of(uri: &str) -> PathBuf {
        PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
    }

    /// Frames divided by sample rate
    pub fn measure(path: &Path) -> Result<f64, ProbeError> {
        let reader = hound::WavReader::open(path)?;
        let sample_rate = reader.spec().sample_rate;
        if sample_rate == 0 {
            return Ok(0.0);
        }
        Ok(f64::from(reader.duration()) / f64::from(sample_rate))
    }
}

#[async_trait]
impl AudioDurationProbe for WavDurationProbe {
    async fn duration_secs(&self, uri: &str) -> Result<f64, ProbeError> {
        let path = Self::path_of(uri);
        tokio::task::spawn_blocking(move || Self::measure(&path))
            .await
            .map_err(|e| ProbeError::Task(e.to_string()))?
    }
}
