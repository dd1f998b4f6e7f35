//! Error types shared across the crate.

use std::time::Duration;

use thiserror::Error;

use crate::worker::WorkerState;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image Error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Layout Error: {0}")]
    Layout(String),

    /// Model or vocabulary could not be loaded. The worker stays out of Ready.
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Worker initialization timed out after {0:?}")]
    InitTimeout(Duration),

    /// A scan request got no answer in time. Distinct from `Inference` so
    /// callers can decide between retrying now and waiting for the next trigger.
    #[error("Scan timed out after {0:?}")]
    ScanTimeout(Duration),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Worker not ready (state: {0})")]
    NotReady(WorkerState),

    #[error("Worker is busy with another scan request")]
    Busy,

    #[error("Worker crashed (restart attempt {attempt} of {max})")]
    WorkerCrashed { attempt: u32, max: u32 },

    #[error("Worker terminated after {0} restart attempts")]
    WorkerTerminated(u32),

    #[error("Statistics unavailable: {0}")]
    Stats(String),
}

impl AdvisorError {
    /// True for either timeout kind (init or scan).
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::InitTimeout(_) | Self::ScanTimeout(_))
    }

    /// True when the worker will not be restarted again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::WorkerTerminated(_))
    }
}

pub type AdvisorResult<T> = Result<T, AdvisorError>;
