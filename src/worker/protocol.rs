//! Messages exchanged between the supervisor and the classifier worker.
//!
//! Every request carries an id and every response echoes it, so the
//! supervisor can tell a current answer from one that arrived too late.

use image::RgbaImage;
use serde::Serialize;
use std::path::PathBuf;

use crate::layout::SlotDescriptor;
use crate::vision::SlotResult;

pub type RequestId = u64;

/// Region groups a scan can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SlotGroup {
    /// Ultimate abilities still in the pool
    Ultimates,
    /// Standard abilities still in the pool
    Standards,
    /// Standard slots that identify each hero
    LeaderDefining,
    /// Abilities already picked by each hero
    Selected,
}

/// One group of slots to classify.
#[derive(Clone, Debug)]
pub struct GroupJob {
    pub group: SlotGroup,
    pub slots: Vec<SlotDescriptor>,
}

/// A batch scan request. The screenshot is moved in, not copied.
#[derive(Debug)]
pub struct ScanJob {
    pub image: RgbaImage,
    pub groups: Vec<GroupJob>,
    pub threshold: f32,
}

/// Results for one group, index-aligned with its `GroupJob::slots`.
#[derive(Clone, Debug)]
pub struct GroupOutcome {
    pub group: SlotGroup,
    pub results: Vec<SlotResult>,
    /// Set when the forward pass failed and `results` are all defaults
    pub inference_error: Option<String>,
}

#[derive(Debug)]
pub enum WorkerRequest {
    Init {
        id: RequestId,
        model_path: PathBuf,
        labels_path: PathBuf,
    },
    Scan {
        id: RequestId,
        job: ScanJob,
    },
    Shutdown,
}

#[derive(Debug)]
pub enum WorkerResponse {
    Ready { id: RequestId },
    InitFailed { id: RequestId, reason: String },
    Scanned { id: RequestId, groups: Vec<GroupOutcome> },
    Failed { id: RequestId, reason: String },
}

impl WorkerResponse {
    pub fn id(&self) -> RequestId {
        match self {
            Self::Ready { id }
            | Self::InitFailed { id, .. }
            | Self::Scanned { id, .. }
            | Self::Failed { id, .. } => *id,
        }
    }
}
