//! Isolated classifier worker and its supervisor.
//!
//! This module provides:
//! - The request/response protocol between supervisor and worker
//! - The worker thread loop that owns the loaded model
//! - The supervisor state machine (init, dispatch, timeouts, restarts)
//! - An injectable clock for restart timing

pub mod clock;
pub mod protocol;
pub mod runtime;
pub mod supervisor;

pub use clock::{Clock, ManualClock, SystemClock};
pub use protocol::{GroupJob, GroupOutcome, RequestId, ScanJob, SlotGroup};
pub use runtime::WorkerModel;
pub use supervisor::{ModelLocation, WorkerState, WorkerSupervisor};
