//! Draft advisor for screen-based ability drafts.
//!
//! Recognises ability and hero icons in fixed screen regions with an isolated
//! classifier worker, keeps track of what is still pickable, and ranks the
//! pool with historical statistics.

pub mod config;
pub mod error;
pub mod layout;
pub mod paths;
pub mod pool;
pub mod scan;
pub mod scoring;
pub mod session;
pub mod stats;
pub mod vision;
pub mod worker;

pub use config::AdvisorConfig;
pub use error::{AdvisorError, AdvisorResult};
pub use layout::{LayoutConfig, ResolutionLayout, SlotDescriptor, SlotRect, SlotRole};
pub use pool::PoolCache;
pub use scoring::DraftPayload;
pub use session::DraftSession;
pub use stats::{SnapshotRepository, StatsRepository};
pub use vision::{Classifier, ClassifierFactory, ReferenceClassifier, SlotResult};
pub use worker::{WorkerState, WorkerSupervisor};
