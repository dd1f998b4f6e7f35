//! Icon recognition: slot preprocessing and batch classification.

pub mod classifier;
pub mod preprocess;
pub mod reference;

pub use classifier::{
    apply_exclusions, classify_batch, load_vocabulary, top_prediction, Classifier,
    ClassifierFactory, Prediction,
};
pub use preprocess::{crop_and_resize, preprocess_slots, PreparedBatch};
pub use reference::ReferenceClassifier;

use serde::{Deserialize, Serialize};

use crate::layout::{SlotDescriptor, SlotRect, SlotRole};

/// Recognition outcome for one slot in one scan.
///
/// The role and origin rectangle are copied from the descriptor at creation
/// and cannot change afterwards; only the detection fields are writable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotResult {
    /// Accepted candidate name, `None` when nothing passed the threshold
    pub name: Option<String>,
    /// Top-1 probability, kept even when the name was rejected
    pub confidence: f32,
    role: SlotRole,
    rect: SlotRect,
}

impl SlotResult {
    /// Default result for a slot: no name, zero confidence.
    pub fn empty(descriptor: &SlotDescriptor) -> Self {
        Self {
            name: None,
            confidence: 0.0,
            role: descriptor.role,
            rect: descriptor.rect,
        }
    }

    pub fn detected(descriptor: &SlotDescriptor, name: Option<String>, confidence: f32) -> Self {
        Self {
            name,
            confidence,
            role: descriptor.role,
            rect: descriptor.rect,
        }
    }

    pub fn role(&self) -> SlotRole {
        self.role
    }

    pub fn rect(&self) -> SlotRect {
        self.rect
    }

    pub fn hero_order(&self) -> u8 {
        self.role.hero_order
    }

    pub fn is_finisher(&self) -> bool {
        self.role.is_finisher
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
