//! Batch classification on top of a pluggable classifier backend.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{AdvisorError, AdvisorResult};
use crate::vision::preprocess::PreparedBatch;
use crate::vision::SlotResult;

/// An icon classifier backend.
///
/// Instances live inside the worker thread; they are created by a
/// [`ClassifierFactory`] on every (re)spawn and loaded once per spawn.
pub trait Classifier: Send + Sync {
    /// Loads model weights and the class vocabulary.
    fn load(&mut self, model_path: &Path, labels_path: &Path) -> AdvisorResult<()>;

    /// Class names, index-aligned with the probability rows from `infer`.
    fn labels(&self) -> &[String];

    /// One forward pass. Returns `count` rows of class probabilities.
    fn infer(&self, tensor: &[f32], count: usize, input_size: u32) -> AdvisorResult<Vec<Vec<f32>>>;
}

/// Produces a fresh, unloaded classifier for each worker spawn.
pub trait ClassifierFactory: Send + Sync {
    fn create(&self) -> Box<dyn Classifier>;
}

impl<F> ClassifierFactory for F
where
    F: Fn() -> Box<dyn Classifier> + Send + Sync,
{
    fn create(&self) -> Box<dyn Classifier> {
        self()
    }
}

/// Top-1 outcome for one batch item.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Label, present only when `confidence >= threshold`
    pub label: Option<String>,
    pub confidence: f32,
}

/// Picks the most probable class and applies the confidence threshold.
///
/// The confidence is reported even when the label is rejected.
pub fn top_prediction(probabilities: &[f32], labels: &[String], threshold: f32) -> Prediction {
    let best = probabilities
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_finite())
        .fold(None::<(usize, f32)>, |best, (i, &p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((i, p)),
        });

    let Some((index, probability)) = best else {
        return Prediction { label: None, confidence: 0.0 };
    };

    let confidence = probability.clamp(0.0, 1.0);
    let label = if confidence >= threshold {
        labels.get(index).cloned()
    } else {
        None
    };
    Prediction { label, confidence }
}

/// Runs one forward pass over the batch and applies the threshold per item.
pub fn classify_batch(
    classifier: &dyn Classifier,
    batch: &PreparedBatch,
    threshold: f32,
) -> AdvisorResult<Vec<Prediction>> {
    if batch.is_empty() {
        return Ok(Vec::new());
    }

    let rows = classifier.infer(&batch.tensor, batch.len(), batch.input_size)?;
    if rows.len() != batch.len() {
        return Err(AdvisorError::Inference(format!(
            "expected {} prediction rows, got {}",
            batch.len(),
            rows.len()
        )));
    }

    let labels = classifier.labels();
    Ok(rows
        .iter()
        .map(|row| top_prediction(row, labels, threshold))
        .collect())
}

/// Clears names that are in `excluded`, keeping their confidence.
pub fn apply_exclusions(results: &mut [SlotResult], excluded: &HashSet<String>) {
    if excluded.is_empty() {
        return;
    }
    for result in results.iter_mut() {
        if result.name.as_ref().is_some_and(|n| excluded.contains(n)) {
            result.name = None;
        }
    }
}

/// Reads the class names vocabulary (a JSON array of strings).
pub fn load_vocabulary(path: &Path) -> AdvisorResult<Vec<String>> {
    let contents = fs::read_to_string(path).map_err(|e| {
        AdvisorError::ModelLoad(format!("failed to read vocabulary {}: {}", path.display(), e))
    })?;
    let labels: Vec<String> = serde_json::from_str(&contents)
        .map_err(|e| AdvisorError::ModelLoad(format!("invalid vocabulary {}: {}", path.display(), e)))?;
    if labels.is_empty() {
        return Err(AdvisorError::ModelLoad(format!(
            "vocabulary {} is empty",
            path.display()
        )));
    }
    Ok(labels)
}
