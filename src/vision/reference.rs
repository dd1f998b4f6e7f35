//! Reference-icon classifier.
//!
//! Each class has one reference icon, `<model_dir>/<class>.png`. An input is
//! compared against every reference by cosine similarity and the similarities
//! are turned into class probabilities with a temperature-scaled softmax.

use std::path::Path;
use tracing::{info, warn};

use crate::error::{AdvisorError, AdvisorResult};
use crate::layout::SlotRect;
use crate::vision::classifier::{load_vocabulary, Classifier};
use crate::vision::preprocess::crop_and_resize;

/// Softmax temperature; lower is sharper.
const DEFAULT_TEMPERATURE: f32 = 0.02;

pub struct ReferenceClassifier {
    input_size: u32,
    temperature: f32,
    labels: Vec<String>,
    /// Index-aligned with `labels`; `None` for classes without a reference icon
    references: Vec<Option<Vec<f32>>>,
}

impl ReferenceClassifier {
    pub fn new(input_size: u32) -> Self {
        Self {
            input_size,
            temperature: DEFAULT_TEMPERATURE,
            labels: Vec::new(),
            references: Vec::new(),
        }
    }

    fn load_reference(&self, path: &Path) -> AdvisorResult<Vec<f32>> {
        let img = image::open(path)?.to_rgba8();
        let (w, h) = img.dimensions();
        let full = SlotRect::new(0, 0, w as i32, h as i32);
        crop_and_resize(&img, &full, self.input_size)
    }

    fn probabilities(&self, item: &[f32]) -> Vec<f32> {
        let logits: Vec<Option<f32>> = self
            .references
            .iter()
            .map(|r| r.as_ref().map(|r| cosine_similarity(item, r) / self.temperature))
            .collect();

        let max = logits
            .iter()
            .flatten()
            .fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        let exps: Vec<f32> = logits
            .iter()
            .map(|l| l.map(|l| (l - max).exp()).unwrap_or(0.0))
            .collect();
        let sum: f32 = exps.iter().sum();
        if sum <= 0.0 || !sum.is_finite() {
            return vec![0.0; exps.len()];
        }
        exps.into_iter().map(|e| e / sum).collect()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

impl Classifier for ReferenceClassifier {
    fn load(&mut self, model_path: &Path, labels_path: &Path) -> AdvisorResult<()> {
        if !model_path.is_dir() {
            return Err(AdvisorError::ModelLoad(format!(
                "reference directory {} not found",
                model_path.display()
            )));
        }

        let labels = load_vocabulary(labels_path)?;
        let mut references = Vec::with_capacity(labels.len());
        let mut missing = 0usize;

        for label in &labels {
            let path = model_path.join(format!("{}.png", label));
            if !path.exists() {
                missing += 1;
                references.push(None);
                continue;
            }
            match self.load_reference(&path) {
                Ok(values) => references.push(Some(values)),
                Err(e) => {
                    warn!("Skipping reference {}: {}", path.display(), e);
                    missing += 1;
                    references.push(None);
                }
            }
        }

        if missing == labels.len() {
            return Err(AdvisorError::ModelLoad(format!(
                "no reference icons found in {}",
                model_path.display()
            )));
        }
        if missing > 0 {
            warn!("{} of {} classes have no reference icon", missing, labels.len());
        }

        info!(
            "Reference classifier loaded: {} classes from {}",
            labels.len(),
            model_path.display()
        );
        self.labels = labels;
        self.references = references;
        Ok(())
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn infer(&self, tensor: &[f32], count: usize, input_size: u32) -> AdvisorResult<Vec<Vec<f32>>> {
        if self.labels.is_empty() {
            return Err(AdvisorError::Inference("classifier not loaded".into()));
        }
        if input_size != self.input_size {
            return Err(AdvisorError::Inference(format!(
                "input size {} does not match reference size {}",
                input_size, self.input_size
            )));
        }
        let item_len = (input_size * input_size * 3) as usize;
        if tensor.len() != count * item_len {
            return Err(AdvisorError::Inference(format!(
                "tensor has {} values, expected {}",
                tensor.len(),
                count * item_len
            )));
        }

        Ok(tensor
            .chunks_exact(item_len)
            .map(|item| self.probabilities(item))
            .collect())
    }
}
