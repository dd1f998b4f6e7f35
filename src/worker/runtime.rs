//! Classifier worker thread.
//!
//! Runs in a separate thread, receiving requests from the supervisor and
//! answering each one on the response channel. The loaded model lives only
//! here, inside [`WorkerModel`].

use image::RgbaImage;
use rayon::prelude::*;
use std::path::Path;
use std::sync::mpsc::{Receiver, Sender};
use tracing::{debug, info, warn};

use crate::error::{AdvisorError, AdvisorResult};
use crate::vision::{classify_batch, preprocess_slots, Classifier, SlotResult};
use crate::worker::protocol::{GroupJob, GroupOutcome, ScanJob, WorkerRequest, WorkerResponse};

/// Model state owned by one worker thread.
pub struct WorkerModel {
    classifier: Box<dyn Classifier>,
    loaded: bool,
    input_size: u32,
}

impl WorkerModel {
    pub fn new(classifier: Box<dyn Classifier>, input_size: u32) -> Self {
        Self {
            classifier,
            loaded: false,
            input_size,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn load(&mut self, model_path: &Path, labels_path: &Path) -> AdvisorResult<()> {
        self.loaded = false;
        self.classifier.load(model_path, labels_path)?;
        self.loaded = true;
        Ok(())
    }

    /// Classifies every group of the job, groups in parallel.
    pub fn scan(&self, job: &ScanJob) -> AdvisorResult<Vec<GroupOutcome>> {
        if !self.is_loaded() {
            return Err(AdvisorError::Inference("model not loaded".into()));
        }
        Ok(job
            .groups
            .par_iter()
            .map(|group| self.classify_group(&job.image, group, job.threshold))
            .collect())
    }

    /// One group, one forward pass. Slots that could not be extracted, and
    /// the whole group if the pass fails, keep their default result.
    fn classify_group(&self, image: &RgbaImage, job: &GroupJob, threshold: f32) -> GroupOutcome {
        let mut results: Vec<SlotResult> = job.slots.iter().map(SlotResult::empty).collect();
        let batch = preprocess_slots(image, &job.slots, self.input_size);

        if !batch.failed_indices.is_empty() {
            debug!(
                "{:?}: {} of {} slots could not be extracted",
                job.group,
                batch.failed_indices.len(),
                job.slots.len()
            );
        }

        let mut inference_error = None;
        match classify_batch(self.classifier.as_ref(), &batch, threshold) {
            Ok(predictions) => {
                for (&idx, prediction) in batch.valid_indices.iter().zip(predictions) {
                    results[idx] = SlotResult::detected(
                        &job.slots[idx],
                        prediction.label,
                        prediction.confidence,
                    );
                }
            }
            Err(e) => {
                warn!("{:?}: inference failed, using defaults: {}", job.group, e);
                inference_error = Some(e.to_string());
            }
        }

        GroupOutcome {
            group: job.group,
            results,
            inference_error,
        }
    }
}

/// Runs the worker loop.
///
/// Processes requests until a `Shutdown` arrives or either channel closes.
/// This function blocks, so it should be run in a dedicated thread.
pub fn run_classifier_worker(
    requests: Receiver<WorkerRequest>,
    responses: Sender<WorkerResponse>,
    mut model: WorkerModel,
) {
    info!("Classifier worker started");

    while let Ok(request) = requests.recv() {
        let response = match request {
            WorkerRequest::Init {
                id,
                model_path,
                labels_path,
            } => {
                info!("Classifier worker: loading model from {}", model_path.display());
                match model.load(&model_path, &labels_path) {
                    Ok(()) => WorkerResponse::Ready { id },
                    Err(e) => WorkerResponse::InitFailed {
                        id,
                        reason: e.to_string(),
                    },
                }
            }
            WorkerRequest::Scan { id, job } => {
                debug!("Classifier worker: scan #{} with {} group(s)", id, job.groups.len());
                match model.scan(&job) {
                    Ok(groups) => WorkerResponse::Scanned { id, groups },
                    Err(e) => WorkerResponse::Failed {
                        id,
                        reason: e.to_string(),
                    },
                }
            }
            WorkerRequest::Shutdown => break,
        };

        if responses.send(response).is_err() {
            // Supervisor is gone
            break;
        }
    }

    info!("Classifier worker finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{SlotDescriptor, SlotRect, SlotRole};
    use crate::worker::protocol::SlotGroup;
    use image::ImageBuffer;
    use std::path::PathBuf;
    use std::sync::mpsc::channel;
    use std::thread;

    /// Always predicts the first label with the given probability.
    struct Constant(f32, Vec<String>);

    impl Classifier for Constant {
        fn load(&mut self, _: &Path, _: &Path) -> AdvisorResult<()> {
            Ok(())
        }
        fn labels(&self) -> &[String] {
            &self.1
        }
        fn infer(&self, _: &[f32], count: usize, _: u32) -> AdvisorResult<Vec<Vec<f32>>> {
            Ok(vec![vec![self.0, 1.0 - self.0]; count])
        }
    }

    struct Broken;

    impl Classifier for Broken {
        fn load(&mut self, _: &Path, _: &Path) -> AdvisorResult<()> {
            Ok(())
        }
        fn labels(&self) -> &[String] {
            &[]
        }
        fn infer(&self, _: &[f32], _: usize, _: u32) -> AdvisorResult<Vec<Vec<f32>>> {
            Err(AdvisorError::Inference("backend exploded".into()))
        }
    }

    fn slots() -> Vec<SlotDescriptor> {
        vec![
            SlotDescriptor::new(SlotRect::new(0, 0, 8, 8), SlotRole::default()),
            SlotDescriptor::new(SlotRect::new(100, 100, 8, 8), SlotRole::default()),
            SlotDescriptor::new(
                SlotRect::new(8, 8, 8, 8),
                SlotRole {
                    hero_order: 4,
                    ability_order: Some(2),
                    is_finisher: false,
                },
            ),
        ]
    }

    fn job() -> ScanJob {
        ScanJob {
            image: ImageBuffer::new(32, 32),
            groups: vec![
                GroupJob { group: SlotGroup::Ultimates, slots: slots() },
                GroupJob { group: SlotGroup::Standards, slots: slots()[..1].to_vec() },
            ],
            threshold: 0.9,
        }
    }

    #[test]
    fn test_scan_preserves_order_and_defaults_bad_slots() {
        let mut model = WorkerModel::new(Box::new(Constant(0.95, vec!["X".into(), "Y".into()])), 4);
        model.load(Path::new("m"), Path::new("l")).unwrap();

        let outcomes = model.scan(&job()).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].group, SlotGroup::Ultimates);

        let results = &outcomes[0].results;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].name.as_deref(), Some("X"));
        assert_eq!(results[1].name, None);
        assert_eq!(results[1].confidence, 0.0);
        assert_eq!(results[2].hero_order(), 4);
        assert_eq!(outcomes[1].results.len(), 1);
    }

    #[test]
    fn test_inference_failure_yields_defaults_for_group() {
        let mut model = WorkerModel::new(Box::new(Broken), 4);
        model.load(Path::new("m"), Path::new("l")).unwrap();
        assert!(model.is_loaded());

        let outcomes = model.scan(&job()).unwrap();
        assert!(outcomes[0].inference_error.is_some());
        assert!(outcomes[0].results.iter().all(|r| r.name.is_none() && r.confidence == 0.0));
    }

    #[test]
    fn test_scan_before_load_fails() {
        let model = WorkerModel::new(Box::new(Broken), 4);
        assert!(!model.is_loaded());
        assert!(model.scan(&job()).is_err());
    }

    #[test]
    fn test_worker_answers_and_exits_on_shutdown() {
        let (req_tx, req_rx) = channel();
        let (resp_tx, resp_rx) = channel();
        let model = WorkerModel::new(Box::new(Constant(0.5, vec!["X".into(), "Y".into()])), 4);
        let handle = thread::spawn(move || run_classifier_worker(req_rx, resp_tx, model));

        req_tx
            .send(WorkerRequest::Init {
                id: 7,
                model_path: PathBuf::from("m"),
                labels_path: PathBuf::from("l"),
            })
            .unwrap();
        assert!(matches!(resp_rx.recv().unwrap(), WorkerResponse::Ready { id: 7 }));

        req_tx.send(WorkerRequest::Scan { id: 8, job: job() }).unwrap();
        let response = resp_rx.recv().unwrap();
        assert_eq!(response.id(), 8);

        req_tx.send(WorkerRequest::Shutdown).unwrap();
        handle.join().expect("Worker thread panicked");
    }

    #[test]
    fn test_worker_exits_when_channel_closes() {
        let (req_tx, req_rx) = channel::<WorkerRequest>();
        let (resp_tx, _resp_rx) = channel();
        let model = WorkerModel::new(Box::new(Broken), 4);
        let handle = thread::spawn(move || run_classifier_worker(req_rx, resp_tx, model));

        drop(req_tx);
        handle.join().expect("Worker thread panicked");
    }
}
