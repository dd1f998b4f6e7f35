//! Worker supervisor: lifecycle of the classifier worker thread.
//!
//! The supervisor spawns the worker, loads the model, dispatches one scan at
//! a time, and restarts the worker after a crash within a bounded budget:
//!
//! Uninitialized → Initializing → Ready ⇄ Busy, with Error on failure and
//! Terminated once the restart budget is spent.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::error::{AdvisorError, AdvisorResult};
use crate::vision::ClassifierFactory;
use crate::worker::clock::{Clock, SystemClock};
use crate::worker::protocol::{GroupOutcome, RequestId, ScanJob, WorkerRequest, WorkerResponse};
use crate::worker::runtime::{run_classifier_worker, WorkerModel};

/// Supervisor states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No model loaded yet
    Uninitialized,
    /// Waiting for the model load acknowledgement
    Initializing,
    /// Idle and able to take a scan
    Ready,
    /// A scan is in flight
    Busy,
    /// Load failed, timed out, or the worker crashed
    Error,
    /// Restart budget exhausted or shut down; no further restarts
    Terminated,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Uninitialized => write!(f, "Uninitialized"),
            WorkerState::Initializing => write!(f, "Initializing"),
            WorkerState::Ready => write!(f, "Ready"),
            WorkerState::Busy => write!(f, "Busy"),
            WorkerState::Error => write!(f, "Error"),
            WorkerState::Terminated => write!(f, "Terminated"),
        }
    }
}

/// Where the worker loads its model and vocabulary from.
#[derive(Clone, Debug)]
pub struct ModelLocation {
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Init,
    Scan,
}

#[derive(Debug)]
struct PendingRequest {
    kind: RequestKind,
    issued_at: Instant,
}

enum AwaitFailure {
    TimedOut,
    Disconnected,
}

struct WorkerLink {
    requests: Sender<WorkerRequest>,
    responses: Receiver<WorkerResponse>,
    handle: JoinHandle<()>,
}

pub struct WorkerSupervisor<C: Clock = SystemClock> {
    factory: Arc<dyn ClassifierFactory>,
    model: ModelLocation,
    config: WorkerConfig,
    input_size: u32,
    clock: C,
    state: WorkerState,
    link: Option<WorkerLink>,
    next_id: RequestId,
    pending: HashMap<RequestId, PendingRequest>,
    restart_attempts: u32,
    ready_since: Option<Instant>,
}

impl WorkerSupervisor<SystemClock> {
    pub fn new(
        factory: Arc<dyn ClassifierFactory>,
        model: ModelLocation,
        config: WorkerConfig,
        input_size: u32,
    ) -> Self {
        Self::with_clock(factory, model, config, input_size, SystemClock)
    }
}

impl<C: Clock> WorkerSupervisor<C> {
    pub fn with_clock(
        factory: Arc<dyn ClassifierFactory>,
        model: ModelLocation,
        config: WorkerConfig,
        input_size: u32,
        clock: C,
    ) -> Self {
        Self {
            factory,
            model,
            config,
            input_size,
            clock,
            state: WorkerState::Uninitialized,
            link: None,
            next_id: 1,
            pending: HashMap::new(),
            restart_attempts: 0,
            ready_since: None,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == WorkerState::Ready
    }

    /// True once the supervisor has given up; callers should degrade.
    pub fn is_terminated(&self) -> bool {
        self.state == WorkerState::Terminated
    }

    pub fn restart_attempts(&self) -> u32 {
        self.restart_attempts
    }

    /// Requests still awaiting an answer. Zero whenever no call is running.
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Spawns the worker if needed and loads the model.
    pub fn initialize(&mut self) -> AdvisorResult<()> {
        match self.state {
            WorkerState::Ready => return Ok(()),
            WorkerState::Uninitialized | WorkerState::Error => {}
            WorkerState::Terminated => {
                return Err(AdvisorError::WorkerTerminated(self.restart_attempts));
            }
            other => return Err(AdvisorError::NotReady(other)),
        }

        if self.link.as_ref().is_none_or(|l| l.handle.is_finished()) {
            self.link = None;
            self.spawn_worker()?;
        }

        self.state = WorkerState::Initializing;
        let id = self.register(RequestKind::Init);
        info!(
            "Initializing classifier worker (model: {}, labels: {})",
            self.model.model_path.display(),
            self.model.labels_path.display()
        );

        let request = WorkerRequest::Init {
            id,
            model_path: self.model.model_path.clone(),
            labels_path: self.model.labels_path.clone(),
        };
        if !self.send(request) {
            self.pending.remove(&id);
            self.state = WorkerState::Error;
            self.retire_link();
            return Err(AdvisorError::ModelLoad(
                "worker exited before initialization".into(),
            ));
        }

        let timeout = self.config.init_timeout();
        match self.await_response(id, timeout) {
            Ok(WorkerResponse::Ready { .. }) => {
                self.state = WorkerState::Ready;
                self.ready_since = Some(self.clock.now());
                info!("Classifier worker ready");
                Ok(())
            }
            Ok(WorkerResponse::InitFailed { reason, .. }) => {
                self.state = WorkerState::Error;
                error!("Classifier model failed to load: {}", reason);
                Err(AdvisorError::ModelLoad(reason))
            }
            Ok(other) => {
                self.state = WorkerState::Error;
                Err(AdvisorError::ModelLoad(format!(
                    "unexpected worker response to init: {:?}",
                    other
                )))
            }
            Err(AwaitFailure::TimedOut) => {
                self.state = WorkerState::Error;
                self.retire_link();
                error!("Classifier worker did not become ready within {:?}", timeout);
                Err(AdvisorError::InitTimeout(timeout))
            }
            Err(AwaitFailure::Disconnected) => {
                self.state = WorkerState::Error;
                self.retire_link();
                Err(AdvisorError::ModelLoad(
                    "worker exited during initialization".into(),
                ))
            }
        }
    }

    /// Sends one scan and waits for its answer or the scan timeout.
    ///
    /// Only valid from Ready. A crash detected here triggers the restart
    /// policy; the scan itself is not retried.
    pub fn submit(&mut self, job: ScanJob) -> AdvisorResult<Vec<GroupOutcome>> {
        if self.is_ready() && self.worker_exited() {
            return Err(self.handle_crash());
        }
        match self.state {
            WorkerState::Ready => {}
            WorkerState::Busy => return Err(AdvisorError::Busy),
            WorkerState::Terminated => {
                return Err(AdvisorError::WorkerTerminated(self.restart_attempts));
            }
            other => return Err(AdvisorError::NotReady(other)),
        }

        self.state = WorkerState::Busy;
        let id = self.register(RequestKind::Scan);
        debug!("Dispatching scan #{} ({} group(s))", id, job.groups.len());

        if !self.send(WorkerRequest::Scan { id, job }) {
            self.pending.remove(&id);
            return Err(self.handle_crash());
        }

        let timeout = self.config.scan_timeout();
        match self.await_response(id, timeout) {
            Ok(WorkerResponse::Scanned { groups, .. }) => {
                self.state = WorkerState::Ready;
                Ok(groups)
            }
            Ok(WorkerResponse::Failed { reason, .. }) => {
                self.state = WorkerState::Ready;
                Err(AdvisorError::Inference(reason))
            }
            Ok(other) => {
                self.state = WorkerState::Ready;
                Err(AdvisorError::Inference(format!(
                    "unexpected worker response to scan: {:?}",
                    other
                )))
            }
            Err(AwaitFailure::TimedOut) => {
                self.state = WorkerState::Ready;
                warn!(
                    "Scan #{} timed out after {:?}; a late answer will be discarded",
                    id, timeout
                );
                Err(AdvisorError::ScanTimeout(timeout))
            }
            Err(AwaitFailure::Disconnected) => Err(self.handle_crash()),
        }
    }

    /// Stops the worker for good.
    pub fn shutdown(&mut self) {
        if let Some(link) = self.link.take() {
            let _ = link.requests.send(WorkerRequest::Shutdown);
            drop(link.requests);
            if link.handle.join().is_err() {
                warn!("Classifier worker panicked during shutdown");
            }
        }
        self.pending.clear();
        self.state = WorkerState::Terminated;
        info!("Classifier worker shut down");
    }

    fn spawn_worker(&mut self) -> AdvisorResult<()> {
        let model = WorkerModel::new(self.factory.create(), self.input_size);
        let (request_tx, request_rx) = channel();
        let (response_tx, response_rx) = channel();

        let handle = thread::Builder::new()
            .name("classifier-worker".into())
            .spawn(move || run_classifier_worker(request_rx, response_tx, model))?;

        self.link = Some(WorkerLink {
            requests: request_tx,
            responses: response_rx,
            handle,
        });
        Ok(())
    }

    fn register(&mut self, kind: RequestKind) -> RequestId {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert(
            id,
            PendingRequest {
                kind,
                issued_at: self.clock.now(),
            },
        );
        id
    }

    fn send(&self, request: WorkerRequest) -> bool {
        match &self.link {
            Some(link) => link.requests.send(request).is_ok(),
            None => false,
        }
    }

    fn worker_exited(&self) -> bool {
        self.link.as_ref().is_some_and(|l| l.handle.is_finished())
    }

    /// Waits for the response to `id`. Responses to anything else are stale
    /// (their caller already timed out) and are dropped.
    fn await_response(&mut self, id: RequestId, timeout: Duration) -> Result<WorkerResponse, AwaitFailure> {
        let Some(link) = self.link.as_ref() else {
            self.pending.remove(&id);
            return Err(AwaitFailure::Disconnected);
        };

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match link.responses.recv_timeout(remaining) {
                Ok(response) if response.id() == id => {
                    if let Some(pending) = self.pending.remove(&id) {
                        debug!(
                            "{:?} request #{} answered after {:?}",
                            pending.kind,
                            id,
                            self.clock.now().saturating_duration_since(pending.issued_at)
                        );
                    }
                    return Ok(response);
                }
                Ok(stale) => {
                    debug!("Discarding stale worker response #{}", stale.id());
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.pending.remove(&id);
                    return Err(AwaitFailure::TimedOut);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.pending.remove(&id);
                    return Err(AwaitFailure::Disconnected);
                }
            }
        }
    }

    /// Drops a worker that may still be running (stuck or mid-load).
    fn retire_link(&mut self) {
        if let Some(link) = self.link.take() {
            let _ = link.requests.send(WorkerRequest::Shutdown);
        }
    }

    /// Applies the restart policy after an unexpected worker exit and
    /// returns the error for the request that observed it.
    fn handle_crash(&mut self) -> AdvisorError {
        self.state = WorkerState::Error;
        self.pending.clear();

        if let Some(link) = self.link.take() {
            drop(link.requests);
            match link.handle.join() {
                Ok(()) => warn!("Classifier worker exited unexpectedly"),
                Err(panic) => error!("Classifier worker panicked: {}", panic_message(panic.as_ref())),
            }
        }

        let now = self.clock.now();
        if let Some(since) = self.ready_since.take() {
            if now.saturating_duration_since(since) >= self.config.stable_reset() && self.restart_attempts > 0 {
                info!(
                    "Worker was stable for {:?}; resetting restart counter",
                    self.config.stable_reset()
                );
                self.restart_attempts = 0;
            }
        }

        let max = self.config.max_restart_attempts;
        loop {
            if self.restart_attempts >= max {
                self.state = WorkerState::Terminated;
                error!(
                    "Classifier worker crashed after {} restart attempts; giving up",
                    self.restart_attempts
                );
                return AdvisorError::WorkerTerminated(self.restart_attempts);
            }

            self.restart_attempts += 1;
            let attempt = self.restart_attempts;
            let cooldown = self.config.restart_cooldown();
            warn!(
                "Restarting classifier worker (attempt {}/{}) after {:?}",
                attempt, max, cooldown
            );
            self.clock.sleep(cooldown);

            match self.initialize() {
                Ok(()) => return AdvisorError::WorkerCrashed { attempt, max },
                Err(e) => {
                    // A failed restart counts against the budget; start the next one fresh
                    error!("Restart attempt {} failed: {}", attempt, e);
                    self.retire_link();
                    self.state = WorkerState::Error;
                }
            }
        }
    }
}

impl<C: Clock> Drop for WorkerSupervisor<C> {
    fn drop(&mut self) {
        self.retire_link();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
