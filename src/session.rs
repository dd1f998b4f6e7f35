//! Draft session: the scan-request API.
//!
//! Owns the worker supervisor, the pool cache and the latest detections, and
//! produces a fresh [`DraftPayload`] after every scan.

use image::RgbaImage;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AdvisorConfig;
use crate::error::{AdvisorError, AdvisorResult};
use crate::layout::LayoutConfig;
use crate::pool::PoolCache;
use crate::scan::{run_initial_scan, run_rescan, ScanOptions};
use crate::scoring::{DraftPayload, DraftView, ScoringEngine};
use crate::stats::StatsRepository;
use crate::vision::{ClassifierFactory, SlotResult};
use crate::worker::{Clock, ModelLocation, SystemClock, WorkerState, WorkerSupervisor};

pub struct DraftSession<R: StatsRepository, C: Clock = SystemClock> {
    supervisor: WorkerSupervisor<C>,
    layouts: LayoutConfig,
    repo: R,
    config: AdvisorConfig,
    pool: PoolCache,
    selections: Vec<SlotResult>,
    leader_slots: Vec<SlotResult>,
    preferred_leader: Option<u8>,
    live_suggestions: bool,
}

impl<R: StatsRepository> DraftSession<R, SystemClock> {
    /// Builds a session from configuration: loads the layout file and
    /// prepares (but does not start) the worker.
    pub fn open(config: AdvisorConfig, factory: Arc<dyn ClassifierFactory>, repo: R) -> AdvisorResult<Self> {
        config.validate()?;
        let layouts = LayoutConfig::load(&config.layout_path)?;
        let supervisor = WorkerSupervisor::new(
            factory,
            ModelLocation {
                model_path: config.model_path.clone(),
                labels_path: config.labels_path.clone(),
            },
            config.worker.clone(),
            config.input_size,
        );
        Ok(Self::new(supervisor, layouts, repo, config))
    }
}

impl<R: StatsRepository, C: Clock> DraftSession<R, C> {
    pub fn new(supervisor: WorkerSupervisor<C>, layouts: LayoutConfig, repo: R, config: AdvisorConfig) -> Self {
        Self {
            supervisor,
            layouts,
            repo,
            config,
            pool: PoolCache::new(),
            selections: Vec::new(),
            leader_slots: Vec::new(),
            preferred_leader: None,
            live_suggestions: true,
        }
    }

    /// Loads the model. Must succeed before the first scan.
    pub fn start(&mut self) -> AdvisorResult<()> {
        self.supervisor.initialize().map_err(|e| self.degrade_on(e))
    }

    /// Full scan: rebuilds the pool and identifies heroes.
    pub fn initial_scan(&mut self, image: RgbaImage) -> AdvisorResult<DraftPayload> {
        self.ensure_live()?;
        let options = self.scan_options();
        let layout = self.layouts.for_dimensions(image.width(), image.height())?;
        let scan = match run_initial_scan(&mut self.supervisor, image, layout, &options) {
            Ok(scan) => scan,
            Err(e) => return Err(self.degrade_on(e)),
        };

        self.pool.rebuild(&scan);
        self.pool.apply_selections(&self.selections);
        self.leader_slots = scan.leader_defining;
        info!("Pool ready: {} candidates available", self.pool.len());
        Ok(self.payload())
    }

    /// Reads the selected group and narrows the pool.
    pub fn rescan(&mut self, image: RgbaImage) -> AdvisorResult<DraftPayload> {
        self.ensure_live()?;
        let options = self.scan_options();
        let layout = self.layouts.for_dimensions(image.width(), image.height())?;
        let rescan = match run_rescan(&mut self.supervisor, image, layout, &options) {
            Ok(rescan) => rescan,
            Err(e) => return Err(self.degrade_on(e)),
        };

        if !rescan.selections.is_empty() {
            self.selections = rescan.selections;
        }
        let removed = self.pool.apply_selections(&self.selections);
        info!(
            "Rescan: {} picked since last update, {} candidates left",
            removed,
            self.pool.len()
        );
        Ok(self.payload())
    }

    /// Recomputes the payload from the current detections without scanning.
    pub fn payload(&self) -> DraftPayload {
        let engine = ScoringEngine::new(&self.repo, &self.config.scoring, &self.config.combos);
        let mut payload = engine.evaluate(&DraftView {
            pool: &self.pool,
            selections: &self.selections,
            leader_slots: &self.leader_slots,
            preferred_leader: self.preferred_leader,
        });
        payload.live_suggestions = self.live_suggestions;
        payload
    }

    /// Sets the hero (by screen position) to rank suggestions for.
    pub fn set_preferred_leader(&mut self, hero_order: Option<u8>) {
        self.preferred_leader = hero_order;
    }

    pub fn preferred_leader(&self) -> Option<u8> {
        self.preferred_leader
    }

    pub fn pool(&self) -> &PoolCache {
        &self.pool
    }

    pub fn selections(&self) -> &[SlotResult] {
        &self.selections
    }

    pub fn leader_slots(&self) -> &[SlotResult] {
        &self.leader_slots
    }

    pub fn live_suggestions(&self) -> bool {
        self.live_suggestions
    }

    pub fn worker_state(&self) -> WorkerState {
        self.supervisor.state()
    }

    /// Forgets all detections, e.g. when a new draft starts.
    pub fn reset(&mut self) {
        self.pool.clear();
        self.selections.clear();
        self.leader_slots.clear();
        self.preferred_leader = None;
    }

    pub fn shutdown(&mut self) {
        self.supervisor.shutdown();
    }

    fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            threshold: self.config.confidence_threshold,
            leader_defining_order: self.config.leader_defining_order,
            excluded: self.selections.iter().filter_map(|s| s.name.clone()).collect(),
        }
    }

    fn ensure_live(&self) -> AdvisorResult<()> {
        if self.live_suggestions {
            Ok(())
        } else {
            Err(AdvisorError::WorkerTerminated(self.supervisor.restart_attempts()))
        }
    }

    fn degrade_on(&mut self, error: AdvisorError) -> AdvisorError {
        if error.is_terminal() && self.live_suggestions {
            warn!("Classifier worker is gone; live suggestions disabled");
            self.live_suggestions = false;
        }
        error
    }
}
