//! Advisor configuration.
//!
//! Loads settings from config.json at startup. Provides model locations,
//! recognition thresholds, worker timing, and scoring weights. Every field has
//! a default, so a partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{AdvisorError, AdvisorResult};

/// Complete advisor configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Model location handed to the classifier on init
    pub model_path: PathBuf,
    /// Class names vocabulary (JSON array of strings)
    pub labels_path: PathBuf,
    /// Per-resolution slot layout
    pub layout_path: PathBuf,
    /// Minimum top-1 probability for a detection to be accepted (0.0-1.0)
    pub confidence_threshold: f32,
    /// Square edge length of the model input, in pixels
    pub input_size: u32,
    /// Ability order of the standard slot that identifies its hero
    pub leader_defining_order: u8,
    pub worker: WorkerConfig,
    pub scoring: ScoringConfig,
    pub combos: ComboThresholds,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            model_path: crate::paths::get_model_dir(),
            labels_path: crate::paths::get_default_labels_path(),
            layout_path: crate::paths::get_default_layout_path(),
            confidence_threshold: 0.9,
            input_size: 96,
            leader_defining_order: 2,
            worker: WorkerConfig::default(),
            scoring: ScoringConfig::default(),
            combos: ComboThresholds::default(),
        }
    }
}

/// Worker supervisor timing and restart policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum wait for the model load acknowledgement (milliseconds)
    pub init_timeout_ms: u64,
    /// Maximum wait for one batch scan (milliseconds)
    pub scan_timeout_ms: u64,
    /// Restarts allowed before the worker is given up on
    pub max_restart_attempts: u32,
    /// Pause before each restart (milliseconds)
    pub restart_cooldown_ms: u64,
    /// Crash-free Ready time after which the restart counter resets (milliseconds)
    pub stable_reset_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            init_timeout_ms: 30_000,
            scan_timeout_ms: 10_000,
            max_restart_attempts: 3,
            restart_cooldown_ms: 5_000,
            stable_reset_ms: 60_000,
        }
    }
}

impl WorkerConfig {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    pub fn restart_cooldown(&self) -> Duration {
        Duration::from_millis(self.restart_cooldown_ms)
    }

    pub fn stable_reset(&self) -> Duration {
        Duration::from_millis(self.stable_reset_ms)
    }
}

/// Score weights and bounds, synergy list shape, and suggestion count.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of the normalised win rate
    pub win_rate: f64,
    /// Weight of the inverted, normalised average pick order
    pub pick_order: f64,
    /// Pick orders at or below this count as the earliest possible pick
    pub min_pick_order: f64,
    /// Pick orders at or above this count as the latest possible pick
    pub max_pick_order: f64,
    /// Number of suggestions in the top-tier list
    pub top_tier_count: usize,
    /// Maximum partners kept in each strong/weak synergy list
    pub synergy_cap: usize,
    /// Synergy win rate at or above this is "strong"
    pub synergy_split: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            win_rate: 0.4,
            pick_order: 0.6,
            min_pick_order: 1.0,
            max_pick_order: 50.0,
            top_tier_count: 10,
            synergy_cap: 5,
            synergy_split: 0.5,
        }
    }
}

/// Global synergy-increase thresholds for OP and trap combinations.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboThresholds {
    /// Combos whose synergy increase is at or above this are OP
    pub op: f64,
    /// Combos whose synergy increase is at or below this are traps
    pub trap: f64,
}

impl Default for ComboThresholds {
    fn default() -> Self {
        Self { op: 0.13, trap: -0.05 }
    }
}

impl AdvisorConfig {
    /// Loads configuration from `path`, falling back to defaults when the
    /// file is missing or malformed.
    pub fn load(path: &Path) -> Self {
        info!("Looking for config at: {}", path.display());

        if !path.exists() {
            info!("config.json not found. Using default config.");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<AdvisorConfig>(&contents) {
                Ok(config) => match config.validate() {
                    Ok(()) => {
                        info!("Config loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => warn!("Rejected {}: {}. Using defaults.", path.display(), e),
                },
                Err(e) => warn!("Failed to parse {}: {}. Using defaults.", path.display(), e),
            },
            Err(e) => warn!("Failed to read {}: {}. Using defaults.", path.display(), e),
        }

        Self::default()
    }

    /// Looks for config.json in the same directory as the executable.
    pub fn load_default() -> Self {
        Self::load(&crate::paths::get_exe_dir().join("config.json"))
    }

    /// Checks the invariants the scoring and worker code relies on.
    pub fn validate(&self) -> AdvisorResult<()> {
        let w = &self.scoring;
        if (w.win_rate + w.pick_order - 1.0).abs() > 1e-6 {
            return Err(AdvisorError::Config(format!(
                "score weights must sum to 1.0 (got {} + {})",
                w.win_rate, w.pick_order
            )));
        }
        if w.win_rate < 0.0 || w.pick_order < 0.0 {
            return Err(AdvisorError::Config("score weights must be non-negative".into()));
        }
        if w.max_pick_order <= w.min_pick_order {
            return Err(AdvisorError::Config(format!(
                "max_pick_order ({}) must exceed min_pick_order ({})",
                w.max_pick_order, w.min_pick_order
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(AdvisorError::Config(format!(
                "confidence_threshold {} outside 0.0-1.0",
                self.confidence_threshold
            )));
        }
        if self.input_size == 0 {
            return Err(AdvisorError::Config("input_size must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = AdvisorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.worker.scan_timeout(), Duration::from_secs(10));
        assert_eq!(config.worker.max_restart_attempts, 3);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "confidence_threshold": 0.75, "worker": { "scan_timeout_ms": 2500 } }"#,
        )
        .unwrap();

        let config = AdvisorConfig::load(&path);
        assert_eq!(config.confidence_threshold, 0.75);
        assert_eq!(config.worker.scan_timeout_ms, 2500);
        assert_eq!(config.worker.init_timeout_ms, 30_000);
        assert_eq!(config.scoring.top_tier_count, 10);
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let config = AdvisorConfig::load(&path);
        assert_eq!(config.confidence_threshold, 0.9);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut config = AdvisorConfig::default();
        config.scoring.win_rate = 0.7;
        assert!(matches!(config.validate(), Err(AdvisorError::Config(_))));
    }

    #[test]
    fn test_invalid_weights_in_file_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "scoring": { "win_rate": 0.9, "pick_order": 0.9 } }"#).unwrap();

        let config = AdvisorConfig::load(&path);
        assert_eq!(config.scoring.win_rate, 0.4);
    }
}
