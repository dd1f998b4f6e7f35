//! Read-only access to historical draft statistics.
//!
//! The scoring engine only sees the [`StatsRepository`] trait. Every method
//! takes the full name set of one cycle so that each data kind costs a single
//! lookup.

pub mod snapshot;

pub use snapshot::{SnapshotRepository, StatsSnapshot};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::AdvisorResult;

/// Aggregate statistics of one candidate (ability).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateRecord {
    pub name: String,
    pub win_rate: Option<f64>,
    pub high_skill_win_rate: Option<f64>,
    /// Average pick position; lower means picked earlier
    pub pick_order: Option<f64>,
    pub is_finisher: bool,
    /// Hero the ability originally belongs to
    pub leader: Option<String>,
}

/// Win rate when two candidates are drafted together.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynergyPair {
    pub a: String,
    pub b: String,
    pub synergy_win_rate: f64,
}

impl SynergyPair {
    /// The other side of the pair, if `name` is one side.
    pub fn partner_of(&self, name: &str) -> Option<&str> {
        if self.a == name {
            Some(&self.b)
        } else if self.b == name {
            Some(&self.a)
        } else {
            None
        }
    }
}

/// A hero, identified on screen by its defining ability.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderRecord {
    pub name: String,
    pub defining_candidate: String,
    pub win_rate: Option<f64>,
    pub pick_order: Option<f64>,
}

/// Win rate of a hero drafting a given candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderSynergy {
    pub leader: String,
    pub candidate: String,
    pub synergy_win_rate: f64,
}

/// A pair whose combined win rate departs from what its parts predict.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComboEntry {
    pub a: String,
    pub b: String,
    pub synergy_increase: f64,
}

/// Combos above the OP threshold and below the trap threshold.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ComboTables {
    pub op: Vec<ComboEntry>,
    pub trap: Vec<ComboEntry>,
}

pub trait StatsRepository {
    /// Records for the requested names; unknown names are absent.
    fn candidate_stats(&self, names: &[String]) -> AdvisorResult<HashMap<String, CandidateRecord>>;

    /// Pairs with both sides in `names`.
    fn pair_synergies(&self, names: &[String]) -> AdvisorResult<Vec<SynergyPair>>;

    /// Heroes whose defining ability is one of `names`.
    fn leaders_for_candidates(&self, names: &[String]) -> AdvisorResult<Vec<LeaderRecord>>;

    /// Hero/candidate synergies for the given heroes, restricted to `names`.
    fn leader_synergies(&self, leaders: &[String], names: &[String]) -> AdvisorResult<Vec<LeaderSynergy>>;

    /// Globally thresholded combo tables: `op` holds increases at or above
    /// `op_threshold`, `trap` those at or below `trap_threshold`.
    fn combo_tables(&self, op_threshold: f64, trap_threshold: f64) -> AdvisorResult<ComboTables>;
}
