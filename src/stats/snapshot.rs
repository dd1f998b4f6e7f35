//! JSON snapshot of the statistics store.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::info;

use super::{
    CandidateRecord, ComboEntry, ComboTables, LeaderRecord, LeaderSynergy, StatsRepository,
    SynergyPair,
};
use crate::error::{AdvisorError, AdvisorResult};

/// On-disk layout of a statistics export.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSnapshot {
    pub candidates: Vec<CandidateRecord>,
    pub synergies: Vec<SynergyPair>,
    pub leaders: Vec<LeaderRecord>,
    pub leader_synergies: Vec<LeaderSynergy>,
    pub combos: Vec<ComboEntry>,
}

/// In-memory [`StatsRepository`] over a [`StatsSnapshot`].
#[derive(Clone, Debug, Default)]
pub struct SnapshotRepository {
    candidates: HashMap<String, CandidateRecord>,
    synergies: Vec<SynergyPair>,
    leaders: Vec<LeaderRecord>,
    leader_synergies: Vec<LeaderSynergy>,
    combos: Vec<ComboEntry>,
}

impl SnapshotRepository {
    pub fn load(path: &Path) -> AdvisorResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            AdvisorError::Stats(format!("failed to read {}: {}", path.display(), e))
        })?;
        let snapshot: StatsSnapshot = serde_json::from_str(&contents)?;
        info!(
            "Loaded statistics snapshot: {} candidates, {} pairs, {} heroes, {} combos",
            snapshot.candidates.len(),
            snapshot.synergies.len(),
            snapshot.leaders.len(),
            snapshot.combos.len()
        );
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn from_snapshot(snapshot: StatsSnapshot) -> Self {
        Self {
            candidates: snapshot
                .candidates
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect(),
            synergies: snapshot.synergies,
            leaders: snapshot.leaders,
            leader_synergies: snapshot.leader_synergies,
            combos: snapshot.combos,
        }
    }
}

fn name_set(names: &[String]) -> HashSet<&str> {
    names.iter().map(String::as_str).collect()
}

impl StatsRepository for SnapshotRepository {
    fn candidate_stats(&self, names: &[String]) -> AdvisorResult<HashMap<String, CandidateRecord>> {
        Ok(names
            .iter()
            .filter_map(|n| self.candidates.get(n).map(|c| (n.clone(), c.clone())))
            .collect())
    }

    fn pair_synergies(&self, names: &[String]) -> AdvisorResult<Vec<SynergyPair>> {
        let wanted = name_set(names);
        Ok(self
            .synergies
            .iter()
            .filter(|p| wanted.contains(p.a.as_str()) && wanted.contains(p.b.as_str()))
            .cloned()
            .collect())
    }

    fn leaders_for_candidates(&self, names: &[String]) -> AdvisorResult<Vec<LeaderRecord>> {
        let wanted = name_set(names);
        Ok(self
            .leaders
            .iter()
            .filter(|l| wanted.contains(l.defining_candidate.as_str()))
            .cloned()
            .collect())
    }

    fn leader_synergies(&self, leaders: &[String], names: &[String]) -> AdvisorResult<Vec<LeaderSynergy>> {
        let heroes = name_set(leaders);
        let wanted = name_set(names);
        Ok(self
            .leader_synergies
            .iter()
            .filter(|s| heroes.contains(s.leader.as_str()) && wanted.contains(s.candidate.as_str()))
            .cloned()
            .collect())
    }

    fn combo_tables(&self, op_threshold: f64, trap_threshold: f64) -> AdvisorResult<ComboTables> {
        let mut tables = ComboTables::default();
        for combo in &self.combos {
            if combo.synergy_increase >= op_threshold {
                tables.op.push(combo.clone());
            } else if combo.synergy_increase <= trap_threshold {
                tables.trap.push(combo.clone());
            }
        }
        tables
            .op
            .sort_by(|a, b| b.synergy_increase.total_cmp(&a.synergy_increase));
        tables
            .trap
            .sort_by(|a, b| a.synergy_increase.total_cmp(&b.synergy_increase));
        Ok(tables)
    }
}
