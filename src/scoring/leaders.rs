use serde::Serialize;
use std::collections::HashSet;

use super::score::consolidated_score;
use super::synergy::{leader_synergies, SynergySplit};
use crate::config::ScoringConfig;
use crate::stats::{LeaderRecord, LeaderSynergy};
use crate::vision::SlotResult;

/// A hero identified on screen this cycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredLeader {
    pub name: String,
    /// Screen position of the hero, from its defining slot
    pub hero_order: Option<u8>,
    pub defining_candidate: String,
    pub score: f64,
    pub win_rate: Option<f64>,
    pub pick_order: Option<f64>,
    pub is_top_tier: bool,
    pub synergies: SynergySplit,
}

/// Scores each identified hero and attaches its synergies with names on the
/// board. Heroes are ordered by screen position.
pub fn enrich_leaders(
    records: &[LeaderRecord],
    leader_slots: &[SlotResult],
    synergies: &[LeaderSynergy],
    on_board: &HashSet<String>,
    scoring: &ScoringConfig,
) -> Vec<ScoredLeader> {
    let mut seen = HashSet::new();
    let mut leaders: Vec<ScoredLeader> = records
        .iter()
        .filter(|r| seen.insert(r.name.clone()))
        .map(|record| {
            let hero_order = leader_slots
                .iter()
                .find(|s| s.name() == Some(record.defining_candidate.as_str()))
                .map(SlotResult::hero_order);
            ScoredLeader {
                name: record.name.clone(),
                hero_order,
                defining_candidate: record.defining_candidate.clone(),
                score: consolidated_score(record.win_rate, record.pick_order, scoring),
                win_rate: record.win_rate,
                pick_order: record.pick_order,
                is_top_tier: false,
                synergies: leader_synergies(&record.name, synergies, on_board, scoring),
            }
        })
        .collect();

    leaders.sort_by(|a, b| {
        a.hero_order
            .unwrap_or(u8::MAX)
            .cmp(&b.hero_order.unwrap_or(u8::MAX))
            .then_with(|| a.name.cmp(&b.name))
    });
    leaders
}
