//! Enrichment pipeline: detections plus statistics into one ranked payload.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::combos::combos_on_board;
use super::leaders::{enrich_leaders, ScoredLeader};
use super::score::consolidated_score;
use super::synergy::{candidate_synergies, SynergySplit};
use super::top_tier::{select_top_tier, PreferredLeader, TierEntry};
use crate::config::{ComboThresholds, ScoringConfig};
use crate::error::AdvisorResult;
use crate::pool::PoolCache;
use crate::stats::{ComboEntry, StatsRepository};
use crate::vision::SlotResult;

/// Which region group a slot came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotSource {
    Pool,
    Selected,
    LeaderDefining,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub name: String,
    pub score: f64,
    pub win_rate: Option<f64>,
    pub high_skill_win_rate: Option<f64>,
    pub pick_order: Option<f64>,
    pub is_finisher: bool,
    pub leader: Option<String>,
    pub is_top_tier: bool,
    pub synergies: SynergySplit,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnrichedSlot {
    pub source: SlotSource,
    #[serde(flatten)]
    pub detection: SlotResult,
    pub candidate: Option<ScoredCandidate>,
}

/// Everything the overlay needs for one cycle.
#[derive(Clone, Debug, Serialize)]
pub struct DraftPayload {
    pub generated_at: DateTime<Local>,
    /// False once the classifier worker has been given up on
    pub live_suggestions: bool,
    pub preferred_leader: Option<u8>,
    pub slots: Vec<EnrichedSlot>,
    pub top_tier: Vec<TierEntry>,
    pub leaders: Vec<ScoredLeader>,
    pub op_combos: Vec<ComboEntry>,
    pub trap_combos: Vec<ComboEntry>,
}

/// Detection state the engine reads for one cycle.
#[derive(Clone, Copy, Debug)]
pub struct DraftView<'a> {
    pub pool: &'a PoolCache,
    pub selections: &'a [SlotResult],
    pub leader_slots: &'a [SlotResult],
    pub preferred_leader: Option<u8>,
}

pub struct ScoringEngine<'a, R: StatsRepository + ?Sized> {
    repo: &'a R,
    scoring: &'a ScoringConfig,
    thresholds: &'a ComboThresholds,
}

/// A failed lookup degrades to "no statistics" for that data kind.
fn or_empty<T: Default>(kind: &str, result: AdvisorResult<T>) -> T {
    result.unwrap_or_else(|e| {
        warn!("{} lookup failed, continuing without it: {}", kind, e);
        T::default()
    })
}

fn distinct_names(slots: &[SlotResult]) -> HashSet<String> {
    slots.iter().filter_map(|s| s.name.clone()).collect()
}

fn sorted(names: &HashSet<String>) -> Vec<String> {
    let mut list: Vec<String> = names.iter().cloned().collect();
    list.sort();
    list
}

impl<'a, R: StatsRepository + ?Sized> ScoringEngine<'a, R> {
    pub fn new(repo: &'a R, scoring: &'a ScoringConfig, thresholds: &'a ComboThresholds) -> Self {
        Self {
            repo,
            scoring,
            thresholds,
        }
    }

    pub fn evaluate(&self, view: &DraftView<'_>) -> DraftPayload {
        let pool_names = view.pool.names();
        let selected_names = distinct_names(view.selections);
        let on_board: HashSet<String> = pool_names.union(&selected_names).cloned().collect();
        let all_names = sorted(&on_board);
        let defining_names = sorted(&distinct_names(view.leader_slots));

        // One repository call per data kind
        let stats = or_empty("Candidate stats", self.repo.candidate_stats(&all_names));
        let pairs = or_empty("Pair synergy", self.repo.pair_synergies(&all_names));
        let leader_records = if defining_names.is_empty() {
            Vec::new()
        } else {
            or_empty("Hero", self.repo.leaders_for_candidates(&defining_names))
        };
        let leader_names: Vec<String> = leader_records.iter().map(|l| l.name.clone()).collect();
        let leader_links = if leader_names.is_empty() {
            Vec::new()
        } else {
            or_empty("Hero synergy", self.repo.leader_synergies(&leader_names, &all_names))
        };
        let tables = or_empty(
            "Combo",
            self.repo.combo_tables(self.thresholds.op, self.thresholds.trap),
        );

        let finisher_slots: HashSet<&str> = view
            .pool
            .entries()
            .chain(view.selections.iter())
            .filter(|s| s.is_finisher())
            .filter_map(|s| s.name())
            .collect();

        let mut candidates: HashMap<String, ScoredCandidate> = all_names
            .iter()
            .map(|name| {
                let record = stats.get(name);
                let win_rate = record.and_then(|r| r.win_rate);
                let pick_order = record.and_then(|r| r.pick_order);
                let candidate = ScoredCandidate {
                    name: name.clone(),
                    score: consolidated_score(win_rate, pick_order, self.scoring),
                    win_rate,
                    high_skill_win_rate: record.and_then(|r| r.high_skill_win_rate),
                    pick_order,
                    is_finisher: finisher_slots.contains(name.as_str())
                        || record.is_some_and(|r| r.is_finisher),
                    leader: record.and_then(|r| r.leader.clone()),
                    is_top_tier: false,
                    synergies: candidate_synergies(name, &pairs, &pool_names, self.scoring),
                };
                (name.clone(), candidate)
            })
            .collect();

        let mut leaders = enrich_leaders(
            &leader_records,
            view.leader_slots,
            &leader_links,
            &on_board,
            self.scoring,
        );

        let preferred = view
            .preferred_leader
            .map(|order| preferred_context(order, view.selections, &candidates));

        let mut entries: Vec<TierEntry> = sorted(&pool_names)
            .into_iter()
            .filter_map(|name| candidates.get(&name))
            .map(|c| TierEntry::candidate(c.name.clone(), c.score, c.is_finisher))
            .collect();
        entries.extend(leaders.iter().map(|l| TierEntry::leader(l.name.clone(), l.score)));

        let top_tier = select_top_tier(
            &entries,
            &pairs,
            preferred.as_ref(),
            self.scoring.top_tier_count,
            self.scoring.synergy_split,
        );
        for entry in &top_tier {
            if entry.is_leader {
                leaders
                    .iter_mut()
                    .filter(|l| l.name == entry.name)
                    .for_each(|l| l.is_top_tier = true);
            } else if let Some(candidate) = candidates.get_mut(&entry.name) {
                candidate.is_top_tier = true;
            }
        }

        let enrich = |source: SlotSource, slot: &SlotResult| EnrichedSlot {
            source,
            detection: slot.clone(),
            candidate: slot.name().and_then(|n| candidates.get(n)).cloned(),
        };
        let mut slots: Vec<EnrichedSlot> = view
            .pool
            .entries()
            .map(|s| enrich(SlotSource::Pool, s))
            .collect();
        slots.extend(view.selections.iter().map(|s| enrich(SlotSource::Selected, s)));
        slots.extend(view.leader_slots.iter().map(|s| enrich(SlotSource::LeaderDefining, s)));

        let op_combos = combos_on_board(&tables.op, &on_board);
        let trap_combos = combos_on_board(&tables.trap, &on_board);

        debug!(
            "Scored {} names, {} heroes; top tier {}, {} OP / {} trap combos on board",
            candidates.len(),
            leaders.len(),
            top_tier.len(),
            op_combos.len(),
            trap_combos.len()
        );

        DraftPayload {
            generated_at: Local::now(),
            live_suggestions: true,
            preferred_leader: view.preferred_leader,
            slots,
            top_tier,
            leaders,
            op_combos,
            trap_combos,
        }
    }
}

/// What the hero at `hero_order` already holds, from the selected group.
fn preferred_context(
    hero_order: u8,
    selections: &[SlotResult],
    candidates: &HashMap<String, ScoredCandidate>,
) -> PreferredLeader {
    let held_slots: Vec<&SlotResult> = selections
        .iter()
        .filter(|s| s.hero_order() == hero_order && s.name.is_some())
        .collect();
    let holds_finisher = held_slots.iter().any(|s| {
        s.is_finisher()
            || s.name()
                .and_then(|n| candidates.get(n))
                .is_some_and(|c| c.is_finisher)
    });
    PreferredLeader {
        hero_order,
        held: held_slots.iter().filter_map(|s| s.name.clone()).collect(),
        holds_finisher,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdvisorError;
    use crate::layout::{SlotDescriptor, SlotRect, SlotRole};
    use crate::scan::InitialScan;
    use crate::stats::{
        CandidateRecord, ComboTables, LeaderRecord, LeaderSynergy, SnapshotRepository,
        StatsSnapshot, SynergyPair,
    };

    fn slot(name: Option<&str>, hero_order: u8, finisher: bool) -> SlotResult {
        let descriptor = SlotDescriptor::new(
            SlotRect::new(0, 0, 10, 10),
            SlotRole {
                hero_order,
                ability_order: None,
                is_finisher: finisher,
            },
        );
        SlotResult::detected(&descriptor, name.map(str::to_string), 0.97)
    }

    fn record(name: &str, win_rate: f64, pick_order: f64) -> CandidateRecord {
        CandidateRecord {
            name: name.into(),
            win_rate: Some(win_rate),
            pick_order: Some(pick_order),
            ..Default::default()
        }
    }

    fn combo(a: &str, b: &str, increase: f64) -> ComboEntry {
        ComboEntry {
            a: a.into(),
            b: b.into(),
            synergy_increase: increase,
        }
    }

    fn repo() -> SnapshotRepository {
        SnapshotRepository::from_snapshot(StatsSnapshot {
            candidates: vec![
                record("A", 0.55, 5.0),
                record("B", 0.50, 20.0),
                record("C", 0.60, 2.0),
                record("U", 0.58, 3.0),
            ],
            synergies: vec![SynergyPair {
                a: "X".into(),
                b: "B".into(),
                synergy_win_rate: 0.61,
            }],
            leaders: vec![LeaderRecord {
                name: "Hero".into(),
                defining_candidate: "D".into(),
                win_rate: Some(0.52),
                pick_order: Some(10.0),
            }],
            leader_synergies: vec![LeaderSynergy {
                leader: "Hero".into(),
                candidate: "A".into(),
                synergy_win_rate: 0.56,
            }],
            combos: vec![combo("A", "B", 0.2), combo("A", "Q", 0.3), combo("C", "X", -0.08)],
        })
    }

    fn pool() -> PoolCache {
        let mut pool = PoolCache::new();
        pool.rebuild(&InitialScan {
            ultimates: vec![slot(Some("U"), 0, true)],
            standards: vec![slot(Some("A"), 1, false), slot(Some("B"), 1, false), slot(Some("C"), 2, false)],
            ..Default::default()
        });
        pool
    }

    #[test]
    fn test_payload_joins_stats_and_ranks() {
        let repo = repo();
        let scoring = ScoringConfig::default();
        let thresholds = ComboThresholds::default();
        let engine = ScoringEngine::new(&repo, &scoring, &thresholds);

        let pool = pool();
        let selections = vec![slot(Some("X"), 4, true), slot(None, 4, false)];
        let leader_slots = vec![slot(Some("D"), 3, false)];
        let payload = engine.evaluate(&DraftView {
            pool: &pool,
            selections: &selections,
            leader_slots: &leader_slots,
            preferred_leader: None,
        });

        assert_eq!(payload.slots.len(), 4 + 2 + 1);
        assert_eq!(payload.slots[0].source, SlotSource::Pool);
        assert!(payload.slots.iter().any(|s| s.source == SlotSource::Selected && s.candidate.is_none()));

        // C: best win rate and earliest pick
        assert_eq!(payload.top_tier[0].name, "C");
        assert_eq!(payload.top_tier.len(), 5);

        assert_eq!(payload.leaders.len(), 1);
        assert_eq!(payload.leaders[0].hero_order, Some(3));
        assert!(payload.leaders[0].is_top_tier);
        assert_eq!(payload.leaders[0].synergies.strong[0].partner, "A");

        assert_eq!(payload.op_combos, vec![combo("A", "B", 0.2)]);
        assert_eq!(payload.trap_combos, vec![combo("C", "X", -0.08)]);
    }

    #[test]
    fn test_preferred_leader_holding_finisher() {
        let repo = repo();
        let scoring = ScoringConfig::default();
        let thresholds = ComboThresholds::default();
        let engine = ScoringEngine::new(&repo, &scoring, &thresholds);

        let pool = pool();
        let selections = vec![slot(Some("X"), 4, true)];
        let payload = engine.evaluate(&DraftView {
            pool: &pool,
            selections: &selections,
            leader_slots: &[],
            preferred_leader: Some(4),
        });

        let names: Vec<&str> = payload.top_tier.iter().map(|e| e.name.as_str()).collect();
        // B partners X; U is a finisher and X already is one
        assert_eq!(names, vec!["B", "C", "A"]);
        assert!(payload.top_tier[0].synergy_pick);
        let u = payload.slots.iter().find(|s| s.detection.name() == Some("U")).unwrap();
        assert!(!u.candidate.as_ref().unwrap().is_top_tier);
    }

    struct Offline;

    impl StatsRepository for Offline {
        fn candidate_stats(&self, _: &[String]) -> AdvisorResult<HashMap<String, CandidateRecord>> {
            Err(AdvisorError::Stats("offline".into()))
        }
        fn pair_synergies(&self, _: &[String]) -> AdvisorResult<Vec<SynergyPair>> {
            Err(AdvisorError::Stats("offline".into()))
        }
        fn leaders_for_candidates(&self, _: &[String]) -> AdvisorResult<Vec<LeaderRecord>> {
            Err(AdvisorError::Stats("offline".into()))
        }
        fn leader_synergies(&self, _: &[String], _: &[String]) -> AdvisorResult<Vec<LeaderSynergy>> {
            Err(AdvisorError::Stats("offline".into()))
        }
        fn combo_tables(&self, _: f64, _: f64) -> AdvisorResult<ComboTables> {
            Err(AdvisorError::Stats("offline".into()))
        }
    }

    #[test]
    fn test_repository_failure_degrades_to_neutral() {
        let scoring = ScoringConfig::default();
        let thresholds = ComboThresholds::default();
        let engine = ScoringEngine::new(&Offline, &scoring, &thresholds);

        let pool = pool();
        let leader_slots = vec![slot(Some("D"), 3, false)];
        let payload = engine.evaluate(&DraftView {
            pool: &pool,
            selections: &[],
            leader_slots: &leader_slots,
            preferred_leader: None,
        });

        assert!(payload.leaders.is_empty());
        assert!(payload.op_combos.is_empty());
        assert_eq!(payload.top_tier.len(), 4);
        assert!(payload.top_tier.iter().all(|e| (e.score - 0.5).abs() < 1e-9));
    }

    #[test]
    fn test_payload_serializes() {
        let repo = repo();
        let scoring = ScoringConfig::default();
        let thresholds = ComboThresholds::default();
        let engine = ScoringEngine::new(&repo, &scoring, &thresholds);
        let pool = pool();
        let payload = engine.evaluate(&DraftView {
            pool: &pool,
            selections: &[],
            leader_slots: &[],
            preferred_leader: None,
        });

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["slots"][0]["source"], "pool");
        assert_eq!(json["slots"][0]["name"], "U");
        assert!(json["generated_at"].is_string());
    }
}
