//! Top-tier suggestion list.
//!
//! Without a preferred hero this is simply the best-scoring entries. With
//! one, partners of what the hero already holds go first, finishers are
//! dropped once the hero has one, and other heroes never fill the list.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::stats::SynergyPair;

/// Anything that can be suggested: a pool candidate or a hero.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TierEntry {
    pub name: String,
    pub score: f64,
    pub is_finisher: bool,
    pub is_leader: bool,
    /// Ranked ahead because it pairs with something the preferred hero holds
    pub synergy_pick: bool,
}

impl TierEntry {
    pub fn candidate(name: impl Into<String>, score: f64, is_finisher: bool) -> Self {
        Self {
            name: name.into(),
            score,
            is_finisher,
            is_leader: false,
            synergy_pick: false,
        }
    }

    pub fn leader(name: impl Into<String>, score: f64) -> Self {
        Self {
            is_leader: true,
            ..Self::candidate(name, score, false)
        }
    }
}

/// The hero the player is drafting for.
#[derive(Clone, Debug, Default)]
pub struct PreferredLeader {
    pub hero_order: u8,
    /// Names the hero has already picked
    pub held: HashSet<String>,
    pub holds_finisher: bool,
}

fn by_score_desc(a: &TierEntry, b: &TierEntry) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.name.cmp(&b.name))
}

pub fn select_top_tier(
    entries: &[TierEntry],
    pairs: &[SynergyPair],
    preferred: Option<&PreferredLeader>,
    count: usize,
    min_synergy: f64,
) -> Vec<TierEntry> {
    let Some(preferred) = preferred else {
        let mut ranked = entries.to_vec();
        ranked.sort_by(by_score_desc);
        ranked.truncate(count);
        return ranked;
    };

    let eligible: Vec<&TierEntry> = entries
        .iter()
        .filter(|e| !preferred.held.contains(&e.name))
        .filter(|e| !(preferred.holds_finisher && e.is_finisher))
        .collect();

    // Only positive synergy promotes a candidate
    let partners: HashSet<&str> = pairs
        .iter()
        .filter(|pair| pair.synergy_win_rate >= min_synergy)
        .flat_map(|pair| {
            preferred
                .held
                .iter()
                .filter_map(move |held| pair.partner_of(held))
        })
        .collect();

    let mut synergy: Vec<TierEntry> = eligible
        .iter()
        .filter(|e| !e.is_leader && partners.contains(e.name.as_str()))
        .map(|e| TierEntry {
            synergy_pick: true,
            ..(*e).clone()
        })
        .collect();
    synergy.sort_by(by_score_desc);
    synergy.truncate(count);

    let chosen: HashSet<String> = synergy.iter().map(|e| e.name.clone()).collect();
    let mut fill: Vec<TierEntry> = eligible
        .into_iter()
        .filter(|e| !e.is_leader && !chosen.contains(&e.name))
        .cloned()
        .collect();
    fill.sort_by(by_score_desc);

    let remaining = count.saturating_sub(synergy.len());
    synergy.extend(fill.into_iter().take(remaining));
    synergy
}
