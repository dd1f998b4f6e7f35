//! Strong/weak synergy lists.

use serde::Serialize;
use std::collections::HashSet;

use crate::config::ScoringConfig;
use crate::stats::{LeaderSynergy, SynergyPair};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SynergyLink {
    pub partner: String,
    pub synergy_win_rate: f64,
}

/// Strong links sorted best first, weak links sorted worst first.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SynergySplit {
    pub strong: Vec<SynergyLink>,
    pub weak: Vec<SynergyLink>,
}

impl SynergySplit {
    pub fn from_links(links: impl IntoIterator<Item = SynergyLink>, scoring: &ScoringConfig) -> Self {
        let (mut strong, mut weak): (Vec<_>, Vec<_>) = links
            .into_iter()
            .filter(|l| l.synergy_win_rate.is_finite())
            .partition(|l| l.synergy_win_rate >= scoring.synergy_split);

        strong.sort_by(|a, b| {
            b.synergy_win_rate
                .total_cmp(&a.synergy_win_rate)
                .then_with(|| a.partner.cmp(&b.partner))
        });
        weak.sort_by(|a, b| {
            a.synergy_win_rate
                .total_cmp(&b.synergy_win_rate)
                .then_with(|| a.partner.cmp(&b.partner))
        });
        strong.truncate(scoring.synergy_cap);
        weak.truncate(scoring.synergy_cap);

        Self { strong, weak }
    }

    pub fn is_empty(&self) -> bool {
        self.strong.is_empty() && self.weak.is_empty()
    }
}

/// Pair synergies of `name` whose partner is in `allowed`.
pub fn candidate_synergies(
    name: &str,
    pairs: &[SynergyPair],
    allowed: &HashSet<String>,
    scoring: &ScoringConfig,
) -> SynergySplit {
    let links = pairs.iter().filter_map(|pair| {
        let partner = pair.partner_of(name)?;
        if partner == name || !allowed.contains(partner) {
            return None;
        }
        Some(SynergyLink {
            partner: partner.to_string(),
            synergy_win_rate: pair.synergy_win_rate,
        })
    });
    SynergySplit::from_links(links, scoring)
}

/// Candidate synergies of one hero, restricted to `allowed`.
pub fn leader_synergies(
    leader: &str,
    synergies: &[LeaderSynergy],
    allowed: &HashSet<String>,
    scoring: &ScoringConfig,
) -> SynergySplit {
    let links = synergies
        .iter()
        .filter(|s| s.leader == leader && allowed.contains(&s.candidate))
        .map(|s| SynergyLink {
            partner: s.candidate.clone(),
            synergy_win_rate: s.synergy_win_rate,
        });
    SynergySplit::from_links(links, scoring)
}
