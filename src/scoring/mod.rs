//! Enrichment and scoring.
//!
//! This module provides:
//! - The consolidated score (win rate and pick order blend)
//! - Strong/weak synergy lists for candidates and heroes
//! - Top-tier selection around an optional preferred hero
//! - OP/trap combo filtering
//! - The [`ScoringEngine`] that assembles a [`DraftPayload`]

pub mod combos;
pub mod engine;
pub mod leaders;
pub mod score;
pub mod synergy;
pub mod top_tier;

pub use engine::{DraftPayload, DraftView, EnrichedSlot, ScoredCandidate, ScoringEngine, SlotSource};
pub use leaders::ScoredLeader;
pub use score::consolidated_score;
pub use synergy::{SynergyLink, SynergySplit};
pub use top_tier::{select_top_tier, PreferredLeader, TierEntry};
