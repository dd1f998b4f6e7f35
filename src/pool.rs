//! Pool cache: candidates still available to pick.

use std::collections::HashSet;
use tracing::debug;

use crate::scan::InitialScan;
use crate::vision::SlotResult;

/// Available candidates, split by pool group.
///
/// Rebuilt from each initial scan and only ever narrowed by rescans.
#[derive(Clone, Debug, Default)]
pub struct PoolCache {
    finishers: Vec<SlotResult>,
    standards: Vec<SlotResult>,
}

impl PoolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cache with the accepted detections of `scan`.
    pub fn rebuild(&mut self, scan: &InitialScan) {
        self.finishers = accepted_only(&scan.ultimates);
        self.standards = accepted_only(&scan.standards);
        debug!(
            "Pool cache rebuilt: {} ultimates, {} standards",
            self.finishers.len(),
            self.standards.len()
        );
    }

    /// Removes every name confirmed as selected. Returns how many entries
    /// were dropped.
    pub fn apply_selections(&mut self, selections: &[SlotResult]) -> usize {
        let picked: HashSet<&str> = selections.iter().filter_map(|s| s.name()).collect();
        if picked.is_empty() {
            return 0;
        }
        let before = self.len();
        let keep = |r: &SlotResult| r.name().is_some_and(|n| !picked.contains(n));
        self.finishers.retain(keep);
        self.standards.retain(keep);
        let removed = before - self.len();
        if removed > 0 {
            debug!("Pool cache: {} entries picked since last scan", removed);
        }
        removed
    }

    pub fn finishers(&self) -> &[SlotResult] {
        &self.finishers
    }

    pub fn standards(&self) -> &[SlotResult] {
        &self.standards
    }

    /// Every available entry, finishers first.
    pub fn entries(&self) -> impl Iterator<Item = &SlotResult> {
        self.finishers.iter().chain(self.standards.iter())
    }

    /// Distinct available names.
    pub fn names(&self) -> HashSet<String> {
        self.entries()
            .filter_map(|r| r.name.clone())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries().any(|r| r.name() == Some(name))
    }

    pub fn len(&self) -> usize {
        self.finishers.len() + self.standards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.finishers.clear();
        self.standards.clear();
    }
}

fn accepted_only(results: &[SlotResult]) -> Vec<SlotResult> {
    results.iter().filter(|r| r.name.is_some()).cloned().collect()
}
