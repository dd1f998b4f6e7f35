//! Scan orchestration: which region groups to classify per scan.
//!
//! An initial scan reads the whole pool plus the hero-defining slots; a
//! rescan only reads the smaller "already selected" group.

use image::RgbaImage;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::error::AdvisorResult;
use crate::layout::ResolutionLayout;
use crate::vision::{apply_exclusions, SlotResult};
use crate::worker::{Clock, GroupJob, GroupOutcome, ScanJob, SlotGroup, WorkerSupervisor};

/// Per-scan settings.
#[derive(Clone, Debug)]
pub struct ScanOptions {
    pub threshold: f32,
    pub leader_defining_order: u8,
    /// Names already picked; cleared from pool detections
    pub excluded: HashSet<String>,
}

/// Result of an initial scan.
#[derive(Clone, Debug, Default)]
pub struct InitialScan {
    /// Pool group A
    pub ultimates: Vec<SlotResult>,
    /// Pool group B
    pub standards: Vec<SlotResult>,
    pub leader_defining: Vec<SlotResult>,
    /// Always empty; selections come from rescans
    pub selections: Vec<SlotResult>,
}

/// Result of a rescan.
#[derive(Clone, Debug, Default)]
pub struct Rescan {
    pub selections: Vec<SlotResult>,
}

pub fn plan_initial(layout: &ResolutionLayout, leader_defining_order: u8) -> Vec<GroupJob> {
    vec![
        GroupJob {
            group: SlotGroup::Ultimates,
            slots: layout.ultimate_slots(),
        },
        GroupJob {
            group: SlotGroup::Standards,
            slots: layout.standard_slots(),
        },
        GroupJob {
            group: SlotGroup::LeaderDefining,
            slots: layout.leader_defining_slots(leader_defining_order),
        },
    ]
}

/// `None` when the layout cannot describe the selected group.
pub fn plan_rescan(layout: &ResolutionLayout) -> Option<Vec<GroupJob>> {
    let slots = layout.selected_slots()?;
    if slots.is_empty() {
        return None;
    }
    Some(vec![GroupJob {
        group: SlotGroup::Selected,
        slots,
    }])
}

fn take_group(outcomes: &mut Vec<GroupOutcome>, group: SlotGroup) -> Vec<SlotResult> {
    match outcomes.iter().position(|o| o.group == group) {
        Some(pos) => {
            let outcome = outcomes.swap_remove(pos);
            if let Some(e) = &outcome.inference_error {
                warn!("{:?} returned defaults: {}", group, e);
            }
            outcome.results
        }
        None => Vec::new(),
    }
}

fn accepted(results: &[SlotResult]) -> usize {
    results.iter().filter(|r| r.name.is_some()).count()
}

/// Classifies the pool and the hero-defining slots in one worker request.
///
/// The exclusion set applies to the pool groups only; hero-defining slots
/// are reported as detected.
pub fn run_initial_scan<C: Clock>(
    supervisor: &mut WorkerSupervisor<C>,
    image: RgbaImage,
    layout: &ResolutionLayout,
    options: &ScanOptions,
) -> AdvisorResult<InitialScan> {
    let job = ScanJob {
        image,
        groups: plan_initial(layout, options.leader_defining_order),
        threshold: options.threshold,
    };
    let mut outcomes = supervisor.submit(job)?;

    let mut ultimates = take_group(&mut outcomes, SlotGroup::Ultimates);
    let mut standards = take_group(&mut outcomes, SlotGroup::Standards);
    let leader_defining = take_group(&mut outcomes, SlotGroup::LeaderDefining);

    apply_exclusions(&mut ultimates, &options.excluded);
    apply_exclusions(&mut standards, &options.excluded);

    info!(
        "Initial scan: {}/{} ultimates, {}/{} standards, {}/{} hero slots recognised",
        accepted(&ultimates),
        ultimates.len(),
        accepted(&standards),
        standards.len(),
        accepted(&leader_defining),
        leader_defining.len()
    );

    Ok(InitialScan {
        ultimates,
        standards,
        leader_defining,
        selections: Vec::new(),
    })
}

/// Classifies only the selected-abilities group.
pub fn run_rescan<C: Clock>(
    supervisor: &mut WorkerSupervisor<C>,
    image: RgbaImage,
    layout: &ResolutionLayout,
    options: &ScanOptions,
) -> AdvisorResult<Rescan> {
    let Some(groups) = plan_rescan(layout) else {
        debug!("No selected-abilities layout for this resolution; skipping rescan");
        return Ok(Rescan::default());
    };

    let job = ScanJob {
        image,
        groups,
        threshold: options.threshold,
    };
    let mut outcomes = supervisor.submit(job)?;
    let selections = take_group(&mut outcomes, SlotGroup::Selected);

    info!(
        "Rescan: {}/{} selected slots recognised",
        accepted(&selections),
        selections.len()
    );
    Ok(Rescan { selections })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use crate::error::{AdvisorError, AdvisorResult};
    use crate::layout::{CoordEntry, SharedDimensions};
    use crate::vision::Classifier;
    use crate::worker::{ManualClock, ModelLocation};
    use image::ImageBuffer;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    /// Labels each item by the red channel of its first pixel.
    struct ByColor(Vec<String>);

    impl Classifier for ByColor {
        fn load(&mut self, _: &Path, _: &Path) -> AdvisorResult<()> {
            Ok(())
        }
        fn labels(&self) -> &[String] {
            &self.0
        }
        fn infer(&self, tensor: &[f32], count: usize, size: u32) -> AdvisorResult<Vec<Vec<f32>>> {
            let item = (size * size * 3) as usize;
            Ok((0..count)
                .map(|i| {
                    let class = (tensor[i * item] * 255.0).round() as usize;
                    let mut row = vec![0.0; self.0.len()];
                    row[class.min(self.0.len() - 1)] = 1.0;
                    row
                })
                .collect())
        }
    }

    fn coord(x: i32, hero: u8, ability: Option<u8>) -> CoordEntry {
        CoordEntry {
            x,
            y: 0,
            width: Some(10),
            height: Some(10),
            hero_order: Some(hero),
            ability_order: ability,
            is_ultimate: None,
        }
    }

    fn supervisor() -> WorkerSupervisor<ManualClock> {
        let factory = || -> Box<dyn Classifier> {
            Box::new(ByColor(vec!["none".into(), "A".into(), "B".into(), "C".into()]))
        };
        let mut supervisor = WorkerSupervisor::with_clock(
            Arc::new(factory),
            ModelLocation {
                model_path: PathBuf::from("m"),
                labels_path: PathBuf::from("l"),
            },
            WorkerConfig::default(),
            4,
            ManualClock::new(),
        );
        supervisor.initialize().unwrap();
        supervisor
    }

    /// 40x10 image with four 10px columns coloured by red = 1, 2, 3, 1.
    fn image() -> RgbaImage {
        ImageBuffer::from_fn(40, 10, |x, _| {
            let class = [1u8, 2, 3, 1][(x / 10) as usize];
            image::Rgba([class, 0, 0, 255])
        })
    }

    fn options() -> ScanOptions {
        ScanOptions {
            threshold: 0.5,
            leader_defining_order: 2,
            excluded: HashSet::new(),
        }
    }

    #[test]
    fn test_initial_scan_splits_groups() {
        let layout = ResolutionLayout {
            ultimate_slots_coords: vec![coord(0, 0, None)],
            standard_slots_coords: vec![coord(10, 0, Some(1)), coord(20, 0, Some(2))],
            ..Default::default()
        };
        let mut supervisor = supervisor();
        let scan = run_initial_scan(&mut supervisor, image(), &layout, &options()).unwrap();

        assert_eq!(scan.ultimates.len(), 1);
        assert_eq!(scan.ultimates[0].name.as_deref(), Some("A"));
        assert!(scan.ultimates[0].is_finisher());
        assert_eq!(scan.standards.len(), 2);
        assert_eq!(scan.standards[1].name.as_deref(), Some("C"));
        assert_eq!(scan.leader_defining.len(), 1);
        assert_eq!(scan.leader_defining[0].name.as_deref(), Some("C"));
        assert!(scan.selections.is_empty());
    }

    #[test]
    fn test_exclusions_skip_leader_defining_slots() {
        let layout = ResolutionLayout {
            standard_slots_coords: vec![coord(20, 3, Some(2))],
            ..Default::default()
        };
        let mut opts = options();
        opts.excluded.insert("C".to_string());

        let mut supervisor = supervisor();
        let scan = run_initial_scan(&mut supervisor, image(), &layout, &opts).unwrap();
        assert_eq!(scan.standards[0].name, None);
        assert!(scan.standards[0].confidence > 0.9);
        assert_eq!(scan.leader_defining[0].name.as_deref(), Some("C"));
    }

    #[test]
    fn test_rescan_without_selected_layout_is_empty() {
        let layout = ResolutionLayout {
            selected_abilities_coords: vec![CoordEntry {
                width: None,
                height: None,
                ..coord(0, 0, None)
            }],
            ..Default::default()
        };
        let mut supervisor = supervisor();
        let rescan = run_rescan(&mut supervisor, image(), &layout, &options()).unwrap();
        assert!(rescan.selections.is_empty());
    }

    #[test]
    fn test_rescan_reads_selected_group() {
        let layout = ResolutionLayout {
            selected_abilities_coords: vec![
                CoordEntry { width: None, height: None, ..coord(10, 1, None) },
                CoordEntry { width: None, height: None, is_ultimate: Some(true), ..coord(30, 1, None) },
            ],
            selected_abilities_params: Some(SharedDimensions { width: 10, height: 10 }),
            ..Default::default()
        };
        let mut supervisor = supervisor();
        let rescan = run_rescan(&mut supervisor, image(), &layout, &options()).unwrap();

        let names: Vec<_> = rescan.selections.iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec![Some("B".to_string()), Some("A".to_string())]);
        assert!(rescan.selections[1].is_finisher());
    }

    #[test]
    fn test_scan_error_propagates() {
        let layout = ResolutionLayout::default();
        let mut supervisor = supervisor();
        supervisor.shutdown();
        assert!(matches!(
            run_initial_scan(&mut supervisor, image(), &layout, &options()),
            Err(AdvisorError::WorkerTerminated(_))
        ));
    }
}
