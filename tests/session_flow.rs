//! End-to-end draft flow against a scripted classifier.

use draft_advisor::error::AdvisorResult;
use draft_advisor::vision::Classifier;
use draft_advisor::{AdvisorConfig, DraftSession, SnapshotRepository};
use image::{ImageBuffer, Rgba, RgbaImage};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const LABELS: [&str; 5] = ["empty", "A", "B", "C", "D"];

/// Predicts the class whose index equals the red channel of the slot.
struct Scripted {
    labels: Vec<String>,
}

impl Classifier for Scripted {
    fn load(&mut self, _model_path: &Path, labels_path: &Path) -> AdvisorResult<()> {
        self.labels = draft_advisor::vision::load_vocabulary(labels_path)?;
        Ok(())
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn infer(&self, tensor: &[f32], count: usize, input_size: u32) -> AdvisorResult<Vec<Vec<f32>>> {
        let item = (input_size * input_size * 3) as usize;
        Ok((0..count)
            .map(|i| {
                let n = self.labels.len();
                let class = ((tensor[i * item] * 255.0).round() as usize).min(n - 1);
                if class == 0 {
                    // Blank slot: nothing clears the threshold
                    return vec![1.0 / n as f32; n];
                }
                let mut row = vec![0.01; n];
                row[class] = 0.96;
                row
            })
            .collect())
    }
}

/// 40x20 screen: pool row shows A B C D (D is a hero-defining slot), the
/// selected row shows `picked` in its first slot.
fn screen(picked: u8) -> RgbaImage {
    ImageBuffer::from_fn(40, 20, |x, y| {
        let class = if y < 10 { (x / 10) as u8 + 1 } else if x < 10 { picked } else { 0 };
        Rgba([class, 0, 0, 255])
    })
}

fn fixture() -> (TempDir, AdvisorConfig) {
    let dir = TempDir::new().unwrap();

    let labels_path = dir.path().join("class_names.json");
    fs::write(&labels_path, serde_json::to_string(&LABELS).unwrap()).unwrap();

    let layout_path = dir.path().join("layout_coordinates.json");
    fs::write(
        &layout_path,
        r#"{
            "resolutions": {
                "40x20": {
                    "ultimate_slots_coords": [],
                    "standard_slots_coords": [
                        {"x": 0, "y": 0, "width": 10, "height": 10, "hero_order": 0, "ability_order": 0},
                        {"x": 10, "y": 0, "width": 10, "height": 10, "hero_order": 0, "ability_order": 1},
                        {"x": 20, "y": 0, "width": 10, "height": 10, "hero_order": 1, "ability_order": 0},
                        {"x": 30, "y": 0, "width": 10, "height": 10, "hero_order": 1, "ability_order": 2}
                    ],
                    "selected_abilities_coords": [
                        {"x": 0, "y": 10, "hero_order": 0},
                        {"x": 10, "y": 10, "hero_order": 0}
                    ],
                    "selected_abilities_params": {"width": 10, "height": 10}
                }
            }
        }"#,
    )
    .unwrap();

    let config = AdvisorConfig {
        model_path: dir.path().to_path_buf(),
        labels_path,
        layout_path,
        input_size: 8,
        ..Default::default()
    };
    (dir, config)
}

fn stats() -> SnapshotRepository {
    serde_json::from_str::<draft_advisor::stats::StatsSnapshot>(
        r#"{
            "candidates": [
                {"name": "A", "win_rate": 0.56, "pick_order": 4.0},
                {"name": "B", "win_rate": 0.51, "pick_order": 12.0},
                {"name": "C", "win_rate": 0.49, "pick_order": 30.0}
            ],
            "leaders": [{"name": "Hero", "defining_candidate": "D", "win_rate": 0.5}],
            "combos": [
                {"a": "A", "b": "C", "synergy_increase": 0.15},
                {"a": "A", "b": "Z", "synergy_increase": 0.25},
                {"a": "B", "b": "C", "synergy_increase": -0.09}
            ]
        }"#,
    )
    .map(SnapshotRepository::from_snapshot)
    .unwrap()
}

#[test]
fn initial_scan_then_rescan_narrows_pool_and_ranks() {
    let (_dir, config) = fixture();
    let factory = || -> Box<dyn Classifier> { Box::new(Scripted { labels: Vec::new() }) };
    let mut session = DraftSession::open(config, Arc::new(factory), stats()).unwrap();
    session.start().unwrap();

    let payload = session.initial_scan(screen(0)).unwrap();
    let mut pool: Vec<String> = session.pool().names().into_iter().collect();
    pool.sort();
    assert_eq!(pool, vec!["A", "B", "C", "D"]);
    assert_eq!(payload.leaders.len(), 1);
    assert_eq!(payload.leaders[0].name, "Hero");
    assert_eq!(payload.leaders[0].hero_order, Some(1));
    assert_eq!(payload.top_tier[0].name, "A");

    // A-Z needs Z on the board
    assert_eq!(payload.op_combos.len(), 1);
    assert_eq!(payload.op_combos[0].b, "C");

    let payload = session.rescan(screen(2)).unwrap();
    assert!(!session.pool().contains("B"));
    assert!(session.pool().contains("A") && session.pool().contains("C"));
    assert_eq!(session.selections()[0].name.as_deref(), Some("B"));
    // B is selected, so the B-C trap is still on the board
    assert_eq!(payload.trap_combos.len(), 1);
    assert!(payload.top_tier.iter().all(|e| e.name != "B"));

    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["live_suggestions"], true);
    session.shutdown();
}
