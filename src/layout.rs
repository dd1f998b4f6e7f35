//! Slot layout: screen rectangles and the roles attached to them.
//!
//! The layout file is keyed by resolution ("1920x1080") and lists every
//! region group in absolute pixel coordinates. Groups without their own
//! width/height (heroes, selected abilities) share dimensions from a
//! `*_params` entry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{AdvisorError, AdvisorResult};

/// A rectangle in absolute pixel coordinates.
///
/// Signed so that a misconfigured layout (negative origin) survives parsing
/// and is rejected per slot instead of failing the whole file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl SlotRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// True when the rectangle has positive size and lies inside an image of
    /// the given dimensions.
    pub fn fits_within(&self, image_width: u32, image_height: u32) -> bool {
        if self.x < 0 || self.y < 0 || self.width <= 0 || self.height <= 0 {
            return false;
        }
        let right = self.x as i64 + self.width as i64;
        let bottom = self.y as i64 + self.height as i64;
        right <= image_width as i64 && bottom <= image_height as i64
    }
}

/// Role attributes of a slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRole {
    /// Which hero (leader) the slot belongs to
    pub hero_order: u8,
    /// Position of the ability within the hero's kit, when known
    pub ability_order: Option<u8>,
    /// Ultimate-type slot
    pub is_finisher: bool,
}

/// One classifiable screen region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotDescriptor {
    pub rect: SlotRect,
    pub role: SlotRole,
}

impl SlotDescriptor {
    pub fn new(rect: SlotRect, role: SlotRole) -> Self {
        Self { rect, role }
    }
}

/// One coordinate entry as written by the layout mapper.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordEntry {
    pub x: i32,
    pub y: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_order: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability_order: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_ultimate: Option<bool>,
}

/// Shared dimensions for groups whose entries carry only a position.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SharedDimensions {
    pub width: i32,
    pub height: i32,
}

/// All slot groups for one screen resolution.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionLayout {
    pub ultimate_slots_coords: Vec<CoordEntry>,
    pub standard_slots_coords: Vec<CoordEntry>,
    pub models_coords: Vec<CoordEntry>,
    pub heroes_coords: Vec<CoordEntry>,
    pub heroes_params: Option<SharedDimensions>,
    pub selected_abilities_coords: Vec<CoordEntry>,
    pub selected_abilities_params: Option<SharedDimensions>,
}

/// Outcome of [`ResolutionLayout::validate`].
#[derive(Clone, Debug, Default, Serialize)]
pub struct LayoutValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl LayoutValidation {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Expected entry counts for a full ten-hero draft screen.
const EXPECTED_COUNTS: [(&str, usize); 5] = [
    ("ultimate_slots_coords", 12),
    ("standard_slots_coords", 36),
    ("heroes_coords", 10),
    ("selected_abilities_coords", 40),
    ("models_coords", 12),
];

fn descriptor_from(entry: &CoordEntry, dims: Option<SharedDimensions>, is_finisher: bool) -> SlotDescriptor {
    let width = entry.width.or(dims.map(|d| d.width)).unwrap_or(0);
    let height = entry.height.or(dims.map(|d| d.height)).unwrap_or(0);
    SlotDescriptor {
        rect: SlotRect::new(entry.x, entry.y, width, height),
        role: SlotRole {
            hero_order: entry.hero_order.unwrap_or(0),
            ability_order: entry.ability_order,
            is_finisher,
        },
    }
}

impl ResolutionLayout {
    /// Ultimate pool slots (pool group A).
    pub fn ultimate_slots(&self) -> Vec<SlotDescriptor> {
        self.ultimate_slots_coords
            .iter()
            .map(|e| descriptor_from(e, None, true))
            .collect()
    }

    /// Standard pool slots (pool group B).
    pub fn standard_slots(&self) -> Vec<SlotDescriptor> {
        self.standard_slots_coords
            .iter()
            .map(|e| descriptor_from(e, None, e.is_ultimate.unwrap_or(false)))
            .collect()
    }

    /// Standard slots whose ability order identifies the hero they belong to.
    pub fn leader_defining_slots(&self, defining_order: u8) -> Vec<SlotDescriptor> {
        self.standard_slots_coords
            .iter()
            .filter(|e| e.ability_order == Some(defining_order))
            .map(|e| descriptor_from(e, None, false))
            .collect()
    }

    /// Slots showing abilities already picked by each hero.
    ///
    /// Returns `None` when the shared dimensions for this group are missing.
    pub fn selected_slots(&self) -> Option<Vec<SlotDescriptor>> {
        let dims = self.selected_abilities_params?;
        Some(
            self.selected_abilities_coords
                .iter()
                .map(|e| descriptor_from(e, Some(dims), e.is_ultimate.unwrap_or(false)))
                .collect(),
        )
    }

    /// Checks bounds and counts against a screen of `width` x `height`.
    pub fn validate(&self, width: u32, height: u32) -> LayoutValidation {
        let mut validation = LayoutValidation::default();

        let sized = [
            ("ultimate_slots_coords", &self.ultimate_slots_coords),
            ("standard_slots_coords", &self.standard_slots_coords),
            ("models_coords", &self.models_coords),
        ];
        for (category, entries) in sized {
            for (i, entry) in entries.iter().enumerate() {
                check_entry(
                    &mut validation,
                    category,
                    i,
                    entry,
                    entry.width.unwrap_or(0),
                    entry.height.unwrap_or(0),
                    width,
                    height,
                );
            }
        }

        let shared = [
            ("heroes_coords", &self.heroes_coords, self.heroes_params, "heroes_params"),
            (
                "selected_abilities_coords",
                &self.selected_abilities_coords,
                self.selected_abilities_params,
                "selected_abilities_params",
            ),
        ];
        for (category, entries, dims, params_key) in shared {
            let Some(dims) = dims else {
                if !entries.is_empty() {
                    validation
                        .warnings
                        .push(format!("{}: missing {}, sizes unchecked", category, params_key));
                }
                continue;
            };
            for (i, entry) in entries.iter().enumerate() {
                check_entry(&mut validation, category, i, entry, dims.width, dims.height, width, height);
            }
        }

        for (category, expected) in EXPECTED_COUNTS {
            let actual = self.count_of(category);
            if actual != expected {
                validation
                    .errors
                    .push(format!("{}: Expected {}, got {}", category, expected, actual));
            }
        }

        validation
    }

    fn count_of(&self, category: &str) -> usize {
        match category {
            "ultimate_slots_coords" => self.ultimate_slots_coords.len(),
            "standard_slots_coords" => self.standard_slots_coords.len(),
            "heroes_coords" => self.heroes_coords.len(),
            "selected_abilities_coords" => self.selected_abilities_coords.len(),
            "models_coords" => self.models_coords.len(),
            _ => 0,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn check_entry(
    validation: &mut LayoutValidation,
    category: &str,
    index: usize,
    entry: &CoordEntry,
    entry_width: i32,
    entry_height: i32,
    width: u32,
    height: u32,
) {
    let hero = entry
        .hero_order
        .map(|h| h.to_string())
        .unwrap_or_else(|| "?".to_string());

    if entry.x < 0 || entry.y < 0 {
        validation.errors.push(format!(
            "{}[{}]: Negative coordinates (x={}, y={})",
            category, index, entry.x, entry.y
        ));
    }
    if entry.x as i64 + entry_width as i64 > width as i64 {
        validation
            .errors
            .push(format!("{}[{}] hero_order={}: Extends beyond width", category, index, hero));
    }
    if entry.y as i64 + entry_height as i64 > height as i64 {
        validation
            .errors
            .push(format!("{}[{}] hero_order={}: Extends beyond height", category, index, hero));
    }
}

/// Layouts for every supported resolution.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub resolutions: HashMap<String, ResolutionLayout>,
}

impl LayoutConfig {
    pub fn load(path: &Path) -> AdvisorResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            AdvisorError::Layout(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: LayoutConfig = serde_json::from_str(&contents)?;
        info!(
            "Loaded layout for {} resolution(s) from {}",
            config.resolutions.len(),
            path.display()
        );
        Ok(config)
    }

    /// Layout for an exact screen size.
    pub fn for_dimensions(&self, width: u32, height: u32) -> AdvisorResult<&ResolutionLayout> {
        let key = resolution_key(width, height);
        self.resolutions
            .get(&key)
            .ok_or_else(|| AdvisorError::Layout(format!("no layout for resolution {}", key)))
    }
}

pub fn resolution_key(width: u32, height: u32) -> String {
    format!("{}x{}", width, height)
}
