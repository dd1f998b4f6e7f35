use image::imageops::{self, FilterType};
use image::RgbaImage;
use tracing::debug;

use crate::error::{AdvisorError, AdvisorResult};
use crate::layout::{SlotDescriptor, SlotRect};

/// Model-ready tensor for the slots that could be extracted.
#[derive(Clone, Debug, Default)]
pub struct PreparedBatch {
    /// Indices into the descriptor list, in original order
    pub valid_indices: Vec<usize>,
    /// Descriptors that were rejected before inference
    pub failed_indices: Vec<usize>,
    /// `valid_indices.len()` items of `input_size * input_size * 3` values, HWC RGB in 0.0-1.0
    pub tensor: Vec<f32>,
    pub input_size: u32,
}

impl PreparedBatch {
    pub fn len(&self) -> usize {
        self.valid_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valid_indices.is_empty()
    }

    pub fn item_len(&self) -> usize {
        (self.input_size * self.input_size * 3) as usize
    }

    /// Tensor slice for the n-th valid item.
    pub fn item(&self, n: usize) -> &[f32] {
        let len = self.item_len();
        &self.tensor[n * len..(n + 1) * len]
    }
}

/// Crops one rectangle and resizes it to `size` x `size`.
///
/// Fails when the rectangle is empty or not fully inside the image. The
/// returned values are RGB in HWC order scaled to 0.0-1.0; alpha is dropped.
pub fn crop_and_resize(img: &RgbaImage, rect: &SlotRect, size: u32) -> AdvisorResult<Vec<f32>> {
    let (w, h) = img.dimensions();
    if !rect.fits_within(w, h) {
        return Err(AdvisorError::Layout(format!(
            "slot rect {:?} is empty or outside {}x{} image",
            rect, w, h
        )));
    }

    let cropped = imageops::crop_imm(
        img,
        rect.x as u32,
        rect.y as u32,
        rect.width as u32,
        rect.height as u32,
    )
    .to_image();
    let resized = imageops::resize(&cropped, size, size, FilterType::Triangle);

    let mut out = Vec::with_capacity((size * size * 3) as usize);
    for pixel in resized.pixels() {
        out.push(pixel[0] as f32 / 255.0);
        out.push(pixel[1] as f32 / 255.0);
        out.push(pixel[2] as f32 / 255.0);
    }
    Ok(out)
}

/// Extracts every slot into one batch. A bad slot is recorded in
/// `failed_indices` and skipped; it never aborts the rest of the batch.
pub fn preprocess_slots(img: &RgbaImage, slots: &[SlotDescriptor], size: u32) -> PreparedBatch {
    let mut batch = PreparedBatch {
        input_size: size,
        ..Default::default()
    };

    for (idx, slot) in slots.iter().enumerate() {
        match crop_and_resize(img, &slot.rect, size) {
            Ok(values) => {
                batch.tensor.extend_from_slice(&values);
                batch.valid_indices.push(idx);
            }
            Err(e) => {
                debug!("Slot {} skipped: {}", idx, e);
                batch.failed_indices.push(idx);
            }
        }
    }

    batch
}
