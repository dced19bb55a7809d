//! Template extraction: canonical image in, comparable template out.
//!
//! A template summarizes the image as a fixed grid of block descriptors.
//! Each block carries the dominant gradient orientation (structure tensor,
//! double-angle convention), a coherence measure in `[0, 1]` telling how
//! consistent that orientation is, and the block's gradient energy.
//! Extraction is deterministic: the same pixels always produce the same
//! template, and worker budgets elsewhere in the engine never touch it.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::error::BuildError;
use crate::image::CanonicalImage;
use crate::transparency::{
    ARTIFACT_GRAYSCALE, ARTIFACT_ORIENTATION, ARTIFACT_TEMPLATE, TransparencySink,
};

/// Side length of one descriptor block, in pixels.
pub const BLOCK_SIZE: u32 = 16;

/// Bumped whenever the extraction algorithm changes in a way that can affect
/// comparison results. Templates from different versions must not be mixed.
pub const TEMPLATE_VERSION: u16 = 1;

/// Minimum block grid along each axis; below this no usable structure fits.
const MIN_GRID: u32 = 2;

/// Descriptor for one image block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TemplateCell {
    /// Dominant gradient orientation in radians, `[-pi/2, pi/2]`.
    pub theta: f32,
    /// Orientation coherence in `[0, 1]`; 0 means no dominant direction.
    pub coherence: f32,
    /// Mean gradient energy of the block, normalized by block area.
    pub energy: f32,
}

/// Opaque comparable representation of one fingerprint image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    /// Extraction algorithm version, see [`TEMPLATE_VERSION`].
    pub version: u16,
    /// Grid width in blocks.
    pub grid_w: u32,
    /// Grid height in blocks.
    pub grid_h: u32,
    /// Row-major block descriptors, `grid_w * grid_h` long.
    pub cells: Vec<TemplateCell>,
}

impl Template {
    /// Descriptor at grid position `(x, y)`, row-major.
    #[inline]
    pub fn cell(&self, x: u32, y: u32) -> &TemplateCell {
        &self.cells[y as usize * self.grid_w as usize + x as usize]
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Extract a [`Template`] from a canonical image.
///
/// The sink receives three named artifacts when it accepts their keys:
/// the raw grayscale buffer, the orientation field as JSON, and a JSON
/// summary of the finished template. Sink failures are logged and ignored;
/// they cannot affect the returned template.
///
/// Fails with [`BuildError::ImageTooSmall`] when fewer than a 2x2 block grid
/// fits, and with [`BuildError::NoRidgeStructure`] when the image carries no
/// gradient energy at all.
pub fn build_template(
    image: &CanonicalImage,
    sink: &dyn TransparencySink,
) -> Result<Template, BuildError> {
    let grid_w = image.width / BLOCK_SIZE;
    let grid_h = image.height / BLOCK_SIZE;
    if grid_w < MIN_GRID || grid_h < MIN_GRID {
        return Err(BuildError::ImageTooSmall {
            width: image.width,
            height: image.height,
            min: MIN_GRID * BLOCK_SIZE,
        });
    }

    emit(
        sink,
        ARTIFACT_GRAYSCALE,
        "application/octet-stream",
        &image.pixels,
    );

    let mut cells = Vec::with_capacity((grid_w * grid_h) as usize);
    let mut total_energy = 0.0f64;
    for by in 0..grid_h {
        for bx in 0..grid_w {
            let cell = block_descriptor(image, bx, by);
            total_energy += f64::from(cell.energy);
            cells.push(cell);
        }
    }

    if let Ok(bytes) = serde_json::to_vec(&cells) {
        emit(sink, ARTIFACT_ORIENTATION, "application/json", &bytes);
    }

    if total_energy <= f64::EPSILON {
        return Err(BuildError::NoRidgeStructure);
    }

    let template = Template {
        version: TEMPLATE_VERSION,
        grid_w,
        grid_h,
        cells,
    };

    let summary = json!({
        "version": template.version,
        "grid_w": template.grid_w,
        "grid_h": template.grid_h,
        "cells": template.cell_count(),
    });
    if let Ok(bytes) = serde_json::to_vec(&summary) {
        emit(sink, ARTIFACT_TEMPLATE, "application/json", &bytes);
    }

    debug!(
        grid_w,
        grid_h,
        cells = template.cell_count(),
        "template extracted"
    );
    Ok(template)
}

/// Forward one artifact through the sink's accept gate, swallowing record
/// failures.
fn emit(sink: &dyn TransparencySink, key: &str, media_type: &str, data: &[u8]) {
    if !sink.accepts(key) {
        return;
    }
    if let Err(err) = sink.record(key, media_type, data) {
        warn!(key, error = %err, "transparency sink failed to record artifact");
    }
}

/// Summarize one block via the gradient structure tensor.
fn block_descriptor(image: &CanonicalImage, bx: u32, by: u32) -> TemplateCell {
    let x0 = bx * BLOCK_SIZE;
    let y0 = by * BLOCK_SIZE;

    let mut gxx = 0.0f64;
    let mut gyy = 0.0f64;
    let mut gxy = 0.0f64;
    for y in y0..y0 + BLOCK_SIZE {
        for x in x0..x0 + BLOCK_SIZE {
            // Sobel needs a full 3x3 neighborhood; the outermost image ring
            // has none.
            if x == 0 || y == 0 || x + 1 >= image.width || y + 1 >= image.height {
                continue;
            }
            let (gx, gy) = sobel(image, x, y);
            let gx = f64::from(gx);
            let gy = f64::from(gy);
            gxx += gx * gx;
            gyy += gy * gy;
            gxy += gx * gy;
        }
    }

    let energy = gxx + gyy;
    let (theta, coherence) = if energy <= f64::EPSILON {
        (0.0, 0.0)
    } else {
        let theta = 0.5 * (2.0 * gxy).atan2(gxx - gyy);
        let coherence = ((gxx - gyy).powi(2) + 4.0 * gxy * gxy).sqrt() / energy;
        (theta, coherence)
    };

    let area = f64::from(BLOCK_SIZE * BLOCK_SIZE);
    TemplateCell {
        theta: theta as f32,
        coherence: coherence.clamp(0.0, 1.0) as f32,
        energy: (energy / area) as f32,
    }
}

/// 3x3 Sobel gradients at an interior pixel.
#[inline]
fn sobel(image: &CanonicalImage, x: u32, y: u32) -> (i32, i32) {
    let p = |dx: i32, dy: i32| -> i32 {
        let px = (x as i32 + dx) as u32;
        let py = (y as i32 + dy) as u32;
        i32::from(image.get(px, py))
    };

    let gx = (p(1, -1) + 2 * p(1, 0) + p(1, 1)) - (p(-1, -1) + 2 * p(-1, 0) + p(-1, 1));
    let gy = (p(-1, 1) + 2 * p(0, 1) + p(1, 1)) - (p(-1, -1) + 2 * p(0, -1) + p(1, -1));
    (gx, gy)
}
