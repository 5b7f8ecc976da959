// SPDX-License-Identifier: MPL-2.0
//! Mask compositing: merge a color frame and a grayscale mask frame into
//! one RGBA frame with per-pixel transparency.
//!
//! The blend is a pure, stateless transform reusable across frames. The
//! output's RGB channels equal the color input's; its alpha channel is the
//! Rec.709 luminance of the mask sampled at matching coordinates.

use crate::error::BlendError;
use crate::frame::{CompositedFrame, PixelBuffer, WorkingImage};

// Rec.709 luma weights scaled so they sum to 256, for an integer blend
// with +128 rounding.
const LUMA_R: u32 = 54;
const LUMA_G: u32 = 183;
const LUMA_B: u32 = 19;

/// Blends a color image with a mask image.
///
/// Both inputs are BGRA working images of the same extent. The result is
/// RGBA with straight alpha: RGB taken from `color`, alpha from the
/// luminance of `mask`. A pure white mask yields a fully opaque frame, a
/// pure black mask a fully transparent one.
///
/// # Errors
///
/// Returns [`BlendError::ExtentMismatch`] when the inputs differ in size.
pub fn blend(color: &WorkingImage, mask: &WorkingImage) -> Result<CompositedFrame, BlendError> {
    if color.extent() != mask.extent() {
        return Err(BlendError::ExtentMismatch {
            color: color.extent(),
            mask: mask.extent(),
        });
    }

    let mut rgba = Vec::with_capacity(color.bgra_bytes().len());
    for (c, m) in color
        .bgra_bytes()
        .chunks_exact(4)
        .zip(mask.bgra_bytes().chunks_exact(4))
    {
        let luma = mask_luminance(m);
        // BGRA in, RGBA out.
        rgba.extend_from_slice(&[c[2], c[1], c[0], luma]);
    }

    Ok(CompositedFrame::new(PixelBuffer::from_vec(
        color.width(),
        color.height(),
        rgba,
    )))
}

/// Rec.709 luminance of one BGRA pixel.
#[allow(clippy::cast_possible_truncation)] // weighted sum of u8 channels stays within u8 after >> 8
fn mask_luminance(bgra: &[u8]) -> u8 {
    let b = u32::from(bgra[0]);
    let g = u32::from(bgra[1]);
    let r = u32::from(bgra[2]);
    ((LUMA_R * r + LUMA_G * g + LUMA_B * b + 128) >> 8) as u8
}
