// Inference boundary: detection and extraction+translation are opaque
// collaborator functions. Any error they raise is a page-level failure,
// never a process crash.

pub mod remote;

use anyhow::Result;
use async_trait::async_trait;
use image::DynamicImage;

use crate::core::types::{NormalizedBox, PixelBox};

pub use remote::RemoteTransformer;

/// The detection/extraction/translation collaborator.
#[async_trait]
pub trait RegionTransformer: Send + Sync {
    /// Detect text regions on a page image, in normalized box form.
    async fn detect_regions(&self, image: &DynamicImage) -> Result<Vec<NormalizedBox>>;

    /// Extract and translate the text of the given regions.
    ///
    /// Returns one (pixel box, translated text) pair per surviving region;
    /// the text is empty when extraction found nothing to translate. The
    /// region is still returned so it gets blanked during rendering.
    async fn extract_and_translate(
        &self,
        image: &DynamicImage,
        boxes: &[NormalizedBox],
    ) -> Result<Vec<(PixelBox, String)>>;
}

/// Map a normalized (center, size) box to absolute pixel bounds.
///
/// Scales by the image dimensions, centers, and clamps to the image.
/// A box that collapses to zero or negative area after clamping is
/// discarded (returns None) rather than treated as an error; malformed
/// or edge-touching boxes must never crash the pipeline.
pub fn to_pixel_box(b: &NormalizedBox, img_width: u32, img_height: u32) -> Option<PixelBox> {
    let cx = b.cx * img_width as f32;
    let cy = b.cy * img_height as f32;
    let w = b.w * img_width as f32;
    let h = b.h * img_height as f32;

    let left = ((cx - w / 2.0) as i64).max(0) as u32;
    let top = ((cy - h / 2.0) as i64).max(0) as u32;
    let right = ((cx + w / 2.0) as i64).clamp(0, img_width as i64) as u32;
    let bottom = ((cy + h / 2.0) as i64).clamp(0, img_height as i64) as u32;

    if right <= left || bottom <= top {
        return None;
    }

    Some(PixelBox {
        left,
        top,
        right,
        bottom,
    })
}

/// Validate a pixel box received from a collaborator against the image
/// bounds.
///
/// Clamps right/bottom to the image and discards anything inverted or
/// collapsed to zero area, same rule as `to_pixel_box`. Wire data gets
/// no more trust than detector output.
pub fn clamp_region(region: &PixelBox, img_width: u32, img_height: u32) -> Option<PixelBox> {
    let right = region.right.min(img_width);
    let bottom = region.bottom.min(img_height);

    if right <= region.left || bottom <= region.top {
        return None;
    }

    Some(PixelBox {
        left: region.left,
        top: region.top,
        right,
        bottom,
    })
}

/// Map a whole detection result, dropping degenerate boxes.
pub fn map_boxes(boxes: &[NormalizedBox], img_width: u32, img_height: u32) -> Vec<PixelBox> {
    boxes
        .iter()
        .filter_map(|b| to_pixel_box(b, img_width, img_height))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nbox(cx: f32, cy: f32, w: f32, h: f32) -> NormalizedBox {
        NormalizedBox { cx, cy, w, h }
    }

    #[test]
    fn centered_box_maps_to_pixel_bounds() {
        let b = to_pixel_box(&nbox(0.5, 0.5, 0.5, 0.5), 200, 100).unwrap();
        assert_eq!(
            b,
            PixelBox {
                left: 50,
                top: 25,
                right: 150,
                bottom: 75
            }
        );
        assert_eq!(b.width(), 100);
        assert_eq!(b.height(), 50);
    }

    #[test]
    fn edge_touching_box_is_clamped_not_dropped() {
        // Center near the left edge; half the box hangs outside
        let b = to_pixel_box(&nbox(0.0, 0.5, 0.2, 0.2), 100, 100).unwrap();
        assert_eq!(b.left, 0);
        assert_eq!(b.right, 10);
    }

    #[test]
    fn zero_width_box_is_discarded() {
        assert!(to_pixel_box(&nbox(0.5, 0.5, 0.0, 0.5), 100, 100).is_none());
    }

    #[test]
    fn box_entirely_outside_image_is_discarded() {
        // Clamping collapses it to zero area at the boundary
        assert!(to_pixel_box(&nbox(1.5, 0.5, 0.2, 0.2), 100, 100).is_none());
        assert!(to_pixel_box(&nbox(-0.5, 0.5, 0.2, 0.2), 100, 100).is_none());
    }

    #[test]
    fn all_degenerate_input_yields_zero_regions() {
        let boxes = [
            nbox(0.5, 0.5, 0.0, 0.0),
            nbox(2.0, 2.0, 0.1, 0.1),
            nbox(0.5, -1.0, 0.3, 0.1),
        ];
        assert!(map_boxes(&boxes, 640, 480).is_empty());
    }

    #[test]
    fn mixed_input_keeps_only_valid_regions() {
        let boxes = [nbox(0.5, 0.5, 0.0, 0.0), nbox(0.5, 0.5, 0.4, 0.4)];
        assert_eq!(map_boxes(&boxes, 100, 100).len(), 1);
    }

    #[test]
    fn inverted_wire_region_is_discarded() {
        let inverted = PixelBox {
            left: 15,
            top: 15,
            right: 5,
            bottom: 5,
        };
        assert!(clamp_region(&inverted, 20, 20).is_none());
    }

    #[test]
    fn oversized_wire_region_is_clamped_to_the_image() {
        let oversized = PixelBox {
            left: 10,
            top: 10,
            right: 500,
            bottom: 500,
        };
        let clamped = clamp_region(&oversized, 100, 50).unwrap();
        assert_eq!(clamped.right, 100);
        assert_eq!(clamped.bottom, 50);

        // Entirely outside the image: clamping collapses it
        let outside = PixelBox {
            left: 200,
            top: 10,
            right: 300,
            bottom: 40,
        };
        assert!(clamp_region(&outside, 100, 50).is_none());
    }

    #[test]
    fn valid_wire_region_passes_through() {
        let valid = PixelBox {
            left: 5,
            top: 5,
            right: 50,
            bottom: 40,
        };
        assert_eq!(clamp_region(&valid, 100, 100), Some(valid));
    }
}
