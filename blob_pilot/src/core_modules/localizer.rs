// THEORY:
// The `localizer` reduces a whole mask to one answer: where is the target and how
// big is it. There are two ways of doing that and both have shipped on real
// rovers, so they live behind one trait and the pipeline picks one from config.
//
// - `LargestContour` only trusts connected shapes. It drops every region whose
//   area is not strictly inside the size band and keeps the biggest survivor.
//   Far-away noise forms its own small regions and is ignored.
// - `MeanPixel` treats every "on" pixel as a vote and averages them. A target
//   broken into pieces by an occluder still lands in the right place, but two
//   unrelated patches of the same color pull the estimate to the midpoint
//   between them.
//
// Both accept an area only strictly between the band's edges, and both are
// deterministic for a given mask.

use serde::{Deserialize, Serialize};

use crate::core_modules::blob::{Detection, Point, Region, SizeBounds};
use crate::core_modules::blob_detector::blob_detector;
use crate::core_modules::mask::Mask;

/// Reduces a mask to at most one target position.
pub trait BlobLocalizer {
    fn locate(&self, mask: &Mask, bounds: &SizeBounds) -> Option<Detection>;
}

/// Centroid of the largest external contour whose area is strictly inside the
/// size band.
#[derive(Debug, Clone, Copy, Default)]
pub struct LargestContour;

impl BlobLocalizer for LargestContour {
    fn locate(&self, mask: &Mask, bounds: &SizeBounds) -> Option<Detection> {
        let regions = blob_detector::find_regions(mask);

        // `max_by_key` keeps the last maximum, so fold to keep the first one.
        let largest = regions
            .iter()
            .filter(|region| bounds.contains(region.area()))
            .fold(None, |best: Option<&Region>, region| match best {
                Some(current) if current.area() >= region.area() => Some(current),
                _ => Some(region),
            })?;

        let position = largest.centroid()?;
        Some(Detection {
            position,
            size: largest.area(),
        })
    }
}

/// Mean of every "on" pixel, if their count is strictly inside the size band.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanPixel;

impl BlobLocalizer for MeanPixel {
    fn locate(&self, mask: &Mask, bounds: &SizeBounds) -> Option<Detection> {
        let (count, sum_x, sum_y) = mask
            .on_pixels()
            .fold((0u64, 0u64, 0u64), |(n, sx, sy), (x, y)| {
                (n + 1, sx + x as u64, sy + y as u64)
            });

        if count == 0 || !bounds.contains(count) {
            return None;
        }

        Some(Detection {
            position: Point::new((sum_x / count) as u32, (sum_y / count) as u32),
            size: count,
        })
    }
}

/// Config-level choice of localizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalizerStrategy {
    #[default]
    LargestContour,
    MeanPixel,
}

impl LocalizerStrategy {
    pub fn localizer(self) -> &'static dyn BlobLocalizer {
        match self {
            LocalizerStrategy::LargestContour => &LargestContour,
            LocalizerStrategy::MeanPixel => &MeanPixel,
        }
    }
}

impl BlobLocalizer for LocalizerStrategy {
    fn locate(&self, mask: &Mask, bounds: &SizeBounds) -> Option<Detection> {
        self.localizer().locate(mask, bounds)
    }
}
