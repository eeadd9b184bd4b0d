// THEORY:
// The `ColorSegmenter` is the first stage of every frame. It answers one question
// per pixel ("is this the target's color?") and then cleans the answer up so the
// stages downstream see solid shapes instead of sensor noise.
//
// Algorithm:
// 1.  **Color space**: every RGB pixel is converted to 8-bit HSV (see `pixel`).
// 2.  **Threshold**: a pixel is "on" iff all three of its HSV channels lie inside
//     the inclusive `[lower, upper]` bounds of the `ColorRange`. Bounds that are
//     out of order simply match nothing.
// 3.  **Opening** (erode, then dilate) removes isolated speckle smaller than the
//     structuring element.
// 4.  **Closing** (dilate, then erode) fills pinholes and hairline gaps inside
//     the surviving shapes.
//
// The order of 3 and 4 matters: closing first would grow speckle into blobs
// large enough to survive the opening.
//
// Both steps are binary morphology with the square as an L-infinity ball of
// radius k / 2 (`imageproc::morphology`).
//
// Border policy: pixels outside the frame do not take part in either erosion or
// dilation. A blob touching the frame edge is not eaten from the outside and
// nothing grows in from beyond the edge.

use serde::{Deserialize, Serialize};

use crate::core_modules::mask::Mask;
use crate::core_modules::pixel::pixel::HsvPixel;

/// Side length of the square structuring element used for noise cleanup.
pub const DEFAULT_KERNEL_SIZE: u32 = 5;

/// Inclusive per-channel HSV bounds, `[hue, saturation, value]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ColorRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, pixel: HsvPixel) -> bool {
        pixel
            .channels()
            .iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .all(|(value, (low, high))| low <= value && value <= high)
    }
}

pub mod color_segmenter {
    use super::*;
    use image::{GrayImage, RgbImage};
    use imageproc::distance_transform::Norm;
    use imageproc::morphology;

    /// Thresholds `frame` against `color_range` and cleans the result with the
    /// reference 5x5 kernel.
    pub fn segment(frame: &RgbImage, color_range: &ColorRange) -> Mask {
        segment_with_kernel(frame, color_range, DEFAULT_KERNEL_SIZE)
    }

    /// Same as [`segment`] with a custom structuring element size. A size of 0 or
    /// 1 skips the cleanup entirely.
    pub fn segment_with_kernel(frame: &RgbImage, color_range: &ColorRange, kernel_size: u32) -> Mask {
        let raw = threshold(frame, color_range);
        let opened = open(&raw, kernel_size);
        close(&opened, kernel_size)
    }

    /// Per-pixel HSV in-range test with no cleanup.
    pub fn threshold(frame: &RgbImage, color_range: &ColorRange) -> Mask {
        Mask::from_fn(frame.width(), frame.height(), |x, y| {
            color_range.contains(HsvPixel::from(*frame.get_pixel(x, y)))
        })
    }

    pub fn open(mask: &Mask, kernel_size: u32) -> Mask {
        apply(mask, kernel_size, morphology::open)
    }

    pub fn close(mask: &Mask, kernel_size: u32) -> Mask {
        apply(mask, kernel_size, morphology::close)
    }

    /// A pixel stays on only if every in-frame pixel under the kernel is on.
    pub fn erode(mask: &Mask, kernel_size: u32) -> Mask {
        apply(mask, kernel_size, morphology::erode)
    }

    /// A pixel turns on if any in-frame pixel under the kernel is on.
    pub fn dilate(mask: &Mask, kernel_size: u32) -> Mask {
        apply(mask, kernel_size, morphology::dilate)
    }

    // A k x k square is the L-infinity ball of radius k / 2, so even sizes
    // grow to the next odd square.
    fn apply(mask: &Mask, kernel_size: u32, op: fn(&GrayImage, Norm, u8) -> GrayImage) -> Mask {
        if kernel_size <= 1 {
            return mask.clone();
        }
        let radius = (kernel_size / 2).min(254) as u8;
        Mask::from(op(mask.as_image(), Norm::LInf, radius))
    }
}

#[cfg(test)]
mod tests {
    use super::color_segmenter::*;
    use super::*;
    use image::{Rgb, RgbImage};

    const ORANGE: ColorRange = ColorRange::new([5, 100, 100], [15, 255, 255]);

    fn frame_with_square(size: u32, x0: u32, y0: u32, side: u32, color: Rgb<u8>) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            if x >= x0 && x < x0 + side && y >= y0 && y < y0 + side {
                color
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = ColorRange::new([10, 20, 30], [10, 20, 30]);
        assert!(range.contains(HsvPixel::new(10, 20, 30)));
        assert!(!range.contains(HsvPixel::new(11, 20, 30)));
    }

    #[test]
    fn inverted_range_matches_nothing() {
        let frame = frame_with_square(20, 5, 5, 10, Rgb([255, 128, 0]));
        let inverted = ColorRange::new([15, 255, 255], [5, 100, 100]);
        assert!(segment(&frame, &inverted).is_empty());
    }

    #[test]
    fn solid_square_survives_cleanup_unchanged() {
        let frame = frame_with_square(40, 10, 12, 15, Rgb([255, 128, 0]));
        let mask = segment(&frame, &ORANGE);
        assert_eq!(mask.count(), 15 * 15);
        assert!(mask.is_on(10, 12));
        assert!(mask.is_on(24, 26));
        assert!(!mask.is_on(25, 26));
    }

    #[test]
    fn isolated_speckle_is_removed() {
        let mut frame = frame_with_square(40, 10, 10, 15, Rgb([255, 128, 0]));
        frame.put_pixel(35, 35, Rgb([255, 128, 0]));
        frame.put_pixel(2, 30, Rgb([255, 128, 0]));
        frame.put_pixel(3, 30, Rgb([255, 128, 0]));
        let mask = segment(&frame, &ORANGE);
        assert_eq!(mask.count(), 15 * 15);
        assert!(!mask.is_on(35, 35));
    }

    #[test]
    fn pinhole_is_filled() {
        let mut frame = frame_with_square(40, 10, 10, 15, Rgb([255, 128, 0]));
        frame.put_pixel(17, 17, Rgb([0, 0, 0]));
        assert!(!threshold(&frame, &ORANGE).is_on(17, 17));
        let mask = segment(&frame, &ORANGE);
        assert!(mask.is_on(17, 17));
        assert_eq!(mask.count(), 15 * 15);
    }

    #[test]
    fn blob_on_the_frame_edge_is_not_eroded_from_outside() {
        let frame = frame_with_square(30, 0, 0, 10, Rgb([255, 128, 0]));
        let mask = segment(&frame, &ORANGE);
        assert_eq!(mask.count(), 100);
        assert!(mask.is_on(0, 0));
    }

    #[test]
    fn erode_and_dilate_with_unit_kernel_are_identity() {
        let mask = Mask::from_fn(8, 8, |x, y| (x + y) % 3 == 0);
        assert_eq!(erode(&mask, 1), mask);
        assert_eq!(dilate(&mask, 1), mask);
    }

    #[test]
    fn dilate_grows_a_point_into_a_square() {
        let mut mask = Mask::new(11, 11);
        mask.set(5, 5, true);
        let grown = dilate(&mask, 5);
        assert_eq!(grown.count(), 25);
        assert!(grown.is_on(3, 3) && grown.is_on(7, 7));
        assert!(!grown.is_on(2, 5));
    }

    #[test]
    fn even_kernel_grows_to_the_next_odd_square() {
        let mut mask = Mask::new(11, 11);
        mask.set(5, 5, true);
        assert_eq!(dilate(&mask, 4), dilate(&mask, 5));
        assert_eq!(dilate(&mask, 2).count(), 9);
    }

    #[test]
    fn erosion_keeps_a_full_frame_on() {
        let full = Mask::from_fn(6, 6, |_, _| true);
        assert_eq!(erode(&full, 5), full);
        assert_eq!(open(&full, 5).count(), 36);
    }
}
