// THEORY:
// A `Mask` is the binary answer to "does this pixel look like the target?" for
// every pixel of one frame. It is a thin wrapper over an 8-bit grayscale image
// where 255 means "on" and 0 means "off", so it can be handed to anything in the
// `image` ecosystem for saving or display without conversion.
//
// Masks are produced fresh every frame and are never carried across frames.

use image::{GrayImage, Luma};

pub const ON: u8 = 255;
pub const OFF: u8 = 0;

/// A binary image, same dimensions as the frame it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    /// An all-off mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    /// Builds a mask by evaluating `predicate` at every coordinate.
    pub fn from_fn<F>(width: u32, height: u32, mut predicate: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let image = GrayImage::from_fn(width, height, |x, y| {
            Luma([if predicate(x, y) { ON } else { OFF }])
        });
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Panics if `(x, y)` is out of bounds, like `ImageBuffer::get_pixel`.
    pub fn is_on(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y).0[0] != OFF
    }

    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        self.image.put_pixel(x, y, Luma([if on { ON } else { OFF }]));
    }

    /// Number of "on" pixels.
    pub fn count(&self) -> usize {
        self.image.as_raw().iter().filter(|&&v| v != OFF).count()
    }

    pub fn is_empty(&self) -> bool {
        self.image.as_raw().iter().all(|&v| v == OFF)
    }

    /// Iterates the coordinates of every "on" pixel in raster order.
    pub fn on_pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.image
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] != OFF)
            .map(|(x, y, _)| (x, y))
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }
}

impl From<GrayImage> for Mask {
    /// Any non-zero luma counts as "on".
    fn from(image: GrayImage) -> Self {
        let mut image = image;
        for pixel in image.pixels_mut() {
            if pixel.0[0] != OFF {
                pixel.0[0] = ON;
            }
        }
        Self { image }
    }
}
