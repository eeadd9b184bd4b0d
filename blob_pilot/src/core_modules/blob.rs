// THEORY:
// Plain data containers shared by the spatial stages. A `Region` is one
// connected shape found in a mask, with the moment sums needed to place it. A
// `Detection` is the single answer the localizer gives for a frame: where the
// target is and how big it looked. Neither remembers anything about previous
// frames.

use serde::{Deserialize, Serialize};

/// A pixel coordinate in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl From<(u32, u32)> for Point {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

/// The accepted band of blob areas, exclusive on both edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SizeBounds {
    pub min_area: u32,
    pub max_area: u32,
}

impl SizeBounds {
    pub const fn new(min_area: u32, max_area: u32) -> Self {
        Self { min_area, max_area }
    }

    /// `min < area < max`
    pub fn contains(&self, area: u64) -> bool {
        (self.min_area as u64) < area && area < self.max_area as u64
    }
}

/// The localized target for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Detection {
    pub position: Point,
    /// Area in pixels.
    pub size: u64,
}

/// One external-contour region of a mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Position of this region in the enumeration order of the detector.
    pub index: usize,
    /// Top-left and bottom-right corners, inclusive.
    pub bounding_box: (Point, Point),
    /// Zeroth moment: the number of pixels enclosed by the external boundary,
    /// holes included.
    pub m00: u64,
    /// First moment along x: the sum of x over every enclosed pixel.
    pub m10: u64,
    /// First moment along y: the sum of y over every enclosed pixel.
    pub m01: u64,
}

impl Region {
    pub fn area(&self) -> u64 {
        self.m00
    }

    /// Area-weighted center, truncated toward zero. `None` for a degenerate
    /// region.
    pub fn centroid(&self) -> Option<Point> {
        if self.m00 == 0 {
            return None;
        }
        Some(Point {
            x: (self.m10 / self.m00) as u32,
            y: (self.m01 / self.m00) as u32,
        })
    }
}
