// THEORY:
// The `BlobDetector` is the spatial grouping step behind the largest-contour
// localizer. It turns a binary mask into a list of `Region`s, one per external
// contour, each carrying the moment sums needed to place it.
//
// "External contour" is the important word. A ring-shaped blob is one region
// whose area includes the hole, and a speck sitting inside that hole is not a
// region of its own. To get that behaviour without tracing boundaries:
//
// 1.  **Outside flood**: every "off" pixel on the frame border seeds a
//     4-connected flood through "off" pixels. Everything reached is outside every
//     contour.
// 2.  **Region growing**: every pixel NOT reached by that flood is enclosed by
//     some external contour (it is either foreground, a hole, or something nested
//     in a hole). Those pixels are grouped 8-connected, in raster order of their
//     first pixel, which fixes the enumeration order deterministically.
// 3.  **Data aggregation**: each group accumulates its pixel count (M00), the sums
//     of x (M10) and y (M01), and its bounding box.
//
// 8-connectivity for the foreground and 4-connectivity for the background are
// the dual pair: a diagonal gap in a ring does not let the outside leak in.
//
// The detector is a stateless utility with no memory of previous frames.

use crate::core_modules::blob::{Point, Region};
use crate::core_modules::mask::Mask;

pub mod blob_detector {
    use super::*;

    const FOUR_NEIGHBORS: [(i64, i64); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
    const EIGHT_NEIGHBORS: [(i64, i64); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];

    /// Finds every external-contour region in `mask`, in raster order of each
    /// region's first pixel.
    pub fn find_regions(mask: &Mask) -> Vec<Region> {
        let width = mask.width() as usize;
        let height = mask.height() as usize;
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let outside = flood_outside(mask, width, height);

        let mut visited = vec![false; width * height];
        let mut regions = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let index = y * width + x;
                if outside[index] || visited[index] {
                    continue;
                }
                let region = grow_region(
                    Point::new(x as u32, y as u32),
                    &outside,
                    &mut visited,
                    width,
                    height,
                    regions.len(),
                );
                regions.push(region);
            }
        }
        regions
    }

    /// Marks every background pixel 4-connected to the frame border.
    fn flood_outside(mask: &Mask, width: usize, height: usize) -> Vec<bool> {
        let mut outside = vec![false; width * height];
        let mut queue: Vec<(usize, usize)> = Vec::new();

        let seed = |x: usize, y: usize, outside: &mut Vec<bool>, queue: &mut Vec<(usize, usize)>| {
            let index = y * width + x;
            if !outside[index] && !mask.is_on(x as u32, y as u32) {
                outside[index] = true;
                queue.push((x, y));
            }
        };
        for x in 0..width {
            seed(x, 0, &mut outside, &mut queue);
            seed(x, height - 1, &mut outside, &mut queue);
        }
        for y in 0..height {
            seed(0, y, &mut outside, &mut queue);
            seed(width - 1, y, &mut outside, &mut queue);
        }

        while let Some((x, y)) = queue.pop() {
            for (dx, dy) in &FOUR_NEIGHBORS {
                let Some((nx, ny)) = offset(x, y, *dx, *dy, width, height) else {
                    continue;
                };
                let index = ny * width + nx;
                if !outside[index] && !mask.is_on(nx as u32, ny as u32) {
                    outside[index] = true;
                    queue.push((nx, ny));
                }
            }
        }
        outside
    }

    /// Depth-first grouping of enclosed pixels starting at `start`.
    fn grow_region(
        start: Point,
        outside: &[bool],
        visited: &mut [bool],
        width: usize,
        height: usize,
        index: usize,
    ) -> Region {
        let mut queue: Vec<(usize, usize)> = vec![(start.x as usize, start.y as usize)];
        visited[start.y as usize * width + start.x as usize] = true;

        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        let mut m00 = 0u64;
        let mut m10 = 0u64;
        let mut m01 = 0u64;

        while let Some((x, y)) = queue.pop() {
            m00 += 1;
            m10 += x as u64;
            m01 += y as u64;
            min_x = min_x.min(x as u32);
            min_y = min_y.min(y as u32);
            max_x = max_x.max(x as u32);
            max_y = max_y.max(y as u32);

            for (dx, dy) in &EIGHT_NEIGHBORS {
                let Some((nx, ny)) = offset(x, y, *dx, *dy, width, height) else {
                    continue;
                };
                let neighbor = ny * width + nx;
                if !outside[neighbor] && !visited[neighbor] {
                    visited[neighbor] = true;
                    queue.push((nx, ny));
                }
            }
        }

        Region {
            index,
            bounding_box: (Point::new(min_x, min_y), Point::new(max_x, max_y)),
            m00,
            m10,
            m01,
        }
    }

    fn offset(x: usize, y: usize, dx: i64, dy: i64, width: usize, height: usize) -> Option<(usize, usize)> {
        let nx = x as i64 + dx;
        let ny = y as i64 + dy;
        if nx >= 0 && nx < width as i64 && ny >= 0 && ny < height as i64 {
            Some((nx as usize, ny as usize))
        } else {
            None
        }
    }
}
