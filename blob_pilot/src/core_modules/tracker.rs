// THEORY:
// The `tracker` gives the system a short memory. A single dropped detection (a
// motion-blurred frame, a hand passing in front of the ball) should not make the
// rover slam on the brakes, so the last known position is held for a bounded
// number of misses before loss is declared.
//
// This is coasting, not prediction: the reported position freezes while the
// target is missing. It does not move along an estimated velocity.
//
// The state lives in an explicit `TrackState` owned by the caller and handed in
// by `&mut` every frame, so there is no hidden global and a fresh state always
// reproduces the same output.

use tracing::{debug, info};

use crate::core_modules::blob::{Detection, Point};

/// How many consecutive misses are tolerated before the target is reported lost.
pub const DEFAULT_MAX_FRAMES_LOST: u32 = 10;

/// Cross-frame memory of the single tracked target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackState {
    /// Position from the most recent successful detection. Kept even after loss
    /// is declared.
    pub last_position: Option<Point>,
    /// Consecutive frames without a detection.
    pub frames_lost: u32,
}

impl TrackState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the miss counter has reached `max_frames_lost`.
    pub fn is_lost(&self, max_frames_lost: u32) -> bool {
        self.last_position.is_none() || self.frames_lost >= max_frames_lost
    }
}

pub mod position_tracker {
    use super::*;

    /// Folds this frame's detection into `state` and returns the position the
    /// controller should act on, or `None` once the target is confirmed lost.
    pub fn resolve(detection: Option<&Detection>, state: &mut TrackState, max_frames_lost: u32) -> Option<Point> {
        match detection {
            Some(detection) => {
                if state.frames_lost >= max_frames_lost || state.last_position.is_none() {
                    info!(x = detection.position.x, y = detection.position.y, "target acquired");
                }
                state.last_position = Some(detection.position);
                state.frames_lost = 0;
                Some(detection.position)
            }
            None => {
                state.frames_lost = state.frames_lost.saturating_add(1);
                if state.frames_lost < max_frames_lost {
                    debug!(frames_lost = state.frames_lost, "coasting on last position");
                    state.last_position
                } else {
                    if state.frames_lost == max_frames_lost && state.last_position.is_some() {
                        info!(frames_lost = state.frames_lost, "target lost");
                    }
                    None
                }
            }
        }
    }
}
