// THEORY:
// The `pipeline` module is the top-level API of the tracker. It strings the core
// stages together for one frame:
//
//     frame -> segment -> mask -> locate -> detection -> resolve -> position
//           -> compute_signal -> control signal
//
// and hands back a `FrameReport` with every intermediate result, so the caller
// can draw an overlay, log, or dispatch without recomputing anything.
//
// The configuration is passed in on every call instead of being captured at
// construction. Whoever owns the loop can swap thresholds, dead zones or the
// localizer between two frames and the very next frame uses them. The only
// state kept between frames is the `TrackState`.

use std::time::Duration;

use image::RgbImage;
use tracing::debug;

use crate::core_modules::blob::{Detection, Point, SizeBounds};
use crate::core_modules::color_segmenter::{color_segmenter, ColorRange, DEFAULT_KERNEL_SIZE};
use crate::core_modules::controller::{error_controller, ControlAxis, ControlConfig, ControlSignal};
use crate::core_modules::dispatcher::DEFAULT_COMMAND_INTERVAL;
use crate::core_modules::localizer::{BlobLocalizer, LocalizerStrategy};
use crate::core_modules::mask::Mask;
use crate::core_modules::presets;
use crate::core_modules::tracker::{position_tracker, TrackState, DEFAULT_MAX_FRAMES_LOST};

// Re-export key data structures for the public API.
pub use crate::core_modules::controller::Command;
pub use crate::core_modules::dispatcher::{CommandDispatcher, CommandSink, DispatchOutcome, MotorCommand};

/// Every tunable of the tracking loop. Re-read once per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub color_range: ColorRange,
    pub size_bounds: SizeBounds,
    pub strategy: LocalizerStrategy,
    /// Side of the square structuring element for noise cleanup.
    pub kernel_size: u32,
    pub max_frames_lost: u32,
    pub control: ControlConfig,
    pub command_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::steering()
    }
}

impl TrackerConfig {
    /// The steering rover: blue target, largest contour, discrete turns.
    pub fn steering() -> Self {
        Self {
            color_range: presets::PRESETS[2].range,
            size_bounds: SizeBounds::new(500, 50_000),
            strategy: LocalizerStrategy::LargestContour,
            kernel_size: DEFAULT_KERNEL_SIZE,
            max_frames_lost: DEFAULT_MAX_FRAMES_LOST,
            control: ControlConfig {
                axis: ControlAxis::Horizontal,
                ..ControlConfig::default()
            },
            command_interval: DEFAULT_COMMAND_INTERVAL,
        }
    }

    /// The motorised rover: pale green target, mean of all pixels, signed speed
    /// on the vertical axis.
    pub fn drive() -> Self {
        Self {
            color_range: ColorRange::new([34, 30, 94], [68, 116, 229]),
            size_bounds: SizeBounds::new(500, 50_000),
            strategy: LocalizerStrategy::MeanPixel,
            kernel_size: DEFAULT_KERNEL_SIZE,
            max_frames_lost: DEFAULT_MAX_FRAMES_LOST,
            control: ControlConfig {
                axis: ControlAxis::Vertical,
                ..ControlConfig::default()
            },
            command_interval: DEFAULT_COMMAND_INTERVAL,
        }
    }
}

/// Everything the pipeline produced for one frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// 1-based index of this frame since the pipeline was created or reset.
    pub frame_index: u64,
    pub frame_width: u32,
    pub frame_height: u32,
    /// The cleaned mask this frame was localized on.
    pub mask: Mask,
    /// What the localizer found in this frame alone.
    pub detection: Option<Detection>,
    /// Position after coasting; `None` once the target is confirmed lost.
    pub position: Option<Point>,
    pub signal: ControlSignal,
}

impl FrameReport {
    /// True when the position was carried over from an earlier frame.
    pub fn is_coasting(&self) -> bool {
        self.detection.is_none() && self.position.is_some()
    }

    /// Target area in pixels, 0 when nothing was detected this frame.
    pub fn area(&self) -> u64 {
        self.detection.map_or(0, |d| d.size)
    }

    pub fn motor_command(&self) -> MotorCommand {
        MotorCommand::from(&self.signal)
    }
}

/// The frame-at-a-time tracking loop body.
#[derive(Debug, Default)]
pub struct TrackingPipeline {
    track_state: TrackState,
    frame_count: u64,
}

impl TrackingPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one full segment/locate/resolve/control cycle on `frame`.
    pub fn process_frame(&mut self, frame: &RgbImage, config: &TrackerConfig) -> FrameReport {
        self.frame_count += 1;

        let mask = color_segmenter::segment_with_kernel(frame, &config.color_range, config.kernel_size);
        let detection = config.strategy.locate(&mask, &config.size_bounds);
        let position = position_tracker::resolve(detection.as_ref(), &mut self.track_state, config.max_frames_lost);
        let signal = error_controller::compute_signal(position, frame.width(), frame.height(), &config.control);

        debug!(
            frame = self.frame_count,
            mask_pixels = mask.count(),
            detected = detection.is_some(),
            ?position,
            %signal,
            "frame processed"
        );

        FrameReport {
            frame_index: self.frame_count,
            frame_width: frame.width(),
            frame_height: frame.height(),
            mask,
            detection,
            position,
            signal,
        }
    }

    pub fn track_state(&self) -> &TrackState {
        &self.track_state
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Forgets the tracked target and the frame counter.
    pub fn reset(&mut self) {
        self.track_state = TrackState::default();
        self.frame_count = 0;
    }
}
