// THEORY:
// `blob_pilot` is the library half of a camera-guided rover. It follows one
// colored object through a live video feed and turns its position into a
// steering or motor-speed command.
//
// The public surface is the `TrackingPipeline` with its `TrackerConfig` and
// `FrameReport`, the `CommandDispatcher` boundary to the motor controller, and
// the persisted `Settings`. The individual stages (`core_modules`) stay public
// for callers that want to run one of them on its own.
//
// Camera access, windows and the network transport live in the `rover_runner`
// binary, so this crate builds and tests without any of them.

pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod settings;

pub use error::SettingsError;
pub use pipeline::{FrameReport, TrackerConfig, TrackingPipeline};
pub use settings::{Settings, SettingsWatcher};
