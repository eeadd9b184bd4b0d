pub mod blob;
pub mod blob_detector;
pub mod color_segmenter;
pub mod controller;
pub mod dispatcher;
pub mod localizer;
pub mod mask;
pub mod pixel;
pub mod presets;
pub mod tracker;
