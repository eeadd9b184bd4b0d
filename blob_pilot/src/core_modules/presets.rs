// Named HSV ranges for the colors the rover is usually asked to chase.

use crate::core_modules::color_segmenter::ColorRange;
use crate::error::SettingsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPreset {
    pub name: &'static str,
    pub range: ColorRange,
    pub description: &'static str,
}

pub const PRESETS: [ColorPreset; 5] = [
    ColorPreset {
        name: "orange",
        range: ColorRange::new([5, 100, 100], [15, 255, 255]),
        description: "Default orange blob",
    },
    ColorPreset {
        name: "red",
        range: ColorRange::new([0, 100, 100], [10, 255, 255]),
        description: "Red blob",
    },
    ColorPreset {
        name: "blue",
        range: ColorRange::new([100, 100, 100], [130, 255, 255]),
        description: "Blue blob",
    },
    ColorPreset {
        name: "green",
        range: ColorRange::new([40, 50, 50], [90, 255, 255]),
        description: "Green blob",
    },
    ColorPreset {
        name: "yellow",
        range: ColorRange::new([20, 100, 100], [30, 255, 255]),
        description: "Yellow blob",
    },
];

/// Case-insensitive lookup by name.
pub fn preset(name: &str) -> Result<&'static ColorPreset, SettingsError> {
    PRESETS
        .iter()
        .find(|preset| preset.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| SettingsError::UnknownPreset(name.to_string()))
}
