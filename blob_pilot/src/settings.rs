// THEORY:
// `settings` persists the tunables a user dialled in so the next run starts from
// them. The on-disk format is a small JSON record:
//
//     {
//       "lower_hsv": [5, 100, 100],
//       "upper_hsv": [15, 255, 255],
//       "min_blob_area": 500,
//       "max_blob_area": 50000,
//       "dead_zone": 50,                       (optional)
//       "base_speed": 150,                     (optional)
//       "min_speed": 50,                       (optional)
//       "max_speed": 255,                      (optional)
//       "max_frames_lost": 10,                 (optional)
//       "command_interval": 0.3,               (optional, seconds)
//       "description": "...",                  (optional)
//       "timestamp": "1760600000"              (optional)
//     }
//
// The optional tunables leave the running value alone when absent.
//
// Loading is forgiving on purpose. Missing keys take their defaults, and a
// missing or unreadable file is reported and the previous settings are kept.
// A bad settings file must never stop the rover from starting.
//
// `SettingsWatcher` polls the file's modification time once per frame and
// reloads it when it changes, which makes the file a live tuning surface.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core_modules::blob::SizeBounds;
use crate::core_modules::color_segmenter::ColorRange;
use crate::core_modules::presets::PRESETS;
use crate::error::SettingsError;
use crate::pipeline::TrackerConfig;

/// File name used when none is given.
pub const SETTINGS_FILE: &str = "tracker_settings.json";

/// The persisted subset of `TrackerConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub lower_hsv: [u8; 3],
    pub upper_hsv: [u8; 3],
    pub min_blob_area: u32,
    pub max_blob_area: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_zone: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_speed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_speed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_frames_lost: Option<u32>,
    /// Seconds between two transmitted commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_interval: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let orange = &PRESETS[0];
        Self {
            lower_hsv: orange.range.lower,
            upper_hsv: orange.range.upper,
            min_blob_area: 500,
            max_blob_area: 50_000,
            dead_zone: None,
            base_speed: None,
            min_speed: None,
            max_speed: None,
            max_frames_lost: None,
            command_interval: None,
            description: Some("Default orange blob tracking settings".to_string()),
            timestamp: None,
        }
    }
}

impl Settings {
    /// Captures the persisted tunables of `config`.
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self {
            lower_hsv: config.color_range.lower,
            upper_hsv: config.color_range.upper,
            min_blob_area: config.size_bounds.min_area,
            max_blob_area: config.size_bounds.max_area,
            dead_zone: Some(config.control.dead_zone()),
            base_speed: Some(config.control.base_speed),
            min_speed: Some(config.control.min_speed),
            max_speed: Some(config.control.max_speed),
            max_frames_lost: Some(config.max_frames_lost),
            command_interval: Some(config.command_interval.as_secs_f64()),
            description: None,
            timestamp: None,
        }
    }

    /// Writes these settings over the matching fields of `config`. The dead
    /// zone, when present, applies to the active control axis.
    pub fn apply_to(&self, config: &mut TrackerConfig) {
        config.color_range = ColorRange::new(self.lower_hsv, self.upper_hsv);
        config.size_bounds = SizeBounds::new(self.min_blob_area, self.max_blob_area);
        if let Some(dead_zone) = self.dead_zone {
            config.control.set_dead_zone(dead_zone);
        }
        if let Some(base_speed) = self.base_speed {
            config.control.base_speed = base_speed;
        }
        if let Some(min_speed) = self.min_speed {
            config.control.min_speed = min_speed;
        }
        if let Some(max_speed) = self.max_speed {
            config.control.max_speed = max_speed;
        }
        if let Some(max_frames_lost) = self.max_frames_lost {
            config.max_frames_lost = max_frames_lost;
        }
        if let Some(seconds) = self.command_interval {
            match Duration::try_from_secs_f64(seconds) {
                Ok(interval) => config.command_interval = interval,
                Err(error) => warn!(seconds, %error, "ignoring command interval"),
            }
        }
    }

    pub fn from_json(path: &Path, json: &str) -> Result<Self, SettingsError> {
        serde_json::from_str(json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(path, &json)
    }

    /// Loads `path`, or logs why it could not and returns `fallback`.
    pub fn load_or(path: impl AsRef<Path>, fallback: Settings) -> Settings {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(settings) => {
                info!(path = %path.display(), "settings loaded");
                settings
            }
            Err(error) => {
                warn!(%error, "keeping previous settings");
                fallback
            }
        }
    }

    /// Saves with a fresh timestamp (seconds since the Unix epoch).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let mut stamped = self.clone();
        stamped.timestamp = Some(unix_timestamp());

        let json = serde_json::to_string_pretty(&stamped).map_err(|source| SettingsError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "settings saved");
        Ok(())
    }
}

fn unix_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs().to_string())
        .unwrap_or_default()
}

/// Reloads a settings file whenever its modification time changes.
#[derive(Debug)]
pub struct SettingsWatcher {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl SettingsWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_modified: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies the file to `config` if it changed since the last poll. Returns
    /// true when `config` was updated. A file that disappears or fails to parse
    /// leaves `config` untouched.
    pub fn poll(&mut self, config: &mut TrackerConfig) -> bool {
        let Ok(modified) = fs::metadata(&self.path).and_then(|meta| meta.modified()) else {
            return false;
        };
        if self.last_modified == Some(modified) {
            return false;
        }
        self.last_modified = Some(modified);

        match Settings::load(&self.path) {
            Ok(settings) => {
                settings.apply_to(config);
                info!(path = %self.path.display(), "settings reloaded");
                true
            }
            Err(error) => {
                warn!(%error, "ignoring settings change");
                false
            }
        }
    }
}
