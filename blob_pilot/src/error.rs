use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading or saving persisted tracker settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file {path} could not be accessed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings file {path} is malformed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("settings for {path} could not be encoded: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown color preset `{0}` (expected one of: orange, red, blue, green, yellow)")]
    UnknownPreset(String),
}
