//! Configuration file support.
//!
//! Editor settings are stored as a versioned JSON document. Every section
//! falls back to defaults, so older or partial files keep loading.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Version of the configuration file format
    pub version: u32,

    #[serde(default)]
    pub preferences: Preferences,

    #[serde(default)]
    pub editing: EditingSettings,

    #[serde(default)]
    pub viewport: ViewportSettings,

    #[serde(default)]
    pub persistence: PersistenceSettings,

    #[serde(default)]
    pub export: ExportSettings,
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Preferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Pointer interaction tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditingSettings {
    /// Edge slack for boxes and polygon outlines, in screen pixels
    pub hit_tolerance: f32,
    /// Grab radius around points, in screen pixels
    pub point_hit_radius: f32,
    /// Grab radius around vertex handles, in screen pixels
    pub vertex_handle_radius: f32,
    /// Per-paste offset, in image pixels
    pub paste_offset: f32,
    /// Distance to the first vertex that closes a polygon, in screen pixels
    pub polygon_close_threshold: f32,
}

impl Default for EditingSettings {
    fn default() -> Self {
        Self {
            hit_tolerance: constants::DEFAULT_HIT_TOLERANCE,
            point_hit_radius: constants::DEFAULT_POINT_HIT_RADIUS,
            vertex_handle_radius: constants::DEFAULT_VERTEX_HANDLE_RADIUS,
            paste_offset: constants::DEFAULT_PASTE_OFFSET,
            polygon_close_threshold: constants::DEFAULT_POLYGON_CLOSE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_factor: f32,
    pub fit_margin: f32,
}

impl ViewportSettings {
    /// Check that the zoom range and fit margin describe a usable viewport.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.min_zoom) || !positive(self.max_zoom) || self.min_zoom > self.max_zoom {
            return Err(ConfigError::invalid_viewport(format!(
                "zoom range {}..{} must be positive and ordered",
                self.min_zoom, self.max_zoom
            )));
        }
        if !self.zoom_factor.is_finite() || self.zoom_factor <= 1.0 {
            return Err(ConfigError::invalid_viewport(format!(
                "zoom_factor {} must be greater than 1",
                self.zoom_factor
            )));
        }
        if !positive(self.fit_margin) || self.fit_margin > 1.0 {
            return Err(ConfigError::invalid_viewport(format!(
                "fit_margin {} must be in (0, 1]",
                self.fit_margin
            )));
        }
        Ok(())
    }
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            min_zoom: constants::MIN_ZOOM,
            max_zoom: constants::MAX_ZOOM,
            zoom_factor: constants::ZOOM_FACTOR,
            fit_margin: constants::FIT_MARGIN,
        }
    }
}

/// Retry policy for the write-behind queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceSettings {
    /// Total attempts per operation, including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            max_attempts: constants::DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: constants::DEFAULT_BASE_DELAY_MS,
            max_delay_ms: constants::DEFAULT_MAX_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Fail the export on degenerate shapes instead of skipping them
    pub strict: bool,
}

impl EditorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: Preferences::default(),
            editing: EditingSettings::default(),
            viewport: ViewportSettings::default(),
            persistence: PersistenceSettings::default(),
            export: ExportSettings::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }
        config.viewport.validate()?;

        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "pixmark-config.json"
    }

    /// Get the default config file path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .map(|dir| dir.join("pixmark").join(Self::default_filename()))
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when it is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    UnsupportedVersion {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Viewport settings that would make zooming or fitting impossible
    #[error("Invalid viewport settings: {message}")]
    InvalidViewport { message: String },
}

impl ConfigError {
    fn invalid_viewport(message: impl Into<String>) -> Self {
        Self::InvalidViewport {
            message: message.into(),
        }
    }
}
