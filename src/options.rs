//! Runtime options.
//!
//! Settings resolve in three layers: built-in defaults, then an optional
//! TOML configuration file, then command-line flags. The resolved result
//! is validated once before the camera is touched.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Device name selecting the software frame generator.
pub const SYNTHETIC_DEVICE: &str = "synthetic";

/// Runtime limit applied when no timeout is given anywhere, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(author, version, about = "Live motion-highlighting camera preview")]
pub struct Options {
    /// Configuration file (TOML).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Camera to drive: "synthetic" or a V4L2 device node.
    #[arg(short, long)]
    pub device: Option<String>,

    /// Frame width in pixels.
    #[arg(long)]
    pub width: Option<u32>,

    /// Frame height in pixels.
    #[arg(long)]
    pub height: Option<u32>,

    /// Capture rate in frames per second.
    #[arg(long)]
    pub framerate: Option<u32>,

    /// Total runtime in milliseconds; 0 runs until interrupted.
    #[arg(short = 't', long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Verbosity (0 = warnings only, 2 = debug); a bare -v selects 2.
    #[arg(
        short,
        long,
        default_value_t = 1,
        num_args = 0..=1,
        default_missing_value = "2",
        value_name = "LEVEL"
    )]
    pub verbose: u8,
}

/// Camera configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSettings {
    /// "synthetic" or a V4L2 device node such as "/dev/video0".
    pub device: String,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Target frames per second.
    pub framerate: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device: SYNTHETIC_DEVICE.into(),
            width: 640,
            height: 480,
            framerate: 30,
        }
    }
}

impl CameraSettings {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.is_empty() {
            return Err(ConfigError::InvalidDevice);
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.framerate == 0 || self.framerate > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }

    /// True when the software frame generator is selected.
    pub fn is_synthetic(&self) -> bool {
        self.device == SYNTHETIC_DEVICE
    }
}

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("camera device must not be empty")]
    InvalidDevice,
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    #[error("device {0} requires the v4l2 feature")]
    UnsupportedDevice(String),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Configuration file format. Every field is optional; absent fields keep
/// their defaults and command-line flags override both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub camera: FileCamera,
    #[serde(default)]
    pub run: FileRun,
}

/// `[camera]` section of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileCamera {
    /// Camera selection; see [`CameraSettings::device`].
    pub device: Option<String>,
    /// Frame width in pixels.
    pub width: Option<u32>,
    /// Frame height in pixels.
    pub height: Option<u32>,
    /// Target frames per second.
    pub framerate: Option<u32>,
}

/// `[run]` section of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileRun {
    /// Runtime limit in milliseconds; 0 disables the deadline.
    pub timeout_ms: Option<u64>,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Camera selection and geometry.
    pub camera: CameraSettings,
    /// Loop deadline; `None` runs until a quit signal.
    pub deadline: Option<Duration>,
    /// Verbosity level from the command line.
    pub verbose: u8,
}

impl Settings {
    /// Default log level for the chosen verbosity. `RUST_LOG` overrides.
    pub fn log_level(&self) -> tracing::Level {
        log_level(self.verbose)
    }
}

/// Maps a verbosity level to the default log level.
pub fn log_level(verbose: u8) -> tracing::Level {
    match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

impl Options {
    /// Resolves defaults, the configuration file and flags into settings.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let file = match &self.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        self.resolve_with(file)
    }

    fn resolve_with(&self, file: FileConfig) -> Result<Settings, ConfigError> {
        let mut camera = CameraSettings::default();
        if let Some(device) = file.camera.device {
            camera.device = device;
        }
        if let Some(width) = file.camera.width {
            camera.width = width;
        }
        if let Some(height) = file.camera.height {
            camera.height = height;
        }
        if let Some(framerate) = file.camera.framerate {
            camera.framerate = framerate;
        }

        if let Some(device) = &self.device {
            camera.device = device.clone();
        }
        if let Some(width) = self.width {
            camera.width = width;
        }
        if let Some(height) = self.height {
            camera.height = height;
        }
        if let Some(framerate) = self.framerate {
            camera.framerate = framerate;
        }
        camera.validate()?;

        let timeout_ms = self
            .timeout
            .or(file.run.timeout_ms)
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        let deadline = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));

        Ok(Settings {
            camera,
            deadline,
            verbose: self.verbose,
        })
    }
}
