//! Configuration file loading
//!
//! Loads user configuration from `~/.config/screenhue/config.toml`

use anyhow::{Context, Result, bail};
use screenhue_core::capture::command::DEFAULT_TIMEOUT;
use screenhue_core::capture::{CommandCapturer, ScreenCapturer, SyntheticCapturer};
use screenhue_core::config::SamplingConfig;
use screenhue_core::types::ScreenBounds;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Sampler settings
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Where frames come from
    #[serde(default)]
    pub capture: CaptureSettings,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Capture backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureBackend {
    /// External screenshot command
    #[default]
    Command,
    /// Generated test pattern
    Synthetic,
}

impl std::fmt::Display for CaptureBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command => write!(f, "command"),
            Self::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSettings {
    #[serde(default)]
    pub backend: CaptureBackend,

    /// Screenshot program writing an image to stdout
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments for the screenshot program
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Capture width; probed from the first screenshot when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// Capture height; probed from the first screenshot when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Milliseconds a screenshot program may run before it is killed
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Artificial delay per synthetic capture, in milliseconds
    #[serde(default)]
    pub latency_ms: u64,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Level used when no -v flag is given (error, warn, info, debug, trace)
    #[serde(default = "default_level")]
    pub level: String,
}

/// Used by the synthetic backend when no size is configured
const DEFAULT_SYNTHETIC_SIZE: (u32, u32) = (1920, 1080);

fn default_program() -> String {
    screenhue_core::capture::command::DEFAULT_PROGRAM.to_string()
}

fn default_args() -> Vec<String> {
    screenhue_core::capture::command::DEFAULT_ARGS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            backend: CaptureBackend::default(),
            program: default_program(),
            args: default_args(),
            width: None,
            height: None,
            timeout_ms: default_timeout_ms(),
            latency_ms: 0,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl CaptureSettings {
    /// Fixed capture bounds, if both dimensions are configured
    pub fn bounds(&self) -> Option<ScreenBounds> {
        match (self.width, self.height) {
            (Some(width), Some(height)) => Some(ScreenBounds::new(width, height)),
            _ => None,
        }
    }

    /// Build the configured capturer
    ///
    /// For the command backend without configured bounds this takes one
    /// screenshot to learn the screen size.
    pub fn build(&self) -> Result<Box<dyn ScreenCapturer>> {
        match self.backend {
            CaptureBackend::Command => {
                if self.timeout_ms == 0 {
                    bail!("capture.timeout_ms must be greater than zero");
                }
                let timeout = Duration::from_millis(self.timeout_ms);
                let capturer = match self.bounds() {
                    Some(bounds) => {
                        CommandCapturer::with_bounds(&self.program, self.args.clone(), bounds)
                            .timeout(timeout)
                    }
                    None => CommandCapturer::with_timeout(&self.program, self.args.clone(), timeout)?,
                };
                Ok(Box::new(capturer))
            }
            CaptureBackend::Synthetic => {
                let bounds = self.bounds().unwrap_or_else(|| {
                    ScreenBounds::new(DEFAULT_SYNTHETIC_SIZE.0, DEFAULT_SYNTHETIC_SIZE.1)
                });
                let capturer = SyntheticCapturer::new(bounds)?
                    .with_latency(Duration::from_millis(self.latency_ms));
                Ok(Box::new(capturer))
            }
        }
    }
}

impl ServerSettings {
    /// Socket address to listen on
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.bind, self.port))
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("screenhue").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("screenhue")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/screenhue/config.toml")
        }
    }

    /// Load configuration from a specific path
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# Screenhue Configuration
# https://github.com/ghostkellz/screenhue

[sampling]
# Milliseconds between samples (1000 = once a second, 16 ~ 60 per second)
interval_ms = 1000

# Reduce every Nth pixel in both directions
pixel_density = 4

# Algorithm whose result becomes the event's "color"
primary = "squaredAvgRgb"

# Algorithms computed for every sample: avgRgb, squaredAvgRgb, averageHue
algorithms = ["avgRgb", "squaredAvgRgb", "averageHue"]

# "on-demand" samples only while someone is listening
# "continuous" samples from startup until exit
lifecycle = "on-demand"

# Events kept for each listener before a slow one starts skipping
buffer_capacity = 16

[capture]
# "command" runs a screenshot program, "synthetic" generates a test pattern
backend = "command"

# Program printing a PNG or PPM screenshot to stdout
program = "grim"
args = ["-t", "ppm", "-"]

# Fixed capture size; probed from the first screenshot when left out
# width = 2560
# height = 1440

# Kill the screenshot program if it runs longer than this
timeout_ms = 5000

# Artificial delay per synthetic capture
latency_ms = 0

[server]
bind = "127.0.0.1"
port = 8080

[logging]
# Used when no -v flag is given: error, warn, info, debug, trace
level = "warn"
"#
    .to_string()
}
