//! Error types for screenhue

use thiserror::Error;

/// Result type alias using ScreenhueError
pub type Result<T> = std::result::Result<T, ScreenhueError>;

/// Main error type for screenhue operations
#[derive(Debug, Error)]
pub enum ScreenhueError {
    /// Obtaining a frame from the platform failed
    #[error("Capture error: {0}")]
    Capture(String),

    /// Frame could not be reduced to a color
    #[error("Reduction error: {0}")]
    Reduction(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Hub has been shut down
    #[error("Broadcast hub is shut down")]
    HubClosed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ScreenhueError>,
    },
}

impl ScreenhueError {
    /// Create a capture error
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    /// Create a reduction error
    pub fn reduction(msg: impl Into<String>) -> Self {
        Self::Reduction(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any context layers
    pub fn root(&self) -> &ScreenhueError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the sampler should simply try again on the next tick
    pub fn is_transient(&self) -> bool {
        matches!(
            self.root(),
            Self::Capture(_) | Self::Reduction(_) | Self::Io(_)
        )
    }

    /// A short hint for the user on how to resolve the error
    pub fn user_hint(&self) -> Option<&'static str> {
        match self.root() {
            Self::Capture(_) => Some(
                "Check that the screenshot command works in this session (e.g. run `grim -t ppm - > /dev/null`)",
            ),
            Self::Io(_) => Some("Check that the screenshot program is installed and on PATH"),
            Self::Config(_) => Some("Check ~/.config/screenhue/config.toml and the command-line flags"),
            Self::HubClosed => Some("The sampler was stopped; restart screenhue"),
            _ => None,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl From<image::ImageError> for ScreenhueError {
    fn from(err: image::ImageError) -> Self {
        Self::Capture(format!("Failed to decode screenshot: {}", err))
    }
}

impl From<tokio::task::JoinError> for ScreenhueError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Capture(format!("Capture task failed: {}", err))
    }
}
