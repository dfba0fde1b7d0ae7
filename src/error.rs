use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device unavailable: {0}")]
    Open(String),
    #[error("camera read failed: {0}")]
    Read(String),
    #[error("capture unavailable: camera is not running")]
    Unavailable,
}

/// Why a captured image was rejected before comparison.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("captured image could not be read: {0}")]
    Unreadable(String),
    #[error("captured image is too small ({width}x{height})")]
    TooSmall { width: u32, height: u32 },
    #[error("captured image is too dark, please face the light")]
    TooDark,
    #[error("captured image is overexposed")]
    TooBright,
    #[error("captured image has no visible detail, check the camera")]
    NoDetail,
}

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("frame buffer holds {actual} bytes, expected {expected} for {width}x{height}")]
    BadBuffer {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("frame has zero size")]
    Empty,
}

#[derive(Error, Debug)]
pub enum LoginError {
    #[error(transparent)]
    Capture(#[from] CameraError),
    #[error("username and password are required")]
    MissingCredentials,
    #[error("invalid username or password")]
    Rejected,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("administrator face data is missing: {}", .0.display())]
    MissingReference(PathBuf),
    #[error("face authentication failed")]
    FaceMismatch,
    #[error("login failed: {0}")]
    Unexpected(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Critical,
}

/// A message the login window must show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn warning(title: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            title: title.to_string(),
            message: message.into(),
        }
    }

    pub fn critical(title: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Critical,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

impl LoginError {
    /// Device failures send the window back to account mode.
    pub fn is_device(&self) -> bool {
        matches!(self, Self::Capture(_))
    }

    pub fn notice(&self) -> Notice {
        match self {
            Self::Capture(e) => Notice::warning("Camera error", e.to_string()),
            Self::MissingCredentials => {
                Notice::warning("Input error", "Please enter a username and password")
            }
            Self::Rejected => Notice::warning("Login failed", self.to_string()),
            Self::Validation(e) => Notice::warning("Authentication failed", e.to_string()),
            Self::MissingReference(_) => Notice::critical("System error", self.to_string()),
            Self::FaceMismatch => Notice::warning("Verification failed", "Face authentication failed"),
            Self::Unexpected(_) => Notice::critical("Error", self.to_string()),
        }
    }
}
