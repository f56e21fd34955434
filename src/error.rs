//! Error types for the provisioning console.

use crate::resources::ResourceField;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result type alias for console operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while provisioning VMs or driving the container daemon.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Validation Errors
    // =========================================================================
    /// A CPU, memory or disk value is not a positive integer.
    #[error("invalid {field} '{value}': {problem}")]
    InvalidCount {
        field: ResourceField,
        value: String,
        problem: CountProblem,
    },

    /// File has an extension the workflow does not accept.
    #[error("unsupported file type {path}: expected one of {expected}")]
    UnsupportedExtension { path: PathBuf, expected: String },

    /// Failed to parse image reference.
    #[error("invalid image reference '{reference}': {reason}")]
    InvalidImageReference { reference: String, reason: String },

    /// Registry search term is empty.
    #[error("search term must not be empty")]
    EmptySearchTerm,

    // =========================================================================
    // Not Found Errors
    // =========================================================================
    /// Required input file does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Required directory does not exist.
    #[error("directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    /// Container is no longer running.
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// Image is unknown to the daemon or the registry.
    #[error("image not found: {0}")]
    ImageNotFound(String),

    /// No local image matches a search term.
    #[error("no local image matches '{0}'")]
    NoMatchingImage(String),

    // =========================================================================
    // Missing Target Errors
    // =========================================================================
    /// The caller did not choose a path the workflow needs.
    #[error("{0} not selected")]
    MissingTarget(Target),

    // =========================================================================
    // External Tool Errors
    // =========================================================================
    /// Image build reported a failure.
    #[error("build of '{image}' failed: {reason}")]
    BuildFailed { image: String, reason: String },

    /// External command exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// External command could not be started.
    #[error("failed to launch {program}: {reason}")]
    LaunchFailed { program: String, reason: String },

    // =========================================================================
    // Daemon Errors
    // =========================================================================
    /// Daemon could not be reached at startup.
    #[error("container daemon unavailable: {0}")]
    DaemonUnavailable(String),

    /// Daemon rejected or failed a request.
    #[error("container daemon error: {0}")]
    Daemon(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration document could not be read or parsed.
    #[error("failed to load configuration {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the failure category reported to the operator.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidCount { .. }
            | Self::UnsupportedExtension { .. }
            | Self::InvalidImageReference { .. }
            | Self::EmptySearchTerm => FailureKind::ValidationError,
            Self::FileNotFound { .. } | Self::DirectoryNotFound { .. } => {
                FailureKind::ResourceNotFound
            }
            Self::ContainerNotFound(_) | Self::NoMatchingImage(_) => FailureKind::NotFound,
            Self::ImageNotFound(_) => FailureKind::ImageNotFound,
            Self::MissingTarget(_) => FailureKind::MissingTarget,
            Self::BuildFailed { .. } => FailureKind::BuildError,
            Self::CommandFailed { .. } | Self::LaunchFailed { .. } => FailureKind::CommandError,
            Self::DaemonUnavailable(_) | Self::Daemon(_) | Self::Io(_) => FailureKind::RuntimeError,
            Self::Config { .. } => FailureKind::ConfigError,
        }
    }
}

/// Why a raw count failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountProblem {
    /// Empty, or contains something other than ASCII digits.
    NonNumeric,
    /// Parses to zero.
    NonPositive,
    /// Does not fit in 64 bits.
    OutOfRange,
}

impl std::fmt::Display for CountProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonNumeric => write!(f, "must be a whole number"),
            Self::NonPositive => write!(f, "must be greater than zero"),
            Self::OutOfRange => write!(f, "is too large"),
        }
    }
}

/// Path a workflow needs the caller to choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Where a new disk image is written.
    SaveLocation,
    /// Bootable installer ISO.
    InstallerMedia,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SaveLocation => write!(f, "save location for disk image"),
            Self::InstallerMedia => write!(f, "installer ISO"),
        }
    }
}

/// Failure category attached to an unsuccessful [`OperationResult`].
///
/// [`OperationResult`]: crate::console::OperationResult
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    ValidationError,
    ResourceNotFound,
    MissingTarget,
    BuildError,
    CommandError,
    ImageNotFound,
    NotFound,
    RuntimeError,
    ConfigError,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ValidationError => "ValidationError",
            Self::ResourceNotFound => "ResourceNotFound",
            Self::MissingTarget => "MissingTarget",
            Self::BuildError => "BuildError",
            Self::CommandError => "CommandError",
            Self::ImageNotFound => "ImageNotFound",
            Self::NotFound => "NotFound",
            Self::RuntimeError => "RuntimeError",
            Self::ConfigError => "ConfigError",
        };
        f.write_str(name)
    }
}
