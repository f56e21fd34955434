//! Resource requests for VM provisioning.
//!
//! Operator input arrives as raw text: typed on the command line or read
//! from a JSON configuration document. [`ConfigDocument`] carries that text
//! untouched; only [`crate::validate::validate_resources`] turns it into a
//! [`ResourceSpec`]. A document is never trusted just because it came from
//! a file.
//!
//! ```json
//! { "cpu": "2", "memory": "1024", "disk_size": "10240" }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// =============================================================================
// Fields
// =============================================================================

/// Numeric resource field, used to name the culprit in validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceField {
    Cpu,
    Memory,
    Disk,
}

impl std::fmt::Display for ResourceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "CPU count"),
            Self::Memory => write!(f, "memory size"),
            Self::Disk => write!(f, "disk size"),
        }
    }
}

// =============================================================================
// Validated Spec
// =============================================================================

/// Validated VM resources.
///
/// Every field is strictly positive. `disk_mb` is only present when the
/// workflow allocates a new disk image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceSpec {
    /// Virtual CPUs.
    pub cpu_count: u64,
    /// Guest memory in MB.
    pub memory_mb: u64,
    /// Size of a newly allocated disk in MB.
    pub disk_mb: Option<u64>,
}

// =============================================================================
// Config Document
// =============================================================================

/// Raw resource values, as typed or as loaded from a configuration file.
///
/// Missing fields read as empty strings and fail validation later. Numbers
/// written without quotes are kept as their JSON text, so `{"cpu": 2}` and
/// `{"cpu": "2"}` load identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default, deserialize_with = "lenient_string")]
    pub cpu: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub memory: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub disk_size: String,
}

impl ConfigDocument {
    /// Creates a document from raw values.
    pub fn new(
        cpu: impl Into<String>,
        memory: impl Into<String>,
        disk_size: impl Into<String>,
    ) -> Self {
        Self {
            cpu: cpu.into(),
            memory: memory.into(),
            disk_size: disk_size.into(),
        }
    }

    /// Loads a document from a JSON file.
    ///
    /// Fails only when the file cannot be read or is not JSON; field values
    /// are not inspected.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let doc: Self = serde_json::from_str(&content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: format!("invalid JSON: {}", e),
        })?;
        info!("Loaded configuration values from {}", path.display());
        debug!(cpu = %doc.cpu, memory = %doc.memory, disk_size = %doc.disk_size, "configuration document");
        Ok(doc)
    }

    /// Parses a document from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Config {
            path: PathBuf::new(),
            reason: format!("invalid JSON: {}", e),
        })
    }

    /// Fills empty fields from `base`, keeping values already present.
    ///
    /// Values typed by the operator win over those loaded from a file.
    pub fn or_defaults(self, base: ConfigDocument) -> Self {
        let pick = |own: String, fallback: String| if own.is_empty() { fallback } else { own };
        Self {
            cpu: pick(self.cpu, base.cpu),
            memory: pick(self.memory, base.memory),
            disk_size: pick(self.disk_size, base.disk_size),
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

// =============================================================================
// VM Creation Request
// =============================================================================

/// One VM creation submission, with the workflow chosen up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmCreationRequest {
    /// Boot an existing disk image.
    ExistingImage {
        image_path: PathBuf,
        resources: ConfigDocument,
    },
    /// Allocate a new disk image and boot an installer ISO against it.
    ///
    /// `None` paths mean the operator declined to choose one.
    NewImage {
        save_path: Option<PathBuf>,
        iso_path: Option<PathBuf>,
        resources: ConfigDocument,
    },
}

impl VmCreationRequest {
    /// Short workflow label for logs.
    pub fn workflow(&self) -> &'static str {
        match self {
            Self::ExistingImage { .. } => "existing-image",
            Self::NewImage { .. } => "new-image",
        }
    }

    /// Returns the request with empty resource fields taken from `base`.
    pub fn with_resource_defaults(self, base: ConfigDocument) -> Self {
        match self {
            Self::ExistingImage {
                image_path,
                resources,
            } => Self::ExistingImage {
                image_path,
                resources: resources.or_defaults(base),
            },
            Self::NewImage {
                save_path,
                iso_path,
                resources,
            } => Self::NewImage {
                save_path,
                iso_path,
                resources: resources.or_defaults(base),
            },
        }
    }
}
