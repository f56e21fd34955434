//! # Console Constants
//!
//! Default tool locations, recognized file extensions, and daemon limits
//! used throughout the console. [`crate::config::ConsoleConfig`] starts
//! from these values and lets operators override the tool paths.
//!
//! ## Cross-References
//!
//! - [`crate::validate`]: Uses the extension lists for path checks
//! - [`crate::vm`]: Uses the hypervisor and disk tool defaults
//! - [`crate::container`]: Uses image reference limits and the default tag
//! - [`crate::docker`]: Uses the daemon timeouts

use std::time::Duration;

// =============================================================================
// External Tools
// =============================================================================

/// Hypervisor binary launched for both VM workflows.
pub const DEFAULT_HYPERVISOR: &str = "qemu-system-x86_64";

/// Disk-image creation tool.
pub const DEFAULT_DISK_TOOL: &str = "qemu-img";

/// Format passed to the disk-image tool when allocating a new image.
pub const DEFAULT_DISK_FORMAT: &str = "qcow2";

/// Program whose `search` subcommand queries the public registry.
pub const DEFAULT_SEARCH_PROGRAM: &str = "docker";

// =============================================================================
// Files
// =============================================================================

/// Append-only diagnostic log written by the console.
pub const DEFAULT_LOG_FILE: &str = "cloudmgr.log";

/// Console configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "cloudmgr.yaml";

/// Name of the console's directory under the user config dir.
pub const CONFIG_DIR_NAME: &str = "cloudmgr";

/// File name written by Dockerfile authoring.
pub const DOCKERFILE_NAME: &str = "Dockerfile";

/// Prefix of generated disk image names (`disk_image_YYYYmmdd_HHMMSS.qcow2`).
pub const DISK_IMAGE_NAME_PREFIX: &str = "disk_image_";

/// Extensions accepted for an existing or newly created disk image.
///
/// Compared case-insensitively.
pub const DISK_IMAGE_EXTENSIONS: &[&str] = &["qcow2", "qcow", "img", "raw", "vmdk", "vdi", "vhd", "vhdx"];

/// Extensions accepted for bootable installer media.
pub const INSTALLER_EXTENSIONS: &[&str] = &["iso"];

// =============================================================================
// Container Images
// =============================================================================

/// Tag assumed when a reference does not carry one.
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// Maximum image reference length in bytes.
///
/// Registries enforce their own limits; this keeps obviously broken input
/// from ever reaching the daemon.
pub const MAX_IMAGE_REF_LEN: usize = 512;

/// Characters allowed in an image reference.
///
/// The `@` introduces a digest, as in `nginx@sha256:abc...`.
pub const IMAGE_REF_VALID_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789/:.-_@";

/// Repository/tag placeholder the daemon reports for dangling images.
pub const UNTAGGED_MARKER: &str = "<none>";

/// Number of id characters shown in container listings.
pub const SHORT_ID_LEN: usize = 12;

// =============================================================================
// Daemon
// =============================================================================

/// Request timeout for the daemon connection, in seconds.
pub const DAEMON_TIMEOUT_SECS: u64 = 120;

/// Grace period the daemon gives a container before killing it on stop.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);
