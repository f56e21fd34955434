//! Input validation for resource values and file paths.
//!
//! Everything here is a pure check: nothing is clamped, defaulted or
//! rewritten. A value either passes unchanged or the caller gets an
//! [`Error`] explaining which field was wrong.

use crate::error::{CountProblem, Error, Result};
use crate::resources::{ConfigDocument, ResourceField, ResourceSpec};
use std::path::Path;

/// Parses a strictly positive count from raw digit text.
///
/// Only ASCII digits are accepted, so signs, whitespace and decimal points
/// are rejected. Leading zeros are allowed as long as the value is not zero.
pub fn validate_count(field: ResourceField, raw: &str) -> Result<u64> {
    let invalid = |problem| Error::InvalidCount {
        field,
        value: raw.to_string(),
        problem,
    };

    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(CountProblem::NonNumeric));
    }

    // Zero-only strings of any length are zero, not an overflow.
    if raw.bytes().all(|b| b == b'0') {
        return Err(invalid(CountProblem::NonPositive));
    }

    raw.parse::<u64>()
        .map_err(|_| invalid(CountProblem::OutOfRange))
}

/// Validates CPU and memory, and the disk size when the workflow needs one.
///
/// Fields are checked in that order and the first failure is returned.
pub fn validate_resources(doc: &ConfigDocument, require_disk: bool) -> Result<ResourceSpec> {
    let cpu_count = validate_count(ResourceField::Cpu, &doc.cpu)?;
    let memory_mb = validate_count(ResourceField::Memory, &doc.memory)?;
    let disk_mb = if require_disk {
        Some(validate_count(ResourceField::Disk, &doc.disk_size)?)
    } else {
        None
    };

    Ok(ResourceSpec {
        cpu_count,
        memory_mb,
        disk_mb,
    })
}

/// Fails unless `path` is an existing regular file.
pub fn require_existing_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Fails unless `path` is an existing directory.
pub fn require_existing_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::DirectoryNotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Fails unless the extension of `path` is one of `allowed` (case-insensitive).
pub fn require_extension(path: &Path, allowed: &[&str]) -> Result<()> {
    let matches = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)));

    if matches {
        Ok(())
    } else {
        Err(Error::UnsupportedExtension {
            path: path.to_path_buf(),
            expected: allowed
                .iter()
                .map(|ext| format!(".{}", ext))
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}
