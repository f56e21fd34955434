//! Tests for error types.
//!
//! Validates display formatting and the failure category of every variant.

use cloudmgr::{CountProblem, Error, FailureKind, ResourceField, Target};
use std::path::PathBuf;

// =============================================================================
// Display Tests
// =============================================================================

#[test]
fn test_invalid_count_display() {
    let err = Error::InvalidCount {
        field: ResourceField::Memory,
        value: "abc".to_string(),
        problem: CountProblem::NonNumeric,
    };
    assert_eq!(err.to_string(), "invalid memory size 'abc': must be a whole number");
}

#[test]
fn test_missing_target_display() {
    assert_eq!(
        Error::MissingTarget(Target::SaveLocation).to_string(),
        "save location for disk image not selected"
    );
    assert_eq!(
        Error::MissingTarget(Target::InstallerMedia).to_string(),
        "installer ISO not selected"
    );
}

#[test]
fn test_file_not_found_display() {
    let err = Error::FileNotFound {
        path: PathBuf::from("/vms/debian.qcow2"),
    };
    assert_eq!(err.to_string(), "file not found: /vms/debian.qcow2");
}

#[test]
fn test_command_failed_display() {
    let err = Error::CommandFailed {
        program: "qemu-img".to_string(),
        status: "exit code 1".to_string(),
        stderr: "Permission denied".to_string(),
    };
    let msg = err.to_string();
    assert!(msg.contains("qemu-img"));
    assert!(msg.contains("exit code 1"));
    assert!(msg.contains("Permission denied"));
}

#[test]
fn test_io_error_converts() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: Error = io.into();
    assert!(matches!(err, Error::Io(_)));
    assert!(err.to_string().contains("denied"));
}

// =============================================================================
// Category Tests
// =============================================================================

#[test]
fn test_failure_kinds() {
    let cases = vec![
        (
            Error::InvalidCount {
                field: ResourceField::Cpu,
                value: "0".to_string(),
                problem: CountProblem::NonPositive,
            },
            FailureKind::ValidationError,
        ),
        (
            Error::UnsupportedExtension {
                path: PathBuf::from("a.txt"),
                expected: ".iso".to_string(),
            },
            FailureKind::ValidationError,
        ),
        (
            Error::InvalidImageReference {
                reference: "a b".to_string(),
                reason: "space".to_string(),
            },
            FailureKind::ValidationError,
        ),
        (Error::EmptySearchTerm, FailureKind::ValidationError),
        (
            Error::FileNotFound {
                path: PathBuf::from("x"),
            },
            FailureKind::ResourceNotFound,
        ),
        (
            Error::DirectoryNotFound {
                path: PathBuf::from("x"),
            },
            FailureKind::ResourceNotFound,
        ),
        (
            Error::MissingTarget(Target::InstallerMedia),
            FailureKind::MissingTarget,
        ),
        (
            Error::BuildFailed {
                image: "a:1".to_string(),
                reason: "boom".to_string(),
            },
            FailureKind::BuildError,
        ),
        (
            Error::CommandFailed {
                program: "qemu".to_string(),
                status: "a signal".to_string(),
                stderr: String::new(),
            },
            FailureKind::CommandError,
        ),
        (
            Error::LaunchFailed {
                program: "qemu".to_string(),
                reason: "missing".to_string(),
            },
            FailureKind::CommandError,
        ),
        (
            Error::ImageNotFound("ghost:latest".to_string()),
            FailureKind::ImageNotFound,
        ),
        (
            Error::ContainerNotFound("abc".to_string()),
            FailureKind::NotFound,
        ),
        (
            Error::NoMatchingImage("web".to_string()),
            FailureKind::NotFound,
        ),
        (
            Error::DaemonUnavailable("refused".to_string()),
            FailureKind::RuntimeError,
        ),
        (Error::Daemon("conflict".to_string()), FailureKind::RuntimeError),
        (
            Error::Config {
                path: PathBuf::from("vm.json"),
                reason: "bad".to_string(),
            },
            FailureKind::ConfigError,
        ),
    ];

    for (err, kind) in cases {
        assert_eq!(err.kind(), kind, "{:?}", err);
    }
}

#[test]
fn test_failure_kind_names() {
    assert_eq!(FailureKind::ValidationError.to_string(), "ValidationError");
    assert_eq!(FailureKind::ImageNotFound.to_string(), "ImageNotFound");
    assert_eq!(
        serde_json::to_string(&FailureKind::MissingTarget).unwrap(),
        "\"MissingTarget\""
    );
}
