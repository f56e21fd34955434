//! Tests for the console facade: result records, timing and categories.

mod common;

use cloudmgr::{
    ConfigDocument, Console, ConsoleConfig, FailureKind, LogSink, Payload, VmCreationRequest,
};
use common::{FakeDaemon, FakeRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn console(daemon: Option<FakeDaemon>) -> (Arc<FakeRunner>, Console) {
    let runner = Arc::new(FakeRunner::new());
    let mut console = Console::new(&ConsoleConfig::default(), runner.clone(), LogSink::disabled());
    if let Some(daemon) = daemon {
        console = console.with_container_daemon(Arc::new(daemon));
    }
    (runner, console)
}

fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"").unwrap();
    path
}

// =============================================================================
// VM Operation Tests
// =============================================================================

#[test]
fn test_create_vm_success_is_timed() {
    let dir = TempDir::new().unwrap();
    let iso = touch(dir.path(), "debian.iso");
    let (runner, console) = console(None);

    let result = console.create_vm(&VmCreationRequest::NewImage {
        save_path: Some(dir.path().join("vm.qcow2")),
        iso_path: Some(iso),
        resources: ConfigDocument::new("2", "1024", "10240"),
    });

    assert!(result.succeeded, "{}", result.message);
    assert!(result.duration_seconds().unwrap() >= 0.0);
    assert!(result.message.starts_with("VM created successfully in "));
    assert!(result.message.ends_with(" seconds."));
    assert_eq!(result.reason, None);
    assert_eq!(runner.calls().len(), 2);
}

#[test]
fn test_attach_vm_message() {
    let dir = TempDir::new().unwrap();
    let image = touch(dir.path(), "debian.qcow2");
    let (_, console) = console(None);

    let result = console.create_vm(&VmCreationRequest::ExistingImage {
        image_path: image,
        resources: ConfigDocument::new("1", "512", ""),
    });

    assert!(result.succeeded);
    assert!(result.message.starts_with("Existing image VM created successfully"));
}

#[test]
fn test_create_vm_zero_cpu() {
    let dir = TempDir::new().unwrap();
    let iso = touch(dir.path(), "debian.iso");
    let (runner, console) = console(None);

    let result = console.create_vm(&VmCreationRequest::NewImage {
        save_path: Some(dir.path().join("vm.qcow2")),
        iso_path: Some(iso),
        resources: ConfigDocument::new("0", "1024", "10240"),
    });

    assert!(!result.succeeded);
    assert_eq!(result.reason, Some(FailureKind::ValidationError));
    assert!(result.message.starts_with("Failed to create VM: "));
    assert!(result.message.contains("CPU count"), "{}", result.message);
    assert_eq!(result.duration, None);
    assert!(runner.calls().is_empty());
}

#[test]
fn test_create_vm_missing_iso() {
    let dir = TempDir::new().unwrap();
    let (runner, console) = console(None);

    let result = console.create_vm(&VmCreationRequest::NewImage {
        save_path: Some(dir.path().join("vm.qcow2")),
        iso_path: None,
        resources: ConfigDocument::new("2", "1024", "10240"),
    });

    assert_eq!(result.reason, Some(FailureKind::MissingTarget));
    assert!(result.message.contains("installer ISO not selected"));
    assert_eq!(runner.calls_to("qemu-img").len(), 1);
}

#[test]
fn test_create_vm_from_unparsable_config() {
    let dir = TempDir::new().unwrap();
    let image = touch(dir.path(), "debian.qcow2");
    let config = dir.path().join("vm.json");
    std::fs::write(&config, "{ cpu: two").unwrap();
    let (runner, console) = console(None);

    let result = console.create_vm_from_config(
        &VmCreationRequest::ExistingImage {
            image_path: image,
            resources: ConfigDocument::new("2", "1024", ""),
        },
        &config,
    );

    assert!(!result.succeeded);
    assert_eq!(result.reason, Some(FailureKind::ConfigError));
    assert!(result.message.starts_with("Failed to create VM: "), "{}", result.message);
    assert_eq!(result.duration, None);
    assert!(runner.calls().is_empty());
}

#[test]
fn test_create_vm_from_missing_config() {
    let dir = TempDir::new().unwrap();
    let image = touch(dir.path(), "debian.qcow2");
    let (_, console) = console(None);

    let result = console.create_vm_from_config(
        &VmCreationRequest::ExistingImage {
            image_path: image,
            resources: ConfigDocument::default(),
        },
        &dir.path().join("absent.json"),
    );

    assert_eq!(result.reason, Some(FailureKind::ConfigError));
}

#[test]
fn test_create_vm_from_config_fills_empty_values() {
    let dir = TempDir::new().unwrap();
    let iso = touch(dir.path(), "debian.iso");
    let config = dir.path().join("vm.json");
    std::fs::write(&config, r#"{"cpu": 2, "memory": "1024", "disk_size": 20480}"#).unwrap();
    let (runner, console) = console(None);

    let result = console.create_vm_from_config(
        &VmCreationRequest::NewImage {
            save_path: Some(dir.path().join("vm.qcow2")),
            iso_path: Some(iso),
            resources: ConfigDocument::new("4", "", ""),
        },
        &config,
    );

    assert!(result.succeeded, "{}", result.message);
    assert!(result.message.starts_with("VM created successfully in "));
    assert!(result.duration.is_some());
    let calls = runner.calls();
    assert!(calls[0].args.contains(&"20480M".to_string()), "{:?}", calls[0]);
    assert!(calls[1].args.contains(&"cpus=4".to_string()), "{:?}", calls[1]);
    assert!(calls[1].args.contains(&"1024M".to_string()), "{:?}", calls[1]);
}

// =============================================================================
// Dockerfile and Registry Tests
// =============================================================================

#[test]
fn test_write_dockerfile_is_timed() {
    let dir = TempDir::new().unwrap();
    let (_, console) = console(None);

    let result = console.write_dockerfile(dir.path(), "FROM alpine\n");
    assert!(result.succeeded);
    assert!(result.duration.is_some());
    assert!(result.message.starts_with("Dockerfile created at "));
}

#[test]
fn test_search_registry_without_daemon() {
    let (runner, console) = console(None);
    runner.respond("docker", "NAME  STARS\nredis 12000\n");

    let result = console.search_registry("redis");
    assert!(result.succeeded);
    assert_eq!(result.message, "NAME  STARS\nredis 12000\n");
    assert_eq!(result.duration, None);
}

#[test]
fn test_search_registry_empty_output() {
    let (_, console) = console(None);

    let result = console.search_registry("zzzz-nothing");
    assert!(result.succeeded);
    assert_eq!(result.message, "No results found.");
}

#[test]
fn test_search_registry_command_error() {
    let (runner, console) = console(None);
    runner.fail("docker", 1, "Cannot connect to the Docker daemon");

    let result = console.search_registry("redis");
    assert_eq!(result.reason, Some(FailureKind::CommandError));
    assert!(result.message.starts_with("Failed to search registry: "));
}

// =============================================================================
// Container Operation Tests
// =============================================================================

#[test]
fn test_container_ops_need_daemon() {
    let (_, console) = console(None);

    for result in [
        console.list_images(),
        console.list_containers(),
        console.pull_image("nginx"),
        console.stop_container("abc"),
    ] {
        assert!(!result.succeeded);
        assert_eq!(result.reason, Some(FailureKind::RuntimeError));
    }
}

#[test]
fn test_run_missing_image() {
    let (_, console) = console(Some(FakeDaemon::new()));

    let result = console.run_container("missing-image", "");
    assert!(!result.succeeded);
    assert_eq!(result.reason, Some(FailureKind::ImageNotFound));
    assert!(result.message.starts_with("Failed to run container: "));
}

#[test]
fn test_run_container_payload() {
    let (_, console) = console(Some(
        FakeDaemon::new().with_image("sha256:a", &["nginx:latest"]),
    ));

    let result = console.run_container("nginx", "web");
    assert!(result.succeeded);
    assert_eq!(result.message, "Container web is running.");
    assert_eq!(result.duration, None);
    match result.payload {
        Some(Payload::Container(handle)) => assert_eq!(handle.name, "web"),
        other => panic!("expected container payload, got {:?}", other),
    }
}

#[test]
fn test_list_empty_messages() {
    let (_, console) = console(Some(FakeDaemon::new()));

    assert_eq!(console.list_images().message, "No images found.");
    assert_eq!(console.list_containers().message, "No containers running.");
}

#[test]
fn test_list_images_message() {
    let (_, console) = console(Some(
        FakeDaemon::new()
            .with_image("sha256:a", &["nginx:latest"])
            .with_image("sha256:b", &["<none>:<none>"]),
    ));

    let result = console.list_images();
    assert_eq!(result.message, "nginx:latest");
    assert!(matches!(result.payload, Some(Payload::Images(ref v)) if v.len() == 1));
}

#[test]
fn test_list_images_groups_tags_per_image() {
    let (_, console) = console(Some(
        FakeDaemon::new()
            .with_image("sha256:a", &["nginx:latest", "nginx:1.25"])
            .with_image("sha256:b", &["redis:7"]),
    ));

    let result = console.list_images();
    assert_eq!(result.message, "nginx:latest, nginx:1.25\nredis:7");
    assert!(matches!(result.payload, Some(Payload::Images(ref v)) if v.len() == 3));
}

#[test]
fn test_stop_vanished_container() {
    let daemon = FakeDaemon::new().with_running("0123456789abcdef", "web");
    daemon.exit_container("0123456789abcdef");
    let (_, console) = console(Some(daemon));

    let result = console.stop_container("0123456789abcdef");
    assert_eq!(result.reason, Some(FailureKind::NotFound));
}

#[test]
fn test_build_and_search() {
    let dir = TempDir::new().unwrap();
    let (_, console) = console(Some(FakeDaemon::new()));

    let built = console.build_image(dir.path(), "myapp", "1.0");
    assert_eq!(built.message, "Docker image myapp:1.0 built successfully.");

    let found = console.search_local_images("MYAPP");
    assert_eq!(found.message, "Image: myapp:1.0");
}

#[test]
fn test_pull_message() {
    let (_, console) = console(Some(FakeDaemon::new().with_remote("redis:7")));

    let result = console.pull_image("redis:7");
    assert_eq!(result.message, "Image redis:7 downloaded successfully.");

    let missing = console.pull_image("redis:99");
    assert_eq!(missing.reason, Some(FailureKind::ImageNotFound));
}

#[test]
fn test_pull_by_digest() {
    let reference = format!("alpine@sha256:{}", "a".repeat(64));
    let (_, console) = console(Some(FakeDaemon::new().with_remote(&reference)));

    let result = console.pull_image(&reference);
    assert!(result.succeeded, "{}", result.message);
    assert_eq!(result.message, format!("Image {} downloaded successfully.", reference));
}

// =============================================================================
// Serialization and Logging Tests
// =============================================================================

#[test]
fn test_result_json() {
    let dir = TempDir::new().unwrap();
    let (_, console) = console(None);

    let ok = console.write_dockerfile(dir.path(), "FROM alpine");
    let value = serde_json::to_value(&ok).unwrap();
    assert_eq!(value["succeeded"], true);
    assert!(value["duration_seconds"].is_number());
    assert!(value.get("reason").is_none());

    let failed = console.create_vm(&VmCreationRequest::ExistingImage {
        image_path: dir.path().join("ghost.qcow2"),
        resources: ConfigDocument::new("1", "1", ""),
    });
    let value = serde_json::to_value(&failed).unwrap();
    assert_eq!(value["succeeded"], false);
    assert_eq!(value["reason"], "ResourceNotFound");
    assert!(value.get("duration_seconds").is_none());
}

#[test]
fn test_operations_are_logged_to_file() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("cloudmgr.log");
    let runner = Arc::new(FakeRunner::new());
    let log = LogSink::open(&log_path, false).unwrap();
    let console = Console::new(&ConsoleConfig::default(), runner, log);

    console.create_vm(&VmCreationRequest::NewImage {
        save_path: None,
        iso_path: None,
        resources: ConfigDocument::new("2", "1024", "10240"),
    });
    console.shutdown().unwrap();

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("Operation started: create VM"), "{}", log);
    assert!(log.contains("No save location selected"), "{}", log);
    assert!(log.contains("Failed to create VM"), "{}", log);
}

#[test]
fn test_config_failure_is_logged() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("cloudmgr.log");
    let config = dir.path().join("vm.json");
    std::fs::write(&config, "not json").unwrap();
    let log = LogSink::open(&log_path, false).unwrap();
    let console = Console::new(&ConsoleConfig::default(), Arc::new(FakeRunner::new()), log);

    console.create_vm_from_config(
        &VmCreationRequest::ExistingImage {
            image_path: dir.path().join("debian.qcow2"),
            resources: ConfigDocument::default(),
        },
        &config,
    );
    console.shutdown().unwrap();

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("Operation started: create VM"), "{}", log);
    assert!(log.contains("Failed to create VM"), "{}", log);
    assert!(log.contains("vm.json"), "{}", log);
}
