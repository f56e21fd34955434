//! # Orchestration Facade
//!
//! [`Console`] is the single entry point for front ends. Every operation:
//!
//! 1. records a start time,
//! 2. runs validation and the backend call,
//! 3. on success renders a message (with elapsed time for timed
//!    operations) and optional structured payload,
//! 4. on failure renders the error and its [`FailureKind`].
//!
//! Operations never return `Err`; the outcome is always an
//! [`OperationResult`]. They run to completion on the caller's thread, one
//! at a time, with the injected [`LogSink`] as the active dispatcher.
//!
//! ## Timed Operations
//!
//! | Operation               | Timed |
//! |-------------------------|-------|
//! | `create_vm`             | yes   |
//! | `create_vm_from_config` | yes   |
//! | `write_dockerfile`      | yes   |
//! | everything else         | no    |

use crate::config::ConsoleConfig;
use crate::container::{
    ContainerClient, ContainerDaemon, ContainerHandle, ContainerImageRef, write_dockerfile,
};
use crate::error::{Error, FailureKind, Result};
use crate::logging::LogSink;
use crate::process::ProcessRunner;
use crate::registry::RegistrySearch;
use crate::resources::{ConfigDocument, VmCreationRequest};
use crate::vm::{VmOutcome, VmProvisioner};
use serde::{Serialize, Serializer};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

// =============================================================================
// Result Record
// =============================================================================

/// Structured data returned alongside a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "items", rename_all = "snake_case")]
pub enum Payload {
    Images(Vec<ContainerImageRef>),
    Containers(Vec<ContainerHandle>),
    Image(ContainerImageRef),
    Container(ContainerHandle),
}

/// Outcome of one console operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    pub succeeded: bool,
    pub message: String,
    /// Elapsed time, present only for timed operations that succeeded.
    #[serde(
        rename = "duration_seconds",
        serialize_with = "serialize_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<Duration>,
    /// Failure category, present only on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl OperationResult {
    fn success(message: String, duration: Option<Duration>, payload: Option<Payload>) -> Self {
        Self {
            succeeded: true,
            message,
            duration,
            reason: None,
            payload,
        }
    }

    fn failure(action: &str, err: &Error) -> Self {
        Self {
            succeeded: false,
            message: format!("Failed to {}: {}", action, err),
            duration: None,
            reason: Some(err.kind()),
            payload: None,
        }
    }

    /// Elapsed seconds, if timed.
    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration.map(|d| d.as_secs_f64())
    }
}

fn serialize_secs<S>(duration: &Option<Duration>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match duration {
        Some(d) => serializer.serialize_f64(d.as_secs_f64()),
        None => serializer.serialize_none(),
    }
}

/// Whether an operation reports elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timing {
    Timed,
    Untimed,
}

// =============================================================================
// Console
// =============================================================================

/// Provisioning console facade.
pub struct Console {
    vm: VmProvisioner,
    registry: RegistrySearch,
    containers: Option<ContainerClient>,
    log: LogSink,
}

impl Console {
    /// Creates a console without a container daemon.
    ///
    /// Container operations fail until [`Console::with_container_daemon`]
    /// supplies one.
    pub fn new(config: &ConsoleConfig, runner: Arc<dyn ProcessRunner>, log: LogSink) -> Self {
        Self {
            vm: VmProvisioner::new(Arc::clone(&runner), config),
            registry: RegistrySearch::new(runner, config),
            containers: None,
            log,
        }
    }

    /// Attaches the long-lived daemon connection.
    pub fn with_container_daemon(mut self, daemon: Arc<dyn ContainerDaemon>) -> Self {
        self.containers = Some(ContainerClient::new(daemon));
        self
    }

    /// Flushes and closes the log sink.
    pub fn shutdown(self) -> Result<()> {
        self.log.close()
    }

    // -------------------------------------------------------------------------
    // VM
    // -------------------------------------------------------------------------

    /// Creates a VM with the workflow chosen in `request`. Timed.
    pub fn create_vm(&self, request: &VmCreationRequest) -> OperationResult {
        self.execute("create VM", Timing::Timed, || self.vm.provision(request), vm_message)
    }

    /// Like [`Console::create_vm`], with empty resource values taken from
    /// the JSON document at `config_path`. Timed.
    ///
    /// The document is read as part of the operation, so an unreadable or
    /// malformed file is reported as a `ConfigError` result.
    pub fn create_vm_from_config(
        &self,
        request: &VmCreationRequest,
        config_path: &Path,
    ) -> OperationResult {
        self.execute(
            "create VM",
            Timing::Timed,
            || {
                let base = ConfigDocument::load(config_path)?;
                self.vm
                    .provision(&request.clone().with_resource_defaults(base))
            },
            vm_message,
        )
    }

    // -------------------------------------------------------------------------
    // Images
    // -------------------------------------------------------------------------

    /// Writes a Dockerfile into `dir`. Timed.
    pub fn write_dockerfile(&self, dir: &Path, content: &str) -> OperationResult {
        self.execute(
            "create Dockerfile",
            Timing::Timed,
            || write_dockerfile(dir, content),
            |path, elapsed| {
                let message = format!(
                    "Dockerfile created at {} in {:.2} seconds.",
                    path.display(),
                    secs(elapsed)
                );
                (message, None)
            },
        )
    }

    /// Builds `dir` as `name:tag`.
    pub fn build_image(&self, dir: &Path, name: &str, tag: &str) -> OperationResult {
        self.execute(
            "build image",
            Timing::Untimed,
            || self.containers()?.build_image(dir, name, tag),
            |image, _| {
                (
                    format!("Docker image {} built successfully.", image),
                    Some(Payload::Image(image.clone())),
                )
            },
        )
    }

    /// Lists tagged local images, one image per line with its tags joined
    /// by `, `.
    pub fn list_images(&self) -> OperationResult {
        self.execute(
            "list images",
            Timing::Untimed,
            || self.containers()?.list_image_tags(),
            |groups, _| {
                let message = if groups.is_empty() {
                    "No images found.".to_string()
                } else {
                    groups
                        .iter()
                        .map(|tags| {
                            tags.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                };
                let images = groups.iter().flatten().cloned().collect();
                (message, Some(Payload::Images(images)))
            },
        )
    }

    /// Finds the first local image matching `term`.
    pub fn search_local_images(&self, term: &str) -> OperationResult {
        self.execute(
            "search images",
            Timing::Untimed,
            || self.containers()?.search_local_images(term),
            |image, _| {
                (format!("Image: {}", image), Some(Payload::Image(image.clone())))
            },
        )
    }

    /// Searches the public registry.
    pub fn search_registry(&self, term: &str) -> OperationResult {
        self.execute(
            "search registry",
            Timing::Untimed,
            || self.registry.search(term),
            |text, _| {
                let message = if text.trim().is_empty() {
                    "No results found.".to_string()
                } else {
                    text.clone()
                };
                (message, None)
            },
        )
    }

    /// Pulls an image from its registry.
    pub fn pull_image(&self, reference: &str) -> OperationResult {
        self.execute(
            "download image",
            Timing::Untimed,
            || self.containers()?.pull_image(reference),
            |image, _| {
                (
                    format!("Image {} downloaded successfully.", image),
                    Some(Payload::Image(image.clone())),
                )
            },
        )
    }

    // -------------------------------------------------------------------------
    // Containers
    // -------------------------------------------------------------------------

    /// Lists running containers.
    pub fn list_containers(&self) -> OperationResult {
        self.execute(
            "list running containers",
            Timing::Untimed,
            || self.containers()?.list_containers(),
            |containers, _| {
                let message = if containers.is_empty() {
                    "No containers running.".to_string()
                } else {
                    containers.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
                };
                (message, Some(Payload::Containers(containers.clone())))
            },
        )
    }

    /// Stops the running container `id`.
    pub fn stop_container(&self, id: &str) -> OperationResult {
        self.execute(
            "stop container",
            Timing::Untimed,
            || self.containers()?.stop_container(id),
            |handle, _| {
                (
                    format!("Container {} stopped successfully.", handle.name),
                    Some(Payload::Container(handle.clone())),
                )
            },
        )
    }

    /// Starts a detached container from a local image.
    pub fn run_container(&self, reference: &str, name: &str) -> OperationResult {
        self.execute(
            "run container",
            Timing::Untimed,
            || self.containers()?.run_container(reference, name),
            |handle, _| {
                (
                    format!("Container {} is running.", handle.name),
                    Some(Payload::Container(handle.clone())),
                )
            },
        )
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn containers(&self) -> Result<&ContainerClient> {
        self.containers
            .as_ref()
            .ok_or_else(|| Error::DaemonUnavailable("not connected".to_string()))
    }

    fn execute<T, Op, Render>(
        &self,
        action: &str,
        timing: Timing,
        op: Op,
        render: Render,
    ) -> OperationResult
    where
        Op: FnOnce() -> Result<T>,
        Render: FnOnce(&T, Duration) -> (String, Option<Payload>),
    {
        self.log.scope(|| {
            info!("Operation started: {}", action);
            let started = Instant::now();
            match op() {
                Ok(value) => {
                    let elapsed = started.elapsed();
                    let (message, payload) = render(&value, elapsed);
                    let duration = (timing == Timing::Timed).then_some(elapsed);
                    info!("Operation completed: {} ({:.2}s)", action, elapsed.as_secs_f64());
                    OperationResult::success(message, duration, payload)
                }
                Err(err) => {
                    error!("Failed to {}: {}", action, err);
                    OperationResult::failure(action, &err)
                }
            }
        })
    }
}

fn vm_message(outcome: &VmOutcome, elapsed: Duration) -> (String, Option<Payload>) {
    let what = if outcome.created_image { "VM" } else { "Existing image VM" };
    (
        format!("{} created successfully in {:.2} seconds.", what, secs(elapsed)),
        None,
    )
}

fn secs(d: Duration) -> f64 {
    d.as_secs_f64()
}
