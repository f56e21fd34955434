//! # cloudmgr
//!
//! **Local Operator Console for VM and Container Provisioning**
//!
//! This crate is the orchestration core behind a single-operator console:
//! it validates resource requests, drives QEMU through the two VM creation
//! workflows, and manages Docker images and containers. Front ends (the
//! bundled CLI, or any UI) call [`Console`] and render the
//! [`OperationResult`] it returns.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Console (facade)                            │
//! │   timing │ failure categorisation │ log sink dispatch               │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌────────────────┐  ┌──────────────────┐  ┌────────────────────┐   │
//! │  │  VmProvisioner │  │  ContainerClient │  │   RegistrySearch   │   │
//! │  │ attach/create  │  │ build/list/stop  │  │  `docker search`   │   │
//! │  │                │  │ pull/run/search  │  │                    │   │
//! │  └───────┬────────┘  └────────┬─────────┘  └─────────┬──────────┘   │
//! │          │    validate        │                      │              │
//! │          ▼                    ▼                      ▼              │
//! │  ┌────────────────┐  ┌──────────────────┐  ┌────────────────────┐   │
//! │  │ ProcessRunner  │  │ ContainerDaemon  │  │   ProcessRunner    │   │
//! │  │ qemu, qemu-img │  │ DockerDaemon     │  │                    │   │
//! │  └────────────────┘  └──────────────────┘  └────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Execution Model
//!
//! Everything is synchronous. An operation runs to completion on the
//! caller's thread before the next one starts; hypervisor launches block
//! until QEMU exits. There are no timeouts, retries or cancellation.
//!
//! # Error Taxonomy
//!
//! | Kind               | Raised when                                     |
//! |--------------------|-------------------------------------------------|
//! | `ValidationError`  | CPU/memory/disk not a positive integer, bad     |
//! |                    | extension, malformed image reference            |
//! | `ResourceNotFound` | image, ISO or directory missing                 |
//! | `MissingTarget`    | save path or ISO not chosen                     |
//! | `BuildError`       | image build reported failure                    |
//! | `CommandError`     | external tool exited non-zero or failed to run  |
//! | `ImageNotFound`    | image not local (run) or unknown (pull)         |
//! | `NotFound`         | container gone, no matching local image         |
//! | `RuntimeError`     | any other daemon fault                          |
//!
//! # Example
//!
//! ```rust,ignore
//! use cloudmgr::{Console, ConsoleConfig, ConfigDocument, LogSink, SystemRunner, VmCreationRequest};
//! use std::sync::Arc;
//!
//! let config = ConsoleConfig::load(None)?;
//! let log = LogSink::open(&config.log_file, false)?;
//! let console = Console::new(&config, Arc::new(SystemRunner), log);
//!
//! let result = console.create_vm(&VmCreationRequest::ExistingImage {
//!     image_path: "/vms/debian.qcow2".into(),
//!     resources: ConfigDocument::new("2", "2048", ""),
//! });
//! println!("{}", result.message);
//! console.shutdown()?;
//! ```

pub mod config;
pub mod console;
pub mod constants;
pub mod container;
pub mod docker;
pub mod error;
pub mod logging;
pub mod process;
pub mod registry;
pub mod resources;
pub mod validate;
pub mod vm;

// Re-exports
pub use config::ConsoleConfig;
pub use console::{Console, OperationResult, Payload};
pub use container::{
    ContainerClient, ContainerDaemon, ContainerHandle, ContainerImageRef, LocalImage,
    write_dockerfile,
};
pub use docker::DockerDaemon;
pub use error::{CountProblem, Error, FailureKind, Result, Target};
pub use logging::LogSink;
pub use process::{Invocation, ProcessOutput, ProcessRunner, SystemRunner};
pub use registry::RegistrySearch;
pub use resources::{ConfigDocument, ResourceField, ResourceSpec, VmCreationRequest};
pub use validate::validate_count;
pub use vm::{BootDevice, LaunchPlan, VmOutcome, VmProvisioner};
