//! # VM Provisioner - QEMU Workflows
//!
//! Turns a [`VmCreationRequest`] into hypervisor and disk-tool invocations
//! and runs them through a [`ProcessRunner`].
//!
//! ## Workflows
//!
//! ```text
//!  ExistingImage                      NewImage
//!  ─────────────                      ────────
//!  image exists?  ── no ──► NotFound  validate cpu/memory/disk
//!  image extension ok?                save path chosen? ── no ──► MissingTarget
//!  validate cpu/memory                ISO (if chosen) exists?
//!        │                            qemu-img create -f qcow2 <save> <disk>M
//!        ▼                            ISO chosen? ── no ──► MissingTarget
//!  qemu -m -smp -hda <image>                │        (image is kept)
//!       -boot c                             ▼
//!                                     qemu -m -smp -hda <save>
//!                                          -cdrom <iso> -boot d
//! ```
//!
//! All checks that need no external process run before the first launch,
//! so a rejected request has no side effects. The one exception is the
//! missing ISO: the disk image is created first and left on disk when the
//! workflow stops. No cleanup of created images is attempted.
//!
//! Both workflows block until the hypervisor exits.

use crate::config::ConsoleConfig;
use crate::constants::{DISK_IMAGE_EXTENSIONS, DISK_IMAGE_NAME_PREFIX, INSTALLER_EXTENSIONS};
use crate::error::{Error, Result, Target};
use crate::process::{Invocation, ProcessRunner, run_checked};
use crate::resources::{ConfigDocument, ResourceSpec, VmCreationRequest};
use crate::validate::{require_existing_file, require_extension, validate_resources};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

// =============================================================================
// Plans
// =============================================================================

/// Boot device selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootDevice {
    /// Primary hard disk.
    Disk,
    /// Removable installer media.
    Cdrom,
}

impl BootDevice {
    /// QEMU `-boot` letter.
    pub fn as_qemu(&self) -> &'static str {
        match self {
            Self::Disk => "c",
            Self::Cdrom => "d",
        }
    }
}

/// Everything the hypervisor needs to boot one VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub memory_mb: u64,
    pub cpu_count: u64,
    pub primary_disk: PathBuf,
    pub installer: Option<PathBuf>,
    pub boot: BootDevice,
}

impl LaunchPlan {
    /// Boots an existing disk.
    pub fn from_disk(spec: &ResourceSpec, disk: &Path) -> Self {
        Self {
            memory_mb: spec.memory_mb,
            cpu_count: spec.cpu_count,
            primary_disk: disk.to_path_buf(),
            installer: None,
            boot: BootDevice::Disk,
        }
    }

    /// Boots installer media with `disk` attached as the install target.
    pub fn from_installer(spec: &ResourceSpec, disk: &Path, iso: &Path) -> Self {
        Self {
            memory_mb: spec.memory_mb,
            cpu_count: spec.cpu_count,
            primary_disk: disk.to_path_buf(),
            installer: Some(iso.to_path_buf()),
            boot: BootDevice::Cdrom,
        }
    }

    /// Renders the QEMU command line.
    pub fn to_invocation(&self, hypervisor: &Path) -> Invocation {
        let mut inv = Invocation::new(hypervisor)
            .arg("-m")
            .arg(format!("{}M", self.memory_mb))
            .arg("-smp")
            .arg(format!("cpus={}", self.cpu_count))
            .arg("-hda")
            .path_arg(&self.primary_disk);
        if let Some(iso) = &self.installer {
            inv = inv.arg("-cdrom").path_arg(iso);
        }
        inv.arg("-boot").arg(self.boot.as_qemu())
    }
}

/// A disk image to allocate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskImagePlan {
    pub path: PathBuf,
    pub format: String,
    pub size_mb: u64,
}

impl DiskImagePlan {
    /// Renders the `qemu-img create` command line.
    pub fn to_invocation(&self, disk_tool: &Path) -> Invocation {
        Invocation::new(disk_tool)
            .arg("create")
            .arg("-f")
            .arg(self.format.clone())
            .path_arg(&self.path)
            .arg(format!("{}M", self.size_mb))
    }
}

// =============================================================================
// Save Path Resolution
// =============================================================================

/// Default name for a new disk image, e.g. `disk_image_20240131_094500.qcow2`.
pub fn default_image_name(format: &str, now: DateTime<Local>) -> String {
    format!(
        "{}{}.{}",
        DISK_IMAGE_NAME_PREFIX,
        now.format("%Y%m%d_%H%M%S"),
        format
    )
}

/// Resolves where a new disk image is written.
///
/// A directory gets a generated file name inside it; a file name without an
/// extension gets `.<format>` appended. Anything else is used as given.
pub fn resolve_save_path(path: &Path, format: &str, now: DateTime<Local>) -> PathBuf {
    if path.is_dir() {
        return path.join(default_image_name(format, now));
    }
    if path.extension().is_none() {
        return path.with_extension(format);
    }
    path.to_path_buf()
}

// =============================================================================
// Provisioner
// =============================================================================

/// What a successful workflow produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmOutcome {
    /// Disk the VM booted with.
    pub disk_image: PathBuf,
    /// True if the workflow allocated `disk_image`.
    pub created_image: bool,
}

/// Runs the VM creation workflows.
pub struct VmProvisioner {
    runner: Arc<dyn ProcessRunner>,
    hypervisor: PathBuf,
    disk_tool: PathBuf,
    disk_format: String,
}

impl VmProvisioner {
    /// Creates a provisioner using the configured tool paths.
    pub fn new(runner: Arc<dyn ProcessRunner>, config: &ConsoleConfig) -> Self {
        Self {
            runner,
            hypervisor: config.hypervisor.clone(),
            disk_tool: config.disk_tool.clone(),
            disk_format: config.disk_format.clone(),
        }
    }

    /// Runs the workflow selected by `request`.
    pub fn provision(&self, request: &VmCreationRequest) -> Result<VmOutcome> {
        info!("Starting {} VM workflow", request.workflow());
        match request {
            VmCreationRequest::ExistingImage {
                image_path,
                resources,
            } => self.attach_existing(image_path, resources),
            VmCreationRequest::NewImage {
                save_path,
                iso_path,
                resources,
            } => self.create_new(save_path.as_deref(), iso_path.as_deref(), resources),
        }
    }

    /// Boots an existing disk image.
    pub fn attach_existing(&self, image_path: &Path, resources: &ConfigDocument) -> Result<VmOutcome> {
        if let Err(e) = require_existing_file(image_path) {
            warn!("Image file does not exist: {}", image_path.display());
            return Err(e);
        }
        require_extension(image_path, DISK_IMAGE_EXTENSIONS)?;

        let spec = validate_resources(resources, false)?;
        debug!(cpu = spec.cpu_count, memory_mb = spec.memory_mb, image = %image_path.display(), "attach parameters");

        let plan = LaunchPlan::from_disk(&spec, image_path);
        self.launch(&plan)?;

        Ok(VmOutcome {
            disk_image: image_path.to_path_buf(),
            created_image: false,
        })
    }

    /// Allocates a new disk image and boots an installer against it.
    pub fn create_new(
        &self,
        save_path: Option<&Path>,
        iso_path: Option<&Path>,
        resources: &ConfigDocument,
    ) -> Result<VmOutcome> {
        let spec = validate_resources(resources, true)?;
        let disk_mb = spec.disk_mb.unwrap_or_default();
        debug!(cpu = spec.cpu_count, memory_mb = spec.memory_mb, disk_mb, "create parameters");

        let save_path = match save_path.filter(|p| !p.as_os_str().is_empty()) {
            Some(p) => resolve_save_path(p, &self.disk_format, Local::now()),
            None => {
                warn!("No save location selected for disk image");
                return Err(Error::MissingTarget(Target::SaveLocation));
            }
        };
        require_extension(&save_path, DISK_IMAGE_EXTENSIONS)?;

        let iso_path = iso_path.filter(|p| !p.as_os_str().is_empty());
        if let Some(iso) = iso_path {
            require_existing_file(iso)?;
            require_extension(iso, INSTALLER_EXTENSIONS)?;
        }

        let disk = DiskImagePlan {
            path: save_path.clone(),
            format: self.disk_format.clone(),
            size_mb: disk_mb,
        };
        info!("Creating disk image at {} with size {}MB", disk.path.display(), disk.size_mb);
        let inv = disk.to_invocation(&self.disk_tool);
        debug!("Running disk tool: {}", inv);
        run_checked(self.runner.as_ref(), &inv)?;

        let Some(iso) = iso_path else {
            warn!(
                "No installer ISO selected; disk image {} left in place",
                save_path.display()
            );
            return Err(Error::MissingTarget(Target::InstallerMedia));
        };

        let plan = LaunchPlan::from_installer(&spec, &save_path, iso);
        self.launch(&plan)?;

        Ok(VmOutcome {
            disk_image: save_path,
            created_image: true,
        })
    }

    fn launch(&self, plan: &LaunchPlan) -> Result<()> {
        let inv = plan.to_invocation(&self.hypervisor);
        info!("Running QEMU command: {}", inv);
        run_checked(self.runner.as_ref(), &inv)?;
        info!("Hypervisor exited for {}", plan.primary_disk.display());
        Ok(())
    }
}
