//! # Docker Daemon Backend
//!
//! Implements [`ContainerDaemon`] on the Docker Engine API via `bollard`.
//!
//! ## Blocking Bridge
//!
//! The console is synchronous; `bollard` is async. [`DockerDaemon`] owns a
//! private current-thread tokio runtime and blocks on each request, so the
//! caller's thread does all the work and no background tasks outlive a
//! call.
//!
//! ## Connection
//!
//! [`DockerDaemon::connect`] opens the connection and pings the daemon
//! once. A failure there is fatal for the command; it is not retried.
//!
//! ## Error Mapping
//!
//! | Daemon response                    | Console error            |
//! |------------------------------------|--------------------------|
//! | build stream reports `error`       | `Error::BuildFailed`     |
//! | 404 on pull or container create    | `Error::ImageNotFound`   |
//! | 404 on inspect                     | `Ok(None)`               |
//! | anything else                      | `Error::Daemon`          |

use crate::config::ConsoleConfig;
use crate::constants::DAEMON_TIMEOUT_SECS;
use crate::container::{ContainerDaemon, ContainerHandle, ContainerImageRef, LocalImage};
use crate::error::{Error, Result};
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::{BuildImageOptions, CreateImageOptions, ListImagesOptions};
use futures_util::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Connection to a Docker daemon.
pub struct DockerDaemon {
    docker: Docker,
    runtime: Runtime,
    stop_timeout: Duration,
}

impl DockerDaemon {
    /// Connects to the configured daemon and verifies it responds.
    pub fn connect(config: &ConsoleConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::DaemonUnavailable(format!("failed to start runtime: {}", e)))?;

        let docker = {
            let _guard = runtime.enter();
            match config.docker_host.as_deref() {
                Some(host) => Self::connect_host(host)?,
                None => Docker::connect_with_local_defaults()
                    .map_err(|e| Error::DaemonUnavailable(e.to_string()))?,
            }
        };

        runtime
            .block_on(docker.ping())
            .map_err(|e| Error::DaemonUnavailable(format!("ping failed: {}", e)))?;
        info!("Docker connection verified - daemon is reachable");

        Ok(Self {
            docker,
            runtime,
            stop_timeout: config.stop_timeout(),
        })
    }

    fn connect_host(host: &str) -> Result<Docker> {
        let result = if let Some(path) = host.strip_prefix("unix://") {
            Docker::connect_with_unix(path, DAEMON_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
        } else if host.starts_with("tcp://") || host.starts_with("http://") {
            Docker::connect_with_http(host, DAEMON_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
        } else {
            return Err(Error::DaemonUnavailable(format!(
                "unsupported docker host '{}'",
                host
            )));
        };
        info!("Connecting to Docker daemon at: {}", host);
        result.map_err(|e| Error::DaemonUnavailable(format!("{}: {}", host, e)))
    }
}

impl ContainerDaemon for DockerDaemon {
    fn build_image(&self, context_dir: &Path, image: &ContainerImageRef) -> Result<()> {
        let archive = pack_context(context_dir)?;
        let options = BuildImageOptions {
            t: image.to_string(),
            rm: true,
            ..Default::default()
        };

        self.runtime.block_on(async {
            let stream = self.docker.build_image(options, None, Some(archive.into()));
            let mut stream = std::pin::pin!(stream);
            while let Some(item) = stream.next().await {
                match item {
                    Ok(info) => {
                        if let Some(reason) = info.error {
                            return Err(Error::BuildFailed {
                                image: image.to_string(),
                                reason,
                            });
                        }
                        if let Some(line) = info.stream {
                            let line = line.trim_end();
                            if !line.is_empty() {
                                debug!("build: {}", line);
                            }
                        }
                    }
                    Err(BollardError::DockerStreamError { error }) => {
                        return Err(Error::BuildFailed {
                            image: image.to_string(),
                            reason: error,
                        });
                    }
                    Err(e) => return Err(daemon_error(e)),
                }
            }
            Ok(())
        })
    }

    fn list_images(&self) -> Result<Vec<LocalImage>> {
        let options = ListImagesOptions::<String> {
            all: false,
            ..Default::default()
        };
        let images = self
            .runtime
            .block_on(self.docker.list_images(Some(options)))
            .map_err(daemon_error)?;

        Ok(images
            .into_iter()
            .map(|summary| LocalImage {
                id: summary.id,
                repo_tags: summary.repo_tags,
            })
            .collect())
    }

    fn list_containers(&self) -> Result<Vec<ContainerHandle>> {
        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };
        let containers = self
            .runtime
            .block_on(self.docker.list_containers(Some(options)))
            .map_err(daemon_error)?;

        Ok(containers
            .into_iter()
            .filter_map(|c| {
                let id = c.id?;
                let name = c
                    .names
                    .and_then(|names| names.into_iter().next())
                    .map(|n| trim_name(&n).to_string())
                    .unwrap_or_default();
                Some(ContainerHandle::new(id, name))
            })
            .collect())
    }

    fn inspect_running(&self, id: &str) -> Result<Option<ContainerHandle>> {
        let response = self
            .runtime
            .block_on(
                self.docker
                    .inspect_container(id, None::<InspectContainerOptions>),
            );

        let container = match response {
            Ok(container) => container,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(daemon_error(e)),
        };

        let running = container
            .state
            .as_ref()
            .and_then(|s| s.running)
            .unwrap_or(false);
        if !running {
            return Ok(None);
        }

        Ok(Some(ContainerHandle::new(
            container.id.unwrap_or_else(|| id.to_string()),
            container
                .name
                .as_deref()
                .map(trim_name)
                .unwrap_or_default(),
        )))
    }

    fn stop_container(&self, id: &str) -> Result<()> {
        self.runtime
            .block_on(self.docker.stop_container(id, Some(stop_options(self.stop_timeout))))
            .map_err(|e| match e {
                e if is_not_found(&e) => Error::ContainerNotFound(id.to_string()),
                e => daemon_error(e),
            })
    }

    fn pull_image(&self, image: &ContainerImageRef) -> Result<()> {
        self.runtime.block_on(async {
            let stream = self.docker.create_image(Some(pull_options(image)), None, None);
            let mut stream = std::pin::pin!(stream);
            while let Some(item) = stream.next().await {
                match item {
                    Ok(progress) => {
                        if let Some(reason) = progress.error {
                            return Err(Error::Daemon(reason));
                        }
                        if let Some(status) = progress.status {
                            debug!("pull {}: {}", image, status);
                        }
                    }
                    Err(e) if is_not_found(&e) => {
                        return Err(Error::ImageNotFound(image.to_string()));
                    }
                    Err(e) => return Err(daemon_error(e)),
                }
            }
            Ok(())
        })
    }

    fn run_container(&self, image: &ContainerImageRef, name: Option<&str>) -> Result<ContainerHandle> {
        let config = Config {
            image: Some(image.to_string()),
            ..Default::default()
        };
        let options = name.map(|n| CreateContainerOptions {
            name: n.to_string(),
            platform: None,
        });

        self.runtime.block_on(async {
            let created = self
                .docker
                .create_container(options, config)
                .await
                .map_err(|e| {
                    if is_not_found(&e) {
                        Error::ImageNotFound(image.to_string())
                    } else {
                        daemon_error(e)
                    }
                })?;

            self.docker
                .start_container(&created.id, None::<StartContainerOptions<String>>)
                .await
                .map_err(daemon_error)?;

            let name = match name {
                Some(n) => n.to_string(),
                None => self
                    .docker
                    .inspect_container(&created.id, None::<InspectContainerOptions>)
                    .await
                    .ok()
                    .and_then(|c| c.name)
                    .map(|n| trim_name(&n).to_string())
                    .unwrap_or_default(),
            };
            Ok(ContainerHandle::new(created.id, name))
        })
    }
}

/// Packs a build context directory into an in-memory tar archive.
fn pack_context(dir: &Path) -> Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);
    builder.append_dir_all(".", dir)?;
    Ok(builder.into_inner()?)
}

/// Seconds the daemon waits before killing a stopping container.
fn stop_options(timeout: Duration) -> StopContainerOptions {
    StopContainerOptions {
        t: i64::try_from(timeout.as_secs()).unwrap_or(i64::MAX),
    }
}

/// The daemon accepts a digest wherever it accepts a tag.
fn pull_options(image: &ContainerImageRef) -> CreateImageOptions<String> {
    CreateImageOptions {
        from_image: image.name.clone(),
        tag: image.digest.clone().unwrap_or_else(|| image.tag.clone()),
        ..Default::default()
    }
}

fn is_not_found(err: &BollardError) -> bool {
    matches!(
        err,
        BollardError::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

fn daemon_error(err: BollardError) -> Error {
    match err {
        BollardError::DockerResponseServerError { message, .. } => Error::Daemon(message),
        other => Error::Daemon(other.to_string()),
    }
}

/// Daemon names carry a leading `/`.
fn trim_name(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}
