//! # Container Runtime Client
//!
//! Typed facade over a container daemon connection.
//!
//! ## Layers
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    ContainerClient                        │
//! │  build │ list images │ list/stop containers │ pull │ run  │
//! │  search local images                                      │
//! │  (tag filtering, fresh handle resolution, matching)       │
//! ├───────────────────────────────────────────────────────────┤
//! │                ContainerDaemon trait                      │
//! │      DockerDaemon (bollard)   │   test fakes              │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! The daemon trait is a thin transport: it reports what the backend says.
//! Policy (which images are shown, when a container counts as gone, how a
//! search matches) lives in [`ContainerClient`] so every backend behaves
//! the same.
//!
//! ## Handles
//!
//! A [`ContainerHandle`] is a snapshot. [`ContainerClient::stop_container`]
//! resolves the id again right before stopping, because the container may
//! have exited while the operator was choosing it.

use crate::constants::{
    DEFAULT_IMAGE_TAG, DOCKERFILE_NAME, IMAGE_REF_VALID_CHARS, MAX_IMAGE_REF_LEN, SHORT_ID_LEN,
    UNTAGGED_MARKER,
};
use crate::error::{Error, Result};
use crate::validate::require_existing_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

// =============================================================================
// Image References
// =============================================================================

/// Image identity as `name[:tag][@digest]`.
///
/// `tag` is empty only for a reference pinned by digest alone
/// (`alpine@sha256:...`). Every other reference carries a tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerImageRef {
    pub name: String,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ContainerImageRef {
    /// Creates a reference from separate parts. An empty tag means `latest`.
    pub fn new(name: &str, tag: &str) -> Result<Self> {
        let tag = if tag.is_empty() { DEFAULT_IMAGE_TAG } else { tag };
        let reference = format!("{}:{}", name, tag);
        validate_reference_text(&reference)?;
        if name.is_empty() {
            return Err(invalid_reference(&reference, "empty image name"));
        }
        if name.contains('@') {
            return Err(invalid_reference(&reference, "name must not contain '@'"));
        }
        if tag.contains(['/', ':', '@']) {
            return Err(invalid_reference(&reference, "tag must not contain '/', ':' or '@'"));
        }
        Ok(Self {
            name: name.to_string(),
            tag: tag.to_string(),
            digest: None,
        })
    }

    /// Parses `name[:tag][@algorithm:hex]`.
    ///
    /// A registry port (`host:5000/app`) is part of the name, not a tag.
    /// Without a digest the tag defaults to `latest`; with one the tag stays
    /// empty unless given.
    pub fn parse(reference: &str) -> Result<Self> {
        validate_reference_text(reference)?;
        let (named, digest) = match reference.split_once('@') {
            Some((named, digest)) => (named, Some(digest)),
            None => (reference, None),
        };

        let tagged = split_tag(named);
        let mut image = match tagged {
            Some((_, "")) => return Err(invalid_reference(reference, "empty tag after ':'")),
            Some((name, tag)) => Self::new(name, tag)?,
            None => Self::new(named, DEFAULT_IMAGE_TAG)?,
        };

        if let Some(digest) = digest {
            validate_digest(reference, digest)?;
            if tagged.is_none() {
                image.tag.clear();
            }
            image.digest = Some(digest.to_string());
        }
        Ok(image)
    }

    /// Converts a tag reported by the daemon. Dangling entries yield `None`.
    pub fn from_repo_tag(repo_tag: &str) -> Option<Self> {
        let (name, tag) = split_tag(repo_tag)?;
        if name.is_empty() || tag.is_empty() || name == UNTAGGED_MARKER || tag == UNTAGGED_MARKER {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            tag: tag.to_string(),
            digest: None,
        })
    }
}

impl std::fmt::Display for ContainerImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if !self.tag.is_empty() {
            write!(f, ":{}", self.tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

/// Splits on the last `:` that comes after the last `/`.
fn split_tag(reference: &str) -> Option<(&str, &str)> {
    let (name, tag) = reference.rsplit_once(':')?;
    if tag.contains('/') {
        return None;
    }
    Some((name, tag))
}

fn validate_reference_text(reference: &str) -> Result<()> {
    if reference.is_empty() {
        return Err(invalid_reference(reference, "empty image reference"));
    }
    if reference.len() > MAX_IMAGE_REF_LEN {
        return Err(Error::InvalidImageReference {
            reference: reference.chars().take(50).collect::<String>() + "...",
            reason: format!("exceeds maximum length of {} bytes", MAX_IMAGE_REF_LEN),
        });
    }
    if let Some(bad) = reference.chars().find(|c| !IMAGE_REF_VALID_CHARS.contains(*c)) {
        return Err(invalid_reference(
            reference,
            &format!("invalid character '{}'", bad),
        ));
    }
    Ok(())
}

/// Digests are `<algorithm>:<encoded>`, both alphanumeric.
fn validate_digest(reference: &str, digest: &str) -> Result<()> {
    let well_formed = digest.split_once(':').is_some_and(|(algorithm, encoded)| {
        !algorithm.is_empty()
            && !encoded.is_empty()
            && algorithm.chars().all(|c| c.is_ascii_alphanumeric())
            && encoded.chars().all(|c| c.is_ascii_alphanumeric())
    });
    if well_formed {
        Ok(())
    } else {
        Err(invalid_reference(reference, "digest must look like 'sha256:<hex>'"))
    }
}

fn invalid_reference(reference: &str, reason: &str) -> Error {
    Error::InvalidImageReference {
        reference: reference.to_string(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// Daemon Types
// =============================================================================

/// A running container as reported by the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHandle {
    /// Full container id.
    pub id: String,
    /// Human-readable name, without the leading `/`.
    pub name: String,
}

impl ContainerHandle {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Abbreviated id for listings.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(SHORT_ID_LEN) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }
}

impl std::fmt::Display for ContainerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.short_id(), self.name)
    }
}

/// A locally stored image and every `repo:tag` pointing at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    pub id: String,
    pub repo_tags: Vec<String>,
}

/// Transport to a container daemon.
///
/// Implementations map backend "not found" responses onto
/// [`Error::ImageNotFound`] for pull/run and `Ok(None)` for
/// [`ContainerDaemon::inspect_running`]; build failures onto
/// [`Error::BuildFailed`]; everything else onto [`Error::Daemon`].
pub trait ContainerDaemon: Send + Sync {
    /// Builds the context directory and tags the result.
    fn build_image(&self, context_dir: &Path, image: &ContainerImageRef) -> Result<()>;

    /// Lists local images in backend order.
    fn list_images(&self) -> Result<Vec<LocalImage>>;

    /// Lists running containers in backend order.
    fn list_containers(&self) -> Result<Vec<ContainerHandle>>;

    /// Looks up a container by id, returning it only if it is running.
    fn inspect_running(&self, id: &str) -> Result<Option<ContainerHandle>>;

    /// Stops a container.
    fn stop_container(&self, id: &str) -> Result<()>;

    /// Pulls an image from its registry.
    fn pull_image(&self, image: &ContainerImageRef) -> Result<()>;

    /// Creates and starts a detached container from a local image.
    fn run_container(&self, image: &ContainerImageRef, name: Option<&str>) -> Result<ContainerHandle>;
}

// =============================================================================
// Client
// =============================================================================

/// Container operations on top of a shared daemon connection.
///
/// Calls are issued one at a time; the connection is not locked.
#[derive(Clone)]
pub struct ContainerClient {
    daemon: Arc<dyn ContainerDaemon>,
}

impl ContainerClient {
    pub fn new(daemon: Arc<dyn ContainerDaemon>) -> Self {
        Self { daemon }
    }

    /// Builds `context_dir` as `name:tag`.
    pub fn build_image(&self, context_dir: &Path, name: &str, tag: &str) -> Result<ContainerImageRef> {
        let image = ContainerImageRef::new(name, tag)?;
        require_existing_dir(context_dir)?;
        debug!("Building image with name: {} and tag: {}", image.name, image.tag);

        self.daemon.build_image(context_dir, &image)?;
        info!("Image {} built successfully", image);
        Ok(image)
    }

    /// Lists every tagged local image reference. Dangling images are skipped.
    pub fn list_images(&self) -> Result<Vec<ContainerImageRef>> {
        Ok(self.list_image_tags()?.into_iter().flatten().collect())
    }

    /// Lists tagged references grouped per local image, in backend order.
    /// Images left with no usable tag are omitted.
    pub fn list_image_tags(&self) -> Result<Vec<Vec<ContainerImageRef>>> {
        let groups: Vec<Vec<ContainerImageRef>> = self
            .daemon
            .list_images()?
            .iter()
            .map(|image| {
                image
                    .repo_tags
                    .iter()
                    .filter_map(|tag| ContainerImageRef::from_repo_tag(tag))
                    .collect::<Vec<_>>()
            })
            .filter(|tags| !tags.is_empty())
            .collect();
        debug!("Found {} tagged images", groups.len());
        Ok(groups)
    }

    /// Lists running containers.
    pub fn list_containers(&self) -> Result<Vec<ContainerHandle>> {
        let containers = self.daemon.list_containers()?;
        debug!("Found {} running containers", containers.len());
        Ok(containers)
    }

    /// Stops a running container after re-resolving its id.
    pub fn stop_container(&self, id: &str) -> Result<ContainerHandle> {
        let Some(handle) = self.daemon.inspect_running(id)? else {
            warn!("Container {} is no longer running", id);
            return Err(Error::ContainerNotFound(id.to_string()));
        };

        self.daemon.stop_container(&handle.id)?;
        info!("Container {} stopped successfully", handle.name);
        Ok(handle)
    }

    /// Pulls `reference` (tag defaults to `latest`).
    pub fn pull_image(&self, reference: &str) -> Result<ContainerImageRef> {
        let image = ContainerImageRef::parse(reference)?;
        self.daemon.pull_image(&image)?;
        info!("Downloaded image: {}", image);
        Ok(image)
    }

    /// Starts a detached container. An empty name lets the daemon choose.
    pub fn run_container(&self, reference: &str, name: &str) -> Result<ContainerHandle> {
        let image = ContainerImageRef::parse(reference)?;
        let name = Some(name.trim()).filter(|n| !n.is_empty());
        debug!("Attempting to run container from image: {}, with name: {:?}", image, name);

        let handle = self.daemon.run_container(&image, name)?;
        info!("Container {} is running", handle.name);
        Ok(handle)
    }

    /// Finds the first local image whose `name:tag` contains `term`,
    /// ignoring case.
    pub fn search_local_images(&self, term: &str) -> Result<ContainerImageRef> {
        let needle = term.to_lowercase();
        debug!("Searching local images for: {}", term);

        for image in self.daemon.list_images()? {
            for repo_tag in &image.repo_tags {
                if !repo_tag.to_lowercase().contains(&needle) {
                    continue;
                }
                if let Some(found) = ContainerImageRef::from_repo_tag(repo_tag) {
                    info!("Image found: {}", found);
                    return Ok(found);
                }
            }
        }

        info!("No local image matches '{}'", term);
        Err(Error::NoMatchingImage(term.to_string()))
    }
}

// =============================================================================
// Dockerfile Authoring
// =============================================================================

/// Writes `content` to `<dir>/Dockerfile`, replacing any existing file.
///
/// Surrounding whitespace is trimmed. Returns the written path.
pub fn write_dockerfile(dir: &Path, content: &str) -> Result<PathBuf> {
    require_existing_dir(dir)?;
    let path = dir.join(DOCKERFILE_NAME);
    std::fs::write(&path, content.trim())?;
    info!("Dockerfile created at {}", path.display());
    Ok(path)
}
