//! Shared fakes for integration tests.
//!
//! `FakeRunner` records every invocation and answers from a per-program
//! script; `FakeDaemon` keeps images and containers in memory.

#![allow(dead_code)]

use cloudmgr::{
    ContainerDaemon, ContainerHandle, ContainerImageRef, Error, Invocation, LocalImage,
    ProcessOutput, ProcessRunner, Result,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

// =============================================================================
// Process Runner
// =============================================================================

#[derive(Default)]
pub struct FakeRunner {
    calls: Mutex<Vec<Invocation>>,
    responses: Mutex<HashMap<String, ProcessOutput>>,
    unlaunchable: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `program` exit with `code` and print `stderr`.
    pub fn fail(&self, program: &str, code: i32, stderr: &str) {
        self.responses.lock().unwrap().insert(
            program.to_string(),
            ProcessOutput {
                exit_code: Some(code),
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        );
    }

    /// Makes `program` succeed with `stdout`.
    pub fn respond(&self, program: &str, stdout: &str) {
        self.responses.lock().unwrap().insert(
            program.to_string(),
            ProcessOutput {
                exit_code: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        );
    }

    /// Makes `program` fail to start at all.
    pub fn unlaunchable(&self, program: &str) {
        self.unlaunchable.lock().unwrap().push(program.to_string());
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|inv| inv.program_name() == program)
            .collect()
    }
}

impl ProcessRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        let program = invocation.program_name();

        if self.unlaunchable.lock().unwrap().contains(&program) {
            return Err(Error::LaunchFailed {
                program,
                reason: "No such file or directory".to_string(),
            });
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&program)
            .cloned()
            .unwrap_or(ProcessOutput {
                exit_code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            }))
    }
}

// =============================================================================
// Container Daemon
// =============================================================================

#[derive(Default)]
struct DaemonState {
    images: Vec<LocalImage>,
    running: Vec<ContainerHandle>,
    remote: Vec<String>,
    build_failure: Option<String>,
    calls: Vec<String>,
    next_id: u32,
}

#[derive(Default)]
pub struct FakeDaemon {
    state: Mutex<DaemonState>,
}

impl FakeDaemon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a local image with the given repo tags.
    pub fn with_image(self, id: &str, repo_tags: &[&str]) -> Self {
        self.state.lock().unwrap().images.push(LocalImage {
            id: id.to_string(),
            repo_tags: repo_tags.iter().map(|t| t.to_string()).collect(),
        });
        self
    }

    pub fn with_running(self, id: &str, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .running
            .push(ContainerHandle::new(id, name));
        self
    }

    /// Makes `reference` available in the fake registry.
    pub fn with_remote(self, reference: &str) -> Self {
        self.state.lock().unwrap().remote.push(reference.to_string());
        self
    }

    pub fn with_build_failure(self, reason: &str) -> Self {
        self.state.lock().unwrap().build_failure = Some(reason.to_string());
        self
    }

    /// Simulates a container exiting on its own.
    pub fn exit_container(&self, id: &str) {
        self.state.lock().unwrap().running.retain(|c| c.id != id);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn running(&self) -> Vec<ContainerHandle> {
        self.state.lock().unwrap().running.clone()
    }

    fn has_local(state: &DaemonState, image: &ContainerImageRef) -> bool {
        let wanted = image.to_string();
        state
            .images
            .iter()
            .any(|i| i.repo_tags.iter().any(|t| *t == wanted))
    }
}

impl ContainerDaemon for FakeDaemon {
    fn build_image(&self, _context_dir: &Path, image: &ContainerImageRef) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("build {}", image));
        if let Some(reason) = state.build_failure.clone() {
            return Err(Error::BuildFailed {
                image: image.to_string(),
                reason,
            });
        }
        let id = format!("sha256:built{}", state.images.len());
        state.images.push(LocalImage {
            id,
            repo_tags: vec![image.to_string()],
        });
        Ok(())
    }

    fn list_images(&self) -> Result<Vec<LocalImage>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_images".to_string());
        Ok(state.images.clone())
    }

    fn list_containers(&self) -> Result<Vec<ContainerHandle>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_containers".to_string());
        Ok(state.running.clone())
    }

    fn inspect_running(&self, id: &str) -> Result<Option<ContainerHandle>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("inspect {}", id));
        Ok(state
            .running
            .iter()
            .find(|c| c.id == id || c.id.starts_with(id))
            .cloned())
    }

    fn stop_container(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("stop {}", id));
        let before = state.running.len();
        state.running.retain(|c| c.id != id);
        if state.running.len() == before {
            return Err(Error::ContainerNotFound(id.to_string()));
        }
        Ok(())
    }

    fn pull_image(&self, image: &ContainerImageRef) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("pull {}", image));
        let wanted = image.to_string();
        if !state.remote.contains(&wanted) {
            return Err(Error::ImageNotFound(wanted));
        }
        let id = format!("sha256:pulled{}", state.images.len());
        state.images.push(LocalImage {
            id,
            repo_tags: vec![wanted],
        });
        Ok(())
    }

    fn run_container(
        &self,
        image: &ContainerImageRef,
        name: Option<&str>,
    ) -> Result<ContainerHandle> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("run {} {:?}", image, name));
        if !Self::has_local(&state, image) {
            return Err(Error::ImageNotFound(image.to_string()));
        }
        state.next_id += 1;
        let id = format!("{:064x}", state.next_id);
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("auto_{}", state.next_id));
        let handle = ContainerHandle::new(id, name);
        state.running.push(handle.clone());
        Ok(handle)
    }
}
