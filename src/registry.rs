//! Public registry search.
//!
//! Shells out to `<program> search <term>` and hands back stdout untouched.
//! One attempt per call; the output format belongs to the search program.

use crate::config::ConsoleConfig;
use crate::error::{Error, Result};
use crate::process::{Invocation, ProcessRunner, run_checked};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Runs registry searches through an external program.
pub struct RegistrySearch {
    runner: Arc<dyn ProcessRunner>,
    program: PathBuf,
}

impl RegistrySearch {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: &ConsoleConfig) -> Self {
        Self {
            runner,
            program: config.search_program.clone(),
        }
    }

    /// Builds the search command line.
    pub fn invocation(&self, term: &str) -> Invocation {
        Invocation::new(&self.program).arg("search").arg(term)
    }

    /// Searches the registry for `term`, returning raw stdout.
    pub fn search(&self, term: &str) -> Result<String> {
        let term = term.trim();
        if term.is_empty() {
            return Err(Error::EmptySearchTerm);
        }

        let inv = self.invocation(term);
        debug!("Running registry search: {}", inv);
        let output = run_checked(self.runner.as_ref(), &inv)?;
        info!("Registry search for '{}' returned {} bytes", term, output.stdout.len());
        Ok(output.stdout)
    }
}
