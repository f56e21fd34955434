//! Diagnostic log sink.
//!
//! The console does not install a global subscriber. A [`LogSink`] is
//! opened at startup, handed to [`Console`](crate::console::Console), and
//! every operation runs with the sink's dispatcher as the thread default.
//! [`LogSink::close`] flushes the file at shutdown.
//!
//! ## Levels
//!
//! | Level | Used for                                   |
//! |-------|--------------------------------------------|
//! | info  | workflow milestones                        |
//! | debug | parameter values, tool command lines       |
//! | warn  | targets the operator did not choose        |
//! | error | failed operations                          |
//!
//! The file receives everything from `debug` up. With `verbose`, the same
//! events are mirrored to stderr, filtered by `RUST_LOG` (default
//! `cloudmgr=info`).

use crate::error::Result;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing::Dispatch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Default stderr filter when `RUST_LOG` is unset.
const DEFAULT_STDERR_FILTER: &str = "cloudmgr=info";

/// Where console diagnostics go.
pub struct LogSink {
    dispatch: Dispatch,
    file: Option<Arc<File>>,
}

impl LogSink {
    /// Opens `path` for appending and routes diagnostics to it.
    pub fn open(path: &Path, verbose: bool) -> Result<Self> {
        let file = Arc::new(OpenOptions::new().create(true).append(true).open(path)?);

        let file_layer = fmt::layer()
            .with_writer(Arc::clone(&file))
            .with_ansi(false)
            .with_filter(LevelFilter::DEBUG);

        let stderr_layer = verbose.then(|| {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_STDERR_FILTER));
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter)
        });

        let subscriber = tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer);

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            file: Some(file),
        })
    }

    /// Discards all diagnostics.
    pub fn disabled() -> Self {
        Self::from_dispatch(Dispatch::none())
    }

    /// Uses an existing dispatcher, e.g. a test subscriber.
    pub fn from_dispatch(dispatch: Dispatch) -> Self {
        Self {
            dispatch,
            file: None,
        }
    }

    /// Runs `f` with this sink as the thread's default dispatcher.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Flushes the log file to disk.
    pub fn close(self) -> Result<()> {
        if let Some(file) = self.file {
            file.sync_all()?;
        }
        Ok(())
    }
}
