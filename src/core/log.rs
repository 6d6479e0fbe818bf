//! Purpose: Tracing bootstrap for the bridge.
//! Exports: `init_trace`.
//! Invariants: At most one global subscriber install per process; a
//! subscriber already owned by the embedding process is left in place.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::core::error::{Error, ErrorKind};

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Install the global trace subscriber with `filter` (an env-filter directive
/// such as `depotbridge=debug`). Idempotent: later calls after a successful
/// install are accepted and ignored, matching the once-per-process contract.
pub fn init_trace(filter: &str, file: Option<&Path>) -> Result<(), Error> {
    let filter = EnvFilter::try_new(filter)
        .map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid trace filter")
                .with_source(err)
        })?;
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let result = match file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| {
                    INSTALLED.store(false, Ordering::SeqCst);
                    Error::new(ErrorKind::Io).with_path(path).with_source(err)
                })?;
            builder.with_writer(Arc::new(file)).with_ansi(false).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    // A subscriber installed by the embedding process is not an error here.
    if result.is_err() {
        tracing::debug!("global subscriber already installed; keeping it");
    }
    Ok(())
}
