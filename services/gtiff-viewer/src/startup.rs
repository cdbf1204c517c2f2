//! Preconditions checked before the server accepts requests.
//!
//! The retrieval program must already be installed and the workspace root
//! writable. Nothing is installed or fixed up on the operator's behalf.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::config::ViewerConfig;

/// What the checks found.
#[derive(Debug, Clone, Serialize)]
pub struct StartupReport {
    pub program: PathBuf,
    pub workspace_root: PathBuf,
}

/// Resolve the retrieval program and prepare the workspace root.
pub fn check_preconditions(config: &ViewerConfig) -> Result<StartupReport> {
    let program = retrieval::resolve_program(&config.retrieval.program).with_context(|| {
        format!(
            "Retrieval program '{}' is not installed or not executable; \
             install it or set RETRIEVAL_PROGRAM to its path",
            config.retrieval.program.display()
        )
    })?;

    std::fs::create_dir_all(&config.workspace_root).with_context(|| {
        format!(
            "Failed to create workspace root {}",
            config.workspace_root.display()
        )
    })?;
    let probe = tempfile::NamedTempFile::new_in(&config.workspace_root).with_context(|| {
        format!(
            "Workspace root {} is not writable",
            config.workspace_root.display()
        )
    })?;
    drop(probe);

    info!(
        program = %program.display(),
        workspace_root = %config.workspace_root.display(),
        "Startup preconditions satisfied"
    );

    Ok(StartupReport {
        program,
        workspace_root: config.workspace_root.clone(),
    })
}
