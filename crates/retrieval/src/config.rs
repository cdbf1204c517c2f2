//! Retrieval settings.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for retrieval invocations.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Program name or path of the retrieval tool
    pub program: PathBuf,
    /// Upper bound on a single invocation
    pub timeout: Duration,
    /// Interval between "still running" log lines
    pub heartbeat_interval: Duration,
    /// Pass `--debug` to the program
    pub debug: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("meteohub"),
            timeout: Duration::from_secs(900), // 15 minutes
            heartbeat_interval: Duration::from_secs(30),
            debug: true,
        }
    }
}
