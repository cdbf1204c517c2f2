//! Retrieval of forecast rasters through an external program.
//!
//! The [`RetrievalInvoker`] clears the session workspace of rasters, then
//! runs a [`Retriever`] with the request and the stem-derived output file
//! name. Every invocation is bounded by a timeout and a cancellation token,
//! and logs a heartbeat while it runs.
//!
//! [`CommandRetriever`] is the shipped retriever: it spawns the configured
//! program (by default `meteohub`) in the workspace directory.

pub mod command;
pub mod config;
pub mod error;
pub mod invoker;
pub mod job;
pub mod program;

use async_trait::async_trait;

pub use command::CommandRetriever;
pub use config::RetrievalConfig;
pub use error::{RetrievalError, RetrievalResult};
pub use invoker::RetrievalInvoker;
pub use job::RetrievalJob;
pub use program::resolve_program;

/// A collaborator that turns a forecast request into raster files.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Produce the job's output in `job.workdir` and return a status message.
    ///
    /// Dropping the returned future must stop the work.
    async fn retrieve(&self, job: &RetrievalJob) -> RetrievalResult<String>;
}
