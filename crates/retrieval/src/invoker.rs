//! Clear-then-invoke sequencing with timeout, cancellation and heartbeat.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use viewer_common::{ForecastRequest, Workspace};

use crate::config::RetrievalConfig;
use crate::error::{RetrievalError, RetrievalResult};
use crate::job::RetrievalJob;
use crate::Retriever;

/// Runs retrievals against a session workspace.
#[derive(Clone)]
pub struct RetrievalInvoker {
    retriever: Arc<dyn Retriever>,
    config: RetrievalConfig,
}

impl RetrievalInvoker {
    pub fn new(retriever: Arc<dyn Retriever>, config: RetrievalConfig) -> Self {
        Self { retriever, config }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Remove every raster from `workspace`, then run the retriever.
    ///
    /// The removal completes before the retriever starts and is not undone
    /// if the retriever fails.
    #[instrument(skip_all, fields(stem = %request.stem, retriever = self.retriever.name()))]
    pub async fn invoke(
        &self,
        workspace: &Workspace,
        request: &ForecastRequest,
        cancel: CancellationToken,
    ) -> RetrievalResult<String> {
        let to_clear = workspace.clone();
        let removed = tokio::task::spawn_blocking(move || to_clear.clear_rasters())
            .await
            .map_err(|e| RetrievalError::Workspace(std::io::Error::other(e)))??;
        info!(removed, "Workspace cleared before retrieval");

        let job = RetrievalJob::new(request, workspace.path().to_path_buf(), self.config.debug);
        let started = Instant::now();

        let retrieval = self.retriever.retrieve(&job);
        tokio::pin!(retrieval);
        let deadline = tokio::time::sleep(self.config.timeout);
        tokio::pin!(deadline);

        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
        // The first tick completes immediately
        heartbeat.tick().await;

        loop {
            tokio::select! {
                result = &mut retrieval => {
                    let elapsed = started.elapsed().as_secs_f64();
                    match &result {
                        Ok(message) => {
                            info!(elapsed_secs = elapsed, message = %message, "Retrieval finished")
                        }
                        Err(e) => warn!(elapsed_secs = elapsed, error = %e, "Retrieval failed"),
                    }
                    return result;
                }
                _ = cancel.cancelled() => {
                    warn!(elapsed_secs = started.elapsed().as_secs(), "Retrieval cancelled");
                    return Err(RetrievalError::Cancelled);
                }
                _ = &mut deadline => {
                    warn!(timeout_secs = self.config.timeout.as_secs(), "Retrieval timed out");
                    return Err(RetrievalError::Timeout(self.config.timeout));
                }
                _ = heartbeat.tick() => {
                    info!(elapsed_secs = started.elapsed().as_secs(), "Retrieval still running");
                }
            }
        }
    }
}
