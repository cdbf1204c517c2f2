//! Application state shared across handlers.

use std::path::PathBuf;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use retrieval::{CommandRetriever, RetrievalInvoker, Retriever};

use crate::config::ViewerConfig;
use crate::session::SessionRegistry;

/// Shared application state.
pub struct AppState {
    pub config: ViewerConfig,
    pub sessions: SessionRegistry,
    pub invoker: RetrievalInvoker,
    /// Absent when no recorder was installed (tests)
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// State backed by the resolved retrieval program.
    pub fn new(
        config: ViewerConfig,
        program: PathBuf,
        prometheus: Option<PrometheusHandle>,
    ) -> Self {
        let retriever = Arc::new(CommandRetriever::new(program));
        Self::with_retriever(config, retriever, prometheus)
    }

    /// State backed by any retriever.
    pub fn with_retriever(
        config: ViewerConfig,
        retriever: Arc<dyn Retriever>,
        prometheus: Option<PrometheusHandle>,
    ) -> Self {
        let invoker = RetrievalInvoker::new(retriever, config.retrieval.clone());
        let sessions = SessionRegistry::new(config.workspace_root.clone())
            .with_max_sessions(config.max_sessions);
        Self {
            config,
            sessions,
            invoker,
            prometheus,
        }
    }
}
