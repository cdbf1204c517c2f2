//! Per-session state: workspace, retrieval status and the work lock.
//!
//! Each browser session owns a scratch directory under the workspace root.
//! Retrieval and render passes within one session are serialized by an
//! async mutex; different sessions never share files.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;
use viewer_common::{ViewerError, ViewerResult, Workspace};

/// Where the session's last retrieval stands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RetrievalStatus {
    Idle,
    Running {
        stem: String,
        started_at: DateTime<Utc>,
    },
    Succeeded {
        stem: String,
        message: String,
        finished_at: DateTime<Utc>,
        elapsed_secs: f64,
    },
    Failed {
        stem: String,
        error: String,
        code: String,
        finished_at: DateTime<Utc>,
        elapsed_secs: f64,
    },
}

#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub workspace: Workspace,
    pub created_at: DateTime<Utc>,
    last_access: AtomicI64,
    work: Arc<Mutex<()>>,
    status: RwLock<RetrievalStatus>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl Session {
    fn new(id: Uuid, workspace: Workspace) -> Self {
        let now = Utc::now();
        Self {
            id,
            workspace,
            created_at: now,
            last_access: AtomicI64::new(now.timestamp()),
            work: Arc::new(Mutex::new(())),
            status: RwLock::new(RetrievalStatus::Idle),
            cancel: Mutex::new(None),
        }
    }

    pub fn touch(&self) {
        self.last_access.store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        let idle = now.timestamp() - self.last_access.load(Ordering::Relaxed);
        Duration::from_secs(idle.max(0) as u64)
    }

    /// Take the work lock without waiting; busy sessions are rejected.
    pub fn try_lock_work(&self) -> ViewerResult<OwnedMutexGuard<()>> {
        self.work
            .clone()
            .try_lock_owned()
            .map_err(|_| ViewerError::RetrievalBusy)
    }

    pub fn is_busy(&self) -> bool {
        self.work.try_lock().is_err()
    }

    /// Mark a retrieval as running and hand out its cancellation token.
    pub async fn begin_retrieval(&self, stem: &str) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.lock().await = Some(token.clone());
        *self.status.write().await = RetrievalStatus::Running {
            stem: stem.to_string(),
            started_at: Utc::now(),
        };
        token
    }

    pub async fn finish_retrieval(&self, status: RetrievalStatus) {
        *self.cancel.lock().await = None;
        *self.status.write().await = status;
    }

    /// Cancel the running retrieval, if any. Returns whether one was running.
    pub async fn cancel_retrieval(&self) -> bool {
        match self.cancel.lock().await.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn status(&self) -> RetrievalStatus {
        self.status.read().await.clone()
    }
}

/// All live sessions, keyed by id.
pub struct SessionRegistry {
    root: PathBuf,
    max_sessions: Option<usize>,
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_sessions: None,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Refuse new sessions once `max` are live.
    pub fn with_max_sessions(mut self, max: Option<usize>) -> Self {
        self.max_sessions = max;
        self
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Create a session with a fresh workspace directory.
    ///
    /// The registry stays write-locked until the directory exists so the
    /// session limit holds under concurrent requests.
    pub async fn create(&self) -> ViewerResult<Arc<Session>> {
        let mut sessions = self.sessions.write().await;
        if let Some(max) = self.max_sessions {
            if sessions.len() >= max {
                warn!(max_sessions = max, "Session limit reached");
                return Err(ViewerError::TooManySessions(max));
            }
        }

        let id = Uuid::new_v4();
        let dir = self.root.join(id.to_string());
        let workspace = tokio::task::spawn_blocking(move || Workspace::open(dir))
            .await
            .map_err(|e| ViewerError::InternalError(e.to_string()))??;

        let session = Arc::new(Session::new(id, workspace));
        sessions.insert(id, session.clone());
        drop(sessions);
        info!(session_id = %id, workspace = %session.workspace.path().display(), "Session created");
        Ok(session)
    }

    pub async fn get(&self, id: &str) -> ViewerResult<Arc<Session>> {
        let uuid = parse_id(id)?;
        let session = self
            .sessions
            .read()
            .await
            .get(&uuid)
            .cloned()
            .ok_or_else(|| ViewerError::SessionNotFound(id.to_string()))?;
        session.touch();
        Ok(session)
    }

    /// Drop the session and delete its workspace.
    pub async fn remove(&self, id: &str) -> ViewerResult<()> {
        let uuid = parse_id(id)?;
        let session = self
            .sessions
            .write()
            .await
            .remove(&uuid)
            .ok_or_else(|| ViewerError::SessionNotFound(id.to_string()))?;

        session.cancel_retrieval().await;
        let workspace = session.workspace.clone();
        tokio::task::spawn_blocking(move || workspace.remove())
            .await
            .map_err(|e| ViewerError::InternalError(e.to_string()))??;
        info!(session_id = %uuid, "Session removed");
        Ok(())
    }

    /// Remove sessions idle for longer than `ttl` that are not working.
    pub async fn expire_idle(&self, ttl: Duration) -> usize {
        let now = Utc::now();
        let expired: Vec<String> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.idle_for(now) > ttl && !s.is_busy())
            .map(|s| s.id.to_string())
            .collect();

        let mut removed = 0;
        for id in expired {
            match self.remove(&id).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(session_id = %id, error = %e, "Failed to expire session"),
            }
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn parse_id(id: &str) -> ViewerResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| ViewerError::SessionNotFound(id.to_string()))
}
