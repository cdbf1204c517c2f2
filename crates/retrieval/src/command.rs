//! Child-process retriever.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::error::{RetrievalError, RetrievalResult};
use crate::job::RetrievalJob;
use crate::Retriever;

/// Message returned when the program succeeds without printing anything.
const DEFAULT_SUCCESS_MESSAGE: &str = "Retrieval completed";

/// Keep the tail of stderr in error messages.
const MAX_STDERR_CHARS: usize = 2000;

/// Runs the retrieval program in the job's working directory.
#[derive(Debug, Clone)]
pub struct CommandRetriever {
    program: PathBuf,
    name: String,
}

impl CommandRetriever {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());
        Self { program, name }
    }
}

#[async_trait]
impl Retriever for CommandRetriever {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, job), fields(program = %self.name, out = %job.output_filename))]
    async fn retrieve(&self, job: &RetrievalJob) -> RetrievalResult<String> {
        let args = job.args();
        info!(args = ?args, workdir = %job.workdir.display(), "Starting retrieval program");

        // The child dies with the future on timeout or cancellation
        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&job.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RetrievalError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if job.debug && !stderr.trim().is_empty() {
            debug!(stderr = %stderr.trim(), "Retrieval program diagnostics");
        }

        if !output.status.success() {
            warn!(status = ?output.status.code(), "Retrieval program failed");
            return Err(RetrievalError::Failed {
                status: output.status.code(),
                stderr: tail(stderr.trim(), MAX_STDERR_CHARS),
            });
        }

        let message = stdout.trim();
        Ok(if message.is_empty() {
            DEFAULT_SUCCESS_MESSAGE.to_string()
        } else {
            message.to_string()
        })
    }
}

fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_keeps_end() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("abc", 10), "abc");
    }

    #[test]
    fn test_name_from_path() {
        assert_eq!(CommandRetriever::new("/opt/bin/meteohub").name(), "meteohub");
        assert_eq!(CommandRetriever::new("meteohub").name(), "meteohub");
    }
}
