//! Command line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use geotiff_reader::RasterLimits;
use retrieval::RetrievalConfig;
use viewer_common::ParameterForm;

/// GeoTIFF forecast layer viewer
#[derive(Parser, Debug, Clone)]
#[command(name = "gtiff-viewer")]
#[command(about = "Web viewer for GeoTIFF forecast layers")]
pub struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8090", env = "VIEWER_LISTEN_ADDR")]
    pub listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Number of worker threads
    #[arg(long, env = "VIEWER_WORKER_THREADS")]
    pub worker_threads: Option<usize>,

    /// Directory holding one scratch workspace per session
    #[arg(long, default_value = "/tmp/gtiff-viewer", env = "VIEWER_WORKSPACE_ROOT")]
    pub workspace_root: PathBuf,

    /// Retrieval program name or path
    #[arg(long, default_value = "meteohub", env = "RETRIEVAL_PROGRAM")]
    pub retrieval_program: PathBuf,

    /// Upper bound on one retrieval, in seconds
    #[arg(long, default_value_t = 900, env = "RETRIEVAL_TIMEOUT_SECS")]
    pub retrieval_timeout_secs: u64,

    /// Interval between retrieval heartbeat log lines, in seconds
    #[arg(long, default_value_t = 30, env = "RETRIEVAL_HEARTBEAT_SECS")]
    pub heartbeat_secs: u64,

    /// Largest accepted raster width or height
    #[arg(long, default_value_t = 8192, env = "VIEWER_MAX_RASTER_DIMENSION")]
    pub max_raster_dimension: u32,

    /// Largest accepted raster pixel count
    #[arg(long, default_value_t = 50_000_000, env = "VIEWER_MAX_RASTER_PIXELS")]
    pub max_raster_pixels: u64,

    /// YAML file overriding the form defaults
    #[arg(long, env = "VIEWER_FORM_DEFAULTS")]
    pub form_defaults: Option<PathBuf>,

    /// Remove sessions idle for longer than this, in seconds (0 keeps them)
    #[arg(long, default_value_t = 86_400, env = "VIEWER_SESSION_TTL_SECS")]
    pub session_ttl_secs: u64,

    /// Most live sessions at once (0 removes the limit)
    #[arg(long, default_value_t = 1000, env = "VIEWER_MAX_SESSIONS")]
    pub max_sessions: usize,

    /// How often idle sessions are looked for, in seconds
    #[arg(long, default_value_t = 600, env = "VIEWER_CLEANUP_INTERVAL_SECS")]
    pub cleanup_interval_secs: u64,
}

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub workspace_root: PathBuf,
    pub retrieval: RetrievalConfig,
    pub limits: RasterLimits,
    pub form_defaults: ParameterForm,
    pub session_ttl: Option<Duration>,
    pub max_sessions: Option<usize>,
    pub cleanup_interval: Duration,
}

impl ViewerConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        let form_defaults = match &args.form_defaults {
            Some(path) => ParameterForm::load_defaults(path)
                .with_context(|| format!("Failed to load form defaults from {}", path.display()))?,
            None => ParameterForm::default(),
        };

        Ok(Self {
            workspace_root: args.workspace_root.clone(),
            retrieval: RetrievalConfig {
                program: args.retrieval_program.clone(),
                timeout: Duration::from_secs(args.retrieval_timeout_secs.max(1)),
                heartbeat_interval: Duration::from_secs(args.heartbeat_secs.max(1)),
                debug: true,
            },
            limits: RasterLimits {
                max_dimension: args.max_raster_dimension,
                max_pixels: args.max_raster_pixels,
            },
            form_defaults,
            session_ttl: (args.session_ttl_secs > 0)
                .then(|| Duration::from_secs(args.session_ttl_secs)),
            max_sessions: (args.max_sessions > 0).then_some(args.max_sessions),
            cleanup_interval: Duration::from_secs(args.cleanup_interval_secs.max(1)),
        })
    }

    /// Defaults with the given workspace root; used by tests and embedders.
    pub fn with_workspace_root(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            retrieval: RetrievalConfig::default(),
            limits: RasterLimits::default(),
            form_defaults: ParameterForm::default(),
            session_ttl: None,
            max_sessions: None,
            cleanup_interval: Duration::from_secs(600),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["gtiff-viewer"]);
        assert_eq!(args.listen, "0.0.0.0:8090");
        let config = ViewerConfig::from_args(&args).unwrap();
        assert_eq!(config.retrieval.timeout, Duration::from_secs(900));
        assert_eq!(config.retrieval.program, PathBuf::from("meteohub"));
        assert_eq!(config.limits, RasterLimits::default());
        assert_eq!(config.session_ttl, Some(Duration::from_secs(86_400)));
        assert_eq!(config.max_sessions, Some(1000));
    }

    #[test]
    fn test_form_defaults_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("form.yaml");
        std::fs::write(&path, "dataset: ICON-2I\nstart_fc: \"3\"\n").unwrap();

        let args = Args::parse_from([
            "gtiff-viewer",
            "--form-defaults",
            path.to_str().unwrap(),
            "--session-ttl-secs",
            "0",
            "--max-sessions",
            "0",
        ]);
        let config = ViewerConfig::from_args(&args).unwrap();
        assert_eq!(config.form_defaults.dataset, "ICON-2I");
        assert_eq!(config.form_defaults.start_fc, "3");
        assert_eq!(config.form_defaults.varname, "tp");
        assert_eq!(config.session_ttl, None);
        assert_eq!(config.max_sessions, None);
    }
}
