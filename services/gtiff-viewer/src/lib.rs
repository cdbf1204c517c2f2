//! GeoTIFF Layers Viewer service library.
//!
//! Collects forecast parameters from a browser page, runs the external
//! retrieval program into a per-session workspace, and serves the
//! resulting GeoTIFF bands as map overlays.

pub mod app;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod render;
pub mod session;
pub mod startup;
pub mod state;
