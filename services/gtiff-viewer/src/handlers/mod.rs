//! HTTP request handlers for the viewer.

pub mod api;
pub mod health;
pub mod page;
