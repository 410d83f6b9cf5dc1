//! Navigation of the page surface
//!
//! The orchestrator drives navigation only through the [`Agent`] trait.
//! [`HttpAgent`] is the shipped implementation: it fetches pages with
//! reqwest into a shared [`PageSurface`].

mod http;
mod surface;

pub use http::{build_http_client, HttpAgent};
pub use surface::{LoadedPage, PageSurface, SurfaceState};

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by an agent
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// The working surface was closed or lost
    #[error("Page surface is closed")]
    SurfaceClosed,

    #[error("Navigation failed: {0}")]
    Navigation(String),
}

/// Readiness of the surface after a navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Complete,
}

/// Navigates a page surface and reports its readiness
#[async_trait]
pub trait Agent: Send + Sync {
    /// Starts loading `url`; returns once the navigation was issued
    async fn navigate(&self, url: &str) -> Result<(), AgentError>;

    /// Reports whether the last navigation finished loading
    async fn check_status(&self) -> Result<LoadStatus, AgentError>;
}
