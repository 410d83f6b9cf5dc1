//! HTTP agent implementation
//!
//! Each navigation spawns one background fetch that writes into the page
//! surface. Starting a new navigation aborts the previous fetch.

use crate::agent::surface::{LoadedPage, PageSurface, SurfaceState};
use crate::agent::{Agent, AgentError, LoadStatus};
use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::AbortHandle;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use shelf_sweep::agent::build_http_client;
/// use shelf_sweep::config::UserAgentConfig;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Agent that loads pages over plain HTTP
pub struct HttpAgent {
    client: Client,
    surface: PageSurface,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl HttpAgent {
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?, PageSurface::new()))
    }

    pub fn with_client(client: Client, surface: PageSurface) -> Self {
        Self {
            client,
            surface,
            in_flight: Mutex::new(None),
        }
    }

    /// Handle to the surface, shared with the extractor
    pub fn surface(&self) -> PageSurface {
        self.surface.clone()
    }

    /// Closes the surface and abandons the in-flight fetch
    pub fn close(&self) {
        self.abort_in_flight();
        self.surface.close();
    }

    fn abort_in_flight(&self) {
        let previous = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = previous {
            handle.abort();
        }
    }
}

impl Drop for HttpAgent {
    fn drop(&mut self) {
        self.abort_in_flight();
    }
}

#[async_trait]
impl Agent for HttpAgent {
    async fn navigate(&self, url: &str) -> Result<(), AgentError> {
        if self.surface.is_closed() {
            return Err(AgentError::SurfaceClosed);
        }

        Url::parse(url).map_err(|e| AgentError::Navigation(format!("{}: {}", url, e)))?;

        self.abort_in_flight();
        if !self.surface.set(SurfaceState::Loading {
            url: url.to_string(),
        }) {
            return Err(AgentError::SurfaceClosed);
        }

        let client = self.client.clone();
        let surface = self.surface.clone();
        let requested = url.to_string();
        let handle = tokio::spawn(async move {
            let next = fetch_page(&client, &requested).await;
            if !surface.finish(&requested, next) {
                tracing::debug!("Dropping stale load of {}", requested);
            }
        });

        *self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle.abort_handle());

        tracing::debug!("Navigating to {}", url);
        Ok(())
    }

    async fn check_status(&self) -> Result<LoadStatus, AgentError> {
        match self.surface.state() {
            SurfaceState::Closed => Err(AgentError::SurfaceClosed),
            SurfaceState::Loading { .. } => Ok(LoadStatus::Loading),
            SurfaceState::Loaded(_) => Ok(LoadStatus::Complete),
            SurfaceState::Failed { url, message } => {
                Err(AgentError::Navigation(format!("{}: {}", url, message)))
            }
            SurfaceState::Blank => Err(AgentError::Navigation("nothing loaded".to_string())),
        }
    }
}

/// Fetches `url` and maps the outcome to the next surface state
async fn fetch_page(client: &Client, url: &str) -> SurfaceState {
    let failed = |message: String| SurfaceState::Failed {
        url: url.to_string(),
        message,
    };

    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) if e.is_timeout() => return failed("Request timeout".to_string()),
        Err(e) if e.is_connect() => return failed("Connection refused".to_string()),
        Err(e) => return failed(e.to_string()),
    };

    let status = response.status();
    if !status.is_success() {
        return failed(format!("HTTP {}", status.as_u16()));
    }

    let final_url = response.url().to_string();
    match response.text().await {
        Ok(html) => SurfaceState::Loaded(LoadedPage {
            requested_url: url.to_string(),
            final_url,
            status_code: status.as_u16(),
            html,
        }),
        Err(e) => failed(e.to_string()),
    }
}
