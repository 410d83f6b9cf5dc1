//! The page surface an agent drives and an extractor reads
//!
//! A surface holds at most one document. Navigation replaces it; closing
//! the surface makes every later navigation and status check fail.

use std::sync::{Arc, PoisonError, RwLock};

/// What the surface currently shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceState {
    /// Nothing has been loaded yet
    Blank,

    /// A navigation is in flight
    Loading { url: String },

    /// A document finished loading
    Loaded(LoadedPage),

    /// The last navigation failed
    Failed { url: String, message: String },

    /// The surface is gone
    Closed,
}

/// A fully loaded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPage {
    /// URL passed to `navigate`
    pub requested_url: String,

    /// URL after redirects
    pub final_url: String,

    pub status_code: u16,
    pub html: String,
}

/// Shared handle to a page surface
#[derive(Debug, Clone)]
pub struct PageSurface {
    state: Arc<RwLock<SurfaceState>>,
}

impl Default for PageSurface {
    fn default() -> Self {
        Self {
            state: Arc::new(RwLock::new(SurfaceState::Blank)),
        }
    }
}

impl PageSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SurfaceState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The loaded document, if any
    pub fn page(&self) -> Option<LoadedPage> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            SurfaceState::Loaded(page) => Some(page.clone()),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state(), SurfaceState::Closed)
    }

    /// Replaces the state unless the surface is closed
    ///
    /// Returns false if the surface was closed.
    pub fn set(&self, next: SurfaceState) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, SurfaceState::Closed) {
            return false;
        }
        *state = next;
        true
    }

    /// Sets `next` only while the surface is still loading `url`
    ///
    /// A fetch that finishes after a newer navigation started is dropped.
    pub fn finish(&self, url: &str, next: SurfaceState) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            SurfaceState::Loading { url: loading } if loading == url => {
                *state = next;
                true
            }
            _ => false,
        }
    }

    pub fn close(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = SurfaceState::Closed;
    }
}
