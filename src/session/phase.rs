/// Phase definitions for a crawl session
///
/// A session only ever moves forward through these phases.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current phase of a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No session has been started yet
    Idle,

    /// Walking listing pages and collecting product URLs
    CollectingUrls,

    /// Visiting collected product URLs and extracting records
    ScrapingDetails,

    /// Every queued product was attempted
    Complete,

    /// The session was stopped before it could complete
    Stopped,
}

impl Phase {
    /// Returns true once the session can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Stopped)
    }

    /// Checks whether moving from `self` to `next` keeps the phase order
    ///
    /// The order is `idle -> collecting_urls -> scraping_details -> complete`,
    /// and `stopped` can be reached from any non-terminal phase.
    pub fn can_transition_to(&self, next: Phase) -> bool {
        match (self, next) {
            (Self::Idle, Self::CollectingUrls) => true,
            (Self::CollectingUrls, Self::ScrapingDetails) => true,
            (Self::ScrapingDetails, Self::Complete) => true,
            (from, Self::Stopped) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CollectingUrls => "collecting_urls",
            Self::ScrapingDetails => "scraping_details",
            Self::Complete => "complete",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
