//! One unit of work: an extractor call raced against its timeout
//!
//! The first of {response, timeout, cancellation, surface loss} wins. A
//! failed delivery is re-sent exactly once after a short delay, inside the
//! same timeout budget. A timed-out unit is never retried.

use crate::extractor::ExtractError;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Error substrings reported by store pages that are not worth recording
pub const BENIGN_ERROR_PATTERNS: [&str; 5] = [
    "sonic.fdp.api",
    "406",
    "facebook.com/tr",
    "ERR_BLOCKED_BY_CLIENT",
    "net::ERR_ABORTED",
];

/// Returns true if `message` matches a known benign page error
pub fn is_benign(message: &str) -> bool {
    BENIGN_ERROR_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
}

/// Why a unit of work produced nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitFailure {
    /// No response within the unit's budget
    Timeout(Duration),

    /// The request could not be delivered, even after the retry
    Delivery(String),

    /// The working surface went away
    SurfaceLost,

    /// The session was stopped or replaced
    Cancelled,

    /// The extractor answered with an error
    Failed(String),
}

impl UnitFailure {
    /// Returns true for a delivery failure caused by known benign network noise
    ///
    /// Extractor errors and timeouts always count, whatever their text.
    pub fn is_benign(&self) -> bool {
        match self {
            Self::Delivery(message) => is_benign(message),
            _ => false,
        }
    }
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(budget) => write!(f, "Processing timeout after {}ms", budget.as_millis()),
            Self::Delivery(message) => write!(f, "Delivery failed: {}", message),
            Self::SurfaceLost => f.write_str("Page surface was lost"),
            Self::Cancelled => f.write_str("Cancelled"),
            Self::Failed(message) => f.write_str(message),
        }
    }
}

impl From<ExtractError> for UnitFailure {
    fn from(error: ExtractError) -> Self {
        match error {
            ExtractError::Delivery(message) => Self::Delivery(message),
            ExtractError::Failed(message) => Self::Failed(message),
        }
    }
}

/// Budget and signals shared by every unit of one session
pub struct UnitBudget<'a> {
    pub timeout: Duration,
    pub retry_delay: Duration,
    pub token: &'a CancellationToken,
}

/// Runs `call`, retrying once on a delivery failure, racing the whole
/// attempt against the timeout, cancellation and surface loss
pub async fn run_unit<T, F, Fut>(
    budget: UnitBudget<'_>,
    lost: &mut watch::Receiver<u64>,
    mut call: F,
) -> Result<T, UnitFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExtractError>>,
{
    let token = budget.token;
    let retry_delay = budget.retry_delay;

    let attempt = async move {
        match call().await {
            Err(first) if first.is_transient() => {
                tracing::debug!("{}, retrying once", first);
                tokio::select! {
                    _ = token.cancelled() => return Err(UnitFailure::Cancelled),
                    _ = tokio::time::sleep(retry_delay) => {}
                }
                call().await.map_err(UnitFailure::from)
            }
            other => other.map_err(UnitFailure::from),
        }
    };

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(UnitFailure::Cancelled),
        Ok(()) = lost.changed() => Err(UnitFailure::SurfaceLost),
        _ = tokio::time::sleep(budget.timeout) => Err(UnitFailure::Timeout(budget.timeout)),
        result = attempt => result,
    }
}
