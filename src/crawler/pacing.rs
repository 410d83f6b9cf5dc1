//! Pacing between units of work and the bounded readiness wait
//!
//! Every wait here observes the session's cancellation token and the
//! surface-loss signal, so a stopped or replaced session never sleeps on.

use crate::agent::{Agent, AgentError, LoadStatus};
use crate::config::Timing;
use crate::crawler::unit::UnitFailure;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Sleeps for `duration` unless `token` is cancelled first
///
/// Returns true if the full delay elapsed.
pub async fn pause(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// How a readiness wait ended without failing the unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// The page reported complete and the settle delay passed
    Ready,

    /// The ceiling passed before the page reported complete
    CeilingReached,

    /// The agent reported a navigation problem; extraction decides the outcome
    NavigationFailed(String),
}

/// Navigates to `url` and polls the agent until the page is ready
///
/// The wait is bounded by the navigation ceiling; reaching it is not a
/// failure. Cancellation and surface loss end the wait with a failure.
pub async fn navigate_and_wait(
    agent: &dyn Agent,
    url: &str,
    timing: &Timing,
    token: &CancellationToken,
    lost: &mut watch::Receiver<u64>,
) -> Result<Readiness, UnitFailure> {
    let deadline = Instant::now() + timing.navigation_ceiling();

    let issued = tokio::select! {
        _ = token.cancelled() => return Err(UnitFailure::Cancelled),
        Ok(()) = lost.changed() => return Err(UnitFailure::SurfaceLost),
        issued = tokio::time::timeout_at(deadline, agent.navigate(url)) => issued,
    };

    match issued {
        Err(_) => return Ok(Readiness::CeilingReached),
        Ok(Err(AgentError::SurfaceClosed)) => return Err(UnitFailure::SurfaceLost),
        Ok(Err(AgentError::Navigation(message))) => {
            return Ok(Readiness::NavigationFailed(message))
        }
        Ok(Ok(())) => {}
    }

    loop {
        let status = tokio::select! {
            _ = token.cancelled() => return Err(UnitFailure::Cancelled),
            Ok(()) = lost.changed() => return Err(UnitFailure::SurfaceLost),
            status = tokio::time::timeout_at(deadline, agent.check_status()) => status,
        };

        match status {
            Err(_) => return Ok(Readiness::CeilingReached),
            Ok(Err(AgentError::SurfaceClosed)) => return Err(UnitFailure::SurfaceLost),
            Ok(Err(AgentError::Navigation(message))) => {
                return Ok(Readiness::NavigationFailed(message))
            }
            Ok(Ok(LoadStatus::Complete)) => {
                return if pause(token, timing.settle_delay()).await {
                    Ok(Readiness::Ready)
                } else {
                    Err(UnitFailure::Cancelled)
                };
            }
            Ok(Ok(LoadStatus::Loading)) => {}
        }

        if Instant::now() >= deadline {
            return Ok(Readiness::CeilingReached);
        }

        let wake = std::cmp::min(Instant::now() + timing.poll_interval(), deadline);
        tokio::select! {
            _ = token.cancelled() => return Err(UnitFailure::Cancelled),
            Ok(()) = lost.changed() => return Err(UnitFailure::SurfaceLost),
            _ = tokio::time::sleep_until(wake) => {}
        }
    }
}
