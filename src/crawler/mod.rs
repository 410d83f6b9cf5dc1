//! Crawler module for the two-phase crawl
//!
//! This module contains the core crawling logic, including:
//! - The orchestrator and its session control loop
//! - Bounded readiness waits and inter-unit pacing
//! - Timeout racing and single-retry handling for units of work

mod coordinator;
mod pacing;
mod unit;

pub use coordinator::{Orchestrator, OrchestratorBuilder};
pub use pacing::{navigate_and_wait, pause, Readiness};
pub use unit::{is_benign, run_unit, UnitBudget, UnitFailure, BENIGN_ERROR_PATTERNS};
