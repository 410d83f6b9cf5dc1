//! Session state for one crawl
//!
//! # Components
//!
//! - `Phase`: the forward-only phase of a session
//! - `Session`: the mutable state machine instance owned by the orchestrator
//! - `TimerSet`: cancellation scope for every timer a session schedules
//! - `ProductRecord` / `ErrorRecord`: what a session accumulates

mod phase;
mod records;
mod state;
mod timers;

pub use phase::Phase;
pub use records::{ErrorRecord, ProductRecord};
pub use state::{Session, SessionSnapshot};
pub use timers::TimerSet;
