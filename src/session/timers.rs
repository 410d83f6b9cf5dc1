//! Timer ownership for one session generation
//!
//! Every delay and timeout a session schedules observes the set's
//! cancellation token, and every task it spawns is tracked here. Releasing
//! the set (explicitly or on drop) cancels the token and aborts the tasks,
//! so nothing scheduled by a superseded session can fire afterwards.

use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct TimerSet {
    token: CancellationToken,
    tasks: Vec<AbortHandle>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token observed by every delay and race owned by this set
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Tracks a spawned task so release aborts it
    pub fn track<T>(&mut self, handle: &JoinHandle<T>) {
        self.tasks.push(handle.abort_handle());
    }

    pub fn is_released(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancels the token and aborts every tracked task; idempotent
    pub fn release(&mut self) {
        self.token.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.release();
    }
}
