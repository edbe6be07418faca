//! Debounced persistence writes.
//!
//! Every layout gesture can produce dozens of state changes per second
//! (per-keystroke filter edits, per-frame resize updates). The writer
//! keeps only the latest snapshot and a single deadline; each new
//! schedule supersedes the pending write and resets the timer, so a burst
//! collapses to one storage write. Time is passed in explicitly: the
//! host drives `poll` from its own tick, and tests drive it directly.

use std::time::{Duration, Instant};

use crate::state::GridState;
use crate::store::StateStore;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

struct PendingWrite {
    key: String,
    payload: String,
    due: Instant,
}

pub struct DebouncedWriter {
    delay: Duration,
    pending: Option<PendingWrite>,
}

impl Default for DebouncedWriter {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl DebouncedWriter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Stage a snapshot for writing. Supersedes any pending write for the
    /// timer's duration.
    pub fn schedule(&mut self, key: &str, state: &GridState, now: Instant) {
        let payload = match serde_json::to_string_pretty(state) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("failed to serialize grid state for {:?}: {}", key, e);
                return;
            }
        };
        self.pending = Some(PendingWrite {
            key: key.to_string(),
            payload,
            due: now + self.delay,
        });
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Write the pending snapshot if its deadline has passed. Returns
    /// whether a write happened. Failures are logged and dropped; the
    /// grid keeps working in memory.
    pub fn poll(&mut self, store: &mut dyn StateStore, now: Instant) -> bool {
        match &self.pending {
            Some(p) if now >= p.due => {}
            _ => return false,
        }
        self.write_pending(store)
    }

    /// Write the pending snapshot immediately, deadline or not. Used on
    /// unmount so staged changes are not lost.
    pub fn flush(&mut self, store: &mut dyn StateStore) -> bool {
        if self.pending.is_none() {
            return false;
        }
        self.write_pending(store)
    }

    /// Drop the pending write without persisting (explicit reset path).
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    fn write_pending(&mut self, store: &mut dyn StateStore) -> bool {
        let Some(p) = self.pending.take() else {
            return false;
        };
        match store.write(&p.key, &p.payload) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("dropping grid state write for {:?}: {}", p.key, e);
                false
            }
        }
    }
}
