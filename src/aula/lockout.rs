//! Lockout policy: temporary login refusal after repeated failures.
//!
//! Refusal is independent of credential correctness. The counter only moves
//! through `increment`/`clear`; the controller decides when.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

pub trait LockoutPolicy: Send + Sync {
    fn is_enabled(&self) -> bool;
    fn is_locked_out(&self, account_id: Uuid) -> bool;
    fn increment(&self, account_id: Uuid);
    fn clear(&self, account_id: Uuid);
}

/// Lockout tracking disabled.
#[derive(Clone, Debug)]
pub struct NoopLockout;

impl LockoutPolicy for NoopLockout {
    fn is_enabled(&self) -> bool {
        false
    }

    fn is_locked_out(&self, _account_id: Uuid) -> bool {
        false
    }

    fn increment(&self, _account_id: Uuid) {}

    fn clear(&self, _account_id: Uuid) {}
}

#[derive(Debug, Clone)]
struct LockoutState {
    failures: u32,
    locked_until: Option<DateTime<Utc>>,
}

/// In-memory failure counter with a cooldown once the threshold is reached.
#[derive(Debug)]
pub struct FailureLockout {
    threshold: u32,
    cooldown: Duration,
    states: Mutex<HashMap<Uuid, LockoutState>>,
}

impl FailureLockout {
    #[must_use]
    pub fn new(threshold: u32, cooldown_seconds: i64) -> Self {
        Self {
            threshold,
            cooldown: Duration::seconds(cooldown_seconds),
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Current consecutive-failure count for an account.
    #[must_use]
    pub fn failures(&self, account_id: Uuid) -> u32 {
        self.states
            .lock()
            .ok()
            .and_then(|states| states.get(&account_id).map(|state| state.failures))
            .unwrap_or(0)
    }
}

impl LockoutPolicy for FailureLockout {
    fn is_enabled(&self) -> bool {
        true
    }

    fn is_locked_out(&self, account_id: Uuid) -> bool {
        self.states
            .lock()
            .ok()
            .and_then(|states| {
                states
                    .get(&account_id)
                    .and_then(|state| state.locked_until)
            })
            .is_some_and(|until| until > Utc::now())
    }

    fn increment(&self, account_id: Uuid) {
        let Ok(mut states) = self.states.lock() else {
            return;
        };
        let state = states.entry(account_id).or_insert(LockoutState {
            failures: 0,
            locked_until: None,
        });
        state.failures += 1;
        if state.failures >= self.threshold {
            state.locked_until = Some(Utc::now() + self.cooldown);
        }
    }

    fn clear(&self, account_id: Uuid) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(&account_id);
        }
    }
}
