//! Password-expiry policy.

use crate::aula::directory::Account;
use chrono::{Duration, Utc};

pub trait PasswordExpiryPolicy: Send + Sync {
    /// Whether the account must rotate its password before logging in again.
    fn should_reset_now(&self, account: &Account) -> bool;
}

/// Passwords never expire.
#[derive(Clone, Debug)]
pub struct NoopExpiry;

impl PasswordExpiryPolicy for NoopExpiry {
    fn should_reset_now(&self, _account: &Account) -> bool {
        false
    }
}

/// Passwords expire once they are older than a configured maximum age.
#[derive(Clone, Debug)]
pub struct RotationExpiry {
    max_age: Duration,
}

impl RotationExpiry {
    #[must_use]
    pub fn new(max_age_seconds: i64) -> Self {
        Self {
            max_age: Duration::seconds(max_age_seconds),
        }
    }
}

impl PasswordExpiryPolicy for RotationExpiry {
    fn should_reset_now(&self, account: &Account) -> bool {
        Utc::now() - account.password_changed >= self.max_age
    }
}
