//! Session login controller.
//!
//! Orchestrates the user directory, lockout policy, password-expiry policy,
//! rate limiter, and session store into the three session operations. Guards
//! run in a fixed order and short-circuit; every exit path is a variant of
//! [`LoginError`] or a [`LoginOutcome`].
//!
//! Concurrent upgrades of the same anonymous session are not synchronized
//! here; the already-authenticated check is a best-effort guard, not a lock.

use crate::aula::{
    directory::{Account, UserDirectory, DIRECTORY_BACKEND},
    error::LoginError,
    lockout::LockoutPolicy,
    password_policy::PasswordExpiryPolicy,
    rate_limit::RateLimiter,
    session_store::{self, Session, SessionStore},
};
use chrono::Utc;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 14 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct SessionConfig {
    base_url: String,
    session_ttl_seconds: i64,
}

impl SessionConfig {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    /// Resource URI for a session token.
    #[must_use]
    pub fn session_uri(&self, token: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/sessions/{token}")
    }
}

/// Successful login: the persisted session plus the account it now carries.
#[derive(Debug)]
pub struct LoginOutcome {
    /// `true` when a brand-new session was created, `false` on upgrade.
    pub created: bool,
    pub session: Session,
    pub account: Account,
    pub csrf_token: String,
}

pub struct SessionController {
    config: SessionConfig,
    directory: UserDirectory,
    sessions: SessionStore,
    lockout: Arc<dyn LockoutPolicy>,
    expiry: Arc<dyn PasswordExpiryPolicy>,
    limiter: Arc<dyn RateLimiter>,
}

impl SessionController {
    #[must_use]
    pub fn new(
        config: SessionConfig,
        directory: UserDirectory,
        sessions: SessionStore,
        lockout: Arc<dyn LockoutPolicy>,
        expiry: Arc<dyn PasswordExpiryPolicy>,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            config,
            directory,
            sessions,
            lockout,
            expiry,
            limiter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create a new authenticated session, or upgrade the named anonymous one.
    ///
    /// Guards are evaluated in order and short-circuit: rate limit, identity
    /// resolution, lockout, password expiry, credentials, account active.
    /// Lockout and expiry refuse the login independent of password
    /// correctness.
    ///
    /// # Errors
    /// One [`LoginError`] variant per refused guard; `Internal` when a
    /// collaborator fails.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
        existing_session: Option<&str>,
        client: Option<&str>,
    ) -> Result<LoginOutcome, LoginError> {
        if self.limiter.is_rate_limit_exceeded(client) {
            return Err(LoginError::RateLimited);
        }

        let Some(account) = self.directory.find_by_username(username).await? else {
            // Same warning for unknown usernames regardless of why; the 404
            // stays indistinguishable from other lookups at this stage.
            warn!(target: "audit", "API::Failed login attempt with unknown username");
            return Err(LoginError::UnknownIdentity);
        };

        if self.lockout.is_enabled() && self.lockout.is_locked_out(account.id) {
            return Err(LoginError::LockedOut);
        }

        if self.expiry.should_reset_now(&account) {
            return Err(LoginError::PasswordExpired);
        }

        if !self.directory.authenticate(&account, password) {
            self.limiter.tick_bad_request(client);
            if self.lockout.is_enabled() {
                self.lockout.increment(account.id);
            }
            warn!(
                target: "audit",
                "API::User authentication failed with user-id - {}", account.id
            );
            return Err(LoginError::BadCredentials);
        }

        if !account.is_active {
            return Err(LoginError::InactiveAccount);
        }

        if self.lockout.is_enabled() {
            self.lockout.clear(account.id);
        }

        let (mut session, created) = match existing_session {
            None => (self.sessions.create().await?, true),
            Some(token) => match self.sessions.load(token).await? {
                Some(session) if session.is_authenticated() => {
                    return Err(LoginError::AlreadyAuthenticated);
                }
                Some(session) => (session, false),
                // Caller-named ids never become live tokens. An unseen id
                // gets a fresh session under a server-generated token.
                None => (self.sessions.create().await?, false),
            },
        };

        let csrf_token = session_store::generate_token().map_err(LoginError::Internal)?;

        session.fields.user_id = Some(account.id);
        session.fields.auth_backend = Some(DIRECTORY_BACKEND.to_string());
        session.fields.csrf_token = Some(csrf_token.clone());
        session.expires_in = self.sessions.save(&session).await?;

        let now = Utc::now();
        self.directory.record_login(account.id, now).await?;

        info!(
            target: "audit",
            "API::User logged in successfully with user-id - {}", account.id
        );

        let mut account = account;
        account.last_login = Some(now);

        Ok(LoginOutcome {
            created,
            session,
            account,
            csrf_token,
        })
    }

    /// Fetch an authenticated session. Anonymous and unknown sessions are
    /// both reported as not found; nothing is mutated.
    ///
    /// # Errors
    /// `SessionNotFound` when the token resolves to no authenticated session.
    pub async fn get_session(&self, token: &str) -> Result<Session, LoginError> {
        match self.sessions.load(token).await? {
            Some(session) if session.is_authenticated() => Ok(session),
            _ => Err(LoginError::SessionNotFound),
        }
    }

    /// Delete a session. Idempotent: unknown and anonymous sessions succeed
    /// without touching the store or the audit log.
    ///
    /// # Errors
    /// `Internal` only; deletion never fails from the caller's perspective.
    pub async fn delete_session(&self, token: &str) -> Result<Option<Uuid>, LoginError> {
        let Some(session) = self.sessions.load(token).await? else {
            return Ok(None);
        };
        let Some(user_id) = session.fields.user_id else {
            return Ok(None);
        };

        self.sessions.delete(token).await?;

        info!(
            target: "audit",
            "API::User session terminated for user-id - {}", user_id
        );

        Ok(Some(user_id))
    }
}
