use crate::aula::{
    self,
    controller::{SessionConfig, SessionController},
    directory::{MemoryDirectory, PgDirectory, UserDirectory},
    lockout::{FailureLockout, LockoutPolicy, NoopLockout},
    password_policy::{NoopExpiry, PasswordExpiryPolicy, RotationExpiry},
    rate_limit::{RateLimiter, WindowRateLimiter},
    session_store::{MemorySessionStore, PgSessionStore, SessionBackend, SessionStore},
};
use crate::cli::actions::Action;
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use url::Url;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            base_url,
            backend,
            dsn,
            session_ttl,
            lockout_threshold,
            lockout_cooldown,
            rate_limit,
            rate_window,
            password_max_age,
        } => {
            let base_url = Url::parse(&base_url).context("Invalid base URL")?;
            let config =
                SessionConfig::new(base_url.as_str().trim_end_matches('/').to_string())
                    .with_session_ttl_seconds(session_ttl);

            let backend: SessionBackend = backend.parse().map_err(anyhow::Error::msg)?;
            let (directory, sessions) = match backend {
                SessionBackend::Memory => (
                    UserDirectory::Memory(MemoryDirectory::new()),
                    SessionStore::Memory(MemorySessionStore::new(session_ttl)),
                ),
                SessionBackend::Postgres => {
                    let dsn =
                        dsn.context("--dsn is required with the postgres session backend")?;

                    let pool = PgPoolOptions::new()
                        .min_connections(1)
                        .max_connections(5)
                        .max_lifetime(Duration::from_secs(60 * 2))
                        .test_before_acquire(true)
                        .connect(&dsn)
                        .await
                        .context("Failed to connect to database")?;

                    (
                        UserDirectory::Postgres(PgDirectory::new(pool.clone())),
                        SessionStore::Postgres(PgSessionStore::new(pool, session_ttl)),
                    )
                }
            };

            let lockout: Arc<dyn LockoutPolicy> = if lockout_threshold == 0 {
                Arc::new(NoopLockout)
            } else {
                Arc::new(FailureLockout::new(lockout_threshold, lockout_cooldown))
            };

            let expiry: Arc<dyn PasswordExpiryPolicy> = match password_max_age {
                Some(seconds) => Arc::new(RotationExpiry::new(seconds)),
                None => Arc::new(NoopExpiry),
            };

            let limiter: Arc<dyn RateLimiter> =
                Arc::new(WindowRateLimiter::new(rate_limit, rate_window));

            let controller = Arc::new(SessionController::new(
                config, directory, sessions, lockout, expiry, limiter,
            ));

            aula::new(port, controller).await?;
        }
    }

    Ok(())
}
