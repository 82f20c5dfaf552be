//! Opaque server-side session storage.
//!
//! The store owns session lifetime: expiry is enforced here, not in the
//! controller. Backends are chosen at construction time via
//! [`SessionBackend`]; there is no runtime engine lookup.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

/// Fields a session may carry. A session is anonymous until `user_id` is set,
/// and it carries at most one identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFields {
    pub user_id: Option<Uuid>,
    pub auth_backend: Option<String>,
    pub csrf_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub fields: SessionFields,
    /// Seconds until the store expires this session.
    pub expires_in: i64,
}

impl Session {
    /// A fresh anonymous session under the given token, not yet persisted.
    #[must_use]
    pub fn anonymous(token: String, ttl_seconds: i64) -> Self {
        Self {
            token,
            fields: SessionFields::default(),
            expires_in: ttl_seconds,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.fields.user_id.is_some()
    }
}

/// Create a new random session token.
/// The raw value is only returned to the caller; the database stores a hash.
pub fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Hash a session token so raw values never touch the database.
pub(crate) fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Memory,
    Postgres,
}

impl FromStr for SessionBackend {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "memory" => Ok(Self::Memory),
            "postgres" => Ok(Self::Postgres),
            other => Err(format!("unknown session backend: {other}")),
        }
    }
}

/// Session storage backend, selected when the server is constructed.
pub enum SessionStore {
    Memory(MemorySessionStore),
    Postgres(PgSessionStore),
}

impl SessionStore {
    /// Create and persist a new anonymous session.
    pub async fn create(&self) -> Result<Session> {
        match self {
            Self::Memory(store) => store.create().await,
            Self::Postgres(store) => store.create().await,
        }
    }

    /// Load a live session by token. Expired and unknown tokens are `None`.
    pub async fn load(&self, token: &str) -> Result<Option<Session>> {
        match self {
            Self::Memory(store) => store.load(token).await,
            Self::Postgres(store) => store.load(token).await,
        }
    }

    /// Persist the session's fields and renew its expiry. Returns the
    /// seconds until the expiry as saved.
    pub async fn save(&self, session: &Session) -> Result<i64> {
        match self {
            Self::Memory(store) => store.save(session).await,
            Self::Postgres(store) => store.save(session).await,
        }
    }

    /// Remove a session. Unknown tokens are not an error.
    pub async fn delete(&self, token: &str) -> Result<()> {
        match self {
            Self::Memory(store) => store.delete(token).await,
            Self::Postgres(store) => store.delete(token).await,
        }
    }
}

#[derive(Debug)]
struct StoredSession {
    fields: SessionFields,
    expires_at: DateTime<Utc>,
}

/// In-memory session store with TTL-based expiry. Clones share the same
/// sessions.
#[derive(Clone, Debug)]
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: Arc<Mutex<HashMap<String, StoredSession>>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_seconds),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of live sessions. Expired entries are pruned first.
    pub async fn len(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();
        sessions.retain(|_, stored| stored.expires_at > now);
        sessions.len()
    }

    async fn create(&self) -> Result<Session> {
        let token = generate_token()?;
        let expires_at = Utc::now() + self.ttl;
        let mut sessions = self.sessions.lock().await;
        sessions.insert(
            token.clone(),
            StoredSession {
                fields: SessionFields::default(),
                expires_at,
            },
        );
        Ok(Session {
            token,
            fields: SessionFields::default(),
            expires_in: self.ttl.num_seconds(),
        })
    }

    async fn load(&self, token: &str) -> Result<Option<Session>> {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();
        sessions.retain(|_, stored| stored.expires_at > now);
        Ok(sessions.get(token).map(|stored| Session {
            token: token.to_string(),
            fields: stored.fields.clone(),
            expires_in: (stored.expires_at - now).num_seconds(),
        }))
    }

    async fn save(&self, session: &Session) -> Result<i64> {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(
            session.token.clone(),
            StoredSession {
                fields: session.fields.clone(),
                expires_at: Utc::now() + self.ttl,
            },
        );
        Ok(self.ttl.num_seconds())
    }

    async fn delete(&self, token: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(token);
        Ok(())
    }
}

/// Postgres-backed session store over the `sessions` table (see
/// `sql/schema.sql`). Only token hashes are stored.
#[derive(Debug)]
pub struct PgSessionStore {
    pool: PgPool,
    ttl_seconds: i64,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool, ttl_seconds: i64) -> Self {
        Self { pool, ttl_seconds }
    }

    async fn create(&self) -> Result<Session> {
        let query = r"
            INSERT INTO sessions (token_hash, expires_at)
            VALUES ($1, NOW() + ($2 * INTERVAL '1 second'))
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );

        // Retry a few times in case of a token collision.
        for _ in 0..3 {
            let token = generate_token()?;
            let result = sqlx::query(query)
                .bind(hash_token(&token))
                .bind(self.ttl_seconds)
                .execute(&self.pool)
                .instrument(span.clone())
                .await;

            match result {
                Ok(_) => {
                    return Ok(Session::anonymous(token, self.ttl_seconds));
                }
                Err(err) if is_unique_violation(&err) => {}
                Err(err) => return Err(err).context("failed to create session"),
            }
        }

        anyhow::bail!("failed to create session after repeated token collisions")
    }

    async fn load(&self, token: &str) -> Result<Option<Session>> {
        let query = r"
            SELECT user_id, auth_backend, csrf_token,
                   GREATEST(0, EXTRACT(EPOCH FROM expires_at - NOW()))::BIGINT AS expires_in
            FROM sessions
            WHERE token_hash = $1 AND expires_at > NOW()
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(hash_token(token))
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to load session")?;

        Ok(row.map(|row| Session {
            token: token.to_string(),
            fields: SessionFields {
                user_id: row.get("user_id"),
                auth_backend: row.get("auth_backend"),
                csrf_token: row.get("csrf_token"),
            },
            expires_in: row.get("expires_in"),
        }))
    }

    async fn save(&self, session: &Session) -> Result<i64> {
        let query = r"
            INSERT INTO sessions (token_hash, user_id, auth_backend, csrf_token, expires_at)
            VALUES ($1, $2, $3, $4, NOW() + ($5 * INTERVAL '1 second'))
            ON CONFLICT (token_hash) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                auth_backend = EXCLUDED.auth_backend,
                csrf_token = EXCLUDED.csrf_token,
                expires_at = EXCLUDED.expires_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(hash_token(&session.token))
            .bind(session.fields.user_id)
            .bind(session.fields.auth_backend.as_deref())
            .bind(session.fields.csrf_token.as_deref())
            .bind(self.ttl_seconds)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to save session")?;

        Ok(self.ttl_seconds)
    }

    async fn delete(&self, token: &str) -> Result<()> {
        let query = "DELETE FROM sessions WHERE token_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(hash_token(token))
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete session")?;

        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
