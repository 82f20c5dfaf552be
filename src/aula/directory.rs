//! User directory: account records and credential checks.
//!
//! The directory owns accounts; the session controller only reads them and
//! records the last login on success. The credential is an opaque hash, and
//! the scheme behind it is not part of this layer's contract.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::Instrument;
use uuid::Uuid;

/// Identifier written into the session's auth-backend field.
pub const DIRECTORY_BACKEND: &str = "aula.directory";

#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub created: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub password_changed: DateTime<Utc>,
    pub organizations: Vec<String>,
    credential: Vec<u8>,
}

impl Account {
    #[must_use]
    pub fn new(username: &str, email: &str, password: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            is_active: true,
            created: now,
            last_login: None,
            password_changed: now,
            organizations: Vec::new(),
            credential: hash_credential(password),
        }
    }

    #[must_use]
    pub fn with_name(mut self, first_name: &str, last_name: &str) -> Self {
        self.first_name = first_name.to_string();
        self.last_name = last_name.to_string();
        self
    }

    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    #[must_use]
    pub fn with_organizations(mut self, organizations: Vec<String>) -> Self {
        self.organizations = organizations;
        self
    }

    #[must_use]
    pub fn with_password_changed(mut self, password_changed: DateTime<Utc>) -> Self {
        self.password_changed = password_changed;
        self
    }
}

/// Username charset check applied before any lookup. Usernames outside the
/// set cannot exist in the directory.
pub fn valid_username(username: &str) -> bool {
    Regex::new(r"^[\w.@+-]+$").is_ok_and(|re| re.is_match(username))
}

/// Hash a password into the opaque credential stored on the account.
/// The controller never compares raw passwords against storage.
fn hash_credential(password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

/// Account storage backend, selected when the server is constructed.
pub enum UserDirectory {
    Memory(MemoryDirectory),
    Postgres(PgDirectory),
}

impl UserDirectory {
    /// Resolve a username to an account record. Lookup is exact-match.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        if !valid_username(username) {
            return Ok(None);
        }

        match self {
            Self::Memory(directory) => Ok(directory.find(username)),
            Self::Postgres(directory) => directory.find_by_username(username).await,
        }
    }

    /// Check a password against the account's stored credential.
    #[must_use]
    pub fn authenticate(&self, account: &Account, password: &SecretString) -> bool {
        account.credential == hash_credential(password.expose_secret())
    }

    /// Record a successful login on the account.
    pub async fn record_login(&self, account_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        match self {
            Self::Memory(directory) => {
                directory.record_login(account_id, at);
                Ok(())
            }
            Self::Postgres(directory) => directory.record_login(account_id, at).await,
        }
    }
}

/// In-memory directory, keyed by username. Clones share the same accounts.
#[derive(Clone, Debug, Default)]
pub struct MemoryDirectory {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, account: Account) {
        if let Ok(mut accounts) = self.accounts.write() {
            accounts.insert(account.username.clone(), account);
        }
    }

    fn find(&self, username: &str) -> Option<Account> {
        self.accounts
            .read()
            .ok()
            .and_then(|accounts| accounts.get(username).cloned())
    }

    fn record_login(&self, account_id: Uuid, at: DateTime<Utc>) {
        if let Ok(mut accounts) = self.accounts.write() {
            for account in accounts.values_mut() {
                if account.id == account_id {
                    account.last_login = Some(at);
                }
            }
        }
    }
}

/// Postgres-backed directory over the `accounts` table (see `sql/schema.sql`).
#[derive(Debug)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        let query = r"
            SELECT id, username, email, first_name, last_name, is_active,
                   created_at, last_login, password_changed_at, organizations, credential
            FROM accounts
            WHERE username = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup account")?;

        Ok(row.map(|row| Account {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            is_active: row.get("is_active"),
            created: row.get("created_at"),
            last_login: row.get("last_login"),
            password_changed: row.get("password_changed_at"),
            organizations: row.get("organizations"),
            credential: row.get("credential"),
        }))
    }

    async fn record_login(&self, account_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let query = "UPDATE accounts SET last_login = $2 WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(account_id)
            .bind(at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to record last login")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn directory_with(account: Account) -> UserDirectory {
        let memory = MemoryDirectory::new();
        memory.insert(account);
        UserDirectory::Memory(memory)
    }

    #[tokio::test]
    async fn find_is_exact_match() -> Result<()> {
        let directory = directory_with(Account::new("staff", "staff@example.com", "edx"));

        assert!(directory.find_by_username("staff").await?.is_some());
        assert!(directory.find_by_username("Staff").await?.is_none());
        assert!(directory.find_by_username("other").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn find_refuses_invalid_usernames() -> Result<()> {
        let directory = directory_with(Account::new("staff", "staff@example.com", "edx"));

        assert!(directory.find_by_username("staff; --").await?.is_none());
        assert!(directory.find_by_username("").await?.is_none());
        Ok(())
    }

    #[test]
    fn username_charset() {
        assert!(valid_username("staff"));
        assert!(valid_username("user.name@example.com"));
        assert!(valid_username("first+last-2"));
        assert!(!valid_username("two words"));
        assert!(!valid_username("semi;colon"));
        assert!(!valid_username(""));
    }

    #[tokio::test]
    async fn authenticate_checks_credential() -> Result<()> {
        let directory = directory_with(Account::new("staff", "staff@example.com", "edx"));
        let account = directory
            .find_by_username("staff")
            .await?
            .context("missing account")?;

        assert!(directory.authenticate(&account, &SecretString::from("edx")));
        assert!(!directory.authenticate(&account, &SecretString::from("wrong")));
        Ok(())
    }

    #[tokio::test]
    async fn record_login_updates_last_login() -> Result<()> {
        let directory = directory_with(Account::new("staff", "staff@example.com", "edx"));
        let account = directory
            .find_by_username("staff")
            .await?
            .context("missing account")?;
        assert!(account.last_login.is_none());

        let now = Utc::now();
        directory.record_login(account.id, now).await?;

        let account = directory
            .find_by_username("staff")
            .await?
            .context("missing account")?;
        assert_eq!(account.last_login, Some(now));
        Ok(())
    }

    #[test]
    fn builders_fill_public_fields() {
        let account = Account::new("staff", "staff@example.com", "edx")
            .with_name("Ada", "Lovelace")
            .with_active(false)
            .with_organizations(vec!["school-of-rock".to_string()]);

        assert_eq!(account.first_name, "Ada");
        assert_eq!(account.last_name, "Lovelace");
        assert!(!account.is_active);
        assert_eq!(account.organizations, vec!["school-of-rock".to_string()]);
    }
}
