//! Request/response types for the session endpoints.

use crate::aula::controller::LoginOutcome;
use crate::aula::directory::Account;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Public view of an account. Never exposes credential material.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub created: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub organizations: Vec<String>,
}

impl From<&Account> for PublicUser {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            username: account.username.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            created: account.created,
            last_login: account.last_login,
            organizations: account.organizations.clone(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub token: String,
    /// Seconds until the session expires.
    pub expires: i64,
    pub user: PublicUser,
    pub uri: String,
    pub csrftoken: String,
}

impl SessionResponse {
    #[must_use]
    pub fn from_outcome(outcome: &LoginOutcome, uri: String) -> Self {
        Self {
            token: outcome.session.token.clone(),
            expires: outcome.session.expires_in,
            user: PublicUser::from(&outcome.account),
            uri,
            csrftoken: outcome.csrf_token.clone(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionDetailResponse {
    pub token: String,
    /// Seconds until the session expires.
    pub expires: i64,
    pub uri: String,
    pub user_id: Uuid,
}
