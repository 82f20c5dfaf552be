//! Login error taxonomy and HTTP status mapping.
//!
//! Every exit path of the controller is one of these variants; none are
//! retried locally and none leak internal details to the caller.

use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("Rate limit exceeded in api login.")]
    RateLimited,
    /// Unknown username. Answered with 404 and an empty body so the response
    /// does not distinguish "no such user" from other failures at this stage.
    #[error("unknown username")]
    UnknownIdentity,
    #[error(
        "This account has been temporarily locked due to excessive login failures. \
         Try again later."
    )]
    LockedOut,
    #[error(
        "Your password has expired due to password policy on this account. \
         You must reset your password before you can log in again."
    )]
    PasswordExpired,
    #[error("authentication failed")]
    BadCredentials,
    #[error("account is not active")]
    InactiveAccount,
    /// The target session already carries an authenticated identity. Upgrading
    /// it would silently re-assign the session, so the request is refused.
    #[error("session is already authenticated")]
    AlreadyAuthenticated,
    #[error("session not found")]
    SessionNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LoginError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimited
            | Self::LockedOut
            | Self::PasswordExpired
            | Self::InactiveAccount
            | Self::AlreadyAuthenticated => StatusCode::FORBIDDEN,
            Self::UnknownIdentity | Self::SessionNotFound => StatusCode::NOT_FOUND,
            Self::BadCredentials => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable message included in the response body, where the API
    /// surfaces one. Most failures answer with an empty object.
    #[must_use]
    pub fn public_message(&self) -> Option<String> {
        match self {
            Self::RateLimited | Self::LockedOut | Self::PasswordExpired => Some(self.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn status_mapping_is_fixed() {
        assert_eq!(LoginError::RateLimited.status(), StatusCode::FORBIDDEN);
        assert_eq!(LoginError::UnknownIdentity.status(), StatusCode::NOT_FOUND);
        assert_eq!(LoginError::LockedOut.status(), StatusCode::FORBIDDEN);
        assert_eq!(LoginError::PasswordExpired.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            LoginError::BadCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(LoginError::InactiveAccount.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            LoginError::AlreadyAuthenticated.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(LoginError::SessionNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            LoginError::Internal(anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn only_policy_failures_carry_a_message() {
        assert!(LoginError::RateLimited.public_message().is_some());
        assert!(LoginError::LockedOut.public_message().is_some());
        assert!(LoginError::PasswordExpired.public_message().is_some());
        assert!(LoginError::BadCredentials.public_message().is_none());
        assert!(LoginError::UnknownIdentity.public_message().is_none());
        assert!(LoginError::AlreadyAuthenticated.public_message().is_none());
        assert!(LoginError::Internal(anyhow!("boom")).public_message().is_none());
    }
}
