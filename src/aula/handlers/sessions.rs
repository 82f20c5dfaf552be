//! Session endpoints: create/upgrade, detail, delete.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use super::extract_client_ip;
use crate::aula::{
    controller::SessionController,
    error::LoginError,
    types::{LoginRequest, SessionDetailResponse, SessionResponse},
};

#[utoipa::path(
    post,
    path = "/sessions",
    request_body = LoginRequest,
    responses(
        (status = 201, description = "New session created", body = SessionResponse),
        (status = 400, description = "Missing payload", body = String),
        (status = 401, description = "Bad credentials"),
        (status = 403, description = "Rate limited, locked out, password expired or inactive account"),
        (status = 404, description = "Unknown username")
    ),
    tag = "sessions"
)]
pub async fn create_session(
    headers: HeaderMap,
    controller: Extension<Arc<SessionController>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    login_user(&headers, &controller, payload, None).await
}

#[utoipa::path(
    post,
    path = "/sessions/{id}",
    request_body = LoginRequest,
    params(
        ("id" = String, Path, description = "Session token to upgrade")
    ),
    responses(
        (status = 200, description = "Session upgraded", body = SessionResponse),
        (status = 400, description = "Missing payload", body = String),
        (status = 401, description = "Bad credentials"),
        (status = 403, description = "Refused; includes sessions already carrying an identity"),
        (status = 404, description = "Unknown username")
    ),
    tag = "sessions"
)]
pub async fn upgrade_session(
    Path(session_id): Path<String>,
    headers: HeaderMap,
    controller: Extension<Arc<SessionController>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    login_user(&headers, &controller, payload, Some(session_id)).await
}

/// Shared login flow for both the create and upgrade routes.
async fn login_user(
    headers: &HeaderMap,
    controller: &SessionController,
    payload: Option<Json<LoginRequest>>,
    session_id: Option<String>,
) -> Response {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let password = SecretString::from(request.password);
    let client_ip = extract_client_ip(headers);

    match controller
        .login(
            &request.username,
            &password,
            session_id.as_deref(),
            client_ip.as_deref(),
        )
        .await
    {
        Ok(outcome) => {
            let status = if outcome.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            let uri = controller.config().session_uri(&outcome.session.token);
            let response = SessionResponse::from_outcome(&outcome, uri);
            (status, Json(response)).into_response()
        }
        Err(err) => error_response(&err),
    }
}

#[utoipa::path(
    get,
    path = "/sessions/{id}",
    params(
        ("id" = String, Path, description = "Session token")
    ),
    responses(
        (status = 200, description = "Authenticated session details", body = SessionDetailResponse),
        (status = 404, description = "No authenticated session for this token")
    ),
    tag = "sessions"
)]
pub async fn get_session(
    Path(session_id): Path<String>,
    controller: Extension<Arc<SessionController>>,
) -> impl IntoResponse {
    match controller.get_session(&session_id).await {
        Ok(session) => {
            // get_session only returns authenticated sessions.
            let Some(user_id) = session.fields.user_id else {
                return error_response(&LoginError::SessionNotFound);
            };
            let response = SessionDetailResponse {
                token: session.token.clone(),
                expires: session.expires_in,
                uri: controller.config().session_uri(&session.token),
                user_id,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => error_response(&err),
    }
}

#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    params(
        ("id" = String, Path, description = "Session token")
    ),
    responses(
        (status = 204, description = "Session deleted, or nothing to delete")
    ),
    tag = "sessions"
)]
pub async fn delete_session(
    Path(session_id): Path<String>,
    controller: Extension<Arc<SessionController>>,
) -> impl IntoResponse {
    match controller.delete_session(&session_id).await {
        // Idempotent: deleting nothing still answers 204.
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err),
    }
}

fn error_response(err: &LoginError) -> Response {
    if let LoginError::Internal(inner) = err {
        error!("Session operation failed: {inner:#}");
    }
    let body = match err.public_message() {
        Some(message) => json!({ "message": message }),
        None => json!({}),
    };
    (err.status(), Json(body)).into_response()
}
