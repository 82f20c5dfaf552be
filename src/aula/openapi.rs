//! `OpenAPI` document for the session API.

use utoipa::OpenApi;

use super::handlers;
use super::types::{LoginRequest, PublicUser, SessionDetailResponse, SessionResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::sessions::create_session,
        handlers::sessions::upgrade_session,
        handlers::sessions::get_session,
        handlers::sessions::delete_session,
    ),
    components(schemas(LoginRequest, PublicUser, SessionResponse, SessionDetailResponse)),
    tags(
        (name = "sessions", description = "Create, upgrade, inspect and delete login sessions"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_all_session_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        assert!(paths.contains_key("/sessions"));
        assert!(paths.contains_key("/sessions/{id}"));
        assert!(paths.contains_key("/health"));
    }

    #[test]
    fn openapi_info_from_cargo() {
        let doc = ApiDoc::openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));
    }
}
