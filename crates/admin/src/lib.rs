//! Galéria Umenia admin library.
//!
//! Artwork management and order review for gallery staff, behind HTTP Basic
//! authentication. The router is built here so it can be tested in-process.
//!
//! # Security
//!
//! The panel can edit and delete every listing and shows buyer contact
//! details. Bind it to a private interface or put it behind a VPN.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod storage;

use std::path::Path;

use axum::{Router, extract::DefaultBodyLimit, middleware::from_fn};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Request body limit: one image plus the text fields.
const BODY_LIMIT_BYTES: usize = storage::MAX_IMAGE_BYTES + 1024 * 1024;

/// Build the admin router with its middleware stack.
pub fn app(state: AppState, upload_dir: &Path) -> Router {
    Router::new()
        .merge(routes::routes(&state, upload_dir))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(from_fn(middleware::security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AdminCredentials;
    use crate::storage::LocalImageStore;

    const PASSWORD: &str = "Xk9#mQ2vLp7&Rt4z";
    const BOUNDARY: &str = "galeria-boundary";

    fn test_app() -> Router {
        // Never connects: none of these requests reach the database
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/galeria_test")
            .unwrap();
        let dir = std::env::temp_dir().join(format!("galeria-admin-{}", uuid::Uuid::new_v4()));
        let images = Arc::new(LocalImageStore::new(&dir, "/uploads"));
        let credentials = AdminCredentials {
            username: "galeria".to_string(),
            password: SecretString::from(PASSWORD),
        };
        app(AppState::from_parts(pool, images, credentials), &dir)
    }

    fn basic(username: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_panel_requires_credentials() {
        let response = test_app()
            .oneshot(Request::get("/obrazy/novy").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(challenge.starts_with("Basic realm="));
    }

    #[tokio::test]
    async fn test_uploads_require_credentials() {
        let response = test_app()
            .oneshot(Request::get("/uploads/a.jpg").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let response = test_app()
            .oneshot(
                Request::get("/obrazy/novy")
                    .header(header::AUTHORIZATION, basic("galeria", "Xk9#mQ2vLp7&Rt4Z"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_new_form_renders() {
        let response = test_app()
            .oneshot(
                Request::get("/obrazy/novy")
                    .header(header::AUTHORIZATION, basic("galeria", PASSWORD))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::X_FRAME_OPTIONS).unwrap(),
            "DENY"
        );
        let html = body_text(response).await;
        assert!(html.contains("Pridať obraz"));
        assert!(html.contains("enctype=\"multipart/form-data\""));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_form_without_touching_storage() {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"title\"\r\n\r\n\
             \r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"price\"\r\n\r\n\
             0\r\n\
             --{BOUNDARY}--\r\n"
        );

        let response = test_app()
            .oneshot(
                Request::post("/obrazy")
                    .header(header::AUTHORIZATION, basic("galeria", PASSWORD))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response).await;
        assert!(html.contains("Názov obrazu je povinný"));
        assert!(html.contains("Cena musí byť väčšia ako 0"));
        assert!(html.contains("Obrázok je povinný"));
    }

    #[tokio::test]
    async fn test_edit_with_malformed_id_is_not_found() {
        let response = test_app()
            .oneshot(
                Request::get("/obrazy/nie-je-id/upravit")
                    .header(header::AUTHORIZATION, basic("galeria", PASSWORD))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
