//! Landing page and static assets.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use axum_helpers::ErrorResponse;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::error;

use crate::config::AssetsConfig;

const INDEX_TEMPLATE: &str = "index.html";

/// `GET /` and `/static/*`
pub fn router(assets: &AssetsConfig) -> Router {
    let index_path = Arc::new(assets.templates_dir.join(INDEX_TEMPLATE));

    Router::new()
        .route("/", get(index))
        .with_state(index_path)
        .nest_service("/static", ServeDir::new(&assets.static_dir))
}

/// The page is read on every request so template edits show up without a restart.
async fn index(State(path): State<Arc<PathBuf>>) -> Response {
    match tokio::fs::read_to_string(path.as_ref()).await {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            error!(path = %path.display(), error = %e, "Error serving index.html");
            ErrorResponse::new(e.to_string()).into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn assets(dir: &std::path::Path) -> AssetsConfig {
        AssetsConfig {
            templates_dir: dir.join("templates"),
            static_dir: dir.join("static"),
        }
    }

    #[tokio::test]
    async fn test_index_serves_template() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("templates")).unwrap();
        std::fs::write(
            dir.path().join("templates").join(INDEX_TEMPLATE),
            "<h1>Cost assistant</h1>",
        )
        .unwrap();

        let response = router(&assets(dir.path()))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"<h1>Cost assistant</h1>");
    }

    #[tokio::test]
    async fn test_missing_template_returns_500_with_error() {
        let dir = tempfile::tempdir().unwrap();

        let response = router(&assets(dir.path()))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_static_assets_are_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("static/js")).unwrap();
        std::fs::write(dir.path().join("static/js/chat.js"), "console.log('hi');").unwrap();

        let response = router(&assets(dir.path()))
            .oneshot(
                Request::builder()
                    .uri("/static/js/chat.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
