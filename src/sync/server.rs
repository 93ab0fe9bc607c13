use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::calendar::{Document, DocumentPatch};
use crate::storage::{DocumentStore, StoreError};
use crate::sync::remote_store::DATA_ENDPOINT;

#[derive(Clone)]
pub struct ServerState {
    store: Arc<dyn DocumentStore>,
    write_lock: Arc<Mutex<()>>,
}

impl ServerState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to read data")]
    Read(#[source] StoreError),
    #[error("Failed to write data")]
    Write(#[source] StoreError),
    #[error("Invalid request body: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct WriteResponse {
    ok: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Read(e) | ApiError::Write(e) => {
                tracing::error!("{}: {}", self, e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::BadRequest(reason) => {
                tracing::warn!("Rejected request body: {}", reason);
                StatusCode::BAD_REQUEST
            }
        };
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub fn router(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(DATA_ENDPOINT, get(read_document).put(write_document))
        .with_state(state)
        .layer(cors)
}

async fn read_document(State(state): State<ServerState>) -> Result<Json<Document>, ApiError> {
    tracing::info!("GET {}", DATA_ENDPOINT);
    let document = state.store.read().await.map_err(ApiError::Read)?;
    tracing::info!("Read data, calendars count: {}", document.calendars.len());
    Ok(Json(document))
}

async fn write_document(
    State(state): State<ServerState>,
    body: Result<Json<DocumentPatch>, JsonRejection>,
) -> Result<Json<WriteResponse>, ApiError> {
    let Json(patch) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let _guard = state.write_lock.lock().await;
    let mut document = state.store.read().await.map_err(ApiError::Read)?;
    document.apply_patch(patch);
    state.store.write(&document).await.map_err(ApiError::Write)?;

    tracing::info!("PUT {} stored {} assigned dates", DATA_ENDPOINT, document.assignments.len());
    Ok(Json(WriteResponse { ok: true }))
}

pub async fn serve(bind: &str, store: Arc<dyn DocumentStore>) -> anyhow::Result<()> {
    let app = router(ServerState::new(store.clone()));
    let listener = tokio::net::TcpListener::bind(bind).await?;

    tracing::info!("Serving {} from {} on http://{}", DATA_ENDPOINT, store.describe(), bind);
    println!("tinymonth listening on http://{}{}", listener.local_addr()?, DATA_ENDPOINT);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Calendar;
    use crate::storage::memory_store::MemoryStore;
    use crate::storage::store::MockDocumentStore;
    use axum::body::Body;
    use axum::http::{Request, header};
    use chrono::NaiveDate;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn put(body: &str) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(DATA_ENDPOINT)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request() -> Request<Body> {
        Request::builder().uri(DATA_ENDPOINT).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn get_creates_default_document() {
        let store = Arc::new(MemoryStore::new());
        let app = router(ServerState::new(store.clone()));

        let response = app.oneshot(get_request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["calendars"], serde_json::json!([]));
        assert_eq!(json["activeId"], serde_json::Value::Null);
        assert_eq!(json["version"], 1);
        assert!(store.snapshot().await.is_some());
    }

    #[tokio::test]
    async fn put_replaces_only_supplied_keys() {
        let mut existing = Document::default();
        existing.calendars.push(Calendar::new("Zurich", "#00ff00"));
        existing.active_id = Some("zurich".to_string());
        let store = Arc::new(MemoryStore::with_document(existing));
        let app = router(ServerState::new(store.clone()));

        let response = app
            .oneshot(put(r#"{ "assignments": { "2024-06-02": ["zurich"] } }"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({ "ok": true }));
        let stored = store.snapshot().await.unwrap();
        assert_eq!(stored.calendars.len(), 1);
        assert_eq!(stored.active_id.as_deref(), Some("zurich"));
        assert_eq!(
            stored.assignments[&NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()],
            vec!["zurich"]
        );
    }

    #[tokio::test]
    async fn put_without_version_defaults_to_one() {
        let existing = Document {
            version: 4,
            ..Document::default()
        };
        let store = Arc::new(MemoryStore::with_document(existing));
        let app = router(ServerState::new(store.clone()));

        app.oneshot(put(r#"{ "calendars": [] }"#)).await.unwrap();

        assert_eq!(store.snapshot().await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let app = router(ServerState::new(store.clone()));

        let response = app.oneshot(put("{ not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn read_failure_is_reported_as_server_error() {
        let mut store = MockDocumentStore::new();
        store
            .expect_read()
            .returning(|| Err(StoreError::Io(std::io::Error::other("permission denied"))));
        let app = router(ServerState::new(Arc::new(store)));

        let response = app.oneshot(get_request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Failed to read data");
    }
}
