//! HTTP gateway in front of the worker.
//!
//! The gateway is the interception surface: every request a page sends at
//! it flows through [`ServiceWorker::handle`]. A handful of `/__worker/*`
//! routes carry the control channel, the sync signal, and cache
//! introspection.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

use vendavoa_core::{EntryKey, Error, ResponseSnapshot};

use crate::worker::{ControlMessage, ServiceWorker};

/// Build the gateway router.
pub fn router(worker: Arc<ServiceWorker>) -> Router {
    Router::new()
        .route("/__worker/state", get(handle_state))
        .route("/__worker/message", post(handle_message))
        .route("/__worker/sync", post(handle_sync))
        .route("/__worker/entry", get(handle_entry))
        .fallback(handle_request)
        .layer(TraceLayer::new_for_http())
        .with_state(worker)
}

/// Serve one intercepted request through the worker.
async fn handle_request(State(worker): State<Arc<ServiceWorker>>, req: Request<Body>) -> Response {
    let method = req.method().as_str().to_string();
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let request = match worker.request_for(&method, &target, headers) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    match worker.handle(&request).await {
        Ok(snapshot) => snapshot_response(snapshot),
        Err(e) => error_response(&e),
    }
}

async fn handle_state(State(worker): State<Arc<ServiceWorker>>) -> Response {
    Json(json!({ "state": worker.state(), "version": worker.version() })).into_response()
}

async fn handle_message(
    State(worker): State<Arc<ServiceWorker>>,
    Json(message): Json<ControlMessage>,
) -> Response {
    match worker.message(message).await {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "ok": true }))).into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
struct SyncParams {
    tag: String,
}

async fn handle_sync(State(worker): State<Arc<ServiceWorker>>, Json(params): Json<SyncParams>) -> Response {
    match worker.sync(&params.tag).await {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "ok": true }))).into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
struct EntryParams {
    url: String,
    #[serde(default = "default_method")]
    method: String,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Metadata view of a cached entry; the body itself is served through the
/// interception path, not here.
#[derive(Debug, Serialize)]
struct EntryMeta {
    method: String,
    url: String,
    status: u16,
    content_type: Option<String>,
    fetched_at: String,
    body_len: usize,
}

async fn handle_entry(State(worker): State<Arc<ServiceWorker>>, Query(params): Query<EntryParams>) -> Response {
    let request = match worker.request_for(&params.method, &params.url, Vec::new()) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    let key = EntryKey::for_request(&request);
    let snapshot = match worker.store().get(&key).await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => return error_response(&Error::CacheMiss(key.to_string())),
        Err(e) => return error_response(&e),
    };

    let meta = EntryMeta {
        method: key.method,
        url: key.url,
        status: snapshot.status,
        content_type: snapshot.content_type,
        fetched_at: snapshot.fetched_at,
        body_len: snapshot.body.len(),
    };

    Json(meta).into_response()
}

fn snapshot_response(snapshot: ResponseSnapshot) -> Response {
    let status = StatusCode::from_u16(snapshot.status).unwrap_or(StatusCode::OK);
    let mut builder = Response::builder().status(status);

    for (name, value) in &snapshot.headers {
        // Hop-by-hop and length headers are the gateway's to manage.
        if matches!(name.as_str(), "connection" | "transfer-encoding" | "content-length") {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(Body::from(snapshot.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn error_response(error: &Error) -> Response {
    let status = match error {
        Error::UnsupportedScheme(_) | Error::InvalidUrl(_) | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::CacheMiss(_) => StatusCode::NOT_FOUND,
        Error::NetworkUnreachable(_) => StatusCode::BAD_GATEWAY,
        Error::InstallFailed(_) | Error::Database(_) | Error::MigrationFailed(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tower::ServiceExt;
    use vendavoa_client::fetch::Network;
    use vendavoa_core::config::AppConfig;
    use vendavoa_core::{CacheDb, WorkerRequest};

    use crate::worker::STATIC_MANIFEST;

    struct FakeNetwork {
        script: Mutex<VecDeque<Result<ResponseSnapshot, Error>>>,
    }

    #[async_trait]
    impl Network for FakeNetwork {
        async fn fetch(&self, _request: &WorkerRequest) -> Result<ResponseSnapshot, Error> {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::NetworkUnreachable("scripted offline".into())))
        }
    }

    fn manifest_network() -> FakeNetwork {
        let script = STATIC_MANIFEST
            .iter()
            .map(|path| {
                let url = format!("http://127.0.0.1:8000{path}");
                Ok(ResponseSnapshot {
                    status: 200,
                    content_type: Some("text/html".to_string()),
                    headers: vec![("content-type".to_string(), "text/html".to_string())],
                    body: Bytes::copy_from_slice(format!("content of {path}").as_bytes()),
                    url: url.clone(),
                    final_url: url,
                    fetched_at: "2024-01-01T00:00:00Z".to_string(),
                })
            })
            .collect::<VecDeque<_>>();
        FakeNetwork { script: Mutex::new(script) }
    }

    async fn installed_worker() -> Arc<ServiceWorker> {
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = ServiceWorker::new(db, Arc::new(manifest_network()), &AppConfig::default()).unwrap();
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        Arc::new(worker)
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_state_endpoint() {
        let app = router(installed_worker().await);

        let response = app
            .oneshot(Request::builder().uri("/__worker/state").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["state"], "active");
        assert_eq!(body["version"], "vendavoa-v1");
    }

    #[tokio::test]
    async fn test_intercepted_request_served_from_cache() {
        let app = router(installed_worker().await);

        // Network script is exhausted after install; only the cache can
        // answer this.
        let response = app
            .oneshot(Request::builder().uri("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "content of /dashboard");
    }

    #[tokio::test]
    async fn test_offline_non_document_maps_to_bad_gateway() {
        let app = router(installed_worker().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/static/img/logo.png")
                    .header("accept", "image/png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_message_endpoint_accepts_force_activate() {
        let app = router(installed_worker().await);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/__worker/message")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"type":"force-activate"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_sync_endpoint() {
        let app = router(installed_worker().await);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/__worker/sync")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"tag":"background-sync"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_entry_endpoint_found_and_missing() {
        let worker = installed_worker().await;
        let app = router(worker);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/__worker/entry?url=/dashboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let meta: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(meta["status"], 200);
        assert_eq!(meta["method"], "GET");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/__worker/entry?url=/never-cached")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
