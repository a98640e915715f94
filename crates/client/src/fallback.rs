//! Offline fallback synthesis.
//!
//! Two synthetic-response templates, built entirely from constants. Neither
//! touches the cache or the network; they are the last resort when a request
//! can be satisfied by neither.

use bytes::Bytes;
use chrono::Utc;
use serde_json::json;

use vendavoa_core::{ResponseSnapshot, WorkerRequest};

/// Body message for the API fallback.
pub const OFFLINE_API_MESSAGE: &str = "No connection and this data is not available offline";

/// Self-contained offline page served for failed document requests.
pub const OFFLINE_PAGE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>VendaVoa - Offline</title>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body {
            font-family: Arial, sans-serif;
            text-align: center;
            padding: 50px;
            background: #f5f5f5;
        }
        .offline-message {
            background: white;
            padding: 2rem;
            border-radius: 8px;
            box-shadow: 0 2px 10px rgba(0,0,0,0.1);
            max-width: 400px;
            margin: 0 auto;
        }
        h1 { color: #2563eb; }
        .retry-btn {
            background: #2563eb;
            color: white;
            border: none;
            padding: 10px 20px;
            border-radius: 5px;
            cursor: pointer;
            margin-top: 20px;
        }
    </style>
</head>
<body>
    <div class="offline-message">
        <h1>VendaVoa</h1>
        <h2>You are offline</h2>
        <p>Check your internet connection and try again.</p>
        <button class="retry-btn" onclick="window.location.reload()">
            Try Again
        </button>
    </div>
</body>
</html>
"#;

/// Synthetic response for a dynamic/API request that could reach neither
/// network nor cache: a JSON error body with status 503.
pub fn api_fallback(request: &WorkerRequest) -> ResponseSnapshot {
    let body = json!({ "error": OFFLINE_API_MESSAGE }).to_string();
    synthesize(request, 503, "application/json", Bytes::from(body))
}

/// Synthetic response for a failed document request: the offline page.
///
/// Status stays 200; the page itself is a valid deliverable even though it
/// tells the user the app is offline.
pub fn document_fallback(request: &WorkerRequest) -> ResponseSnapshot {
    synthesize(request, 200, "text/html", Bytes::from_static(OFFLINE_PAGE_HTML.as_bytes()))
}

fn synthesize(request: &WorkerRequest, status: u16, content_type: &str, body: Bytes) -> ResponseSnapshot {
    ResponseSnapshot {
        status,
        content_type: Some(content_type.to_string()),
        headers: vec![("content-type".to_string(), content_type.to_string())],
        body,
        url: request.url.to_string(),
        final_url: request.url.to_string(),
        fetched_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    }
}
