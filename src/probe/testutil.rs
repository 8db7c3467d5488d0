//! Local stand-ins for remote endpoints.

use super::HEALTH_PATH;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::time::Duration;

/// How a fake endpoint answers its health path.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// 200 with a JSON body after the given delay
    Json { delay_ms: u64 },
    /// 200 JSON if `apikey` and bearer token both match, 401 otherwise
    RequireKey(String),
    /// 200 with a text/plain body
    PlainText,
    /// 200 declaring JSON but sending garbage
    BrokenJson,
    /// The given status with a JSON error body
    Status(u16),
}

async fn respond(behavior: Behavior, headers: HeaderMap) -> Response {
    match behavior {
        Behavior::Json { delay_ms } => {
            if delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            Json(serde_json::json!({ "external": { "email": true } })).into_response()
        }
        Behavior::RequireKey(key) => {
            let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
            let bearer = headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());
            let accept = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok());
            let expected = format!("Bearer {}", key);

            if apikey == Some(key.as_str())
                && bearer == Some(expected.as_str())
                && accept == Some("application/json")
            {
                Json(serde_json::json!({ "ok": true })).into_response()
            } else {
                StatusCode::UNAUTHORIZED.into_response()
            }
        }
        Behavior::PlainText => "alive".into_response(),
        Behavior::BrokenJson => {
            ([(header::CONTENT_TYPE, "application/json")], "{not json").into_response()
        }
        Behavior::Status(code) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(serde_json::json!({ "error": code }))).into_response()
        }
    }
}

/// Serve `behavior` on an ephemeral local port and return its base URL.
pub async fn spawn_endpoint(behavior: Behavior) -> String {
    let router = Router::new().route(
        HEALTH_PATH,
        get(move |headers: HeaderMap| respond(behavior.clone(), headers)),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}
