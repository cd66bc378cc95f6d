use axum::{debug_handler, extract::Path, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Chat-completion routes. The deployment name selects the behavior:
///
/// - `ok`: one choice
/// - `empty`: no choices
/// - `error`: HTTP 500
///
/// A `-<ms>` suffix (`ok-250`) delays the response.
pub fn router() -> Router {
    Router::new()
        .route(
            "/openai/deployments/:deployment/chat/completions",
            post(chat),
        )
        .layer(TraceLayer::new_for_http())
}

pub async fn run(listener: TcpListener) -> anyhow::Result<()> {
    axum::serve(listener, router()).await?;
    Ok(())
}

/// Accepts connections, reads the request and closes the socket without answering.
pub async fn run_dropping(listener: TcpListener) -> anyhow::Result<()> {
    loop {
        let (mut stream, peer) = listener.accept().await?;
        tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            debug!("Dropping connection from {peer}");
        });
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[debug_handler]
pub async fn chat(
    Path(deployment): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let id = REQUESTS.fetch_add(1, Ordering::Relaxed) + 1;

    let (behavior, delay_ms) = match deployment.split_once('-') {
        Some((behavior, delay)) => (behavior, delay.parse::<u64>().unwrap_or(0)),
        None => (deployment.as_str(), 0),
    };
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    match behavior {
        "ok" => {
            let prompt = request
                .messages
                .first()
                .and_then(|m| m.content.as_deref())
                .unwrap_or_default();
            Ok(Json(json!({
                "id": format!("chatcmpl-{id}"),
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": format!("Ack: {prompt}") },
                    "finish_reason": "stop",
                }],
            })))
        }
        "empty" => Ok(Json(json!({
            "id": format!("chatcmpl-{id}"),
            "object": "chat.completion",
            "choices": [],
        }))),
        "error" => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )),
        other => Err((
            StatusCode::NOT_FOUND,
            format!("Unknown deployment {other}"),
        )),
    }
}

/** Request Counter **/

static REQUESTS: AtomicU64 = AtomicU64::new(0);

/// Number of chat requests handled since startup.
pub fn request_count() -> u64 {
    REQUESTS.load(Ordering::Relaxed)
}
