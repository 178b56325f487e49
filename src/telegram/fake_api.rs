//! In-process stand-in for the Telegram Bot API
//!
//! Records every call and serves queued updates, so the client, the
//! messenger adapter and the poller can be tested against real HTTP.

use super::client::TelegramClient;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TOKEN: &str = "TEST";

#[derive(Default)]
struct FakeState {
    calls: Mutex<Vec<(String, Value)>>,
    updates: Mutex<Vec<Value>>,
    reject_markdown: AtomicBool,
}

pub struct FakeTelegram {
    base_url: String,
    state: Arc<FakeState>,
}

impl FakeTelegram {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .route(&format!("/bot{TOKEN}/:method"), post(handle))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn client(&self) -> TelegramClient {
        TelegramClient::new(reqwest::Client::new(), TOKEN, &self.base_url)
    }

    pub fn push_update(&self, update: Value) {
        self.state.updates.lock().unwrap().push(update);
    }

    /// Answer any Markdown `sendMessage` with Telegram's entity parse error
    pub fn reject_markdown(&self) {
        self.state.reject_markdown.store(true, Ordering::SeqCst);
    }

    /// Request bodies for one method, in arrival order
    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.state
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub async fn wait_for_calls(&self, method: &str, count: usize, timeout: Duration) {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.calls_to(method).len() < count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {count} {method} calls"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

async fn handle(
    State(state): State<Arc<FakeState>>,
    Path(method): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let recorded = if content_type.starts_with("application/json") {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    } else {
        json!({"content_type": content_type, "len": body.len()})
    };
    state
        .calls
        .lock()
        .unwrap()
        .push((method.clone(), recorded.clone()));

    match method.as_str() {
        "getMe" => ok(json!({"id": 1, "is_bot": true, "first_name": "podcaster"})),
        "getUpdates" => {
            let offset = recorded["offset"].as_i64().unwrap_or(0);
            let pending: Vec<Value> = state
                .updates
                .lock()
                .unwrap()
                .iter()
                .filter(|u| u["update_id"].as_i64().unwrap_or(0) >= offset)
                .cloned()
                .collect();
            if pending.is_empty() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            ok(Value::Array(pending))
        }
        "sendMessage" => {
            if recorded.get("parse_mode").is_some() && state.reject_markdown.load(Ordering::SeqCst) {
                return error(
                    StatusCode::BAD_REQUEST,
                    "Bad Request: can't parse entities: Can't find end of the entity starting at byte offset 3",
                );
            }
            ok(json!({"message_id": 1, "chat": {"id": recorded["chat_id"]}, "date": 0}))
        }
        "sendAudio" => ok(json!({"message_id": 2, "chat": {"id": 0}, "date": 0})),
        "answerCallbackQuery" | "setMyCommands" => ok(json!(true)),
        _ => error(StatusCode::NOT_FOUND, "Not Found"),
    }
}

fn ok(result: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({"ok": true, "result": result})))
}

fn error(status: StatusCode, description: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({"ok": false, "error_code": status.as_u16(), "description": description})),
    )
}
