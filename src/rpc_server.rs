//! SmartMark RPC Server: JSON-RPC over stdin/stdout for a presentation shell.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"bookmarks.submit", "params":{"url":"...","title":"...","tags":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//! Events:   {"event":"ready", ...} once at startup, then
//!           {"event":"bookmarks.changed", "state":{...}} after every state change.
//!
//! Logs go to stderr; stdout carries only protocol lines.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use smartmark::app::App;
use smartmark::rpc_handler::{handle_method, state_value};
use smartmark::services::config_engine::{ConfigEngine, ENV_CONFIG};
use smartmark::services::logging::init_logging;

/// Simple rate limiter: max requests per one-second window.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

/// Single stdout writer so responses and events never interleave mid-line.
fn spawn_writer() -> mpsc::UnboundedSender<Value> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(message) = rx.recv().await {
            let mut line = message.to_string();
            line.push('\n');
            if stdout.write_all(line.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
                break;
            }
        }
    });
    tx
}

/// Pushes a `bookmarks.changed` event whenever controller state changes.
fn spawn_change_events(app: Arc<App>, out: mpsc::UnboundedSender<Value>) {
    let mut changes = app.controller.watch();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let event = match state_value(&app) {
                Ok(state) => json!({"event": "bookmarks.changed", "state": state}),
                Err(e) => {
                    warn!(error = %e, "could not serialize state for change event");
                    continue;
                }
            };
            if out.send(event).is_err() {
                break;
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = ConfigEngine::new(std::env::var(ENV_CONFIG).ok());
    let config = engine.load_with_env()?;
    let _log_guard = init_logging(&config.logging);

    let app = match App::new(config) {
        Ok(app) => Arc::new(app),
        Err(e) => {
            error!(error = %e, "failed to initialize SmartMark");
            return Err(e);
        }
    };
    app.startup().await;

    let out = spawn_writer();
    let _ = out.send(json!({
        "event": "ready",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": app.backend_kind(),
    }));
    spawn_change_events(app.clone(), out.clone());
    info!("rpc server ready");

    // Max 200 RPC requests per second
    let mut rate_limiter = RateLimiter::new(200);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let _ = out.send(json!({"id": null, "error": format!("parse error: {}", e)}));
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            let _ = out.send(json!({"id": id, "error": "rate limit exceeded"}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("").to_string();
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let app = app.clone();
        let out = out.clone();
        tokio::spawn(async move {
            let response = match handle_method(&app, &method, &params).await {
                Ok(val) => json!({"id": id, "result": val}),
                Err(err) => json!({"id": id, "error": err}),
            };
            let _ = out.send(response);
        });
    }

    info!("stdin closed, shutting down");
    app.shutdown();
    Ok(())
}
