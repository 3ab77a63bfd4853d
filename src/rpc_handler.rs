//! RPC method handler for the SmartMark JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! The `handle_method` function dispatches method calls to the `App` and
//! its synchronization controller. Most bookmark methods answer with the
//! controller snapshot so the presentation shell can re-render from it.

use serde_json::{json, Value};

use crate::app::App;
use crate::types::bookmark::FAVICON_FALLBACK_URL;

fn str_param<'a>(params: &'a Value, name: &str) -> Option<&'a str> {
    params.get(name).and_then(|v| v.as_str())
}

fn required<'a>(params: &'a Value, name: &str) -> Result<&'a str, String> {
    str_param(params, name).ok_or_else(|| format!("missing {}", name))
}

/// Serialized controller snapshot.
pub fn state_value(app: &App) -> Result<Value, String> {
    serde_json::to_value(app.controller.snapshot()).map_err(|e| e.to_string())
}

/// Copies whichever of `url`, `title`, `tags` are present into the draft.
/// Returns whether any field was present.
fn apply_draft_params(app: &App, params: &Value) -> bool {
    let mut touched = false;
    if let Some(url) = str_param(params, "url") {
        app.controller.set_draft_url(url);
        touched = true;
    }
    if let Some(title) = str_param(params, "title") {
        app.controller.set_draft_title(title);
        touched = true;
    }
    if let Some(tags) = str_param(params, "tags") {
        app.controller.set_draft_tags(tags);
        touched = true;
    }
    touched
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
/// Validation and store failures during submit/delete are not RPC errors;
/// they surface as `last_error` in the returned state.
pub async fn handle_method(app: &App, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true, "version": env!("CARGO_PKG_VERSION")})),

        // ─── Session ───
        "session.current" => {
            let user = app.current_user().await;
            serde_json::to_value(user).map_err(|e| e.to_string())
        }
        "auth.signInUrl" => {
            let origin = required(params, "origin")?;
            let url = app.sign_in_url(origin).map_err(|e| e.to_string())?;
            Ok(json!({"url": url}))
        }
        "auth.setAccessToken" => {
            let token = required(params, "access_token")?;
            app.set_access_token(token).await.map_err(|e| e.to_string())?;
            state_value(app)
        }
        "auth.signOut" => {
            app.sign_out().await.map_err(|e| e.to_string())?;
            state_value(app)
        }

        // ─── Bookmarks ───
        "bookmarks.state" => state_value(app),
        "bookmarks.refresh" => {
            app.controller.refresh().await;
            state_value(app)
        }
        "bookmarks.setDraft" => {
            apply_draft_params(app, params);
            serde_json::to_value(app.controller.draft()).map_err(|e| e.to_string())
        }
        "bookmarks.submit" => {
            apply_draft_params(app, params);
            let created = app.controller.submit().await;
            Ok(json!({"bookmark": created, "state": state_value(app)?}))
        }
        "bookmarks.search" => {
            let term = str_param(params, "term").unwrap_or("");
            app.controller.set_search_term(term);
            state_value(app)
        }
        "bookmarks.requestDelete" => {
            let id = required(params, "id")?;
            app.controller.request_delete(id);
            state_value(app)
        }
        "bookmarks.confirmDelete" => {
            let deleted = app.controller.confirm_delete().await;
            Ok(json!({"deleted": deleted, "state": state_value(app)?}))
        }
        "bookmarks.cancelDelete" => {
            app.controller.cancel_delete();
            state_value(app)
        }
        "bookmarks.clearError" => {
            app.controller.clear_error();
            state_value(app)
        }
        "bookmarks.favicon" => {
            let id = required(params, "id")?;
            let bookmark = app
                .controller
                .bookmarks()
                .into_iter()
                .find(|b| b.id == id)
                .ok_or_else(|| format!("bookmark not found: {}", id))?;
            Ok(json!({"url": bookmark.favicon_url(), "fallback": FAVICON_FALLBACK_URL}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
