//! Site document endpoints
//!
//! The public read never hard-fails: a missing, corrupt, or unreadable
//! document is reported as `data: null` so the marketing site keeps
//! rendering with whatever defaults it ships.

use axum::{extract::State, response::Json};
use serde::Deserialize;
use serde_json::Value;

use crate::AppState;
use crate::auth::CurrentAdmin;
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL};

/// Save request body: `{"data": {...}}`
#[derive(Debug, Deserialize)]
pub struct SaveSiteRequest {
    #[serde(default)]
    pub data: Option<Value>,
}

/// GET /api/site
pub async fn get_site(State(state): State<AppState>) -> Json<Value> {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/site", "200"])
        .inc();

    let data = match state.content.read().await {
        Ok(Some(document)) => Value::Object(document),
        Ok(None) => Value::Null,
        Err(error) => {
            tracing::error!(%error, "Site document read failed; serving null");
            Value::Null
        }
    };

    Json(serde_json::json!({ "ok": true, "data": data }))
}

/// POST /api/site
///
/// Requires an admin session. The body must carry a JSON object under
/// `data`; anything else is a 400, an oversized document is a 413.
pub async fn save_site(
    State(state): State<AppState>,
    CurrentAdmin(_session): CurrentAdmin,
    Json(body): Json<SaveSiteRequest>,
) -> Result<Json<Value>, AppError> {
    // Start timing the request
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/site"])
        .start_timer();

    let Some(Value::Object(candidate)) = body.data else {
        return Err(AppError::Validation("missing data".to_string()));
    };

    let stored = state.content.write(candidate).await?;
    Ok(Json(serde_json::json!({
        "ok": true,
        "data": Value::Object(stored),
    })))
}
