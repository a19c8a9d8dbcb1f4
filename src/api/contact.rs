//! Contact-form endpoint
//!
//! Public but rate-limited per client address. The submission is relayed
//! to the outbound email provider; nothing is stored locally.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    response::Json,
};
use serde_json::{Map, Value};

use crate::AppState;
use crate::error::AppError;
use crate::mail::ContactMessage;

/// POST /api/contact
pub async fn submit_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<Value>, AppError> {
    let client = client_key(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    state.contact_limiter.check_and_increment(&client).await?;

    let message = parse_submission(body)?;
    state.mail.relay(&message).await?;

    Ok(Json(serde_json::json!({ "ok": true })))
}

/// Identify the client for rate limiting: first X-Forwarded-For hop when
/// behind a proxy, the socket address otherwise.
fn client_key(headers: &HeaderMap, connect_info: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return forwarded.to_string();
    }

    connect_info
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Validate the posted fields into a [`ContactMessage`].
fn parse_submission(mut body: Map<String, Value>) -> Result<ContactMessage, AppError> {
    let name = take_required(&mut body, "name")?;
    let email = take_required(&mut body, "email")?;
    let message = take_required(&mut body, "message")?;

    Ok(ContactMessage {
        name,
        email,
        message,
        extras: body,
    })
}

/// Pull one required field out of the body as a non-empty string.
fn take_required(body: &mut Map<String, Value>, field: &str) -> Result<String, AppError> {
    body.remove(field)
        .and_then(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        })
        .ok_or_else(|| AppError::Validation(format!("missing required field: {}", field)))
}
