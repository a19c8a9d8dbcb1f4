//! Generative-AI proxy
//!
//! Authenticated pass-through to the upstream Gemini API. The admin UI
//! talks to this endpoint so the provider key never reaches the browser.
//! Upstream status and body are forwarded verbatim, success or not.

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, Method, header},
    response::{IntoResponse, Response},
};

use crate::AppState;
use crate::auth::CurrentAdmin;
use crate::error::AppError;
use crate::metrics::AI_PROXY_REQUESTS_TOTAL;

/// Handler for `/api/gemini/{*path}`
pub async fn proxy_gemini(
    State(state): State<AppState>,
    CurrentAdmin(_session): CurrentAdmin,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let Some(api_key) = state
        .config
        .gemini
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
    else {
        return Err(AppError::Config(
            "AI proxy is not configured (GEMINI_API_KEY)".to_string(),
        ));
    };

    let mut url = format!(
        "{}/{}",
        state.config.gemini.api_base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(&query);
    }

    let mut request = state
        .http_client
        .request(method, url.as_str())
        .header("x-goog-api-key", api_key);
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        request = request.header(header::CONTENT_TYPE, content_type.clone());
    }
    if !body.is_empty() {
        request = request.body(body);
    }

    let upstream = request.send().await.inspect_err(|_| {
        AI_PROXY_REQUESTS_TOTAL.with_label_values(&["unreachable"]).inc();
    })?;

    let status = upstream.status();
    AI_PROXY_REQUESTS_TOTAL
        .with_label_values(&[status.as_str()])
        .inc();
    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), url = %url, "AI upstream returned non-success");
    }

    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = upstream.bytes().await?;

    let mut response = (status, bytes).into_response();
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }

    Ok(response)
}
