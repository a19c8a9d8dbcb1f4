//! Login and logout endpoints
//!
//! Credentials are checked against the configured `ADMIN_USER`/`ADMIN_PASS`
//! pair; a successful login sets the signed session cookie.

use axum::{Json, Router, extract::State, routing::post};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Create authentication router
///
/// Routes:
/// - POST /api/login - Credential login
/// - POST /api/admin/login - Alias kept for the admin UI
/// - POST /api/logout - Logout (idempotent, always 200)
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/admin/login", post(login))
        .route("/api/logout", post(logout))
}

/// Login request body
#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

/// POST /api/login
///
/// # Steps
/// 1. Compare both fields case-sensitively against the configured credential
/// 2. Create a server-side session and mint its signed token
/// 3. Set the session cookie (HttpOnly, SameSite=Lax, Secure in production)
///
/// A mismatch in either field returns the same 401, so the response does
/// not reveal which one was wrong.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<serde_json::Value>), AppError> {
    let (Some(expected_user), Some(expected_pass)) = (
        state.config.auth.admin_user.as_deref(),
        state.config.auth.admin_pass.as_deref(),
    ) else {
        tracing::warn!("Login attempt while ADMIN_USER/ADMIN_PASS are not configured");
        return Err(AppError::Unauthorized);
    };

    if body.username != expected_user || body.password != expected_pass {
        tracing::info!(username = %body.username, "Rejected login attempt");
        return Err(AppError::Unauthorized);
    }

    let token = state.sessions.create(&body.username).await?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.should_use_secure_cookies())
        .build();

    tracing::info!(username = %body.username, "Admin logged in");
    Ok((jar.add(cookie), Json(serde_json::json!({ "ok": true }))))
}

/// POST /api/logout
///
/// Destroys the session (if any) and clears the cookie. Always 200:
/// logging out twice, or with no session at all, is not an error.
async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<serde_json::Value>) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value()).await;
    }

    let removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    (jar.remove(removal), Json(serde_json::json!({ "ok": true })))
}
