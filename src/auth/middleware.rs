//! Authentication middleware
//!
//! Protects routes that require an admin session. JSON APIs get a 401;
//! the admin static pages get a redirect to the login page instead,
//! because a browser navigating to /admin/ cannot act on a JSON error.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::routes::SESSION_COOKIE;
use super::session::Session;
use crate::AppState;
use crate::error::AppError;

/// Path browsers are sent to when the admin page gate rejects them.
pub const ADMIN_LOGIN_PAGE: &str = "/admin/login.html";

fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(SESSION_COOKIE)
                .map(|cookie| cookie.value().to_owned())
        })
}

async fn authenticate_request(headers: &HeaderMap, state: &AppState) -> Result<Session, AppError> {
    let token = extract_token_from_headers(headers).ok_or(AppError::Unauthorized)?;
    state
        .sessions
        .authenticate(&token)
        .await
        .ok_or(AppError::Unauthorized)
}

/// Middleware to require authentication for admin pages
///
/// Same session check as the [`CurrentAdmin`] extractor, but
/// unauthenticated browsers are redirected to the login page instead of
/// receiving a 401. The login page itself passes through, otherwise
/// nobody could ever log in.
pub async fn require_admin_page(
    State(state): State<AppState>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    // The router nests this behind /admin, so the prefix is already
    // stripped from the path seen here.
    if request.uri().path().ends_with("/login.html") {
        return next.run(request).await;
    }

    match authenticate_request(request.headers(), &state).await {
        Ok(session) => {
            let mut request = request;
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(_) => Redirect::to(ADMIN_LOGIN_PAGE).into_response(),
    }
}

/// Extractor for the current authenticated admin
///
/// Use in handlers to get the current session.
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentAdmin(session): CurrentAdmin,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", session.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentAdmin(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(CurrentAdmin(session));
        }

        let state = AppState::from_ref(state);
        let session = authenticate_request(&parts.headers, &state).await?;
        parts.extensions.insert(session.clone());

        Ok(CurrentAdmin(session))
    }
}
