//! Sitekeeper - a lightweight, single-operator CMS backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Site document read/write                                 │
//! │  - Login/logout, uploads, contact relay, AI proxy           │
//! │  - Static public/admin assets                               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Domain Layer                             │
//! │  - Session table + signed tokens                            │
//! │  - Content store (atomic JSON document replace)             │
//! │  - Mail relay + per-client rate limiter                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Storage Layer                           │
//! │  - <DATA_DIR>/site-data.json                                │
//! │  - <DATA_DIR>/uploads/                                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers for content, uploads, contact, and the AI proxy
//! - `auth`: credential login, sessions, authentication gates
//! - `content`: the single persisted JSON site document
//! - `storage`: uploaded assets on local disk
//! - `mail`: outbound contact-form relay and its rate limiter
//! - `config`: configuration management
//! - `error`: error types

pub mod api;
pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod mail;
pub mod metrics;
pub mod storage;

use std::sync::Arc;

/// Request-body ceiling: the document ceiling plus envelope headroom.
const MAX_REQUEST_BODY_BYTES: usize = content::MAX_DOCUMENT_BYTES + 2 * 1024 * 1024;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the session table, content store,
/// and HTTP client.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Session table (volatile; sessions die with the process)
    pub sessions: Arc<auth::SessionStore>,

    /// Content store for the site document
    pub content: Arc<content::ContentStore>,

    /// Upload storage on local disk
    pub uploads: Arc<storage::UploadStorage>,

    /// Outbound contact-form relay
    pub mail: Arc<mail::MailRelay>,

    /// Rate limiter for the contact endpoint, keyed by client address
    pub contact_limiter: Arc<mail::RateLimiter>,

    /// HTTP client for outbound calls (mail relay, AI proxy)
    pub http_client: Arc<reqwest::Client>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Ensure the data directory exists
    /// 2. Build the session table (generating a secret if none is set)
    /// 3. Open the content store and upload storage
    /// 4. Build the shared HTTP client and mail relay
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Data directory
        tokio::fs::create_dir_all(&config.content.data_dir)
            .await
            .map_err(|error| {
                error::AppError::Storage(format!(
                    "Failed to create {}: {}",
                    config.content.data_dir.display(),
                    error
                ))
            })?;

        // 2. Sessions
        let secret = config.session_secret_or_generate();
        let sessions = auth::SessionStore::new(secret, config.auth.session_max_age);
        tracing::info!(
            max_age_seconds = config.auth.session_max_age,
            "Session table initialized"
        );

        // 3. Content + uploads
        let content = content::ContentStore::new(config.content.document_path());
        let uploads = storage::UploadStorage::new(config.content.uploads_dir());
        tracing::info!(data_dir = %config.content.data_dir.display(), "Content store ready");

        // 4. HTTP client, mail relay, contact limiter
        let http_client = Arc::new(
            reqwest::Client::builder()
                .user_agent("Sitekeeper/0.1.0")
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .map_err(|e| error::AppError::Internal(e.into()))?,
        );
        let mail = mail::MailRelay::new(&config.contact, http_client.clone());
        if !mail.is_configured() {
            tracing::warn!("Contact relay is not configured; /api/contact will return 500");
        }
        let contact_limiter = mail::RateLimiter::new(
            config.contact.rate_limit_per_minute,
            std::time::Duration::from_secs(60),
        );

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            content: Arc::new(content),
            uploads: Arc::new(uploads),
            mail: Arc::new(mail),
            contact_limiter: Arc::new(contact_limiter),
            http_client,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{any, get, post},
    };
    use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    // Admin pages are static files behind the redirecting session gate.
    let admin_pages = tower::ServiceBuilder::new()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin_page,
        ))
        .service(ServeDir::new(&state.config.server.admin_dir));

    Router::new()
        .route("/health", get(health_check))
        .merge(auth::auth_router())
        .route("/api/site", get(api::get_site).post(api::save_site))
        .route("/api/upload", post(api::upload))
        .route("/api/contact", post(api::submit_contact))
        .route("/api/gemini/*path", any(api::proxy_gemini))
        .nest_service("/uploads", ServeDir::new(state.config.content.uploads_dir()))
        .nest_service("/admin", admin_pages)
        .fallback_service(ServeDir::new(&state.config.server.public_dir))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
