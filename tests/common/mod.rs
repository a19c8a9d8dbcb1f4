//! Common test utilities for E2E tests

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use sitekeeper::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Credentials used by every test server
pub const TEST_USER: &str = "testadmin";
pub const TEST_PASS: &str = "correct-horse-battery";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a test server with default configuration
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server, letting the caller adjust the configuration
    /// (e.g. point the mail relay or AI proxy at a mock upstream).
    pub async fn with_config<F>(customize: F) -> Self
    where
        F: FnOnce(&mut config::AppConfig),
    {
        // Everything lives under one temporary directory
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");
        let public_dir = temp_dir.path().join("public");
        let admin_dir = temp_dir.path().join("admin");

        // Minimal static assets so the page routes have something to serve
        std::fs::create_dir_all(&public_dir).unwrap();
        std::fs::create_dir_all(&admin_dir).unwrap();
        std::fs::write(public_dir.join("index.html"), "<h1>Public site</h1>").unwrap();
        std::fs::write(admin_dir.join("index.html"), "<h1>Admin panel</h1>").unwrap();
        std::fs::write(admin_dir.join("login.html"), "<h1>Admin login</h1>").unwrap();

        let mut config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
                public_dir,
                admin_dir,
            },
            content: config::ContentConfig { data_dir },
            auth: config::AuthConfig {
                admin_user: Some(TEST_USER.to_string()),
                admin_pass: Some(TEST_PASS.to_string()),
                session_secret: Some("test-secret-key-32-bytes-long!!!".to_string()),
                session_max_age: 43_200,
            },
            contact: config::ContactConfig {
                api_key: None,
                to_email: None,
                from_email: None,
                api_base: "http://127.0.0.1:1/unconfigured".to_string(),
                rate_limit_per_minute: 10,
            },
            gemini: config::GeminiConfig {
                api_key: None,
                api_base: "http://127.0.0.1:1/unconfigured".to_string(),
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        customize(&mut config);

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = sitekeeper::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Log in with the test credentials and return the session cookie
    /// (`session=<token>`) ready for a `Cookie` header.
    pub async fn login(&self) -> String {
        let response = self
            .client
            .post(self.url("/api/login"))
            .json(&serde_json::json!({
                "username": TEST_USER,
                "password": TEST_PASS,
            }))
            .send()
            .await
            .expect("login request succeeds");
        assert_eq!(response.status(), 200, "test login must succeed");

        let set_cookie = response
            .headers()
            .get("set-cookie")
            .and_then(|v| v.to_str().ok())
            .expect("login sets the session cookie");
        set_cookie
            .split(';')
            .next()
            .expect("cookie pair precedes attributes")
            .to_string()
    }
}

/// One request captured by [`MockUpstream`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// A canned upstream (mail provider, AI API) listening on localhost.
///
/// Records every request it receives and answers with a fixed status
/// and body.
pub struct MockUpstream {
    pub addr: String,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockUpstream {
    pub async fn start(status: u16, response_body: &'static str) -> Self {
        use axum::body::Bytes;
        use axum::http::{StatusCode, Uri, header};

        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();

        let app = axum::Router::new().fallback(
            move |method: axum::http::Method,
                  uri: Uri,
                  headers: axum::http::HeaderMap,
                  body: Bytes| {
                let recorded = recorded.clone();
                async move {
                    let captured_headers = headers
                        .iter()
                        .map(|(name, value)| {
                            (
                                name.as_str().to_string(),
                                value.to_str().unwrap_or("").to_string(),
                            )
                        })
                        .collect();
                    recorded.lock().unwrap().push(RecordedRequest {
                        method: method.to_string(),
                        path: uri
                            .path_and_query()
                            .map(|pq| pq.to_string())
                            .unwrap_or_else(|| uri.path().to_string()),
                        headers: captured_headers,
                        body: body.to_vec(),
                    });
                    (
                        StatusCode::from_u16(status).unwrap(),
                        [(header::CONTENT_TYPE, "application/json")],
                        response_body,
                    )
                }
            },
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        Self { addr, requests }
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Value of a header on the most recent request, if any
    pub fn last_header(&self, name: &str) -> Option<String> {
        let requests = self.requests.lock().unwrap();
        let last = requests.last()?;
        last.headers
            .iter()
            .find(|(header_name, _)| header_name.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }
}
