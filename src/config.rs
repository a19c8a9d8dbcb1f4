//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)
//!
//! The flat, well-known variables (`ADMIN_USER`, `ADMIN_PASS`,
//! `SESSION_SECRET`, `DATA_DIR`, `BREVO_API_KEY`, `CONTACT_TO_EMAIL`,
//! `CONTACT_FROM_EMAIL`, `GEMINI_API_KEY`) take precedence over everything
//! else, so a plain `.env`-style deployment needs no config file at all.

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub content: ContentConfig,
    pub auth: AuthConfig,
    pub contact: ContactConfig,
    pub gemini: GeminiConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "www.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
    /// Directory of public static assets
    pub public_dir: PathBuf,
    /// Directory of admin static assets (session-gated)
    pub admin_dir: PathBuf,
}

impl ServerConfig {
    /// Get the base URL for the site
    ///
    /// # Returns
    /// Full URL like "https://www.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Content store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    /// Root directory for the site document and uploads
    pub data_dir: PathBuf,
}

impl ContentConfig {
    /// Path of the single persisted site document
    pub fn document_path(&self) -> PathBuf {
        self.data_dir.join("site-data.json")
    }

    /// Directory of publicly served uploads
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Admin username (`ADMIN_USER`)
    pub admin_user: Option<String>,
    /// Admin password (`ADMIN_PASS`)
    pub admin_pass: Option<String>,
    /// Session secret key (32+ bytes); generated at startup when absent
    pub session_secret: Option<String>,
    /// Session max age in seconds (default: 43200 = 12 hours)
    pub session_max_age: i64,
}

/// Contact-form relay configuration (Brevo transactional email)
#[derive(Debug, Clone, Deserialize)]
pub struct ContactConfig {
    /// Provider API key (`BREVO_API_KEY`)
    pub api_key: Option<String>,
    /// Recipient address (`CONTACT_TO_EMAIL`)
    pub to_email: Option<String>,
    /// Sender address (`CONTACT_FROM_EMAIL`)
    pub from_email: Option<String>,
    /// Provider endpoint; overridable so tests can target a local mock
    pub api_base: String,
    /// Max contact submissions per client per rolling minute
    pub rate_limit_per_minute: u32,
}

/// Generative-AI proxy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    /// Upstream API key (`GEMINI_API_KEY`)
    pub api_key: Option<String>,
    /// Upstream base URL; overridable so tests can target a local mock
    pub api_base: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

/// Well-known flat environment variables and the config keys they override.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("ADMIN_USER", "auth.admin_user"),
    ("ADMIN_PASS", "auth.admin_pass"),
    ("SESSION_SECRET", "auth.session_secret"),
    ("DATA_DIR", "content.data_dir"),
    ("BREVO_API_KEY", "contact.api_key"),
    ("CONTACT_TO_EMAIL", "contact.to_email"),
    ("CONTACT_FROM_EMAIL", "contact.from_email"),
    ("GEMINI_API_KEY", "gemini.api_key"),
];

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (SITEKEEPER__*)
    /// 5. Well-known flat variables (ADMIN_USER, DATA_DIR, ...)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let mut builder = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("server.public_dir", "public")?
            .set_default("server.admin_dir", "admin")?
            .set_default("content.data_dir", "data")?
            .set_default("auth.session_max_age", 43_200)?
            .set_default("contact.api_base", "https://api.brevo.com/v3/smtp/email")?
            .set_default("contact.rate_limit_per_minute", 10)?
            .set_default(
                "gemini.api_base",
                "https://generativelanguage.googleapis.com",
            )?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (SITEKEEPER_*)
            .add_source(
                Environment::with_prefix("SITEKEEPER")
                    .separator("__")
                    .try_parsing(true),
            );

        // The flat well-known variables win over every other source.
        for (var, key) in ENV_OVERRIDES {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_override(*key, value)?;
            }
        }

        let config = builder
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Resolve the session-signing secret.
    ///
    /// When no secret is configured a random one is generated; sessions
    /// then do not survive a process restart.
    pub fn session_secret_or_generate(&self) -> String {
        match self
            .auth
            .session_secret
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            Some(secret) => secret.to_string(),
            None => {
                tracing::warn!(
                    "SESSION_SECRET is not set; generated a random secret \
                     (sessions will not survive a restart)"
                );
                generate_session_secret()
            }
        }
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if let Some(secret) = &self.auth.session_secret {
            if secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
                return Err(crate::error::AppError::Config(format!(
                    "auth.session_secret must be at least {} bytes",
                    MIN_SESSION_SECRET_BYTES
                )));
            }
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.contact.rate_limit_per_minute == 0 {
            return Err(crate::error::AppError::Config(
                "contact.rate_limit_per_minute must be greater than 0".to_string(),
            ));
        }

        if self.auth.admin_user.is_none() || self.auth.admin_pass.is_none() {
            tracing::warn!("ADMIN_USER/ADMIN_PASS not set; admin login is disabled");
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

/// Generate a random 32-byte hex session secret.
pub fn generate_session_secret() -> String {
    use rand::RngCore;

    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
                public_dir: PathBuf::from("public"),
                admin_dir: PathBuf::from("admin"),
            },
            content: ContentConfig {
                data_dir: PathBuf::from("/tmp/sitekeeper-test"),
            },
            auth: AuthConfig {
                admin_user: Some("admin".to_string()),
                admin_pass: Some("hunter2hunter2".to_string()),
                session_secret: Some("x".repeat(32)),
                session_max_age: 43_200,
            },
            contact: ContactConfig {
                api_key: None,
                to_email: None,
                from_email: None,
                api_base: "https://api.brevo.com/v3/smtp/email".to_string(),
                rate_limit_per_minute: 10,
            },
            gemini: GeminiConfig {
                api_key: None,
                api_base: "https://generativelanguage.googleapis.com".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_http_on_localhost() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert!(!config.should_use_secure_cookies());
    }

    #[test]
    fn validate_rejects_short_session_secret() {
        let mut config = valid_config();
        config.auth.session_secret = Some("short-secret".to_string());

        let error = config
            .validate()
            .expect_err("session secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.session_secret")
        ));
    }

    #[test]
    fn validate_rejects_http_for_non_local_domain() {
        let mut config = valid_config();
        config.server.domain = "www.example.com".to_string();
        config.server.protocol = "http".to_string();

        let error = config
            .validate()
            .expect_err("public domains must require https");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("server.protocol must be https")
        ));
    }

    #[test]
    fn document_path_lives_under_data_dir() {
        let config = valid_config();
        assert_eq!(
            config.content.document_path(),
            PathBuf::from("/tmp/sitekeeper-test/site-data.json")
        );
        assert_eq!(
            config.content.uploads_dir(),
            PathBuf::from("/tmp/sitekeeper-test/uploads")
        );
    }

    #[test]
    fn generated_secret_is_long_enough() {
        let secret = generate_session_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn missing_secret_generates_one() {
        let mut config = valid_config();
        config.auth.session_secret = None;

        let secret = config.session_secret_or_generate();
        assert!(secret.as_bytes().len() >= 32);
    }
}
