//! Session management
//!
//! An opaque random session id is HMAC-signed into the cookie value and
//! resolved against an in-memory table. The signature keeps the cookie
//! tamper-proof; the table holds the authoritative authenticated flag, so
//! logout actually destroys the session instead of waiting for expiry.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::AppError;

/// Server-side session entry
///
/// Created on successful login, destroyed on logout or expiry.
#[derive(Debug, Clone)]
pub struct Session {
    /// Authenticated admin username
    pub username: String,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// In-memory session table with signed opaque tokens.
///
/// Sessions do not survive a process restart; a signed token whose id is
/// no longer in the table is treated as unauthenticated.
pub struct SessionStore {
    secret: String,
    max_age: Duration,
    entries: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    /// Create a new store
    ///
    /// # Arguments
    /// * `secret` - HMAC secret key (32+ bytes)
    /// * `max_age_seconds` - Fixed session lifetime
    pub fn new(secret: String, max_age_seconds: i64) -> Self {
        Self {
            secret,
            max_age: Duration::seconds(max_age_seconds),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Establish a session for an authenticated user
    ///
    /// # Returns
    /// Signed token string for the client cookie
    pub async fn create(&self, username: &str) -> Result<String, AppError> {
        let id = generate_session_id();
        let now = Utc::now();
        let session = Session {
            username: username.to_string(),
            created_at: now,
            expires_at: now + self.max_age,
        };

        let mut entries = self.entries.write().await;
        // Expired entries are only ever removed here and in logout; both are
        // rare enough that a full sweep is fine.
        entries.retain(|_, session| !session.is_expired());
        entries.insert(id.clone(), session);

        sign_session_id(&id, &self.secret)
    }

    /// Resolve a token to its live session
    ///
    /// Returns `None` for malformed tokens, bad signatures, unknown ids,
    /// and expired entries. Expired entries are removed on sight.
    pub async fn authenticate(&self, token: &str) -> Option<Session> {
        let id = verify_session_token(token, &self.secret)?;

        let entries = self.entries.read().await;
        let session = entries.get(&id)?.clone();
        drop(entries);

        if session.is_expired() {
            self.entries.write().await.remove(&id);
            return None;
        }

        Some(session)
    }

    /// Destroy the session behind a token
    ///
    /// Idempotent: unknown and malformed tokens are a no-op.
    pub async fn destroy(&self, token: &str) {
        let Some(id) = verify_session_token(token, &self.secret) else {
            return;
        };
        self.entries.write().await.remove(&id);
    }

    /// Number of live sessions (expired entries excluded)
    pub async fn active_count(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|s| !s.is_expired()).count()
    }
}

/// Generate a random 16-byte hex session id
fn generate_session_id() -> String {
    use rand::RngCore;

    let mut bytes = [0_u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Sign a session id into a client token
///
/// Token format: `{id}.{base64url(hmac_sha256(id))}`
///
/// # Arguments
/// * `id` - Opaque session id
/// * `secret` - HMAC secret key
///
/// # Returns
/// Signed token string
pub fn sign_session_id(id: &str, secret: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Config(e.to_string()))?;
    mac.update(id.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", id, signature_b64))
}

/// Verify a client token and extract the session id
///
/// # Arguments
/// * `token` - Token string to verify
/// * `secret` - HMAC secret key
///
/// # Returns
/// The session id if the signature is valid, `None` otherwise
pub fn verify_session_token(token: &str, secret: &str) -> Option<String> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let (id, signature_b64) = token.split_once('.')?;
    if id.is_empty() {
        return None;
    }

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(id.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD.decode(signature_b64).ok()?;
    mac.verify_slice(&expected_signature).ok()?;

    Some(id.to_string())
}
