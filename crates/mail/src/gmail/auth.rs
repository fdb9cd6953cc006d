//! Token management for Gmail API access
//!
//! The pipeline never runs a browser consent flow; it consumes tokens
//! that an external identity provider already minted. This module owns
//! the rest: storing tokens per user, deciding when one is stale, and
//! exchanging a refresh token for a new access token.
//!
//! Refresh-and-store is guarded by a per-user lock so two concurrent
//! fetches for the same user cannot race to persist a stale token.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use crate::config::GmailCredentials;
use crate::error::FetchError;

/// Seconds of remaining lifetime below which a token is refreshed early.
const EXPIRY_BUFFER_SECS: i64 = 300;

/// A stored OAuth credential for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp. `None` means the issuer reported no expiry and
    /// the token is assumed valid until the server rejects it.
    pub expires_at: Option<i64>,
}

impl Token {
    /// Whether the access token is still usable (with a safety buffer).
    pub fn is_fresh(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > now + EXPIRY_BUFFER_SECS,
            None => true,
        }
    }
}

/// Token response from the OAuth token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

/// Per-user credential storage.
///
/// Must support concurrent reads; writes go through the provider's
/// per-user lock.
pub trait TokenStore: Send + Sync {
    /// Get the stored token for a user, if any
    fn get(&self, email: &str) -> Result<Option<Token>>;

    /// Insert or replace the stored token for a user
    fn put(&self, email: &str, token: &Token) -> Result<()>;
}

/// In-memory implementation of [`TokenStore`], used in tests and as a
/// stub when no persistence is wanted.
#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: RwLock<HashMap<String, Token>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn get(&self, email: &str) -> Result<Option<Token>> {
        Ok(self.tokens.read().unwrap().get(email).cloned())
    }

    fn put(&self, email: &str, token: &Token) -> Result<()> {
        self.tokens
            .write()
            .unwrap()
            .insert(email.to_string(), token.clone());
        Ok(())
    }
}

// Lets a provider and other holders share one store.
impl<S: TokenStore + ?Sized> TokenStore for Arc<S> {
    fn get(&self, email: &str) -> Result<Option<Token>> {
        (**self).get(email)
    }

    fn put(&self, email: &str, token: &Token) -> Result<()> {
        (**self).put(email, token)
    }
}

/// File-backed [`TokenStore`]: one JSON file per user under a
/// directory (by default `~/.config/courier/tokens/`).
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    /// Create a store rooted at an arbitrary directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create a store under the Courier config directory
    pub fn in_config_dir() -> Result<Self> {
        let dir = config::ensure_config_dir()?.join("tokens");
        Ok(Self::new(dir))
    }

    fn token_path(&self, email: &str) -> PathBuf {
        // Emails are nearly filename-safe; replace anything that isn't.
        let name: String = email
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, email: &str) -> Result<Option<Token>> {
        let path = self.token_path(email);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read token file: {}", path.display()))?;
        let token = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse token file: {}", path.display()))?;
        Ok(Some(token))
    }

    fn put(&self, email: &str, token: &Token) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create token directory: {}", self.dir.display()))?;
        let path = self.token_path(email);
        let content = serde_json::to_string_pretty(token)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write token file: {}", path.display()))?;
        Ok(())
    }
}

/// Supplies valid bearer tokens, hiding refresh policy from callers.
pub struct TokenProvider<S: TokenStore> {
    store: S,
    credentials: GmailCredentials,
    token_url: String,
    refresh_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: TokenStore> TokenProvider<S> {
    /// Google OAuth2 token endpoint
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    pub fn new(store: S, credentials: GmailCredentials) -> Self {
        Self {
            store,
            credentials,
            token_url: Self::TOKEN_URL.to_string(),
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Override the token endpoint (tests)
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Get a valid access token for a user, refreshing if stale.
    ///
    /// A missing token, or a stale token with no refresh credential,
    /// surfaces as [`FetchError::Auth`]: the user has to re-authorize
    /// through the external consent flow before fetching can work.
    pub fn access_token(&self, email: &str) -> Result<String, FetchError> {
        let token = self.load(email)?;
        if let Some(token) = &token
            && token.is_fresh(now_ts())
        {
            return Ok(token.access_token.clone());
        }

        // Serialize refresh-and-store per user.
        let user_lock = {
            let mut locks = self.refresh_locks.lock().unwrap();
            locks.entry(email.to_string()).or_default().clone()
        };
        let _guard = user_lock.lock().unwrap();

        // Another caller may have refreshed while we waited.
        let token = self.load(email)?;
        if let Some(token) = &token
            && token.is_fresh(now_ts())
        {
            return Ok(token.access_token.clone());
        }

        let Some(refresh_token) = token.and_then(|t| t.refresh_token) else {
            return Err(FetchError::Auth(format!(
                "no usable credential stored for {email}; re-authorization required"
            )));
        };

        let refreshed = self.refresh(&refresh_token)?;
        self.store
            .put(email, &refreshed)
            .map_err(|e| FetchError::Auth(format!("failed to persist refreshed token: {e:#}")))?;
        log::info!("refreshed access token for {email}");
        Ok(refreshed.access_token)
    }

    fn load(&self, email: &str) -> Result<Option<Token>, FetchError> {
        self.store
            .get(email)
            .map_err(|e| FetchError::Auth(format!("token store read failed for {email}: {e:#}")))
    }

    /// Exchange a refresh token for a new access token.
    fn refresh(&self, refresh_token: &str) -> Result<Token, FetchError> {
        let response = ureq::post(&self.token_url)
            .send_form([
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .map_err(|e| match e {
                // invalid_grant and friends: the refresh token is dead.
                ureq::Error::StatusCode(code) if (400..500).contains(&code) => {
                    FetchError::Auth(format!("token refresh rejected: HTTP {code}"))
                }
                ureq::Error::StatusCode(code) => {
                    FetchError::Transient(format!("token endpoint: HTTP {code}"))
                }
                other => FetchError::Transient(format!("token endpoint: {other}")),
            })?;

        let parsed: TokenResponse = response
            .into_body()
            .read_json()
            .map_err(|e| FetchError::Protocol(format!("bad token response: {e}")))?;

        Ok(Token {
            access_token: parsed.access_token,
            // Google omits the refresh token on refresh; keep the old one.
            refresh_token: parsed
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            expires_at: parsed.expires_in.map(|d| now_ts() + d as i64),
        })
    }
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}
