//! Configuration for Gmail access and fetch behavior

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Credentials filename in the Courier config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Gmail enforces at most 100 embedded requests per batch call.
pub const MAX_BATCH_REQUESTS: usize = 100;

/// OAuth client credentials for the Gmail API
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
}

#[derive(Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Load credentials, preferring the config-dir JSON file
    /// (~/.config/courier/google-credentials.json) and falling back to
    /// the GMAIL_CLIENT_ID / GMAIL_CLIENT_SECRET environment variables.
    pub fn load() -> Result<Self> {
        if config::config_exists(CREDENTIALS_FILE) {
            let file: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(file);
        }
        Self::from_env()
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(file)
    }

    /// Parse credentials from a JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let file: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(file)
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GMAIL_CLIENT_ID")
            .context("GMAIL_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GMAIL_CLIENT_SECRET")
            .context("GMAIL_CLIENT_SECRET environment variable not set")?;
        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// Get the default credentials file path
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }

    fn from_credential_file(file: GoogleCredentialFile) -> Result<Self> {
        // Both desktop ("installed") and "web" credential types work.
        let section = file
            .installed
            .or(file.web)
            .context("Credentials file missing 'installed' or 'web' section")?;
        Ok(Self {
            client_id: section.client_id,
            client_secret: section.client_secret,
        })
    }
}

/// Tunables for one fetch pipeline instance
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Recency window for the listing query, in days
    pub window_days: u32,
    /// Default ceiling on threads fetched per invocation
    pub max_threads: usize,
    /// Network timeout for each HTTP call
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            window_days: 1,
            max_threads: 30,
            timeout: Duration::from_secs(30),
        }
    }
}

impl FetchConfig {
    /// Clamp a requested thread count to the batch endpoint's limit.
    pub fn clamp_threads(&self, requested: usize) -> usize {
        requested.min(MAX_BATCH_REQUESTS)
    }
}
