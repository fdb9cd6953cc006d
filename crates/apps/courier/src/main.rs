//! Courier - fetch recent Gmail threads in one batch call
//!
//! Usage: courier <email> [max-threads]
//!
//! Resolves an access token (GMAIL_ACCESS_TOKEN overrides the stored
//! credential), runs one fetch pass, and prints the resulting previews.

use anyhow::{bail, Context, Result};
use log::{info, warn};

use mail::{
    FetchConfig, FetchPipeline, FileTokenStore, GmailClient, GmailCredentials, TokenProvider,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    config::init().context("Failed to initialize config directory")?;

    let mut args = std::env::args().skip(1);
    let Some(email) = args.next() else {
        bail!("usage: courier <email> [max-threads]");
    };
    let max_threads: usize = match args.next() {
        Some(n) => n.parse().context("max-threads must be a number")?,
        None => FetchConfig::default().max_threads,
    };

    let access_token = resolve_token(&email)?;

    let fetch_config = FetchConfig::default();
    let client = GmailClient::new(fetch_config.timeout);
    let pipeline = FetchPipeline::with_config(client, fetch_config);

    let report = pipeline.fetch_recent(&access_token, max_threads)?;

    if report.stats.parts_dropped > 0 {
        warn!(
            "{} batch part(s) failed; output is partial",
            report.stats.parts_dropped
        );
    }
    info!(
        "{} previews from {} threads in {}ms",
        report.stats.previews, report.stats.threads_parsed, report.stats.duration_ms
    );

    for preview in &report.previews {
        println!(
            "{}  {}  {}",
            preview.from.as_deref().unwrap_or("(unknown sender)"),
            preview.subject.as_deref().unwrap_or("(no subject)"),
            preview.snippet
        );
    }

    Ok(())
}

/// Get a bearer token: environment override first, then the stored
/// per-user credential (refreshed if stale).
fn resolve_token(email: &str) -> Result<String> {
    if let Ok(token) = std::env::var("GMAIL_ACCESS_TOKEN") {
        info!("using access token from GMAIL_ACCESS_TOKEN");
        return Ok(token);
    }

    let credentials = GmailCredentials::load().with_context(|| {
        match GmailCredentials::default_credentials_path() {
            Some(path) => format!(
                "Gmail credentials not found; place Google OAuth credentials at {} \
                 or set GMAIL_CLIENT_ID / GMAIL_CLIENT_SECRET",
                path.display()
            ),
            None => "Gmail credentials not found".to_string(),
        }
    })?;

    let store = FileTokenStore::in_config_dir()?;
    let provider = TokenProvider::new(store, credentials);
    let token = provider
        .access_token(email)
        .with_context(|| format!("No usable token for {email}"))?;
    Ok(token)
}
