use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use versa_client::ClientConfig;

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub session_dir: PathBuf,
    pub http_timeout_secs: u64,
    pub log_level: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = non_empty(lookup("VERSA_API_URL"))
            .unwrap_or_else(|| ClientConfig::DEFAULT_ENDPOINT.to_string());
        let session_dir = non_empty(lookup("VERSA_SESSION_DIR"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".versa"));
        let http_timeout_secs = parse_u64(lookup("VERSA_HTTP_TIMEOUT_SECS"), "VERSA_HTTP_TIMEOUT_SECS", 15)?;
        let log_level = non_empty(lookup("LOG_LEVEL"))
            .or_else(|| non_empty(lookup("RUST_LOG")))
            .unwrap_or_else(|| "warn".to_string());

        Ok(Self {
            api_url,
            session_dir,
            http_timeout_secs,
            log_level,
        })
    }

    pub fn client_config(&self, endpoint: String) -> ClientConfig {
        let mut config = ClientConfig::new(endpoint);
        config.request_timeout = Duration::from_secs(self.http_timeout_secs);
        config
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_u64(raw: Option<String>, key: &str, default: u64) -> Result<u64> {
    let value = match non_empty(raw) {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("Failed to parse {key}, expecting positive integer"))?,
        None => default,
    };

    if value == 0 {
        return Err(anyhow!("{key} must be > 0"));
    }
    Ok(value)
}
