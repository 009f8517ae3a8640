use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub gmail: GmailConfig,
    pub extraction: ExtractionConfig,
    pub export_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GmailConfig {
    pub credentials_path: String,
    pub token_cache_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    pub default_sender: Option<String>,
    pub message_limit: u32,
    pub auth_max_retries: u32,
    pub auth_retry_delay_secs: u64,
}

impl ExtractionConfig {
    pub fn auth_retry_delay(&self) -> Duration {
        Duration::from_secs(self.auth_retry_delay_secs)
    }
}

const REQUIRED_VARS: [&str; 1] = ["GMAIL_CREDENTIALS_PATH"];

impl Config {
    pub fn new() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source (the process
    /// environment in production, a map in tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::check_required_vars(&lookup)?;

        let credentials_path = lookup("GMAIL_CREDENTIALS_PATH")
            .context("GMAIL_CREDENTIALS_PATH doit être défini")?;

        Ok(Config {
            gmail: GmailConfig {
                credentials_path,
                token_cache_path: lookup("GMAIL_TOKEN_CACHE_PATH")
                    .unwrap_or_else(|| "./gmail-token-cache.json".to_string()),
            },
            extraction: ExtractionConfig {
                default_sender: lookup("DEFAULT_SENDER")
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
                message_limit: parse_var(&lookup, "MESSAGE_LIMIT", 500)?,
                auth_max_retries: parse_var(&lookup, "AUTH_MAX_RETRIES", 3)?,
                auth_retry_delay_secs: parse_var(&lookup, "AUTH_RETRY_DELAY_SECS", 2)?,
            },
            export_dir: lookup("EXPORT_DIR")
                .unwrap_or_else(|| ".".to_string()),
        })
    }

    fn check_required_vars<F>(lookup: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing_vars: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|var| lookup(var).is_none())
            .collect();

        if !missing_vars.is_empty() {
            anyhow::bail!(
                "Variables d'environnement manquantes: {}\n\
                 \n\
                 💡 Solutions :\n\
                 1. Créer un fichier .env avec vos credentials :\n\
                    cp .env.example .env\n\
                    # Puis éditer .env avec vos valeurs\n\
                 \n\
                 2. Ou définir les variables manuellement :\n\
                    export GMAIL_CREDENTIALS_PATH=/path/to/client_credentials.json\n\
                    export GMAIL_TOKEN_CACHE_PATH=./gmail-token-cache.json\n\
                    cargo run -- --sender newsletter@example.com",
                missing_vars.join(", ")
            );
        }

        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}
