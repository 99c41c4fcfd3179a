//! Configuration of the arcade backend, read entirely from the environment.

use std::env;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("{0} must be set to a real secret in production, not the development placeholder")]
    PlaceholderSecret(&'static str),

    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub run_mode: RunMode,
    pub port: u16,
    pub database_path: String,
    pub cors_allowed_origins: Vec<String>,
    pub public_base_url: String,
    pub log_filter: String,

    pub jwt_access_secret: String,
    pub jwt_refresh_secret: String,
    pub save_session_secret: String,
    pub continue_token_secret: String,
    pub leaderboard_session_secret: String,

    pub payment_provider_secret_key: String,
    pub payment_webhook_secret: String,
    pub payment_price_id: String,

    pub mail_sender_api_key: String,
}

const DEV_PLACEHOLDER: &str = "dev-placeholder-secret-do-not-use-in-production";

impl Config {
    /// Load configuration from the process environment. In `production`
    /// mode every secret is required and must differ from the development
    /// placeholder; this call panics at startup rather than let the server
    /// bind a socket in a half-configured state.
    pub fn from_env() -> Config {
        match Self::try_from_env() {
            Ok(config) => config,
            Err(e) => panic!("invalid configuration: {e}"),
        }
    }

    fn try_from_env() -> Result<Config, ConfigError> {
        let run_mode = match env::var("RUN_MODE").as_deref() {
            Ok("production") => RunMode::Production,
            _ => RunMode::Development,
        };

        let port = env::var("PORT")
            .ok()
            .map(|s| s.parse::<u16>())
            .transpose()
            .map_err(|e| ConfigError::Invalid("PORT", e.to_string()))?
            .unwrap_or(8080);

        let config = Config {
            run_mode,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "arcade.sqlite3".to_string()),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            public_base_url: secret_or_placeholder("PUBLIC_BASE_URL", run_mode)?,
            log_filter: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),

            jwt_access_secret: secret_or_placeholder("JWT_ACCESS_SECRET", run_mode)?,
            jwt_refresh_secret: secret_or_placeholder("JWT_REFRESH_SECRET", run_mode)?,
            save_session_secret: secret_or_placeholder("SAVE_SESSION_SECRET", run_mode)?,
            continue_token_secret: secret_or_placeholder("CONTINUE_TOKEN_SECRET", run_mode)?,
            leaderboard_session_secret: secret_or_placeholder("LEADERBOARD_SESSION_SECRET", run_mode)?,

            payment_provider_secret_key: secret_or_placeholder("PAYMENT_PROVIDER_SECRET_KEY", run_mode)?,
            payment_webhook_secret: secret_or_placeholder("PAYMENT_WEBHOOK_SECRET", run_mode)?,
            payment_price_id: secret_or_placeholder("PAYMENT_PRICE_ID", run_mode)?,

            mail_sender_api_key: secret_or_placeholder("MAIL_SENDER_API_KEY", run_mode)?,
        };

        Ok(config)
    }
}

/// Three distinct HMAC purposes each need their own secret so that
/// compromising one token class never lets an attacker forge another.
fn secret_names_must_differ(config: &Config) -> Result<(), ConfigError> {
    let secrets = [
        ("SAVE_SESSION_SECRET", &config.save_session_secret),
        ("CONTINUE_TOKEN_SECRET", &config.continue_token_secret),
        ("LEADERBOARD_SESSION_SECRET", &config.leaderboard_session_secret),
    ];
    for i in 0..secrets.len() {
        for j in (i + 1)..secrets.len() {
            if secrets[i].1 == secrets[j].1 {
                return Err(ConfigError::Invalid(
                    secrets[j].0,
                    format!("must differ from {}", secrets[i].0),
                ));
            }
        }
    }
    Ok(())
}

fn secret_or_placeholder(name: &'static str, run_mode: RunMode) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => {
            if run_mode == RunMode::Production && value == DEV_PLACEHOLDER {
                return Err(ConfigError::PlaceholderSecret(name));
            }
            Ok(value)
        }
        _ if run_mode == RunMode::Production => Err(ConfigError::Missing(name)),
        _ => {
            tracing::warn!(variable = name, "using development placeholder for unset variable");
            Ok(DEV_PLACEHOLDER.to_string())
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        secret_names_must_differ(self)
    }
}
