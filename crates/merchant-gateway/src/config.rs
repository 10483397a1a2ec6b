use std::env;

use crate::cors::{
    CorsPolicy, DEFAULT_ALLOWED_HEADERS, DEFAULT_ALLOWED_METHODS, DEFAULT_MAX_AGE_SECS,
};

const DEFAULT_PORT: u16 = 4080;
const DEFAULT_DB_PATH: &str = "./merchant-gateway.db";
const DEFAULT_INTERNAL_PREFIXES: &[&str] = &["/admin", "/health", "/metrics"];
const DEFAULT_RETENTION_DAYS: i64 = 90;
const SECS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Clone)]
pub struct GatewayConfig {
    /// Server port
    pub port: u16,
    /// SQLite database path
    pub db_path: String,
    /// Bearer token for /admin routes (None = dev mode, admin open)
    pub admin_token: Option<String>,
    /// CORS allowed origins for the admin scope
    pub admin_allowed_origins: Vec<String>,
    /// Path prefixes that bypass the gateway
    pub internal_prefixes: Vec<String>,
    /// Fixed CORS fields for gated routes
    pub cors: CorsPolicy,
    /// Bearer token required for /metrics endpoint (None = public)
    pub metrics_token: Option<String>,
    /// Failed attempts older than this many seconds are purged at startup
    pub failed_attempt_retention_secs: i64,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("port", &self.port)
            .field("db_path", &self.db_path)
            .field(
                "admin_token",
                &self.admin_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("admin_allowed_origins", &self.admin_allowed_origins)
            .field("internal_prefixes", &self.internal_prefixes)
            .field("cors", &self.cors)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "failed_attempt_retention_secs",
                &self.failed_attempt_retention_secs,
            )
            .finish()
    }
}

/// Split a comma-separated variable, dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn defaults(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        // Optional: port
        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT", raw))?,
            None => DEFAULT_PORT,
        };

        // Optional: database path
        let db_path = var("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        // Optional: admin origins
        let admin_allowed_origins = var("ADMIN_ALLOWED_ORIGINS")
            .map(|s| split_list(&s))
            .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]);
        if admin_allowed_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::InvalidValue(
                "ADMIN_ALLOWED_ORIGINS",
                "wildcard '*' is not allowed".to_string(),
            ));
        }

        // Optional: internal prefixes
        let internal_prefixes = var("INTERNAL_PATH_PREFIXES")
            .map(|s| split_list(&s))
            .unwrap_or_else(|| defaults(DEFAULT_INTERNAL_PREFIXES));
        if let Some(bad) = internal_prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::InvalidValue(
                "INTERNAL_PATH_PREFIXES",
                bad.clone(),
            ));
        }

        // Optional: CORS policy for gated routes
        let allowed_methods: Vec<String> = var("CORS_ALLOWED_METHODS")
            .map(|s| split_list(&s).into_iter().map(|m| m.to_ascii_uppercase()).collect())
            .unwrap_or_else(|| defaults(DEFAULT_ALLOWED_METHODS));
        for required in ["GET", "POST"] {
            if !allowed_methods.iter().any(|m| m == required) {
                return Err(ConfigError::InvalidValue(
                    "CORS_ALLOWED_METHODS",
                    format!("must include {}", required),
                ));
            }
        }
        let allowed_headers = var("CORS_ALLOWED_HEADERS")
            .map(|s| split_list(&s))
            .unwrap_or_else(|| defaults(DEFAULT_ALLOWED_HEADERS));
        let max_age_secs = match var("CORS_MAX_AGE") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CORS_MAX_AGE", raw))?,
            None => DEFAULT_MAX_AGE_SECS,
        };
        // Unset means "*"; set-but-empty disables the header.
        let preflight_origin = match lookup("CORS_PREFLIGHT_ORIGIN") {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(raw.trim().to_string()),
            None => Some("*".to_string()),
        };

        let metrics_token = var("METRICS_TOKEN");

        let retention_days = match var("FAILED_ATTEMPT_RETENTION_DAYS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|d| *d > 0)
                .ok_or(ConfigError::InvalidValue("FAILED_ATTEMPT_RETENTION_DAYS", raw))?,
            None => DEFAULT_RETENTION_DAYS,
        };
        let failed_attempt_retention_secs = retention_days.checked_mul(SECS_PER_DAY).ok_or(
            ConfigError::InvalidValue("FAILED_ATTEMPT_RETENTION_DAYS", retention_days.to_string()),
        )?;

        // Required: admin token, unless explicitly running open for dev
        let admin_token = var("ADMIN_TOKEN");
        let insecure_no_admin_token = var("GATEWAY_INSECURE_NO_ADMIN_TOKEN")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        if let Some(ref token) = admin_token {
            if token.len() < 32 {
                tracing::warn!(
                    "ADMIN_TOKEN is short ({} bytes, recommended minimum 32) — \
                     use `openssl rand -hex 32` to generate one",
                    token.len()
                );
            }
        } else if insecure_no_admin_token {
            tracing::warn!(
                "GATEWAY_INSECURE_NO_ADMIN_TOKEN=true — /admin routes are UNAUTHENTICATED. \
                 DO NOT use this in production!"
            );
        } else {
            tracing::error!(
                "ADMIN_TOKEN is required. For local development only, \
                 set GATEWAY_INSECURE_NO_ADMIN_TOKEN=true to skip."
            );
            return Err(ConfigError::MissingRequired("ADMIN_TOKEN"));
        }

        if metrics_token.is_none() {
            tracing::warn!("METRICS_TOKEN not set — /metrics endpoint is publicly accessible");
        }

        Ok(Self {
            port,
            db_path,
            admin_token,
            admin_allowed_origins,
            internal_prefixes,
            cors: CorsPolicy {
                allowed_methods,
                allowed_headers,
                max_age_secs,
                preflight_origin,
            },
            metrics_token,
            failed_attempt_retention_secs,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
