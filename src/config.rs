//! Configuration for homegate
//!
//! CLI arguments with environment variable fallbacks, via clap.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::auth::JwtValidator;
use crate::services::DEFAULT_INVITATION_TTL_HOURS;
use crate::types::{HomegateError, Result};

/// homegate - home sharing and access control
#[derive(Parser, Debug, Clone)]
#[command(name = "homegate")]
#[command(about = "Home sharing, invitations and per-resource access control")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI (transactions need a replica set)
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "homegate")]
    pub mongodb_db: String,

    /// Development mode: in-memory storage and a built-in JWT secret
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Shared secret for verifying HS256 bearer tokens (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    /// How long an invitation stays redeemable, in hours
    #[arg(long, env = "INVITATION_TTL_HOURS", default_value_t = DEFAULT_INVITATION_TTL_HOURS)]
    pub invitation_ttl_hours: i64,

    /// Public URL of the web app, used to build invite links
    #[arg(long, env = "APP_URL", default_value = "http://localhost:3000")]
    pub app_url: String,
}

impl Args {
    /// Token validator for the configured secret (built-in secret in dev mode)
    pub fn jwt_validator(&self) -> Result<JwtValidator> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => JwtValidator::new(secret.clone(), 3600),
            (None, true) => Ok(JwtValidator::new_dev()),
            (None, false) => Err(HomegateError::Config(
                "JWT_SECRET is required in production mode".into(),
            )),
        }
    }

    pub fn invitation_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.invitation_ttl_hours)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.dev_mode {
            match &self.jwt_secret {
                None => return Err("JWT_SECRET is required in production mode".to_string()),
                Some(secret) if secret.len() < 32 => {
                    return Err("JWT_SECRET must be at least 32 characters".to_string())
                }
                _ => {}
            }
        }

        if self.invitation_ttl_hours <= 0 {
            return Err("INVITATION_TTL_HOURS must be positive".to_string());
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be positive".to_string());
        }

        if !self.app_url.starts_with("http://") && !self.app_url.starts_with("https://") {
            return Err("APP_URL must be an http(s) URL".to_string());
        }

        Ok(())
    }
}
