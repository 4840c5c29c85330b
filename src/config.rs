// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Google OAuth client ID; expected `aud` of Google ID tokens
    pub google_client_id: String,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Counter snapshot location
    pub data_file: PathBuf,
    /// Session lifetime (cookie Max-Age and server-side expiry)
    pub session_ttl: Duration,
    /// Mark the session cookie `Secure` (requires HTTPS)
    pub cookie_secure: bool,
    /// Requests allowed per client IP per window
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    /// Number of leaderboard rows returned
    pub leaderboard_limit: usize,
    /// Recent op ids remembered per user for replay detection
    pub dedup_window: usize,
}

impl Config {
    /// Defaults suitable for tests.
    pub fn test_default() -> Self {
        Self {
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 3000,
            data_file: PathBuf::from("data.json"),
            session_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            cookie_secure: false,
            rate_limit_max: 30,
            rate_limit_window: Duration::from_secs(10),
            leaderboard_limit: 100,
            dedup_window: 256,
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Ok(Self {
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: parse_var("PORT", 3000)?,
            data_file: env::var("DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data.json")),
            session_ttl: hours_to_duration(
                "SESSION_TTL_HOURS",
                parse_var("SESSION_TTL_HOURS", 7 * 24)?,
            )?,
            cookie_secure: parse_var("COOKIE_SECURE", production)?,
            rate_limit_max: parse_var("RATE_LIMIT_MAX", 30)?,
            rate_limit_window: Duration::from_secs(parse_var("RATE_LIMIT_WINDOW_SECS", 10)?),
            leaderboard_limit: parse_var("LEADERBOARD_LIMIT", 100)?,
            dedup_window: parse_var("DEDUP_WINDOW", 256)?,
        })
    }
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw.clone(),
        }),
        Err(_) => Ok(default),
    }
}

fn hours_to_duration(name: &'static str, hours: u64) -> Result<Duration, ConfigError> {
    hours
        .checked_mul(3600)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::Invalid {
            name,
            value: hours.to_string(),
        })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
