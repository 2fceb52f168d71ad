//! CLI argument parsing, validation, and startup helpers.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::http::header::InvalidHeaderValue;
use clap::Parser;
use tracing::{error, info, warn};

use crate::ServerConfig;
use crate::clock::SystemClock;
use crate::credentials::Argon2Verifier;
use crate::db::Database;
use crate::jwt::{MIN_SECRET_LENGTH, check_ttl};
use crate::rate_limit::RateLimitConfig;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tollgate",
    about = "Stateless bearer-token authentication service"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "tollgate.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Token lifetime in milliseconds
    #[arg(long, env = "TOKEN_TTL_MS", default_value = "3600000", value_parser = parse_ttl)]
    pub token_ttl_ms: i64,

    /// Browser origin allowed to call the API (CORS). Empty disables CORS
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:8081")]
    pub cors_origin: String,

    /// Enable the account with this email on startup (new accounts start disabled)
    #[arg(long, value_name = "EMAIL")]
    pub enable_user: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn parse_ttl(s: &str) -> Result<i64, String> {
    let ttl: i64 = s
        .parse()
        .map_err(|_| format!("Token TTL must be a number of milliseconds: {}", s))?;
    check_ttl(ttl).map_err(|e| e.to_string())?;
    Ok(ttl)
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // SAFETY: called once from main before the runtime spawns any work,
        // so no other thread reads the environment concurrently.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} bytes. Use a longer secret",
            MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Parse the CORS origin. Empty means no CORS layer.
pub fn parse_cors_origin(origin: &str) -> Result<Option<HeaderValue>, InvalidHeaderValue> {
    let origin = origin.trim();
    if origin.is_empty() {
        return Ok(None);
    }
    HeaderValue::from_str(origin).map(Some)
}

/// Handle the --enable-user flag. Exits on storage errors.
pub async fn handle_enable_user(db: &Database, email: &str) {
    match db.users().set_enabled(email, true).await {
        Ok(true) => {
            info!(email = %email, "Account enabled");
            println!("Enabled account: {}", email);
        }
        Ok(false) => {
            warn!(email = %email, "No account with this email; nothing enabled");
        }
        Err(e) => {
            error!(error = %e, "Failed to enable account");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    jwt_secret: String,
    token_ttl_ms: i64,
    cors_origin: Option<HeaderValue>,
) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        token_ttl_ms,
        clock: Arc::new(SystemClock),
        verifier: Arc::new(Argon2Verifier::new()),
        cors_origin,
        rate_limits: RateLimitConfig::default(),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
