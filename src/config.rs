use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub csrf_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub session: SessionConfig,
    pub max_body_size: usize,
    pub request_timeout: Duration,
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl: Duration,
    pub secure_cookie: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let csrf_secret = env_required("USERAUTH_CSRF_SECRET")?;

        let host: IpAddr = env_or("USERAUTH_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid USERAUTH_HOST: {e}"))?;

        let port: u16 = env_or("USERAUTH_PORT", "5000")
            .parse()
            .map_err(|e| format!("Invalid USERAUTH_PORT: {e}"))?;

        let ttl = parse_session_ttl(&env_or("USERAUTH_SESSION_TTL_SECS", "86400"))?;

        let secure_cookie = parse_bool(
            "USERAUTH_COOKIE_SECURE",
            &env_or("USERAUTH_COOKIE_SECURE", "false"),
        )?;

        let session = SessionConfig {
            cookie_name: env_or("USERAUTH_SESSION_COOKIE", "session-id"),
            ttl,
            secure_cookie,
        };

        let max_body_size: usize = env_or("USERAUTH_MAX_BODY_SIZE", "65536")
            .parse()
            .map_err(|e| format!("Invalid USERAUTH_MAX_BODY_SIZE: {e}"))?;

        let timeout_secs: u64 = env_or("USERAUTH_REQUEST_TIMEOUT_SECS", "30")
            .parse()
            .map_err(|e| format!("Invalid USERAUTH_REQUEST_TIMEOUT_SECS: {e}"))?;

        let log_level = env_or("USERAUTH_LOG_LEVEL", "info");

        let log_format = match env_or("USERAUTH_LOG_FORMAT", "text").as_str() {
            "json" => LogFormat::Json,
            "text" => LogFormat::Text,
            other => {
                return Err(format!(
                    "Invalid USERAUTH_LOG_FORMAT '{other}': expected text or json"
                ));
            }
        };

        Ok(Config {
            database_url,
            csrf_secret,
            host,
            port,
            session,
            max_body_size,
            request_timeout: Duration::from_secs(timeout_secs),
            log_level,
            log_format,
        })
    }
}

/// Upper bound on the session lifetime, one year.
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

fn parse_session_ttl(value: &str) -> Result<Duration, String> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|e| format!("Invalid USERAUTH_SESSION_TTL_SECS: {e}"))?;
    if secs == 0 || secs > MAX_SESSION_TTL_SECS {
        return Err(format!(
            "USERAUTH_SESSION_TTL_SECS must be between 1 and {MAX_SESSION_TTL_SECS}, got {secs}"
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(format!("Invalid {key}: expected a boolean, got '{value}'")),
    }
}
