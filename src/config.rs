use crate::error::AppError;
use std::env;

/// Upper bound for `ACCESS_TOKEN_EXPIRE_MINUTES`: one year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

/// Runtime configuration, read from the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub allowed_origins: Vec<String>,
    pub server_port: u16,
    pub server_host: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| AppError::InternalServerError("JWT_SECRET must be set".into()))?;

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://kanban_board.db".to_string()),
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            access_token_expire_minutes: token_ttl_minutes(&lookup)?,
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|origins| parse_origins(&origins))
                .unwrap_or_else(|| vec!["*".to_string()]),
            server_port: parse_or(&lookup, "SERVER_PORT", 8080)?,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }

    /// `true` when CORS should accept any origin.
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::InternalServerError(format!("{} must be a number", key))),
        None => Ok(default),
    }
}

fn token_ttl_minutes<F>(lookup: &F) -> Result<i64, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let minutes: i64 = parse_or(lookup, "ACCESS_TOKEN_EXPIRE_MINUTES", 30)?;
    if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&minutes) {
        return Err(AppError::InternalServerError(format!(
            "ACCESS_TOKEN_EXPIRE_MINUTES must be between 1 and {}",
            MAX_TOKEN_TTL_MINUTES
        )));
    }
    Ok(minutes)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
