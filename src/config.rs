use anyhow::{Context, Result, bail};
use std::env;
use std::str::FromStr;

/// Runtime settings, read from the environment once at startup.
///
/// `main` calls `dotenvy::dotenv()` first, so a local `.env` file works too.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string, or `memory://` for the in-process store.
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Keyword in front of the token in the Authorization header.
    pub auth_scheme: String,
    pub port: u16,
    /// Login attempts allowed per IP before the limiter kicks in. `None` disables it.
    pub login_burst: Option<u32>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        // An empty secret would sign tokens anybody can forge. Refuse to start.
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        let login_burst: u32 = parse_or("LOGIN_RATE_LIMIT_BURST", 5)?;

        Ok(Self {
            database_url,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            token_ttl_hours: validate_ttl(parse_or("TOKEN_TTL_HOURS", 168)?)?,
            auth_scheme: env::var("AUTH_SCHEME").unwrap_or_else(|_| "JWT".to_string()),
            port: parse_or("PORT", 8080)?,
            login_burst: (login_burst > 0).then_some(login_burst),
        })
    }

    /// Settings for tests and local tinkering: memory store, no rate limit.
    pub fn for_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: "memory://".to_string(),
            db_max_connections: 1,
            jwt_secret: jwt_secret.into(),
            token_ttl_hours: 168,
            auth_scheme: "JWT".to_string(),
            port: 0,
            login_burst: None,
        }
    }
}

/// Ten years. Past that a token is effectively a password that never changes.
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

/// A TTL of zero or less would mint tokens that are dead on arrival.
fn validate_ttl(hours: i64) -> Result<i64> {
    if !(1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
        bail!("TOKEN_TTL_HOURS must be between 1 and {MAX_TOKEN_TTL_HOURS}, got {hours}");
    }
    Ok(hours)
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}
