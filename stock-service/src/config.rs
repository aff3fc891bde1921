use std::env;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use common_auth::JwtConfig;

const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:5173",
];

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub run_migrations: bool,
    pub allowed_origins: Vec<String>,
}

pub fn load_service_config() -> Result<ServiceConfig> {
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
    if secret.trim().is_empty() {
        return Err(anyhow!("JWT_SECRET must not be empty"));
    }

    let issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "stock-service".to_string());
    let ttl_seconds = parse_env::<i64>("JWT_TTL_SECONDS")?.unwrap_or(86_400);
    if ttl_seconds <= 0 {
        return Err(anyhow!("JWT_TTL_SECONDS must be positive"));
    }
    let leeway_seconds = parse_env::<u32>("JWT_LEEWAY_SECONDS")?.unwrap_or(30);

    let jwt = JwtConfig::new(issuer, secret)
        .with_ttl(ttl_seconds)
        .with_leeway(leeway_seconds);

    let allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .map(|value| parse_origins(&value))
        .filter(|origins| !origins.is_empty())
        .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect());

    Ok(ServiceConfig {
        database_url,
        host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
        port: parse_env::<u16>("PORT")?.unwrap_or(3000),
        jwt,
        db_max_connections: parse_env::<u32>("DB_MAX_CONNECTIONS")?.unwrap_or(10),
        db_acquire_timeout: Duration::from_secs(
            parse_env::<u64>("DB_ACQUIRE_TIMEOUT_SECS")?.unwrap_or(5),
        ),
        run_migrations: bool_from_env("RUN_MIGRATIONS").unwrap_or(true),
        allowed_origins,
    })
}

fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| anyhow!("{key} is invalid: {err}")),
        _ => Ok(None),
    }
}

fn bool_from_env(key: &str) -> Option<bool> {
    env::var(key).ok().map(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_from_env_parses() {
        std::env::set_var("STOCK_TEST_BOOL_TRUE", "true");
        std::env::set_var("STOCK_TEST_BOOL_ONE", "1");
        std::env::set_var("STOCK_TEST_BOOL_FALSE", "no");
        assert_eq!(bool_from_env("STOCK_TEST_BOOL_TRUE"), Some(true));
        assert_eq!(bool_from_env("STOCK_TEST_BOOL_ONE"), Some(true));
        assert_eq!(bool_from_env("STOCK_TEST_BOOL_FALSE"), Some(false));
        assert_eq!(bool_from_env("STOCK_TEST_BOOL_UNSET"), None);
    }

    #[test]
    fn parse_env_reports_bad_numbers() {
        std::env::set_var("STOCK_TEST_PORT_BAD", "eighty");
        assert!(parse_env::<u16>("STOCK_TEST_PORT_BAD").is_err());
        std::env::set_var("STOCK_TEST_PORT_OK", " 8080 ");
        assert_eq!(parse_env::<u16>("STOCK_TEST_PORT_OK").unwrap(), Some(8080));
        assert_eq!(parse_env::<u16>("STOCK_TEST_PORT_UNSET").unwrap(), None);
    }

    #[test]
    fn parse_origins_skips_blanks() {
        let origins = parse_origins("https://a.example, ,https://b.example,");
        assert_eq!(origins, vec!["https://a.example", "https://b.example"]);
    }
}
