use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgConnectOptions;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so parsing can be
    /// exercised without mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} must be set"));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            host: or_default("HOST", "127.0.0.1"),
            port: or_default("PORT", "3000")
                .parse()
                .context("PORT must be a valid number")?,
            database: DatabaseConfig {
                host: required("DB_HOST")?,
                port: required("DB_PORT")?
                    .parse()
                    .context("DB_PORT must be a valid number")?,
                username: required("DB_USERNAME")?,
                password: required("DB_PASSWORD")?,
                name: required("DB_DATABASE")?,
                max_connections: or_default("DB_MAX_CONNECTIONS", "20")
                    .parse()
                    .context("DB_MAX_CONNECTIONS must be a valid number")?,
                acquire_timeout: Duration::from_secs(
                    or_default("DB_ACQUIRE_TIMEOUT_SECS", "30")
                        .parse()
                        .context("DB_ACQUIRE_TIMEOUT_SECS must be a valid number")?,
                ),
                idle_timeout: Duration::from_secs(
                    or_default("DB_IDLE_TIMEOUT_SECS", "600")
                        .parse()
                        .context("DB_IDLE_TIMEOUT_SECS must be a valid number")?,
                ),
                max_lifetime: Duration::from_secs(
                    or_default("DB_MAX_LIFETIME_SECS", "1800")
                        .parse()
                        .context("DB_MAX_LIFETIME_SECS must be a valid number")?,
                ),
            },
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .database(&self.name)
    }
}
