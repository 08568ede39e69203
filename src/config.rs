use std::net::SocketAddr;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub jwt: JwtConfig,
    pub merchant_name: String,
    pub app_host: String,
    pub app_port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = match var("DATABASE_URL") {
            Some(url) => url,
            None => database_url_from_parts(
                &var("POSTGRES_HOST").unwrap_or_else(|| "localhost".into()),
                var("POSTGRES_PORT")
                    .map(|v| v.parse::<u16>())
                    .transpose()
                    .context("POSTGRES_PORT must be a port number")?
                    .unwrap_or(5432),
                &var("POSTGRES_DB").unwrap_or_else(|| "receipts_db".into()),
                &var("POSTGRES_USER").unwrap_or_else(|| "postgres".into()),
                &var("POSTGRES_PASSWORD").unwrap_or_default(),
            ),
        };

        let jwt = JwtConfig {
            secret: var("JWT_SECRET_KEY").context("JWT_SECRET_KEY must be set")?,
            algorithm: var("JWT_ALGORITHM").unwrap_or_else(|| "HS256".into()),
            ttl_hours: var("JWT_ACCESS_TOKEN_EXPIRE_HOURS")
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|h| *h > 0)
                .unwrap_or(2),
        };

        Ok(Self {
            database_url,
            max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(10),
            jwt,
            merchant_name: var("MERCHANT_NAME").unwrap_or_else(|| "My Company".into()),
            app_host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            app_port: var("APP_PORT")
                .map(|v| v.parse::<u16>())
                .transpose()
                .context("APP_PORT must be a port number")?
                .unwrap_or(8080),
        })
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.app_host, self.app_port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.app_host, self.app_port))
    }
}

fn database_url_from_parts(host: &str, port: u16, db: &str, user: &str, password: &str) -> String {
    if password.is_empty() {
        format!("postgres://{user}@{host}:{port}/{db}")
    } else {
        format!("postgres://{user}:{password}@{host}:{port}/{db}")
    }
}
