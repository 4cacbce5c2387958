use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Minimum HMAC secret size for HS512 (512 bits)
pub const MIN_SECRET_BYTES: usize = 64;

const DEFAULT_ACCESS_TTL_MS: u64 = 86_400_000;
const DEFAULT_REFRESH_TTL_MS: u64 = 604_800_000;
/// Longest accepted token lifetime: 365 days
pub const MAX_TOKEN_TTL_MS: u64 = 31_536_000_000;
const DEVELOPMENT_SECRET: &str =
    "development-only-signing-secret-change-me-before-deploying-this-service-anywhere-real";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection URL. When unset the in-memory store is used.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub access_token_ttl_ms: u64,
    pub refresh_token_ttl_ms: u64,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Administrator created at startup when missing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set in {0:?} mode")]
    MissingSecret(Environment),

    #[error("JWT_SECRET must be at least {min} bytes for HS512, got {0}", min = MIN_SECRET_BYTES)]
    WeakSecret(usize),

    #[error("bcrypt cost must be between 4 and 31, got {0}")]
    InvalidBcryptCost(u32),

    #[error("{name} must be at most {max} ms, got {value}", max = MAX_TOKEN_TTL_MS)]
    InvalidTokenTtl { name: &'static str, value: u64 },

    #[error("incomplete bootstrap admin: ADMIN_USERNAME, ADMIN_EMAIL and ADMIN_PASSWORD must all be set")]
    IncompleteBootstrapAdmin,
}

impl AppConfig {
    /// Build and validate the configuration from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` but reads variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(lookup)
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Server overrides
        if let Some(v) = lookup("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("SERVER_PORT").or_else(|| lookup("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Some(v) = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            self.database.url = Some(v);
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Some(v) = lookup("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Security overrides
        if let Some(v) = lookup("JWT_SECRET").filter(|v| !v.is_empty()) {
            self.security.jwt_secret = v;
        }
        if let Some(v) = lookup("JWT_EXPIRATION_MS") {
            self.security.access_token_ttl_ms = v.parse().unwrap_or(self.security.access_token_ttl_ms);
        }
        if let Some(v) = lookup("JWT_REFRESH_EXPIRATION_MS") {
            self.security.refresh_token_ttl_ms = v.parse().unwrap_or(self.security.refresh_token_ttl_ms);
        }
        if let Some(v) = lookup("SECURITY_BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        let admin = (lookup("ADMIN_USERNAME"), lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD"));
        self.security.bootstrap_admin = match admin {
            (Some(username), Some(email), Some(password)) => Some(BootstrapAdmin { username, email, password }),
            (None, None, None) => None,
            _ => return Err(ConfigError::IncompleteBootstrapAdmin),
        };

        Ok(self)
    }

    /// Reject settings the service cannot run safely with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secret = &self.security.jwt_secret;
        if secret.is_empty() {
            return Err(ConfigError::MissingSecret(self.environment));
        }
        if secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::WeakSecret(secret.len()));
        }
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::InvalidBcryptCost(self.security.bcrypt_cost));
        }
        for (name, value) in [
            ("JWT_EXPIRATION_MS", self.security.access_token_ttl_ms),
            ("JWT_REFRESH_EXPIRATION_MS", self.security.refresh_token_ttl_ms),
        ] {
            if value > MAX_TOKEN_TTL_MS {
                return Err(ConfigError::InvalidTokenTtl { name, value });
            }
        }
        if self.environment != Environment::Development && secret == DEVELOPMENT_SECRET {
            return Err(ConfigError::MissingSecret(self.environment));
        }
        Ok(())
    }

    pub fn uses_development_secret(&self) -> bool {
        self.security.jwt_secret == DEVELOPMENT_SECRET
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            security: SecurityConfig {
                jwt_secret: DEVELOPMENT_SECRET.to_string(),
                access_token_ttl_ms: DEFAULT_ACCESS_TTL_MS,
                refresh_token_ttl_ms: DEFAULT_REFRESH_TTL_MS,
                bcrypt_cost: 12,
                cors_origins: vec!["*".to_string()],
                bootstrap_admin: None,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                access_token_ttl_ms: DEFAULT_ACCESS_TTL_MS,
                refresh_token_ttl_ms: DEFAULT_REFRESH_TTL_MS,
                bcrypt_cost: 12,
                cors_origins: vec!["https://staging.example.com".to_string()],
                bootstrap_admin: None,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                access_token_ttl_ms: DEFAULT_ACCESS_TTL_MS,
                refresh_token_ttl_ms: DEFAULT_REFRESH_TTL_MS,
                bcrypt_cost: 12,
                cors_origins: vec!["https://app.example.com".to_string()],
                bootstrap_admin: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.security.access_token_ttl_ms, 86_400_000);
        assert_eq!(config.security.refresh_token_ttl_ms, 604_800_000);
        assert!(config.database.url.is_none());
        assert!(config.validate().is_ok());
        assert!(config.uses_development_secret());
    }

    #[test]
    fn test_production_requires_secret() {
        let config = AppConfig::from_lookup(lookup(&[("APP_ENV", "production")])).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::MissingSecret(Environment::Production))));
    }

    #[test]
    fn test_rejects_weak_secret() {
        let config = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "short")])).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::WeakSecret(5))));
    }

    #[test]
    fn test_env_overrides() {
        let secret = "s".repeat(64);
        let config = AppConfig::from_lookup(lookup(&[
            ("APP_ENV", "staging"),
            ("JWT_SECRET", secret.as_str()),
            ("JWT_EXPIRATION_MS", "1000"),
            ("PORT", "9090"),
            ("SECURITY_CORS_ORIGINS", "https://a.test, https://b.test"),
            ("DATABASE_URL", "postgres://localhost/finance"),
        ]))
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.security.access_token_ttl_ms, 1000);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.security.cors_origins, vec!["https://a.test", "https://b.test"]);
        assert_eq!(config.database.url.as_deref(), Some("postgres://localhost/finance"));
    }

    #[test]
    fn test_rejects_token_ttl_beyond_ceiling() {
        let config = AppConfig::from_lookup(lookup(&[("JWT_EXPIRATION_MS", "9223372036854775807")])).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTokenTtl { name: "JWT_EXPIRATION_MS", .. })
        ));

        let config = AppConfig::from_lookup(lookup(&[("JWT_REFRESH_EXPIRATION_MS", "18446744073709551615")])).unwrap();
        assert_eq!(config.security.refresh_token_ttl_ms, u64::MAX);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTokenTtl { name: "JWT_REFRESH_EXPIRATION_MS", value: u64::MAX })
        ));

        let at_ceiling = MAX_TOKEN_TTL_MS.to_string();
        let config = AppConfig::from_lookup(lookup(&[("JWT_EXPIRATION_MS", at_ceiling.as_str())])).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_bootstrap_admin_is_rejected() {
        let result = AppConfig::from_lookup(lookup(&[("ADMIN_USERNAME", "root")]));
        assert!(matches!(result, Err(ConfigError::IncompleteBootstrapAdmin)));
    }
}
