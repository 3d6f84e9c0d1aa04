//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tillbook_core::{DEFAULT_DEMO_INVOICES_PER_DAY, DEFAULT_DEMO_PRODUCTS_PER_DAY};

const DEV_JWT_SECRET: &str = "tillbook-dev-secret-change-in-production";

/// Deployment mode. Development adds internal error details to 5xx bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind address
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub database_max_connections: u32,

    /// JWT secret key for signing tokens
    #[serde(skip_serializing)]
    pub jwt_secret: String,

    /// JWT lifetime in seconds (default: 30 days)
    pub jwt_lifetime_secs: i64,

    pub environment: Environment,

    /// Sale invoices a demo shop may create per day
    pub demo_invoices_per_day: i64,

    /// Products a demo shop may create per day
    pub demo_products_per_day: i64,

    /// Whether new sign-ups start as demo shops
    pub signup_demo_default: bool,

    /// Built client to serve at `/`, with `index.html` fallback
    pub static_dir: Option<PathBuf>,

    /// Login emails that bypass demo quotas (lower-cased)
    pub demo_exempt_emails: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_path: PathBuf::from("./tillbook.db"),
            database_max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_lifetime_secs: 30 * 24 * 60 * 60,
            environment: Environment::Development,
            demo_invoices_per_day: DEFAULT_DEMO_INVOICES_PER_DAY,
            demo_products_per_day: DEFAULT_DEMO_PRODUCTS_PER_DAY,
            signup_demo_default: true,
            static_dir: None,
            demo_exempt_emails: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ApiConfig::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = match var("TILLBOOK_ENV").as_deref() {
            None | Some("development") | Some("dev") => Environment::Development,
            Some("production") | Some("prod") => Environment::Production,
            Some(_) => return Err(ConfigError::InvalidValue("TILLBOOK_ENV".to_string())),
        };

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if environment == Environment::Production => {
                return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
            }
            None => defaults.jwt_secret,
        };

        let config = ApiConfig {
            host: var("TILLBOOK_HOST").unwrap_or(defaults.host),
            port: parse_or(&var, "TILLBOOK_PORT", defaults.port)?,
            database_path: var("DATABASE_PATH").map(PathBuf::from).unwrap_or(defaults.database_path),
            database_max_connections: parse_or(&var, "DATABASE_MAX_CONNECTIONS", defaults.database_max_connections)?,
            jwt_secret,
            jwt_lifetime_secs: parse_or(&var, "JWT_LIFETIME_SECS", defaults.jwt_lifetime_secs)?,
            environment,
            demo_invoices_per_day: parse_or(&var, "DEMO_INVOICES_PER_DAY", defaults.demo_invoices_per_day)?,
            demo_products_per_day: parse_or(&var, "DEMO_PRODUCTS_PER_DAY", defaults.demo_products_per_day)?,
            signup_demo_default: parse_or(&var, "SIGNUP_DEMO_DEFAULT", defaults.signup_demo_default)?,
            static_dir: var("TILLBOOK_STATIC_DIR").map(PathBuf::from),
            demo_exempt_emails: var("DEMO_EXEMPT_EMAILS")
                .map(|raw| {
                    raw.split(',')
                        .map(|email| email.trim().to_lowercase())
                        .filter(|email| !email.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        };

        if config.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_LIFETIME_SECS".to_string()));
        }
        if config.database_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS".to_string()));
        }

        Ok(config)
    }

    /// Whether this login email skips demo quotas.
    pub fn is_demo_exempt(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.demo_exempt_emails.iter().any(|exempt| *exempt == email)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, V>(var: &V, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    V: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.demo_invoices_per_day, 5);
        assert_eq!(config.jwt_lifetime_secs, 2_592_000);
        assert!(config.signup_demo_default);
        assert!(config.static_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TILLBOOK_PORT", "8080"),
            ("DEMO_PRODUCTS_PER_DAY", "20"),
            ("SIGNUP_DEMO_DEFAULT", "false"),
            ("DEMO_EXEMPT_EMAILS", " Boss@Example.com, ,qa@example.com"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.demo_products_per_day, 20);
        assert!(!config.signup_demo_default);
        assert!(config.is_demo_exempt("boss@example.com"));
        assert!(config.is_demo_exempt(" QA@example.com"));
        assert!(!config.is_demo_exempt("someone@example.com"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(load(&[("TILLBOOK_PORT", "abc")]), Err(ConfigError::InvalidValue(_))));
        assert!(matches!(load(&[("TILLBOOK_ENV", "staging")]), Err(ConfigError::InvalidValue(_))));
        assert!(matches!(load(&[("JWT_LIFETIME_SECS", "0")]), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_production_requires_secret() {
        let err = load(&[("TILLBOOK_ENV", "production")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(_)));

        let config = load(&[("TILLBOOK_ENV", "production"), ("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.jwt_secret, "s3cret");
    }
}
