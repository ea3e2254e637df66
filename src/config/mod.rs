use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

use crate::domain::RefundPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub refund_policy: RefundPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub secret_key: Option<String>,
    /// When set, incoming webhooks must carry a valid signature.
    pub webhook_secret: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.paymongo.com/v1".to_string(),
            secret_key: None,
            webhook_secret: None,
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AdminConfig {
    /// Bearer token required on /admin routes. Admin routes reject every
    /// request while this is unset.
    pub api_token: Option<String>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite://lagoon.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("gateway.base_url", "https://api.paymongo.com/v1")?
            .set_default("gateway.timeout_secs", 20)?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with LAGOON__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("LAGOON").separator("__"))

            .build()?;

        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;

        settings
            .refund_policy
            .validate()
            .map_err(|e| ConfigError::Message(format!("Invalid refund policy: {}", e)))?;

        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "sqlite://lagoon.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            gateway: GatewayConfig::default(),
            admin: AdminConfig::default(),
            refund_policy: RefundPolicy::default(),
        }
    }
}
