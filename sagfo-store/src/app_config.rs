use sagfo_core::BusinessRules;
use sagfo_order::TransitionPolicy;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub business_rules: BusinessRulesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Unset means the in-memory store.
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: None, max_connections: default_max_connections() }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    /// Administrator created at startup when the e-mail is not registered.
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

fn default_bcrypt_cost() -> u32 {
    12
}

#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// Object API root, e.g. `https://host/storage/v1/object/<bucket>`.
    pub base_url: Option<String>,
    pub token: Option<String>,
    /// Prefix of the URLs handed to clients; defaults to `base_url`.
    pub public_base_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRulesConfig {
    #[serde(default)]
    pub status_transitions: TransitionPolicy,
    #[serde(default = "default_deposit_percent")]
    pub deposit_percent: u8,
    #[serde(default = "default_max_compare_items")]
    pub max_compare_items: usize,
}

fn default_deposit_percent() -> u8 {
    50
}

fn default_max_compare_items() -> usize {
    2
}

impl Default for BusinessRulesConfig {
    fn default() -> Self {
        Self {
            status_transitions: TransitionPolicy::default(),
            deposit_percent: default_deposit_percent(),
            max_compare_items: default_max_compare_items(),
        }
    }
}

impl BusinessRulesConfig {
    pub fn rules(&self) -> BusinessRules {
        BusinessRules {
            status_transitions: self.status_transitions,
            deposit_percent: self.deposit_percent.min(100),
            max_compare_items: self.max_compare_items.max(1),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in.
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `SAGFO__SERVER__PORT=9000`
            .add_source(config::Environment::with_prefix("SAGFO").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    const DEFAULT: &str = include_str!("../../config/default.toml");

    fn parse(extra: &str) -> Config {
        config::Config::builder()
            .add_source(File::from_str(DEFAULT, FileFormat::Toml))
            .add_source(File::from_str(extra, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_config_runs_in_memory() {
        let config = parse("");
        assert_eq!(config.server.port, 8080);
        assert!(config.database.url.is_none());
        assert!(config.storage.base_url.is_none());
        let rules = config.business_rules.rules();
        assert_eq!(rules.status_transitions, TransitionPolicy::Strict);
        assert_eq!(rules.deposit_percent, 50);
        assert_eq!(rules.max_compare_items, 2);
    }

    #[test]
    fn test_overrides() {
        let config = parse(
            r#"
            [database]
            url = "postgres://localhost/sagfo"
            [business_rules]
            status_transitions = "free"
            deposit_percent = 140
            "#,
        );
        assert_eq!(config.database.url.as_deref(), Some("postgres://localhost/sagfo"));
        assert_eq!(config.database.max_connections, 5);
        let rules = config.business_rules.rules();
        assert_eq!(rules.status_transitions, TransitionPolicy::Free);
        assert_eq!(rules.deposit_percent, 100);
    }
}
