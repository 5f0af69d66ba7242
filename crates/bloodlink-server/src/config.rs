//! Layered server configuration.
//!
//! Sources, lowest precedence first: built-in defaults, the optional
//! `config/bloodlink.toml` file, then `BLOODLINK__`-prefixed environment
//! variables with `__` separating nested keys
//! (`BLOODLINK__SERVER__PORT=8080`, `BLOODLINK__AUTH__JWT_ISSUER=...`).
//! A `.env` file in the working directory is loaded first.

use std::net::SocketAddr;

use bloodlink_auth::AuthConfig;
use bloodlink_db::DbConfig;
use serde::Deserialize;

const CONFIG_FILE: &str = "config/bloodlink";
const ENV_PREFIX: &str = "BLOODLINK";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DbConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    pub workflow: WorkflowConfig,
    /// Administrator created at startup when no account has its email.
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. Empty disables CORS headers.
    pub cors_origins: Vec<String>,
    /// Request body limit in bytes.
    pub max_request_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            cors_origins: Vec::new(),
            max_request_body_size: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` overrides it.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Reject request transitions outside the allowed table. When false,
    /// any status may follow any other.
    pub strict_request_transitions: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            strict_request_transitions: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

impl Config {
    /// Load configuration from `.env`, the config file and the
    /// environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        // A missing .env is fine; the environment may already be set.
        let _ = dotenvy::dotenv();

        config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be non-zero".into());
        }
        if self.server.max_request_body_size == 0 {
            return Err("server.max_request_body_size must be non-zero".into());
        }
        if self.database.url.trim().is_empty() {
            return Err("database.url must be set".into());
        }
        if self.auth.jwt_private_key_pem.trim().is_empty()
            || self.auth.jwt_public_key_pem.trim().is_empty()
        {
            return Err("auth.jwt_private_key_pem and auth.jwt_public_key_pem must be set".into());
        }
        if self.auth.jwt_issuer.trim().is_empty() {
            return Err("auth.jwt_issuer must be set".into());
        }
        if self.auth.access_token_lifetime_secs == 0 || self.auth.refresh_token_lifetime_secs == 0
        {
            return Err("auth token lifetimes must be non-zero".into());
        }
        if self.auth.min_password_length == 0 {
            return Err("auth.min_password_length must be non-zero".into());
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        let mut config = Config::default();
        config.auth.jwt_private_key_pem = "private".into();
        config.auth.jwt_public_key_pem = "public".into();
        config
    }

    #[test]
    fn defaults_are_strict_and_local() {
        let config = Config::default();
        assert!(config.workflow.strict_request_transitions);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.namespace, "bloodlink");
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn missing_keys_fail_validation() {
        assert!(Config::default().validate().is_err());
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn zero_port_and_empty_issuer_fail_validation() {
        let mut config = valid();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.auth.jwt_issuer = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn socket_addr_joins_host_and_port() {
        let mut config = valid();
        config.server.host = "127.0.0.1".into();
        config.server.port = 9000;
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "server": { "port": 9090 },
            "workflow": { "strict_request_transitions": false }
        }))
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(!config.workflow.strict_request_transitions);
        assert_eq!(config.auth.access_token_lifetime_secs, 900);
    }
}
