use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::store::StoreConfig;

/// Metadata lookup service
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "metadata-server", version, about = "Shared-secret metadata lookup service")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "METADATA_PORT", default_value = "80")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "METADATA_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./metadata.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "METADATA_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Dump the whole collection and email it as a compressed attachment,
    /// then exit (requires the [smtp] config section)
    #[arg(long)]
    pub backup: bool,

    /// Backing store connection (loaded from [store] section in TOML)
    #[arg(skip)]
    #[serde(default = "default_store_config")]
    pub store: Option<StoreConfig>,

    /// SMTP delivery for --backup (loaded from [smtp] section in TOML)
    #[arg(skip)]
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

/// SMTP session parameters for backup delivery. The session authenticates
/// as the sender over STARTTLS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// SMTP relay hostname
    pub host: String,

    /// SMTP port (default: 587)
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Sender address, also the SMTP username
    pub sender: String,

    /// SMTP password for the sender
    pub password: String,

    /// Recipient address for the backup attachment
    pub subscriber: String,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_store_config() -> Option<StoreConfig> {
    Some(StoreConfig::default())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 80,
            bind_address: "0.0.0.0".to_string(),
            config: "./metadata.toml".to_string(),
            json_logs: false,
            generate_config: false,
            backup: false,
            store: Some(StoreConfig::default()),
            smtp: None,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (METADATA_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("METADATA_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Metadata Server Configuration
# Place this file at ./metadata.toml or specify with --config <path>
# All settings can be overridden via environment variables (METADATA_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 80)
# port = 80

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# ---- Backing Store ----
[store]

# Store hostname or IP (default: 127.0.0.1)
# host = "127.0.0.1"

# Store port (default: 27017)
# port = 27017

# Database and collection holding the metadata documents
# database = "metadata"
# collection = "metadata"

# Optional credentials; the connection is unauthenticated when omitted
# user = ""
# password = ""

# Bound on connection establishment in seconds (default: 5)
# connect_timeout_secs = 5

# ---- Backup Delivery (only used with --backup) ----
# [smtp]
# host = "smtp.example.com"
# port = 587
# sender = "backup@example.com"    # also the SMTP username
# password = ""
# subscriber = "operator@example.com"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 80);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.store.unwrap().port, 27017);
        assert!(config.smtp.is_none());
    }

    #[test]
    fn test_smtp_section_from_toml() {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [smtp]
                host = "smtp.example.com"
                sender = "a@example.com"
                password = "pw"
                subscriber = "b@example.com"
                "#,
            ))
            .extract()
            .unwrap();
        let smtp = config.smtp.expect("smtp section");
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.host, "smtp.example.com");
    }
}
