use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub typesense: TypesenseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TypesenseConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub api_key: String,
    /// Timeout applied to every request made on the ingestion path.
    #[serde(default = "default_ingest_timeout_secs")]
    pub connection_timeout_secs: u64,
}

impl Default for TypesenseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            protocol: default_protocol(),
            api_key: String::new(),
            connection_timeout_secs: default_ingest_timeout_secs(),
        }
    }
}

impl TypesenseConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    8108
}
fn default_protocol() -> String {
    "http".to_string()
}
fn default_ingest_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Shared secret expected in `X-API-Key`. Falls back to the
    /// Typesense API key when unset.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Largest request body accepted on the ingestion routes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            api_key: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}
pub fn default_max_body_bytes() -> usize {
    64 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct LifecycleConfig {
    #[serde(default = "default_lifecycle_timeout_secs")]
    pub connection_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: default_lifecycle_timeout_secs(),
        }
    }
}

fn default_lifecycle_timeout_secs() -> u64 {
    600
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Emit JSON log lines for shipping to a log collector.
    #[serde(default)]
    pub production: bool,
}

impl Config {
    /// The secret the ingestion endpoint checks `X-API-Key` against.
    pub fn ingest_api_key(&self) -> &str {
        self.server
            .api_key
            .as_deref()
            .unwrap_or(&self.typesense.api_key)
    }
}

/// Load configuration from an optional TOML file, then apply environment
/// overrides from the process environment.
///
/// A missing file is not an error; defaults are used instead.
pub fn load_config(path: &Path) -> Result<Config> {
    let env: HashMap<String, String> = std::env::vars().collect();
    load_config_with_env(path, &env)
}

pub fn load_config_with_env(path: &Path, env: &HashMap<String, String>) -> Result<Config> {
    let mut config: Config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    apply_env(&mut config, env)?;
    validate(&config)?;
    Ok(config)
}

fn apply_env(config: &mut Config, env: &HashMap<String, String>) -> Result<()> {
    if let Some(host) = env.get("TYPESENSE_ENDPOINT") {
        config.typesense.host = host.clone();
    }
    if let Some(port) = env.get("TYPESENSE_PORT") {
        config.typesense.port = port
            .parse()
            .with_context(|| format!("TYPESENSE_PORT is not a valid port: '{}'", port))?;
    }
    if let Some(protocol) = env.get("TYPESENSE_PROTOCOL") {
        config.typesense.protocol = protocol.clone();
    }
    if let Some(key) = env.get("TYPESENSE_API_KEY") {
        config.typesense.api_key = key.clone();
    }
    if let Some(key) = env.get("INGEST_API_KEY") {
        config.server.api_key = Some(key.clone());
    }
    if let Some(bind) = env.get("BIND_ADDR") {
        config.server.bind = bind.clone();
    }
    if env.get("ENVIRONMENT").map(|v| v.as_str()) == Some("PRODUCTION") {
        config.logging.production = true;
    }
    Ok(())
}

fn validate(config: &Config) -> Result<()> {
    if config.typesense.api_key.is_empty() {
        anyhow::bail!("typesense.api_key must be set (or TYPESENSE_API_KEY)");
    }
    if config.ingest_api_key().is_empty() {
        anyhow::bail!("server.api_key must not be empty");
    }
    match config.typesense.protocol.as_str() {
        "http" | "https" => {}
        other => anyhow::bail!(
            "Unknown typesense protocol: '{}'. Must be http or https.",
            other
        ),
    }
    if config.server.max_body_bytes == 0 {
        anyhow::bail!("server.max_body_bytes must be > 0");
    }
    if config.typesense.connection_timeout_secs == 0 || config.lifecycle.connection_timeout_secs == 0
    {
        anyhow::bail!("connection_timeout_secs must be > 0");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_only_config() {
        let cfg = load_config_with_env(
            Path::new("/nonexistent/tshard.toml"),
            &env(&[
                ("TYPESENSE_ENDPOINT", "ts.internal"),
                ("TYPESENSE_PORT", "443"),
                ("TYPESENSE_PROTOCOL", "https"),
                ("TYPESENSE_API_KEY", "secret"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.typesense.base_url(), "https://ts.internal:443");
        assert_eq!(cfg.ingest_api_key(), "secret");
        assert!(!cfg.logging.production);
        assert_eq!(cfg.lifecycle.connection_timeout_secs, 600);
        assert_eq!(cfg.server.max_body_bytes, 64 * 1024 * 1024);
    }

    #[test]
    fn test_env_overrides_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tshard.toml");
        std::fs::write(
            &path,
            r#"
[typesense]
host = "from-file"
api_key = "file-key"

[server]
bind = "127.0.0.1:9000"
api_key = "ingest-file"
max_body_bytes = 1048576
"#,
        )
        .unwrap();

        let cfg = load_config_with_env(
            &path,
            &env(&[("TYPESENSE_ENDPOINT", "from-env"), ("ENVIRONMENT", "PRODUCTION")]),
        )
        .unwrap();
        assert_eq!(cfg.typesense.host, "from-env");
        assert_eq!(cfg.typesense.api_key, "file-key");
        assert_eq!(cfg.server.bind, "127.0.0.1:9000");
        assert_eq!(cfg.ingest_api_key(), "ingest-file");
        assert_eq!(cfg.server.max_body_bytes, 1_048_576);
        assert!(cfg.logging.production);
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let err = load_config_with_env(Path::new("/nonexistent"), &env(&[])).unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn test_bad_port_rejected() {
        let err = load_config_with_env(
            Path::new("/nonexistent"),
            &env(&[("TYPESENSE_API_KEY", "k"), ("TYPESENSE_PORT", "eighty")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("TYPESENSE_PORT"));
    }

    #[test]
    fn test_bad_protocol_rejected() {
        let err = load_config_with_env(
            Path::new("/nonexistent"),
            &env(&[("TYPESENSE_API_KEY", "k"), ("TYPESENSE_PROTOCOL", "ftp")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("protocol"));
    }
}
