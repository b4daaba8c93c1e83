use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::DEFAULT_REQUEST_TIMEOUT;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:4000";

/// Optional `client.yaml`; command-line flags and env vars win over it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub server_url: Option<String>,
    /// Where the session is saved; defaults to the platform config dir
    #[serde(default)]
    pub token_file: Option<PathBuf>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("spendwise").join("client.yaml"))
}

pub fn load_config(path: &str) -> Result<ClientConfig> {
    let content =
        std::fs::read_to_string(path).context(format!("Failed to read config file: {}", path))?;
    let config: ClientConfig =
        serde_yml::from_str(&content).context("Failed to parse client config YAML")?;
    Ok(config)
}

/// Explicit path must exist; the default location is optional.
pub fn load_or_default(explicit: Option<&str>) -> Result<ClientConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match default_config_path() {
        Some(path) if path.exists() => load_config(&path.to_string_lossy()),
        _ => Ok(ClientConfig::default()),
    }
}

impl ClientConfig {
    pub fn server_url(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.server_url.clone())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let yaml = r#"
server_url: "https://api.spendwise.example"
token_file: "/tmp/spendwise-session.json"
request_timeout_secs: 5
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(
            config.server_url.as_deref(),
            Some("https://api.spendwise.example")
        );
        assert_eq!(
            config.token_file,
            Some(PathBuf::from("/tmp/spendwise-session.json"))
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{}\n").unwrap();
        file.flush().unwrap();

        let config = load_or_default(Some(file.path().to_str().unwrap())).unwrap();
        assert!(config.token_file.is_none());
        assert_eq!(config.server_url(None), DEFAULT_SERVER_URL);
        assert_eq!(config.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_flag_overrides_file() {
        let config = ClientConfig {
            server_url: Some("http://from-file".to_string()),
            token_file: None,
            request_timeout_secs: None,
        };
        assert_eq!(config.server_url(None), "http://from-file");
        assert_eq!(config.server_url(Some("http://flag")), "http://flag");
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        assert!(load_or_default(Some("/nonexistent/client.yaml")).is_err());
    }
}
