use serde::{Deserialize, Serialize};
use spendwise_common::models::auth::AuthProvider;
use std::collections::HashMap;

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub url: String,
}

/// Google/Apple sign-in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Audience the identity token must be issued for (the app's client id)
    pub client_id: String,
    /// Accepted `iss` values; provider defaults when empty
    #[serde(default)]
    pub issuers: Vec<String>,
    /// Signing keys endpoint; provider default when unset
    pub jwks_url: Option<String>,
}

impl ProviderConfig {
    pub fn issuers_for(&self, provider: AuthProvider) -> Vec<String> {
        if !self.issuers.is_empty() {
            return self.issuers.clone();
        }
        match provider {
            AuthProvider::Google => vec![
                "https://accounts.google.com".to_string(),
                "accounts.google.com".to_string(),
            ],
            AuthProvider::Apple => vec!["https://appleid.apple.com".to_string()],
            AuthProvider::Local => Vec::new(),
        }
    }

    pub fn jwks_url_for(&self, provider: AuthProvider) -> Option<String> {
        self.jwks_url.clone().or_else(|| match provider {
            AuthProvider::Google => Some("https://www.googleapis.com/oauth2/v3/certs".to_string()),
            AuthProvider::Apple => Some("https://appleid.apple.com/auth/keys".to_string()),
            AuthProvider::Local => None,
        })
    }
}

/// Initial user to seed on startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialUserConfig {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub monthly_budget: Option<f64>,
}

fn default_access_token_ttl() -> i64 {
    7 * 24 * 60 * 60
}

fn default_refresh_token_ttl_days() -> i64 {
    30
}

fn default_sweep_interval() -> u64 {
    3600
}

/// Auth configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Access token lifetime in seconds (default: 7 days)
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in days (default: 30)
    #[serde(default = "default_refresh_token_ttl_days")]
    pub refresh_token_ttl_days: i64,
    /// How often expired refresh tokens are purged, in seconds (default: 3600)
    #[serde(default = "default_sweep_interval")]
    pub token_sweep_interval_secs: u64,
    /// Social sign-in providers keyed by name ("google", "apple")
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    pub initial_user: Option<InitialUserConfig>,
}

/// Server configuration - loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen: String, // "0.0.0.0:4000"
    pub db: DbConfig,
    pub auth: AuthConfig,
}

/// Load server config from a YAML file with SPENDWISE__ env var overrides.
pub fn load_config(path: &str) -> anyhow::Result<ServerConfig> {
    use anyhow::Context;
    let config: ServerConfig = config::Config::builder()
        .add_source(config::File::new(path, config::FileFormat::Yaml))
        .add_source(
            config::Environment::with_prefix("SPENDWISE")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .with_context(|| format!("Failed to build config from: {}", path))?
        .try_deserialize()
        .with_context(|| format!("Failed to deserialize config from: {}", path))?;

    for name in config.auth.providers.keys() {
        match name.parse::<AuthProvider>() {
            Ok(p) if p.is_social() => {}
            _ => anyhow::bail!("Unsupported sign-in provider '{}' in config", name),
        }
    }

    Ok(config)
}
