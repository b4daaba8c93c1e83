use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Credentials persisted between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<SessionTokens>>;
    async fn save(&self, tokens: &SessionTokens) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// JSON file readable only by the owner
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/spendwise/session.json`
    pub fn default_location() -> Result<Self> {
        let dir = dirs::config_dir().context("Could not determine the user config directory")?;
        Ok(Self::new(dir.join("spendwise").join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<SessionTokens>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };
        let tokens = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(Some(tokens))
    }

    async fn save(&self, tokens: &SessionTokens) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let content = serde_json::to_vec(tokens).context("Failed to serialize tokens")?;
        file.write_all(&content)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        file.flush().await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

/// Process-lifetime store
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<SessionTokens>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<SessionTokens>> {
        Ok(self.tokens.lock().await.clone())
    }

    async fn save(&self, tokens: &SessionTokens) -> Result<()> {
        *self.tokens.lock().await = Some(tokens.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.tokens.lock().await = None;
        Ok(())
    }
}

/// Reads try the primary store first; writes and removals go to both.
/// A write only fails when both stores fail.
pub struct FallbackTokenStore {
    primary: Box<dyn TokenStore>,
    secondary: Box<dyn TokenStore>,
}

impl FallbackTokenStore {
    pub fn new(primary: Box<dyn TokenStore>, secondary: Box<dyn TokenStore>) -> Self {
        Self { primary, secondary }
    }
}

fn either_ok(primary: Result<()>, secondary: Result<()>, action: &str) -> Result<()> {
    match (primary, secondary) {
        (Ok(()), _) | (_, Ok(())) => Ok(()),
        (Err(e), Err(_)) => Err(e).with_context(|| format!("Failed to {} tokens", action)),
    }
}

#[async_trait]
impl TokenStore for FallbackTokenStore {
    async fn load(&self) -> Result<Option<SessionTokens>> {
        match self.primary.load().await {
            Ok(Some(tokens)) => return Ok(Some(tokens)),
            Ok(None) => {}
            Err(e) => tracing::warn!("Primary token store unreadable: {:#}", e),
        }
        self.secondary.load().await
    }

    async fn save(&self, tokens: &SessionTokens) -> Result<()> {
        let primary = self.primary.save(tokens).await;
        if let Err(e) = &primary {
            tracing::warn!("Primary token store write failed: {:#}", e);
        }
        let secondary = self.secondary.save(tokens).await;
        either_ok(primary, secondary, "save")
    }

    async fn clear(&self) -> Result<()> {
        let primary = self.primary.clear().await;
        if let Err(e) = &primary {
            tracing::warn!("Primary token store clear failed: {:#}", e);
        }
        let secondary = self.secondary.clear().await;
        either_ok(primary, secondary, "clear")
    }
}
