use anyhow::{Context, Result};
use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use spendwise_common::models::auth::AuthProvider;
use spendwise_db::{UserAuthLinkRepo, UserRepo, UserRow};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::ProviderConfig;

/// Identity extracted from a verified Google/Apple token
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    /// Provider's stable subject id (`sub` claim)
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Turns an opaque identity token into a verified identity.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity>;
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Verifies RS256 identity tokens against a provider's published key set.
pub struct JwksVerifier {
    provider: AuthProvider,
    client_id: String,
    issuers: Vec<String>,
    jwks_url: String,
    http: reqwest::Client,
    keys: RwLock<Option<JwkSet>>,
}

impl JwksVerifier {
    pub fn new(provider: AuthProvider, config: &ProviderConfig) -> Result<Self> {
        let jwks_url = config
            .jwks_url_for(provider)
            .with_context(|| format!("No key set URL for provider '{}'", provider))?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client for identity verification")?;
        Ok(Self {
            provider,
            client_id: config.client_id.clone(),
            issuers: config.issuers_for(provider),
            jwks_url,
            http,
            keys: RwLock::new(None),
        })
    }

    async fn fetch_keys(&self) -> Result<JwkSet> {
        tracing::debug!("Fetching {} signing keys from {}", self.provider, self.jwks_url);
        let resp = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch keys from {}", self.jwks_url))?;
        if !resp.status().is_success() {
            anyhow::bail!(
                "Key set request to {} failed with status {}",
                self.jwks_url,
                resp.status()
            );
        }
        resp.json::<JwkSet>()
            .await
            .context("Failed to parse key set")
    }

    /// Key for `kid`, refetching the set once when the cached one lacks it
    /// (providers rotate keys).
    async fn key_for(&self, kid: &str) -> Result<DecodingKey> {
        if let Some(keys) = self.keys.read().await.as_ref() {
            if let Some(jwk) = keys.find(kid) {
                return DecodingKey::from_jwk(jwk).context("Unusable signing key");
            }
        }

        let fresh = self.fetch_keys().await?;
        let key = fresh
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()
            .context("Unusable signing key")?;
        *self.keys.write().await = Some(fresh);
        key.with_context(|| format!("Unknown signing key '{}'", kid))
    }
}

#[async_trait]
impl IdentityVerifier for JwksVerifier {
    #[tracing::instrument(skip(self, id_token), fields(provider = %self.provider))]
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity> {
        let header = jsonwebtoken::decode_header(id_token).context("Malformed identity token")?;
        if header.alg != Algorithm::RS256 {
            anyhow::bail!("Unsupported identity token algorithm {:?}", header.alg);
        }
        let kid = header.kid.context("Identity token has no key id")?;
        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.set_issuer(&self.issuers);

        let data = jsonwebtoken::decode::<IdTokenClaims>(id_token, &key, &validation)
            .context("Identity token rejected")?;
        Ok(VerifiedIdentity {
            subject: data.claims.sub,
            email: data.claims.email,
            name: data.claims.name,
        })
    }
}

pub type Verifiers = HashMap<AuthProvider, Arc<dyn IdentityVerifier>>;

/// Build a verifier for every configured sign-in provider
pub fn init_verifiers(providers: &HashMap<String, ProviderConfig>) -> Result<Verifiers> {
    let mut result: Verifiers = HashMap::new();
    for (name, config) in providers {
        let provider: AuthProvider = name
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .with_context(|| format!("Invalid provider name '{}'", name))?;
        if !provider.is_social() {
            anyhow::bail!("Provider '{}' does not use identity tokens", name);
        }
        let verifier = JwksVerifier::new(provider, config)?;
        tracing::info!("Sign-in provider '{}' enabled", name);
        result.insert(provider, Arc::new(verifier));
    }
    Ok(result)
}

/// Just-in-time provisioning for social sign-in.
///
/// 1. An auth link for this provider+subject exists: return that user
/// 2. A user with the token's email exists: link and return it
/// 3. Otherwise create a password-less user plus link
///
/// Returns `None` when the identity is new and carries no email to create
/// an account with.
#[tracing::instrument(skip(pool, identity), fields(subject = %identity.subject))]
pub async fn provision_user(
    pool: &PgPool,
    provider: AuthProvider,
    identity: &VerifiedIdentity,
    fallback_name: Option<&str>,
) -> Result<Option<UserRow>> {
    let provider_id = provider.as_str();

    if let Some(link) =
        UserAuthLinkRepo::get_by_provider_and_external_id(pool, provider_id, &identity.subject)
            .await?
    {
        let user = UserRepo::get_by_id(pool, link.user_id)
            .await?
            .context("User referenced by auth link not found")?;
        return Ok(Some(user));
    }

    let Some(email) = identity.email.as_deref().map(crate::auth::normalize_email) else {
        return Ok(None);
    };

    if let Some(user) = UserRepo::get_by_email(pool, &email).await? {
        UserAuthLinkRepo::create(pool, user.user_id, provider_id, &identity.subject).await?;
        tracing::info!("Linked existing user {} to {}", user.user_id, provider);
        return Ok(Some(user));
    }

    let user_id = Uuid::new_v4();
    let name = identity.name.as_deref().or(fallback_name);
    UserRepo::create(pool, user_id, &email, None, name, provider).await?;
    UserAuthLinkRepo::create(pool, user_id, provider_id, &identity.subject).await?;
    tracing::info!("Provisioned new {} user {}", provider, user_id);

    let user = UserRepo::get_by_id(pool, user_id)
        .await?
        .context("Provisioned user not found")?;
    Ok(Some(user))
}
