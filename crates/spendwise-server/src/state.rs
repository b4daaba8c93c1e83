use crate::config::ServerConfig;
use crate::social::{IdentityVerifier, Verifiers};
use spendwise_common::models::auth::AuthProvider;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<ServerConfig>,
    pub verifiers: Arc<Verifiers>,
}

impl AppState {
    /// Create a new app state
    pub fn new(pool: PgPool, config: ServerConfig, verifiers: Verifiers) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            verifiers: Arc::new(verifiers),
        }
    }

    /// Verifier for a social provider, if it is configured
    pub fn verifier(&self, provider: AuthProvider) -> Option<Arc<dyn IdentityVerifier>> {
        self.verifiers.get(&provider).cloned()
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.auth.jwt_secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, DbConfig};
    use crate::social::VerifiedIdentity;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StaticVerifier;

    #[async_trait]
    impl IdentityVerifier for StaticVerifier {
        async fn verify(&self, _id_token: &str) -> anyhow::Result<VerifiedIdentity> {
            Ok(VerifiedIdentity {
                subject: "sub-1".to_string(),
                email: Some("a@example.com".to_string()),
                name: None,
            })
        }
    }

    fn test_config() -> ServerConfig {
        ServerConfig {
            listen: "127.0.0.1:0".to_string(),
            db: DbConfig {
                url: "postgres://invalid:5432/db".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: "state-secret".to_string(),
                access_token_ttl_secs: 60,
                refresh_token_ttl_days: 30,
                token_sweep_interval_secs: 3600,
                providers: HashMap::new(),
                initial_user: None,
            },
        }
    }

    #[tokio::test]
    async fn test_verifier_lookup() {
        let pool = PgPool::connect_lazy("postgres://invalid:5432/db").unwrap();
        let mut verifiers: Verifiers = HashMap::new();
        verifiers.insert(AuthProvider::Google, Arc::new(StaticVerifier));
        let state = AppState::new(pool, test_config(), verifiers);

        assert_eq!(state.jwt_secret(), "state-secret");
        assert!(state.verifier(AuthProvider::Apple).is_none());

        let google = state.verifier(AuthProvider::Google).unwrap();
        let identity = google.verify("anything").await.unwrap();
        assert_eq!(identity.subject, "sub-1");
    }
}
