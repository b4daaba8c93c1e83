//! Session lifecycle: restore a saved token on start, log in and out, and
//! publish the current state to observers.

use crate::api::{AuthBackend, ClientError};
use crate::store::{SessionTokens, TokenStore};
use spendwise_common::models::auth::{AuthResponse, User};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Unauthenticated,
    /// A saved token is being checked against the server
    Restoring,
    Authenticated(User),
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

pub struct SessionManager {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn TokenStore>,
    state: watch::Sender<SessionState>,
    tokens: Mutex<Option<SessionTokens>>,
    /// Serializes restore, login and logout
    op_lock: Mutex<()>,
}

impl SessionManager {
    /// Enter `Restoring` and spawn the restore task. Callers that need a
    /// settled state should await [`SessionManager::ready`].
    pub fn start(backend: Arc<dyn AuthBackend>, store: Arc<dyn TokenStore>) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::Restoring);
        let manager = Arc::new(Self {
            backend,
            store,
            state,
            tokens: Mutex::new(None),
            op_lock: Mutex::new(()),
        });

        let restoring = manager.clone();
        tokio::spawn(async move {
            restoring.restore().await;
        });
        manager
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Wait until the restore phase is over and return the settled state.
    pub async fn ready(&self) -> SessionState {
        let mut rx = self.state.subscribe();
        let settled = match rx
            .wait_for(|s| !matches!(s, SessionState::Restoring))
            .await
        {
            Ok(state) => state.clone(),
            // Sender lives in self, so this cannot close while we hold &self
            Err(_) => self.state(),
        };
        settled
    }

    /// Refresh token of the current session, if any
    pub async fn refresh_token(&self) -> Option<String> {
        self.tokens
            .lock()
            .await
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
    }

    async fn restore(&self) {
        let _guard = self.op_lock.lock().await;

        let saved = match self.store.load().await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!("Could not read saved session: {:#}", e);
                None
            }
        };

        let Some(tokens) = saved else {
            self.state.send_replace(SessionState::Unauthenticated);
            return;
        };

        self.backend.set_token(Some(tokens.access_token.clone()));
        match self.backend.fetch_profile().await {
            Ok(user) => {
                tracing::debug!("Restored session for {}", user.email);
                *self.tokens.lock().await = Some(tokens);
                self.state.send_replace(SessionState::Authenticated(user));
            }
            Err(e) => {
                tracing::info!("Saved session is no longer valid: {}", e);
                self.drop_credentials().await;
            }
        }
    }

    /// Forget everything locally and become `Unauthenticated`.
    async fn drop_credentials(&self) {
        if let Err(e) = self.store.clear().await {
            tracing::warn!("Failed to clear saved session: {:#}", e);
        }
        self.backend.set_token(None);
        *self.tokens.lock().await = None;
        self.state.send_replace(SessionState::Unauthenticated);
    }

    async fn establish(&self, tokens: SessionTokens, user: User) -> User {
        if let Err(e) = self.store.save(&tokens).await {
            tracing::warn!("Session will not survive a restart: {:#}", e);
        }
        self.backend.set_token(Some(tokens.access_token.clone()));
        *self.tokens.lock().await = Some(tokens);
        self.state
            .send_replace(SessionState::Authenticated(user.clone()));
        user
    }

    /// Password login. On failure the state is left as it was.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        self.ready().await;
        let _guard = self.op_lock.lock().await;

        let AuthResponse {
            user,
            access_token,
            refresh_token,
        } = self.backend.login(email, password).await?;

        let tokens = SessionTokens {
            access_token,
            refresh_token: Some(refresh_token),
        };
        Ok(self.establish(tokens, user).await)
    }

    /// Adopt tokens obtained elsewhere (social sign-in) after checking them
    /// against the server.
    pub async fn login_with_token(&self, tokens: SessionTokens) -> Result<User, ClientError> {
        self.ready().await;
        let _guard = self.op_lock.lock().await;

        let previous = self
            .tokens
            .lock()
            .await
            .as_ref()
            .map(|t| t.access_token.clone());

        self.backend.set_token(Some(tokens.access_token.clone()));
        match self.backend.fetch_profile().await {
            Ok(user) => Ok(self.establish(tokens, user).await),
            Err(e) => {
                self.backend.set_token(previous);
                Err(e)
            }
        }
    }

    /// Clear local state first, then revoke on the server as a best effort.
    /// The session is `Unauthenticated` before any network call is made.
    pub async fn logout(&self) {
        self.ready().await;
        let tokens = {
            let _guard = self.op_lock.lock().await;
            let tokens = self.tokens.lock().await.take();
            self.drop_credentials().await;
            tokens
        };

        let Some(tokens) = tokens else {
            return;
        };
        if let Err(e) = self
            .backend
            .logout(&tokens.access_token, tokens.refresh_token.as_deref())
            .await
        {
            tracing::debug!("Server logout failed, session already cleared locally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTokenStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use spendwise_common::models::auth::AuthProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;
    use uuid::Uuid;

    const GOOD_TOKEN: &str = "good-token";

    fn user(email: &str) -> User {
        User {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            name: None,
            avatar_url: None,
            monthly_budget: None,
            provider: AuthProvider::Local,
            created_at: Utc::now(),
        }
    }

    /// Accepts GOOD_TOKEN and the password "pw"
    #[derive(Default)]
    struct FakeBackend {
        token: StdMutex<Option<String>>,
        profile_calls: AtomicUsize,
        logout_calls: AtomicUsize,
        fail_logout: bool,
        /// When set, profile fetches wait for a notification
        gate: Option<Arc<Notify>>,
        /// When set, server logout waits for a notification
        logout_gate: Option<Arc<Notify>>,
        revoked_with: StdMutex<Vec<String>>,
    }

    impl FakeBackend {
        fn token(&self) -> Option<String> {
            self.token.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AuthBackend for FakeBackend {
        fn set_token(&self, token: Option<String>) {
            *self.token.lock().unwrap() = token;
        }

        async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
            if password != "pw" {
                return Err(ClientError::Unauthorized("Invalid email or password".into()));
            }
            Ok(AuthResponse {
                user: user(email),
                access_token: GOOD_TOKEN.to_string(),
                refresh_token: "refresh-1".to_string(),
            })
        }

        async fn fetch_profile(&self) -> Result<User, ClientError> {
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match self.token().as_deref() {
                Some(GOOD_TOKEN) => Ok(user("ann@test.com")),
                _ => Err(ClientError::Unauthorized("Invalid or expired token".into())),
            }
        }

        async fn logout(
            &self,
            access_token: &str,
            _refresh_token: Option<&str>,
        ) -> Result<(), ClientError> {
            self.logout_calls.fetch_add(1, Ordering::SeqCst);
            self.revoked_with
                .lock()
                .unwrap()
                .push(access_token.to_string());
            if let Some(gate) = &self.logout_gate {
                gate.notified().await;
            }
            if self.fail_logout {
                return Err(ClientError::Server {
                    status: 503,
                    message: "down".into(),
                });
            }
            Ok(())
        }
    }

    async fn store_with(access: Option<&str>) -> Arc<MemoryTokenStore> {
        let store = Arc::new(MemoryTokenStore::new());
        if let Some(access) = access {
            store
                .save(&SessionTokens {
                    access_token: access.to_string(),
                    refresh_token: None,
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_no_saved_token_skips_fetch() {
        let backend = Arc::new(FakeBackend::default());
        let manager = SessionManager::start(backend.clone(), store_with(None).await);

        assert_eq!(manager.ready().await, SessionState::Unauthenticated);
        assert_eq!(backend.profile_calls.load(Ordering::SeqCst), 0);
        assert_eq!(backend.token(), None);
    }

    #[tokio::test]
    async fn test_valid_saved_token_restores() {
        let backend = Arc::new(FakeBackend::default());
        let manager = SessionManager::start(backend.clone(), store_with(Some(GOOD_TOKEN)).await);

        let state = manager.ready().await;
        assert_eq!(state.user().unwrap().email, "ann@test.com");
        assert_eq!(backend.token().as_deref(), Some(GOOD_TOKEN));
    }

    #[tokio::test]
    async fn test_rejected_saved_token_is_cleared() {
        let backend = Arc::new(FakeBackend::default());
        let store = store_with(Some("stale")).await;
        let manager = SessionManager::start(backend.clone(), store.clone());

        assert_eq!(manager.ready().await, SessionState::Unauthenticated);
        assert_eq!(store.load().await.unwrap(), None);
        assert_eq!(backend.token(), None);
    }

    #[tokio::test]
    async fn test_state_is_restoring_until_fetch_finishes() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(FakeBackend {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let manager = SessionManager::start(backend, store_with(Some(GOOD_TOKEN)).await);
        assert_eq!(manager.state(), SessionState::Restoring);

        let waiter = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.ready().await })
        };
        gate.notify_one();
        let settled = waiter.await.unwrap();
        assert!(settled.user().is_some());
    }

    #[tokio::test]
    async fn test_login_waits_for_restore_and_persists() {
        let backend = Arc::new(FakeBackend::default());
        let store = store_with(None).await;
        let manager = SessionManager::start(backend.clone(), store.clone());
        let mut rx = manager.subscribe();

        let user = manager.login("bob@test.com", "pw").await.unwrap();
        assert_eq!(user.email, "bob@test.com");
        assert_eq!(backend.token().as_deref(), Some(GOOD_TOKEN));

        let saved = store.load().await.unwrap().unwrap();
        assert_eq!(saved.access_token, GOOD_TOKEN);
        assert_eq!(saved.refresh_token.as_deref(), Some("refresh-1"));

        rx.wait_for(|s| s.user().is_some()).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_login_leaves_state_unchanged() {
        let backend = Arc::new(FakeBackend::default());
        let store = store_with(None).await;
        let manager = SessionManager::start(backend.clone(), store.clone());

        let err = manager.login("bob@test.com", "nope").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(manager.state(), SessionState::Unauthenticated);
        assert_eq!(store.load().await.unwrap(), None);
        assert_eq!(backend.token(), None);
    }

    #[tokio::test]
    async fn test_login_with_token() {
        let backend = Arc::new(FakeBackend::default());
        let manager = SessionManager::start(backend.clone(), store_with(None).await);

        let bad = SessionTokens {
            access_token: "forged".to_string(),
            refresh_token: None,
        };
        assert!(manager.login_with_token(bad).await.is_err());
        assert_eq!(manager.state(), SessionState::Unauthenticated);
        assert_eq!(backend.token(), None);

        let good = SessionTokens {
            access_token: GOOD_TOKEN.to_string(),
            refresh_token: Some("r".to_string()),
        };
        manager.login_with_token(good).await.unwrap();
        assert!(manager.state().user().is_some());
        assert_eq!(manager.refresh_token().await.as_deref(), Some("r"));
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_server_fails() {
        let backend = Arc::new(FakeBackend {
            fail_logout: true,
            ..Default::default()
        });
        let store = store_with(Some(GOOD_TOKEN)).await;
        let manager = SessionManager::start(backend.clone(), store.clone());
        assert!(manager.ready().await.user().is_some());

        manager.logout().await;
        assert_eq!(backend.logout_calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.state(), SessionState::Unauthenticated);
        assert_eq!(store.load().await.unwrap(), None);
        assert_eq!(backend.token(), None);
        assert_eq!(manager.refresh_token().await, None);
    }

    #[tokio::test]
    async fn test_logout_clears_locally_before_server_answers() {
        let logout_gate = Arc::new(Notify::new());
        let backend = Arc::new(FakeBackend {
            logout_gate: Some(logout_gate.clone()),
            ..Default::default()
        });
        let store = store_with(Some(GOOD_TOKEN)).await;
        let manager = SessionManager::start(backend.clone(), store.clone());
        assert!(manager.ready().await.user().is_some());

        let mut rx = manager.subscribe();
        let pending = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.logout().await })
        };

        // Server revoke is still blocked, local state is already gone
        rx.wait_for(|s| *s == SessionState::Unauthenticated)
            .await
            .unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        assert_eq!(backend.token(), None);
        assert!(!pending.is_finished());

        logout_gate.notify_one();
        pending.await.unwrap();
        // Revoke still used the credentials of the session being ended
        assert_eq!(
            backend.revoked_with.lock().unwrap().as_slice(),
            [GOOD_TOKEN.to_string()]
        );
    }

    #[tokio::test]
    async fn test_logout_without_session_skips_server() {
        let backend = Arc::new(FakeBackend::default());
        let manager = SessionManager::start(backend.clone(), store_with(None).await);

        manager.logout().await;
        assert_eq!(backend.logout_calls.load(Ordering::SeqCst), 0);
        assert_eq!(manager.state(), SessionState::Unauthenticated);
    }
}
