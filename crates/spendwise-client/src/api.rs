use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use spendwise_common::analytics::CategoryBreakdown;
use spendwise_common::insights::SpendingInsight;
use spendwise_common::models::auth::{AuthProvider, AuthResponse, User};
use spendwise_common::models::expense::{Expense, ExpenseInput};
use spendwise_common::models::habit::{HabitStats, HabitView};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ClientError {
    /// 401 from the server: missing, expired or revoked credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }
}

/// The server calls the session manager depends on.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Set or clear the bearer token sent with every request
    fn set_token(&self, token: Option<String>);

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError>;

    async fn fetch_profile(&self) -> Result<User, ClientError>;

    /// Revoke server-side using the given credentials rather than the
    /// shared header, which may already be cleared. Without a refresh token
    /// every session of `access_token`'s user is revoked.
    async fn logout(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), ClientError>;
}

/// Upper bound for a single request, so a silent server cannot stall the
/// session
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP client for the Spendwise API
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Arc<str>,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.read().map(|t| t.is_some()).unwrap_or(false)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let token = self.token.read().ok().and_then(|t| t.clone());
        match token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    /// Send with the shared bearer attached
    async fn send<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        self.send_as_is(self.authorize(req)).await
    }

    /// Send, map error statuses, decode the JSON body.
    async fn send_as_is<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read body".to_string());
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized(message));
        }
        Err(ClientError::Server {
            status: status.as_u16(),
            message,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.client.get(self.url(path))).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AuthResponse, ClientError> {
        self.post(
            "/api/auth/register",
            &json!({"email": email, "password": password, "name": name}),
        )
        .await
    }

    /// Exchange a Google/Apple identity token for a Spendwise session
    #[tracing::instrument(skip(self, id_token))]
    pub async fn social_login(
        &self,
        provider: AuthProvider,
        id_token: &str,
    ) -> Result<AuthResponse, ClientError> {
        self.post(
            &format!("/api/auth/{}", provider),
            &json!({"id_token": id_token}),
        )
        .await
    }

    pub async fn monthly_budget(&self) -> Result<Option<f64>, ClientError> {
        let body: Value = self.get("/api/user/budget").await?;
        Ok(body.get("monthly_budget").and_then(Value::as_f64))
    }

    pub async fn set_monthly_budget(&self, budget: f64) -> Result<(), ClientError> {
        let _: Value = self
            .post("/api/user/budget", &json!({"monthly_budget": budget}))
            .await?;
        Ok(())
    }

    pub async fn list_expenses(&self) -> Result<Vec<Expense>, ClientError> {
        self.get("/api/expenses").await
    }

    pub async fn create_expense(&self, input: &ExpenseInput) -> Result<Expense, ClientError> {
        self.post("/api/expenses", input).await
    }

    pub async fn delete_expense(&self, id: Uuid) -> Result<(), ClientError> {
        let _: Value = self
            .send(self.client.delete(self.url(&format!("/api/expenses/{}", id))))
            .await?;
        Ok(())
    }

    pub async fn breakdown(
        &self,
        year: Option<i32>,
        month: Option<u32>,
    ) -> Result<CategoryBreakdown, ClientError> {
        let mut query = Vec::new();
        if let Some(y) = year {
            query.push(("year", y.to_string()));
        }
        if let Some(m) = month {
            query.push(("month", m.to_string()));
        }
        self.send(
            self.client
                .get(self.url("/api/expenses/breakdown"))
                .query(&query),
        )
        .await
    }

    pub async fn list_habits(&self) -> Result<Vec<HabitView>, ClientError> {
        self.get("/api/habits").await
    }

    pub async fn create_habit(&self, title: &str) -> Result<HabitView, ClientError> {
        self.post("/api/habits", &json!({"title": title})).await
    }

    pub async fn complete_habit(&self, id: Uuid) -> Result<HabitView, ClientError> {
        self.post(&format!("/api/habits/{}/complete", id), &json!({}))
            .await
    }

    pub async fn undo_habit(&self, id: Uuid) -> Result<HabitView, ClientError> {
        self.send(
            self.client
                .delete(self.url(&format!("/api/habits/{}/complete", id))),
        )
        .await
    }

    pub async fn habit_stats(&self) -> Result<HabitStats, ClientError> {
        self.get("/api/habits/stats").await
    }

    pub async fn insights(&self) -> Result<Option<SpendingInsight>, ClientError> {
        self.get("/api/insights").await
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    #[tracing::instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        self.post(
            "/api/auth/login",
            &json!({"email": email, "password": password}),
        )
        .await
    }

    async fn fetch_profile(&self) -> Result<User, ClientError> {
        self.get("/api/me").await
    }

    async fn logout(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), ClientError> {
        let req = self
            .client
            .post(self.url("/api/auth/logout"))
            .bearer_auth(access_token);
        let req = match refresh_token {
            Some(t) => req.json(&json!({"refresh_token": t})),
            None => req,
        };
        let _: Value = self.send_as_is(req).await?;
        Ok(())
    }
}

/// Parse a `YYYY-MM-DD` day argument
pub fn parse_day(s: &str) -> anyhow::Result<NaiveDate> {
    s.parse()
        .map_err(|e| anyhow::anyhow!("Invalid date '{}' (expected YYYY-MM-DD): {}", s, e))
}
