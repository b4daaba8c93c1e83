use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use spendwise_common::models::auth::{AuthProvider, User};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str =
    "user_id, email, name, password_hash, avatar_url, monthly_budget, provider, created_at, last_login_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub avatar_url: Option<String>,
    pub monthly_budget: Option<f64>,
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserRow {
    /// Client-safe view of the row
    pub fn to_user(&self) -> User {
        User {
            user_id: self.user_id,
            email: self.email.clone(),
            name: self.name.clone(),
            avatar_url: self.avatar_url.clone(),
            monthly_budget: self.monthly_budget,
            provider: self.provider.parse().unwrap_or(AuthProvider::Local),
            created_at: self.created_at,
        }
    }
}

pub struct UserRepo;

impl UserRepo {
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        email: &str,
        password_hash: Option<&str>,
        name: Option<&str>,
        provider: AuthProvider,
    ) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO "user" (user_id, email, password_hash, name, provider) VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(user_id)
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(provider.as_str())
        .execute(pool)
        .await
        .context("Failed to create user")?;
        Ok(())
    }

    pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {} FROM "user" WHERE email = $1"#,
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;
        Ok(row)
    }

    pub async fn get_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {} FROM "user" WHERE user_id = $1"#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by id")?;
        Ok(row)
    }

    pub async fn touch_last_login(pool: &PgPool, user_id: Uuid) -> Result<()> {
        sqlx::query(r#"UPDATE "user" SET last_login_at = NOW() WHERE user_id = $1"#)
            .bind(user_id)
            .execute(pool)
            .await
            .context("Failed to update last_login_at")?;
        Ok(())
    }

    /// Set the monthly budget. Returns false if the user does not exist.
    pub async fn set_monthly_budget(pool: &PgPool, user_id: Uuid, budget: f64) -> Result<bool> {
        let result = sqlx::query(r#"UPDATE "user" SET monthly_budget = $2 WHERE user_id = $1"#)
            .bind(user_id)
            .bind(budget)
            .execute(pool)
            .await
            .context("Failed to update monthly budget")?;
        Ok(result.rows_affected() > 0)
    }

    /// Update display name and avatar; `None` leaves a field unchanged.
    pub async fn update_profile(
        pool: &PgPool,
        user_id: Uuid,
        name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"UPDATE "user" SET name = COALESCE($2, name), avatar_url = COALESCE($3, avatar_url)
               WHERE user_id = $1 RETURNING {}"#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(name)
        .bind(avatar_url)
        .fetch_optional(pool)
        .await
        .context("Failed to update profile")?;
        Ok(row)
    }
}
