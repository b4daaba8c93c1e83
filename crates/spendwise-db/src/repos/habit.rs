use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HabitRow {
    pub habit_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub icon: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HabitCompletionRow {
    pub habit_id: Uuid,
    pub user_id: Uuid,
    pub completed_on: NaiveDate,
}

pub struct HabitRepo;

impl HabitRepo {
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        title: &str,
        icon: &str,
        color: &str,
    ) -> Result<HabitRow> {
        let row = sqlx::query_as::<_, HabitRow>(
            r#"
            INSERT INTO habit (habit_id, user_id, title, icon, color)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING habit_id, user_id, title, icon, color, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(icon)
        .bind(color)
        .fetch_one(pool)
        .await
        .context("Failed to create habit")?;
        Ok(row)
    }

    pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM habit WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .context("Failed to count habits")?;
        Ok(count)
    }

    /// Newest habits first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<HabitRow>> {
        let rows = sqlx::query_as::<_, HabitRow>(
            "SELECT habit_id, user_id, title, icon, color, created_at FROM habit WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list habits")?;
        Ok(rows)
    }

    pub async fn get(pool: &PgPool, user_id: Uuid, habit_id: Uuid) -> Result<Option<HabitRow>> {
        let row = sqlx::query_as::<_, HabitRow>(
            "SELECT habit_id, user_id, title, icon, color, created_at FROM habit WHERE habit_id = $1 AND user_id = $2",
        )
        .bind(habit_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get habit")?;
        Ok(row)
    }

    pub async fn rename(
        pool: &PgPool,
        user_id: Uuid,
        habit_id: Uuid,
        title: &str,
    ) -> Result<Option<HabitRow>> {
        let row = sqlx::query_as::<_, HabitRow>(
            r#"
            UPDATE habit SET title = $3
            WHERE habit_id = $1 AND user_id = $2
            RETURNING habit_id, user_id, title, icon, color, created_at
            "#,
        )
        .bind(habit_id)
        .bind(user_id)
        .bind(title)
        .fetch_optional(pool)
        .await
        .context("Failed to rename habit")?;
        Ok(row)
    }

    /// Deletes the habit; completions go with it via ON DELETE CASCADE.
    pub async fn delete(pool: &PgPool, user_id: Uuid, habit_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM habit WHERE habit_id = $1 AND user_id = $2")
            .bind(habit_id)
            .bind(user_id)
            .execute(pool)
            .await
            .context("Failed to delete habit")?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct HabitCompletionRepo;

impl HabitCompletionRepo {
    /// Mark a habit done on `day`. Repeating it the same day changes nothing;
    /// the (habit_id, completed_on) key absorbs concurrent double-submits.
    pub async fn upsert(
        pool: &PgPool,
        habit_id: Uuid,
        user_id: Uuid,
        day: NaiveDate,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO habit_completion (habit_id, user_id, completed_on)
            VALUES ($1, $2, $3)
            ON CONFLICT (habit_id, completed_on) DO NOTHING
            "#,
        )
        .bind(habit_id)
        .bind(user_id)
        .bind(day)
        .execute(pool)
        .await
        .context("Failed to record habit completion")?;
        Ok(())
    }

    /// Undo a completion. Returns how many rows were removed (0 or 1).
    pub async fn delete(
        pool: &PgPool,
        habit_id: Uuid,
        user_id: Uuid,
        day: NaiveDate,
    ) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM habit_completion WHERE habit_id = $1 AND user_id = $2 AND completed_on = $3",
        )
        .bind(habit_id)
        .bind(user_id)
        .bind(day)
        .execute(pool)
        .await
        .context("Failed to delete habit completion")?;
        Ok(result.rows_affected())
    }

    /// Every completion of every habit the user owns, newest first per habit
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<HabitCompletionRow>> {
        let rows = sqlx::query_as::<_, HabitCompletionRow>(
            "SELECT habit_id, user_id, completed_on FROM habit_completion WHERE user_id = $1 ORDER BY habit_id, completed_on DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list habit completions")?;
        Ok(rows)
    }

    /// Completion days of one owned habit, newest first
    pub async fn list_for_habit(
        pool: &PgPool,
        user_id: Uuid,
        habit_id: Uuid,
    ) -> Result<Vec<NaiveDate>> {
        let days = sqlx::query_scalar::<_, NaiveDate>(
            "SELECT completed_on FROM habit_completion WHERE habit_id = $1 AND user_id = $2 ORDER BY completed_on DESC",
        )
        .bind(habit_id)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list habit completions")?;
        Ok(days)
    }

    pub async fn count_since(pool: &PgPool, user_id: Uuid, since: NaiveDate) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM habit_completion WHERE user_id = $1 AND completed_on >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(pool)
        .await
        .context("Failed to count habit completions")?;
        Ok(count)
    }
}
