//! Repository for the `render_usage` table.

use sqlx::PgPool;
use slidereel_core::types::DbId;

/// Render usage accounting. Callers treat increments as best-effort.
pub struct UsageRepo;

impl UsageRepo {
    /// Increment a user's completed-render counter, creating the row
    /// on first use.
    pub async fn increment_renders(pool: &PgPool, user_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO render_usage (user_id, renders_completed) VALUES ($1, 1) \
             ON CONFLICT (user_id) DO UPDATE \
             SET renders_completed = render_usage.renders_completed + 1, \
                 updated_at = NOW()",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Completed-render count for a user (0 when never rendered).
    pub async fn renders_completed(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT renders_completed FROM render_usage WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }
}
