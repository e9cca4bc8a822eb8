//! Repository for the `example_slideshows` table.

use sqlx::PgPool;
use slidereel_core::types::DbId;

use crate::models::example::ExampleSlideshow;

/// Column list for `example_slideshows` queries.
const COLUMNS: &str = "id, industry, product_type, summary, frames, created_at";

/// Maximum examples returned to the planning phase per call.
const LIST_LIMIT: i64 = 10;

/// Read-only access to example slideshows for planning context.
pub struct ExampleRepo;

impl ExampleRepo {
    /// Summaries filtered by industry and/or product type.
    pub async fn list_summaries(
        pool: &PgPool,
        industry: Option<&str>,
        product_type: Option<&str>,
    ) -> Result<Vec<ExampleSlideshow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM example_slideshows \
             WHERE ($1::TEXT IS NULL OR industry = $1) \
               AND ($2::TEXT IS NULL OR product_type = $2) \
             ORDER BY created_at DESC \
             LIMIT $3"
        );
        sqlx::query_as::<_, ExampleSlideshow>(&query)
            .bind(industry)
            .bind(product_type)
            .bind(LIST_LIMIT)
            .fetch_all(pool)
            .await
    }

    /// Full frame sequence for one example.
    pub async fn find_by_id(
        pool: &PgPool,
        example_id: DbId,
    ) -> Result<Option<ExampleSlideshow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM example_slideshows WHERE id = $1");
        sqlx::query_as::<_, ExampleSlideshow>(&query)
            .bind(example_id)
            .fetch_optional(pool)
            .await
    }
}
