//! Postgres-backed planning context.

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::PgPool;
use slidereel_core::types::DbId;
use slidereel_db::repositories::{ExampleRepo, ImageRepo};

use crate::error::GenError;
use crate::tools::PlanningContext;

/// Planning context scoped to one user's visible assets.
pub struct PgPlanningContext {
    pool: PgPool,
    user_id: DbId,
}

impl PgPlanningContext {
    pub fn new(pool: PgPool, user_id: DbId) -> Self {
        Self { pool, user_id }
    }
}

fn context_err(e: sqlx::Error) -> GenError {
    GenError::Context(e.to_string())
}

#[async_trait]
impl PlanningContext for PgPlanningContext {
    async fn list_example_slideshows(
        &self,
        industry: Option<&str>,
        product_type: Option<&str>,
    ) -> Result<Value, GenError> {
        let examples = ExampleRepo::list_summaries(&self.pool, industry, product_type)
            .await
            .map_err(context_err)?;

        Ok(Value::Array(
            examples
                .into_iter()
                .map(|e| {
                    json!({
                        "id": e.id,
                        "industry": e.industry,
                        "product_type": e.product_type,
                        "summary": e.summary,
                    })
                })
                .collect(),
        ))
    }

    async fn get_example_frames(&self, example_id: DbId) -> Result<Value, GenError> {
        let example = ExampleRepo::find_by_id(&self.pool, example_id)
            .await
            .map_err(context_err)?;

        match example {
            Some(e) => Ok(e.frames),
            None => Err(GenError::Context(format!(
                "Example slideshow {example_id} not found"
            ))),
        }
    }

    async fn list_image_briefs(
        &self,
        category: Option<&str>,
        object_tag: Option<&str>,
    ) -> Result<Value, GenError> {
        let assets = ImageRepo::list_briefs(&self.pool, self.user_id, category, object_tag)
            .await
            .map_err(context_err)?;

        Ok(Value::Array(
            assets
                .into_iter()
                .map(|a| {
                    json!({
                        "id": a.id,
                        "kind": a.kind,
                        "brief": a.brief,
                        "category": a.category,
                        "object_tags": a.object_tags,
                    })
                })
                .collect(),
        ))
    }

    async fn get_image_description(&self, image_id: DbId) -> Result<Value, GenError> {
        let asset = ImageRepo::find_by_id(&self.pool, image_id)
            .await
            .map_err(context_err)?;

        match asset {
            Some(a) => Ok(json!({
                "id": a.id,
                "brief": a.brief,
                "long_description": a.long_description,
            })),
            None => Err(GenError::Context(format!("Image {image_id} not found"))),
        }
    }
}
