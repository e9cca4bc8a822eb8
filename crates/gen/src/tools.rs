//! Read-only planning tools.
//!
//! The planning phase may call these to pull extra context before the
//! constrained-generation phase. All tools are read-only by
//! construction; failures come back to the model as error strings
//! rather than aborting the request.

use async_trait::async_trait;
use serde_json::{json, Value};
use slidereel_core::types::DbId;

use crate::error::GenError;

pub const TOOL_LIST_EXAMPLES: &str = "list_example_slideshows";
pub const TOOL_GET_EXAMPLE_FRAMES: &str = "get_example_frames";
pub const TOOL_LIST_IMAGE_BRIEFS: &str = "list_image_briefs";
pub const TOOL_GET_IMAGE_DESCRIPTION: &str = "get_image_description";

/// Read-only context lookups backing the planning tools.
#[async_trait]
pub trait PlanningContext: Send + Sync {
    /// Example slideshow summaries, optionally filtered by industry
    /// and/or product type.
    async fn list_example_slideshows(
        &self,
        industry: Option<&str>,
        product_type: Option<&str>,
    ) -> Result<Value, GenError>;

    /// Full frame sequence of one example slideshow.
    async fn get_example_frames(&self, example_id: DbId) -> Result<Value, GenError>;

    /// Candidate image briefs, optionally filtered by category and/or
    /// object tag.
    async fn list_image_briefs(
        &self,
        category: Option<&str>,
        object_tag: Option<&str>,
    ) -> Result<Value, GenError>;

    /// Long-form description of one image.
    async fn get_image_description(&self, image_id: DbId) -> Result<Value, GenError>;
}

/// OpenAI-format tool definitions for the planning phase.
pub fn tool_definitions() -> Value {
    json!([
        {
            "type": "function",
            "function": {
                "name": TOOL_LIST_EXAMPLES,
                "description": "List example slideshow summaries, optionally filtered by industry and/or product type.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "industry": { "type": "string" },
                        "product_type": { "type": "string" },
                    },
                },
            },
        },
        {
            "type": "function",
            "function": {
                "name": TOOL_GET_EXAMPLE_FRAMES,
                "description": "Fetch the full frame sequence of one example slideshow by id.",
                "parameters": {
                    "type": "object",
                    "required": ["example_id"],
                    "properties": {
                        "example_id": { "type": "string", "description": "Example slideshow UUID" },
                    },
                },
            },
        },
        {
            "type": "function",
            "function": {
                "name": TOOL_LIST_IMAGE_BRIEFS,
                "description": "List candidate image briefs, optionally filtered by category and/or object tag.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "category": { "type": "string" },
                        "object_tag": { "type": "string" },
                    },
                },
            },
        },
        {
            "type": "function",
            "function": {
                "name": TOOL_GET_IMAGE_DESCRIPTION,
                "description": "Fetch the long-form description of one candidate image by id.",
                "parameters": {
                    "type": "object",
                    "required": ["image_id"],
                    "properties": {
                        "image_id": { "type": "string", "description": "Image UUID" },
                    },
                },
            },
        },
    ])
}

/// Dispatch one tool call. Unknown tools and lookup failures come back
/// as error strings for the model to read.
pub async fn execute_tool(context: &dyn PlanningContext, name: &str, input: &Value) -> String {
    let result = match name {
        TOOL_LIST_EXAMPLES => {
            context
                .list_example_slideshows(str_arg(input, "industry"), str_arg(input, "product_type"))
                .await
        }
        TOOL_GET_EXAMPLE_FRAMES => match uuid_arg(input, "example_id") {
            Some(id) => context.get_example_frames(id).await,
            None => Err(GenError::InvalidRequest(
                "example_id must be a UUID".to_string(),
            )),
        },
        TOOL_LIST_IMAGE_BRIEFS => {
            context
                .list_image_briefs(str_arg(input, "category"), str_arg(input, "object_tag"))
                .await
        }
        TOOL_GET_IMAGE_DESCRIPTION => match uuid_arg(input, "image_id") {
            Some(id) => context.get_image_description(id).await,
            None => Err(GenError::InvalidRequest(
                "image_id must be a UUID".to_string(),
            )),
        },
        other => Err(GenError::InvalidRequest(format!("Unknown tool: {other}"))),
    };

    match result {
        Ok(value) => value.to_string(),
        Err(e) => format!("Error: {e}"),
    }
}

fn str_arg<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn uuid_arg(input: &Value, key: &str) -> Option<DbId> {
    input.get(key).and_then(Value::as_str)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubContext;

    #[async_trait]
    impl PlanningContext for StubContext {
        async fn list_example_slideshows(
            &self,
            industry: Option<&str>,
            _product_type: Option<&str>,
        ) -> Result<Value, GenError> {
            Ok(json!([{ "industry": industry }]))
        }

        async fn get_example_frames(&self, _example_id: DbId) -> Result<Value, GenError> {
            Ok(json!([]))
        }

        async fn list_image_briefs(
            &self,
            _category: Option<&str>,
            _object_tag: Option<&str>,
        ) -> Result<Value, GenError> {
            Ok(json!([]))
        }

        async fn get_image_description(&self, _image_id: DbId) -> Result<Value, GenError> {
            Err(GenError::Context("image missing".to_string()))
        }
    }

    #[tokio::test]
    async fn dispatches_by_name() {
        let out = execute_tool(
            &StubContext,
            TOOL_LIST_EXAMPLES,
            &json!({ "industry": "outdoor" }),
        )
        .await;
        assert!(out.contains("outdoor"));
    }

    #[tokio::test]
    async fn unknown_tool_reports_error_string() {
        let out = execute_tool(&StubContext, "summon_dragon", &json!({})).await;
        assert!(out.starts_with("Error:"));
    }

    #[tokio::test]
    async fn context_failures_become_error_strings() {
        let id = uuid::Uuid::new_v4();
        let out = execute_tool(
            &StubContext,
            TOOL_GET_IMAGE_DESCRIPTION,
            &json!({ "image_id": id.to_string() }),
        )
        .await;
        assert!(out.contains("image missing"));
    }

    #[tokio::test]
    async fn malformed_uuid_is_rejected() {
        let out = execute_tool(
            &StubContext,
            TOOL_GET_EXAMPLE_FRAMES,
            &json!({ "example_id": "not-a-uuid" }),
        )
        .await;
        assert!(out.starts_with("Error:"));
    }

    #[test]
    fn definitions_cover_all_tools() {
        let defs = tool_definitions();
        let names: Vec<&str> = defs
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["function"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                TOOL_LIST_EXAMPLES,
                TOOL_GET_EXAMPLE_FRAMES,
                TOOL_LIST_IMAGE_BRIEFS,
                TOOL_GET_IMAGE_DESCRIPTION,
            ]
        );
    }
}
