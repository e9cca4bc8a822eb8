//! The two-phase generation orchestrator.
//!
//! Phase 1 (planning) runs a bounded tool-augmented chat loop and
//! streams the model's reasoning as `Thought` events; its output is
//! informational only and never parsed. Phase 2 (constrained
//! generation) demands a document conforming to the structural
//! contract, repairs it deterministically, resolves reference tokens,
//! and emits the result as the stream's single terminal event.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use slidereel_core::geometry::CanvasGeometry;
use slidereel_core::refs::{PoolImage, ResolvedRefs};
use slidereel_core::repair::{repair_document, RepairContext};
use slidereel_core::types::DbId;

use crate::events::GenEvent;
use crate::prompt;
use crate::schema::build_contract;
use crate::tools::{execute_tool, tool_definitions, PlanningContext};
use crate::transport::{ChatTransport, ContentBlock};

/// Maximum model/tool rounds in the planning phase. Exceeding the
/// budget simply ends the phase.
const MAX_PLANNING_ROUNDS: usize = 6;

/// Schema name passed to the structured-generation call.
const CONTRACT_NAME: &str = "slideshow_document";

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Product metadata attached to a generation request.
#[derive(Debug, Clone)]
pub struct ProductBrief {
    pub name: String,
    pub description: String,
    pub industry: Option<String>,
    pub product_type: Option<String>,
}

/// One candidate image offered to the model.
#[derive(Debug, Clone)]
pub struct CandidateImage {
    pub id: DbId,
    /// Client-fetchable URL, already resolved by ownership.
    pub url: String,
    pub brief: String,
}

/// Everything one generation request needs. Reference tokens are
/// scoped to this request and never escape it.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub slideshow_id: DbId,
    pub user_prompt: String,
    pub product: ProductBrief,
    pub aspect_ratio: String,
    /// Background-eligible candidates; must be non-empty.
    pub backgrounds: Vec<CandidateImage>,
    /// Overlay-eligible candidates; may be empty.
    pub overlays: Vec<CandidateImage>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs the two-phase generation protocol.
pub struct Orchestrator {
    transport: Arc<dyn ChatTransport>,
    context: Arc<dyn PlanningContext>,
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn ChatTransport>, context: Arc<dyn PlanningContext>) -> Self {
        Self { transport, context }
    }

    /// Run one generation request to completion, writing events to
    /// `events`. Always ends with exactly one terminal event; a
    /// dropped receiver aborts nothing (sends are fire-and-forget).
    pub async fn run(&self, request: GenerationRequest, events: mpsc::UnboundedSender<GenEvent>) {
        // Input validation happens before any external call.
        if request.backgrounds.is_empty() {
            let _ = events.send(GenEvent::Error(
                "At least one background-eligible image is required".to_string(),
            ));
            return;
        }

        let geometry = match CanvasGeometry::from_aspect(&request.aspect_ratio) {
            Ok(geometry) => geometry,
            Err(e) => {
                let _ = events.send(GenEvent::Error(e.to_string()));
                return;
            }
        };

        let refs = ResolvedRefs::resolve(
            &pool_images(&request.backgrounds),
            &pool_images(&request.overlays),
        );
        let background_tokens = refs.background_tokens();
        let overlay_tokens = refs.overlay_tokens();
        let slide_count = prompt::extract_slide_count(&request.user_prompt);

        let contract =
            match build_contract(&background_tokens, &overlay_tokens, slide_count, &geometry) {
                Ok(contract) => contract,
                Err(e) => {
                    let _ = events.send(GenEvent::Error(e.to_string()));
                    return;
                }
            };

        let system = prompt::build_system_prompt();
        let mut messages = vec![json!({
            "role": "user",
            "content": prompt::build_planning_message(
                &request.product,
                &request.user_prompt,
                &briefs(&refs.background, &request.backgrounds),
                &briefs(&refs.overlay, &request.overlays),
            ),
        })];

        self.run_planning_phase(&system, &mut messages, &events).await;

        // Phase 2: constrained generation. Total absence of output is
        // terminal; malformed output is repaired below.
        messages.push(json!({
            "role": "user",
            "content": prompt::build_generation_message(slide_count),
        }));

        let raw = match self
            .transport
            .generate_structured(&system, &messages, CONTRACT_NAME, &contract)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(
                    slideshow_id = %request.slideshow_id,
                    error = %e,
                    "Structured generation failed terminally",
                );
                let _ = events.send(GenEvent::Error(e.to_string()));
                return;
            }
        };

        let outcome = repair_document(
            &raw,
            &RepairContext {
                slide_count,
                background_tokens: &background_tokens,
                geometry,
            },
        );
        if outcome.position_adjustments > 0 {
            let _ = events.send(GenEvent::ThoughtLine(format!(
                "Adjusted {} text position(s) to fit the safe area",
                outcome.position_adjustments
            )));
        }

        let mut document = outcome.document;
        let resolved = refs.materialize(&mut document);
        tracing::info!(
            slideshow_id = %request.slideshow_id,
            slides = document.slides.len(),
            resolved_refs = resolved,
            adjustments = outcome.position_adjustments,
            "Generation complete",
        );

        match serde_json::to_value(&document) {
            Ok(value) => {
                let _ = events.send(GenEvent::Json(value));
            }
            Err(e) => {
                let _ = events.send(GenEvent::Error(e.to_string()));
            }
        }
    }

    /// The bounded planning loop. Failures here are logged and end the
    /// phase early -- planning output is informational only.
    async fn run_planning_phase(
        &self,
        system: &str,
        messages: &mut Vec<Value>,
        events: &mpsc::UnboundedSender<GenEvent>,
    ) {
        let tools = tool_definitions();

        for round in 0..MAX_PLANNING_ROUNDS {
            let turn = match self.transport.chat(system, messages, &tools).await {
                Ok(turn) => turn,
                Err(e) => {
                    tracing::warn!(round, error = %e, "Planning round failed; moving on");
                    return;
                }
            };

            messages.push(turn.raw_message.clone());

            let mut had_tool_use = false;
            for block in &turn.blocks {
                match block {
                    ContentBlock::Text(text) => {
                        let _ = events.send(GenEvent::Thought(text.clone()));
                    }
                    ContentBlock::ToolUse { id, name, input } => {
                        had_tool_use = true;
                        let _ = events
                            .send(GenEvent::ThoughtLine(format!("Consulting {name}...")));
                        let result = execute_tool(self.context.as_ref(), name, input).await;
                        messages.push(json!({
                            "role": "tool",
                            "tool_call_id": id,
                            "content": result,
                        }));
                    }
                }
            }

            if !had_tool_use {
                return;
            }
        }

        tracing::debug!("Planning round budget exhausted");
    }
}

fn pool_images(candidates: &[CandidateImage]) -> Vec<PoolImage> {
    candidates
        .iter()
        .map(|c| PoolImage {
            id: c.id,
            url: c.url.clone(),
        })
        .collect()
}

/// Pair assigned tokens with their candidates for prompt rendering.
fn briefs(
    tokens: &[slidereel_core::refs::TokenRef],
    candidates: &[CandidateImage],
) -> Vec<(String, CandidateImage)> {
    tokens
        .iter()
        .zip(candidates.iter())
        .map(|(t, c)| (t.token.clone(), c.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::GenError;
    use crate::transport::ChatTurn;

    // -- harness ------------------------------------------------------------

    struct ScriptedTransport {
        turns: Mutex<VecDeque<ChatTurn>>,
        /// `None` entries simulate total structured-generation failure.
        structured: Mutex<VecDeque<Option<Value>>>,
        chat_calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(turns: Vec<ChatTurn>, structured: Vec<Option<Value>>) -> Self {
            Self {
                turns: Mutex::new(turns.into()),
                structured: Mutex::new(structured.into()),
                chat_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn chat(
            &self,
            _system: &str,
            _messages: &[Value],
            _tools: &Value,
        ) -> Result<ChatTurn, GenError> {
            self.chat_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.turns.lock().unwrap().pop_front().unwrap_or(ChatTurn {
                raw_message: json!({ "role": "assistant", "content": "" }),
                blocks: vec![],
                stop_reason: "stop".to_string(),
            }))
        }

        async fn generate_structured(
            &self,
            _system: &str,
            _messages: &[Value],
            _schema_name: &str,
            _schema: &Value,
        ) -> Result<Value, GenError> {
            match self.structured.lock().unwrap().pop_front().flatten() {
                Some(value) => Ok(value),
                None => Err(GenError::NoObject { attempts: 3 }),
            }
        }
    }

    struct StubContext;

    #[async_trait]
    impl PlanningContext for StubContext {
        async fn list_example_slideshows(
            &self,
            _industry: Option<&str>,
            _product_type: Option<&str>,
        ) -> Result<Value, GenError> {
            Ok(json!([{ "summary": "cozy outdoor reel" }]))
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
            Ok(json!({}))
        }
    }

    fn text_turn(text: &str) -> ChatTurn {
        ChatTurn {
            raw_message: json!({ "role": "assistant", "content": text }),
            blocks: vec![ContentBlock::Text(text.to_string())],
            stop_reason: "stop".to_string(),
        }
    }

    fn tool_turn() -> ChatTurn {
        ChatTurn {
            raw_message: json!({
                "role": "assistant",
                "tool_calls": [{ "id": "call_1", "type": "function",
                    "function": { "name": "list_example_slideshows", "arguments": "{}" } }],
            }),
            blocks: vec![ContentBlock::ToolUse {
                id: "call_1".to_string(),
                name: "list_example_slideshows".to_string(),
                input: json!({}),
            }],
            stop_reason: "tool_calls".to_string(),
        }
    }

    fn candidate(url: &str) -> CandidateImage {
        CandidateImage {
            id: uuid::Uuid::new_v4(),
            url: url.to_string(),
            brief: "a candidate".to_string(),
        }
    }

    fn request(backgrounds: Vec<CandidateImage>) -> GenerationRequest {
        GenerationRequest {
            slideshow_id: uuid::Uuid::new_v4(),
            user_prompt: "make a 3 slide video".to_string(),
            product: ProductBrief {
                name: "Trail Mug".to_string(),
                description: "Enamel camping mug".to_string(),
                industry: Some("outdoor".to_string()),
                product_type: None,
            },
            aspect_ratio: "9:16".to_string(),
            backgrounds,
            overlays: vec![],
        }
    }

    fn good_document() -> Value {
        let slide = |bg: &str| {
            json!({
                "background_image_ref": bg,
                "texts": [{ "text": "hi", "position_x": 150.0, "position_y": 266.0, "size": 24.0 }],
                "overlays": [],
            })
        };
        json!({
            "caption": "Trail Mug reel",
            "slides": [slide("c01"), slide("c02"), slide("c01")],
        })
    }

    async fn run_and_collect(
        transport: Arc<ScriptedTransport>,
        request: GenerationRequest,
    ) -> Vec<GenEvent> {
        let orchestrator = Orchestrator::new(transport, Arc::new(StubContext));
        let (tx, mut rx) = mpsc::unbounded_channel();
        orchestrator.run(request, tx).await;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    // -- tests --------------------------------------------------------------

    #[tokio::test]
    async fn thoughts_then_exactly_one_terminal_json() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![text_turn("plotting the arc...")],
            vec![Some(good_document())],
        ));
        let backgrounds = vec![candidate("http://img/a.jpg"), candidate("http://img/b.jpg")];
        let urls: Vec<String> = backgrounds.iter().map(|c| c.url.clone()).collect();

        let events = run_and_collect(transport, request(backgrounds)).await;

        let terminal_count = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminal_count, 1);
        assert!(events.last().unwrap().is_terminal());
        assert!(matches!(events[0], GenEvent::Thought(_)));

        let GenEvent::Json(doc) = events.last().unwrap() else {
            panic!("expected terminal json");
        };
        let slides = doc["slides"].as_array().unwrap();
        assert_eq!(slides.len(), 3);
        for slide in slides {
            let background = slide["background_image_ref"].as_str().unwrap();
            assert!(urls.contains(&background.to_string()));
            for text in slide["texts"].as_array().unwrap() {
                let x = text["position_x"].as_f64().unwrap();
                assert!((40.0..=260.0).contains(&x));
            }
        }
    }

    #[tokio::test]
    async fn planning_rounds_are_bounded() {
        // The model keeps asking for tools; the budget must cut it off.
        let turns = (0..20).map(|_| tool_turn()).collect();
        let transport = Arc::new(ScriptedTransport::new(turns, vec![Some(good_document())]));

        let events = run_and_collect(
            Arc::clone(&transport),
            request(vec![candidate("http://img/a.jpg"), candidate("http://img/b.jpg")]),
        )
        .await;

        assert_eq!(transport.chat_calls.load(Ordering::SeqCst), 6);
        // Budget exhaustion is not an error: generation still runs.
        assert!(matches!(events.last().unwrap(), GenEvent::Json(_)));
    }

    #[tokio::test]
    async fn structured_failure_is_terminal_error() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![text_turn("hmm")],
            vec![None],
        ));

        let events = run_and_collect(
            transport,
            request(vec![candidate("http://img/a.jpg")]),
        )
        .await;

        let GenEvent::Error(message) = events.last().unwrap() else {
            panic!("expected terminal error");
        };
        assert!(message.contains("no structured object"));
        assert!(!events.iter().any(|e| matches!(e, GenEvent::Json(_))));
    }

    #[tokio::test]
    async fn empty_background_pool_fails_before_any_model_call() {
        let transport = Arc::new(ScriptedTransport::new(vec![], vec![]));

        let events = run_and_collect(Arc::clone(&transport), request(vec![])).await;

        assert_eq!(transport.chat_calls.load(Ordering::SeqCst), 0);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], GenEvent::Error(_)));
    }

    #[tokio::test]
    async fn malformed_document_is_repaired_to_exact_count() {
        // A single bare object instead of an array of three.
        let malformed = json!({
            "caption": "x",
            "slides": {
                "background_image_ref": "c01",
                "texts": [{ "text": "solo", "position_x": 150.0, "position_y": 266.0, "size": 24.0 }],
            },
        });
        let transport = Arc::new(ScriptedTransport::new(vec![], vec![Some(malformed)]));

        let events = run_and_collect(
            transport,
            request(vec![candidate("http://img/a.jpg"), candidate("http://img/b.jpg")]),
        )
        .await;

        let GenEvent::Json(doc) = events.last().unwrap() else {
            panic!("expected terminal json");
        };
        assert_eq!(doc["slides"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn invalid_aspect_ratio_is_rejected_up_front() {
        let transport = Arc::new(ScriptedTransport::new(vec![], vec![]));
        let mut req = request(vec![candidate("http://img/a.jpg")]);
        req.aspect_ratio = "vertical".to_string();

        let events = run_and_collect(transport, req).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], GenEvent::Error(_)));
    }
}
