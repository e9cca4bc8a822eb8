//! AI generation pipeline for slidereel.
//!
//! Runs the two-phase generation protocol: a tool-augmented planning
//! phase that streams its reasoning, followed by a schema-constrained
//! structured-generation phase whose output is deterministically
//! repaired and reference-resolved before delivery.

pub mod context;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod prompt;
pub mod schema;
pub mod tools;
pub mod transport;

pub use error::GenError;
pub use events::GenEvent;
pub use orchestrator::{CandidateImage, GenerationRequest, Orchestrator, ProductBrief};
pub use transport::{ChatTransport, OpenAiTransport};
