//! Postwright Core Library
//!
//! Core functionality for turning a YouTube video transcript into
//! platform-tailored social media posts, streamed as ordered progress
//! events over an SSE-shaped protocol.

pub mod cache;
pub mod error;
pub mod event;
pub mod generator;
pub mod orchestrator;
pub mod provider;
pub mod sse;
pub mod transcript;
pub mod types;

// Re-export commonly used items at crate root
pub use cache::{CacheKey, DEFAULT_TRANSCRIPT_TTL, TranscriptCache};
pub use error::{GenerateError, PostwrightError, Result, TranscriptError};
pub use event::{Stage, StreamEvent};
pub use generator::{ApiContentGenerator, ContentGenerator};
pub use orchestrator::{EventStream, Orchestrator, OrchestratorConfig};
pub use provider::{Provider, ProviderConfig};
pub use sse::{encode_event, stream_events};
pub use transcript::{TranscriptProvider, YtDlpTranscriptProvider};
pub use types::{
    DEFAULT_LANGUAGE, DEFAULT_PLATFORMS, GenerationOutcome, GenerationRequest, Post,
    TranscriptText,
};
