use serde::{Deserialize, Serialize};

pub const DEFAULT_PLATFORMS: [&str; 2] = ["LinkedIn", "Instagram"];
pub const DEFAULT_LANGUAGE: &str = "en";

/// A request to generate posts for one video. Platform order is the
/// emission order of the resulting Post events. Absent fields fall
/// back to the documented defaults on deserialization too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub video_id: String,
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub refresh_transcript: bool,
}

fn default_platforms() -> Vec<String> {
    DEFAULT_PLATFORMS.iter().map(|p| p.to_string()).collect()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl GenerationRequest {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            platforms: default_platforms(),
            language: default_language(),
            refresh_transcript: false,
        }
    }
}

/// Generated content for a single platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub platform: String,
    pub content: String,
}

/// Result of a buffered (non-streaming) generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub video_id: String,
    pub posts: Vec<Post>,
    pub transcript_preview: String,
}

/// Result of a transcript-only lookup.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptText {
    pub video_id: String,
    pub language: String,
    pub transcript: String,
    pub length: usize,
}
