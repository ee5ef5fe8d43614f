use thiserror::Error;

/// Failures while fetching a transcript. Every variant is fatal for the
/// request that hit it: without a transcript nothing can be generated.
#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("No captions available for video {video_id} in language '{language}'")]
    NoCaptions { video_id: String, language: String },

    #[error("Video {video_id} is unavailable: {reason}")]
    VideoUnavailable { video_id: String, reason: String },

    #[error("Transcript fetch failed for {video_id}: {reason}")]
    FetchFailed { video_id: String, reason: String },

    #[error("Transcript fetch for {video_id} timed out after {seconds}s")]
    Timeout { video_id: String, seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while generating post content for a single platform.
/// Non-fatal at the request level: other platforms keep going.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[error("API request failed: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Invalid API response: {reason}")]
    InvalidResponse { reason: String },

    #[error("Generator returned empty content for {platform}")]
    EmptyOutput { platform: String },

    #[error("Generation for {platform} timed out after {seconds}s")]
    Timeout { platform: String, seconds: u64 },
}

#[derive(Error, Debug)]
pub enum PostwrightError {
    #[error("Transcript unavailable: {message}")]
    TranscriptUnavailable { message: String },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<TranscriptError> for PostwrightError {
    fn from(err: TranscriptError) -> Self {
        PostwrightError::TranscriptUnavailable {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PostwrightError>;
