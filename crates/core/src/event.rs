use serde::Serialize;

/// Phase of the orchestration state machine surfaced to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Starting,
    TranscriptReady,
    Generating,
    Done,
}

/// One unit of the progress protocol. Variants serialize to exactly the
/// payload the wire format carries; the SSE event name comes from
/// [`StreamEvent::tag`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Status {
        stage: Stage,
        #[serde(skip_serializing_if = "Option::is_none")]
        platform: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    Transcript {
        preview: String,
        length: usize,
    },
    Post {
        platform: String,
        content: String,
    },
    Error {
        message: String,
    },
    Done {},
}

impl StreamEvent {
    pub fn status(stage: Stage) -> Self {
        StreamEvent::Status {
            stage,
            platform: None,
            index: None,
        }
    }

    pub fn generating(platform: &str, index: usize) -> Self {
        StreamEvent::Status {
            stage: Stage::Generating,
            platform: Some(platform.to_string()),
            index: Some(index),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            message: message.into(),
        }
    }

    /// SSE event name for this variant.
    pub fn tag(&self) -> &'static str {
        match self {
            StreamEvent::Status { .. } => "status",
            StreamEvent::Transcript { .. } => "transcript",
            StreamEvent::Post { .. } => "post",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Done {} => "done",
        }
    }
}
