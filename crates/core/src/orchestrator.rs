use std::{collections::HashSet, sync::Arc, time::Duration};

use tokio::{
    sync::mpsc::{self, error::SendError},
    time::timeout,
};
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

use crate::{
    cache::{CacheKey, TranscriptCache},
    error::{GenerateError, PostwrightError, Result, TranscriptError},
    event::{Stage, StreamEvent},
    generator::ContentGenerator,
    transcript::TranscriptProvider,
    types::{GenerationOutcome, GenerationRequest, Post, TranscriptText},
};

const EVENT_CHANNEL_CAPACITY: usize = 8;

/// Explicit bounds for a single orchestration run. The transcript cap
/// applies to what is fed into generation; the Transcript event still
/// reports the true length.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub preview_chars: usize,
    pub call_timeout: Duration,
    pub max_transcript_chars: usize,
    pub max_platforms: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            preview_chars: 200,
            call_timeout: Duration::from_secs(60),
            max_transcript_chars: 100_000,
            max_platforms: 16,
        }
    }
}

/// Ordered, finite sequence of [`StreamEvent`]s for one request.
/// Dropping the stream cancels the run: the producer stops dispatching
/// further platforms as soon as its next emit fails.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<StreamEvent>,
}

impl EventStream {
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Drains the remaining events into a Vec. Test and tooling helper;
    /// live consumers should poll [`next`](Self::next).
    pub async fn collect(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }
}

/// Coordinates cache lookup, transcript fetch and per-platform
/// generation, emitting a strictly ordered event sequence. Fatal
/// transcript failures end the stream with an Error and no Done;
/// per-platform failures are reported and skipped.
pub struct Orchestrator {
    cache: Arc<TranscriptCache>,
    provider: Arc<dyn TranscriptProvider>,
    generator: Arc<dyn ContentGenerator>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        cache: Arc<TranscriptCache>,
        provider: Arc<dyn TranscriptProvider>,
        generator: Arc<dyn ContentGenerator>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            cache,
            provider,
            generator,
            config,
        }
    }

    /// Starts a run and returns its event stream. Invalid requests are
    /// rejected here, before any event is produced.
    pub fn run(&self, request: GenerationRequest) -> Result<EventStream> {
        validate(&request, &self.config)?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let cache = Arc::clone(&self.cache);
        let provider = Arc::clone(&self.provider);
        let generator = Arc::clone(&self.generator);
        let config = self.config.clone();

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "generation",
            %request_id,
            video_id = %request.video_id,
            platforms = request.platforms.len(),
        );
        tokio::spawn(
            async move {
                if drive(cache, provider, generator, config, request, tx)
                    .await
                    .is_err()
                {
                    debug!("client disconnected, stopping dispatch");
                }
            }
            .instrument(span),
        );

        Ok(EventStream { rx })
    }

    /// Buffered form of [`run`](Self::run): drains the same event
    /// sequence and returns the collected posts, or the fatal error if
    /// the transcript step failed.
    pub async fn run_to_completion(&self, request: GenerationRequest) -> Result<GenerationOutcome> {
        let video_id = request.video_id.clone();
        let mut stream = self.run(request)?;

        let mut posts = Vec::new();
        let mut transcript_preview = String::new();
        let mut transcript_seen = false;
        let mut completed = false;
        let mut fatal = None;

        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::Transcript { preview, .. } => {
                    transcript_seen = true;
                    transcript_preview = preview;
                }
                StreamEvent::Post { platform, content } => posts.push(Post { platform, content }),
                StreamEvent::Error { message } if !transcript_seen => fatal = Some(message),
                StreamEvent::Done {} => completed = true,
                _ => {}
            }
        }

        if !completed {
            return Err(PostwrightError::TranscriptUnavailable {
                message: fatal
                    .unwrap_or_else(|| "event stream ended before completion".to_string()),
            });
        }

        Ok(GenerationOutcome {
            video_id,
            posts,
            transcript_preview,
        })
    }

    /// Transcript-only read: cache and provider, no generation.
    pub async fn transcript(
        &self,
        video_id: &str,
        language: &str,
        refresh: bool,
    ) -> Result<TranscriptText> {
        if video_id.trim().is_empty() {
            return Err(PostwrightError::InvalidRequest {
                reason: "video_id must not be empty".to_string(),
            });
        }

        let key = CacheKey::new(video_id, language);
        if refresh {
            self.cache.invalidate(&key);
        }
        let transcript =
            resolve_transcript(&self.cache, self.provider.as_ref(), &self.config, &key).await?;

        Ok(TranscriptText {
            video_id: video_id.to_string(),
            language: language.to_string(),
            length: transcript.chars().count(),
            transcript,
        })
    }
}

fn validate(request: &GenerationRequest, config: &OrchestratorConfig) -> Result<()> {
    if request.video_id.trim().is_empty() {
        return Err(PostwrightError::InvalidRequest {
            reason: "video_id must not be empty".to_string(),
        });
    }
    if request.platforms.is_empty() {
        return Err(PostwrightError::InvalidRequest {
            reason: "platforms must not be empty".to_string(),
        });
    }
    if request.platforms.len() > config.max_platforms {
        return Err(PostwrightError::InvalidRequest {
            reason: format!(
                "too many platforms: {} (max {})",
                request.platforms.len(),
                config.max_platforms
            ),
        });
    }
    let mut seen = HashSet::new();
    for platform in &request.platforms {
        if platform.trim().is_empty() {
            return Err(PostwrightError::InvalidRequest {
                reason: "platform names must not be empty".to_string(),
            });
        }
        if !seen.insert(platform.as_str()) {
            return Err(PostwrightError::InvalidRequest {
                reason: format!("duplicate platform '{platform}'"),
            });
        }
    }
    Ok(())
}

async fn resolve_transcript(
    cache: &TranscriptCache,
    provider: &dyn TranscriptProvider,
    config: &OrchestratorConfig,
    key: &CacheKey,
) -> std::result::Result<String, TranscriptError> {
    if let Some(cached) = cache.get(key) {
        debug!(video_id = %key.video_id, "transcript cache hit");
        return Ok(cached);
    }

    let fetched = timeout(
        config.call_timeout,
        provider.fetch(&key.video_id, &key.language),
    )
    .await
    .map_err(|_| TranscriptError::Timeout {
        video_id: key.video_id.clone(),
        seconds: config.call_timeout.as_secs(),
    })??;

    cache.put(key.clone(), fetched.clone());
    Ok(fetched)
}

/// The state machine proper. Every emit goes through the bounded
/// channel; a send error means the consumer is gone, which unwinds the
/// run without touching the platforms not yet dispatched.
async fn drive(
    cache: Arc<TranscriptCache>,
    provider: Arc<dyn TranscriptProvider>,
    generator: Arc<dyn ContentGenerator>,
    config: OrchestratorConfig,
    request: GenerationRequest,
    tx: mpsc::Sender<StreamEvent>,
) -> std::result::Result<(), SendError<StreamEvent>> {
    tx.send(StreamEvent::status(Stage::Starting)).await?;

    let key = CacheKey::new(request.video_id.clone(), request.language.clone());
    if request.refresh_transcript {
        cache.invalidate(&key);
    }

    let transcript = match resolve_transcript(&cache, provider.as_ref(), &config, &key).await {
        Ok(transcript) => transcript,
        Err(err) => {
            warn!(error = %err, "transcript resolution failed, aborting request");
            tx.send(StreamEvent::error(err.to_string())).await?;
            // Fatal path: no Done after an aborting Error.
            return Ok(());
        }
    };
    info!(chars = transcript.chars().count(), "transcript ready");

    tx.send(StreamEvent::status(Stage::TranscriptReady)).await?;
    tx.send(StreamEvent::Transcript {
        preview: preview(&transcript, config.preview_chars),
        length: transcript.chars().count(),
    })
    .await?;

    let input = truncate_chars(&transcript, config.max_transcript_chars);

    for (index, platform) in request.platforms.iter().enumerate() {
        tx.send(StreamEvent::generating(platform, index)).await?;

        let result = timeout(
            config.call_timeout,
            generator.generate(input, platform, &request.language),
        )
        .await;

        match result {
            Ok(Ok(content)) => {
                info!(platform = %platform, "post generated");
                tx.send(StreamEvent::Post {
                    platform: platform.clone(),
                    content,
                })
                .await?;
            }
            Ok(Err(err)) => {
                warn!(platform = %platform, error = %err, "generation failed, continuing");
                tx.send(StreamEvent::error(format!(
                    "Error generating {platform}: {err}"
                )))
                .await?;
            }
            Err(_) => {
                let err = GenerateError::Timeout {
                    platform: platform.clone(),
                    seconds: config.call_timeout.as_secs(),
                };
                warn!(platform = %platform, error = %err, "generation timed out, continuing");
                tx.send(StreamEvent::error(format!(
                    "Error generating {platform}: {err}"
                )))
                .await?;
            }
        }
    }

    tx.send(StreamEvent::status(Stage::Done)).await?;
    tx.send(StreamEvent::Done {}).await?;
    Ok(())
}

fn preview(text: &str, chars: usize) -> String {
    text.chars().take(chars).collect()
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
