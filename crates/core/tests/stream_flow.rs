//! End-to-end behavior of the orchestrator and SSE encoder over
//! scripted provider/generator doubles.

use std::{
    collections::HashSet,
    io,
    pin::Pin,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    task::{Context, Poll},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{io::AsyncWrite, sync::Semaphore};

use postwright_core::{
    ContentGenerator, GenerateError, GenerationRequest, Orchestrator, OrchestratorConfig,
    PostwrightError, Stage, StreamEvent, TranscriptCache, TranscriptError, TranscriptProvider,
    stream_events,
};

enum ProviderMode {
    Text(String),
    PerCallText,
    NoCaptions,
    Hang,
}

struct FakeProvider {
    mode: ProviderMode,
    calls: AtomicUsize,
}

impl FakeProvider {
    fn text(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            mode: ProviderMode::Text(text.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn per_call() -> Arc<Self> {
        Arc::new(Self {
            mode: ProviderMode::PerCallText,
            calls: AtomicUsize::new(0),
        })
    }

    fn no_captions() -> Arc<Self> {
        Arc::new(Self {
            mode: ProviderMode::NoCaptions,
            calls: AtomicUsize::new(0),
        })
    }

    fn hanging() -> Arc<Self> {
        Arc::new(Self {
            mode: ProviderMode::Hang,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptProvider for FakeProvider {
    async fn fetch(&self, video_id: &str, language: &str) -> Result<String, TranscriptError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.mode {
            ProviderMode::Text(text) => Ok(text.clone()),
            ProviderMode::PerCallText => Ok(format!("transcript v{n}")),
            ProviderMode::NoCaptions => Err(TranscriptError::NoCaptions {
                video_id: video_id.to_string(),
                language: language.to_string(),
            }),
            ProviderMode::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

struct FakeGenerator {
    fail_platforms: HashSet<String>,
    hang_platforms: HashSet<String>,
    called: Mutex<Vec<String>>,
    seen_transcript_chars: Mutex<Vec<usize>>,
    gate: Option<Semaphore>,
}

impl FakeGenerator {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail_platforms: HashSet::new(),
            hang_platforms: HashSet::new(),
            called: Mutex::new(Vec::new()),
            seen_transcript_chars: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    fn failing(platforms: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            fail_platforms: platforms.iter().map(|p| p.to_string()).collect(),
            hang_platforms: HashSet::new(),
            called: Mutex::new(Vec::new()),
            seen_transcript_chars: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    fn hanging(platforms: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            fail_platforms: HashSet::new(),
            hang_platforms: platforms.iter().map(|p| p.to_string()).collect(),
            called: Mutex::new(Vec::new()),
            seen_transcript_chars: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    fn gated(initial_permits: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_platforms: HashSet::new(),
            hang_platforms: HashSet::new(),
            called: Mutex::new(Vec::new()),
            seen_transcript_chars: Mutex::new(Vec::new()),
            gate: Some(Semaphore::new(initial_permits)),
        })
    }

    fn called(&self) -> Vec<String> {
        self.called.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate(
        &self,
        transcript: &str,
        platform: &str,
        _language: &str,
    ) -> Result<String, GenerateError> {
        self.called.lock().unwrap().push(platform.to_string());
        self.seen_transcript_chars
            .lock()
            .unwrap()
            .push(transcript.chars().count());

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        if self.hang_platforms.contains(platform) {
            std::future::pending::<()>().await;
        }

        if self.fail_platforms.contains(platform) {
            return Err(GenerateError::EmptyOutput {
                platform: platform.to_string(),
            });
        }
        Ok(format!("{platform} post"))
    }
}

fn orchestrator(
    provider: Arc<FakeProvider>,
    generator: Arc<FakeGenerator>,
    config: OrchestratorConfig,
) -> Orchestrator {
    Orchestrator::new(
        Arc::new(TranscriptCache::default()),
        provider,
        generator,
        config,
    )
}

fn request(video_id: &str, platforms: &[&str]) -> GenerationRequest {
    GenerationRequest {
        video_id: video_id.to_string(),
        platforms: platforms.iter().map(|p| p.to_string()).collect(),
        language: "en".to_string(),
        refresh_transcript: false,
    }
}

#[tokio::test]
async fn full_sequence_in_request_order() {
    let transcript: String = "abcdefghij".repeat(1000);
    let provider = FakeProvider::text(transcript.clone());
    let generator = FakeGenerator::ok();
    let orch = orchestrator(provider, generator, OrchestratorConfig::default());

    let events = orch
        .run(request("X", &["LinkedIn", "Instagram"]))
        .unwrap()
        .collect()
        .await;

    let expected_preview: String = transcript.chars().take(200).collect();
    assert_eq!(
        events,
        vec![
            StreamEvent::status(Stage::Starting),
            StreamEvent::status(Stage::TranscriptReady),
            StreamEvent::Transcript {
                preview: expected_preview,
                length: 10_000,
            },
            StreamEvent::generating("LinkedIn", 0),
            StreamEvent::Post {
                platform: "LinkedIn".to_string(),
                content: "LinkedIn post".to_string(),
            },
            StreamEvent::generating("Instagram", 1),
            StreamEvent::Post {
                platform: "Instagram".to_string(),
                content: "Instagram post".to_string(),
            },
            StreamEvent::status(Stage::Done),
            StreamEvent::Done {},
        ]
    );
}

#[tokio::test]
async fn partial_failure_reports_error_and_continues() {
    let provider = FakeProvider::text("some transcript");
    let generator = FakeGenerator::failing(&["B"]);
    let orch = orchestrator(provider, generator, OrchestratorConfig::default());

    let events = orch
        .run(request("X", &["A", "B", "C"]))
        .unwrap()
        .collect()
        .await;

    let posts: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Post { platform, .. } => Some(platform.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(posts, vec!["A", "C"]);

    let errors: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Error { message } => Some(message.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("B"));

    assert_eq!(
        &events[events.len() - 2..],
        &[StreamEvent::status(Stage::Done), StreamEvent::Done {}]
    );
}

#[tokio::test]
async fn fatal_transcript_failure_ends_stream_without_done() {
    let provider = FakeProvider::no_captions();
    let generator = FakeGenerator::ok();
    let orch = orchestrator(provider, Arc::clone(&generator), OrchestratorConfig::default());

    let events = orch
        .run(request("X", &["LinkedIn"]))
        .unwrap()
        .collect()
        .await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], StreamEvent::status(Stage::Starting));
    match &events[1] {
        StreamEvent::Error { message } => assert!(message.contains("No captions")),
        other => panic!("expected error event, got {other:?}"),
    }
    assert!(generator.called().is_empty());
}

#[tokio::test(start_paused = true)]
async fn provider_timeout_is_fatal() {
    let provider = FakeProvider::hanging();
    let generator = FakeGenerator::ok();
    let orch = orchestrator(provider, Arc::clone(&generator), OrchestratorConfig::default());

    let events = orch
        .run(request("X", &["LinkedIn"]))
        .unwrap()
        .collect()
        .await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], StreamEvent::status(Stage::Starting));
    match &events[1] {
        StreamEvent::Error { message } => assert!(message.contains("timed out")),
        other => panic!("expected error event, got {other:?}"),
    }
    assert!(generator.called().is_empty());
}

#[tokio::test(start_paused = true)]
async fn generator_timeout_is_scoped_to_its_platform() {
    let provider = FakeProvider::text("some transcript");
    let generator = FakeGenerator::hanging(&["B"]);
    let orch = orchestrator(provider, generator, OrchestratorConfig::default());

    let events = orch
        .run(request("X", &["A", "B", "C"]))
        .unwrap()
        .collect()
        .await;

    let posts: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Post { platform, .. } => Some(platform.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(posts, vec!["A", "C"]);

    let errors: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Error { message } => Some(message.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("B"));
    assert!(errors[0].contains("timed out"));

    assert_eq!(
        &events[events.len() - 2..],
        &[StreamEvent::status(Stage::Done), StreamEvent::Done {}]
    );
}

#[tokio::test]
async fn consecutive_runs_hit_the_cache() {
    let provider = FakeProvider::text("cached transcript");
    let generator = FakeGenerator::ok();
    let orch = orchestrator(Arc::clone(&provider), generator, OrchestratorConfig::default());

    orch.run(request("X", &["A"])).unwrap().collect().await;
    orch.run(request("X", &["A"])).unwrap().collect().await;

    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn refresh_forces_refetch_and_replaces_entry() {
    let provider = FakeProvider::per_call();
    let generator = FakeGenerator::ok();
    let orch = orchestrator(Arc::clone(&provider), generator, OrchestratorConfig::default());

    orch.run(request("X", &["A"])).unwrap().collect().await;

    let mut refresh = request("X", &["A"]);
    refresh.refresh_transcript = true;
    let events = orch.run(refresh).unwrap().collect().await;
    assert_eq!(provider.calls(), 2);
    assert!(events.contains(&StreamEvent::Transcript {
        preview: "transcript v2".to_string(),
        length: "transcript v2".chars().count(),
    }));

    // The refreshed entry replaced the old one; no further fetches.
    orch.run(request("X", &["A"])).unwrap().collect().await;
    assert_eq!(provider.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn expired_entry_triggers_exactly_one_refetch() {
    let provider = FakeProvider::per_call();
    let generator = FakeGenerator::ok();
    let cache = Arc::new(TranscriptCache::new(Duration::from_secs(60)));
    let orch = Orchestrator::new(
        cache,
        Arc::<FakeProvider>::clone(&provider),
        generator,
        OrchestratorConfig::default(),
    );

    orch.run(request("X", &["A"])).unwrap().collect().await;
    assert_eq!(provider.calls(), 1);

    tokio::time::advance(Duration::from_secs(61)).await;
    orch.run(request("X", &["A"])).unwrap().collect().await;
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_any_event() {
    let orch = orchestrator(
        FakeProvider::text("t"),
        FakeGenerator::ok(),
        OrchestratorConfig::default(),
    );

    let empty_id = orch.run(request("", &["A"]));
    assert!(matches!(
        empty_id.unwrap_err(),
        PostwrightError::InvalidRequest { .. }
    ));

    let no_platforms = orch.run(request("X", &[]));
    assert!(matches!(
        no_platforms.unwrap_err(),
        PostwrightError::InvalidRequest { .. }
    ));
}

#[tokio::test]
async fn run_to_completion_collects_posts_and_preview() {
    let provider = FakeProvider::text("short transcript");
    let generator = FakeGenerator::failing(&["B"]);
    let orch = orchestrator(provider, generator, OrchestratorConfig::default());

    let outcome = orch
        .run_to_completion(request("X", &["A", "B"]))
        .await
        .unwrap();

    assert_eq!(outcome.video_id, "X");
    assert_eq!(outcome.transcript_preview, "short transcript");
    assert_eq!(outcome.posts.len(), 1);
    assert_eq!(outcome.posts[0].platform, "A");
}

#[tokio::test]
async fn run_to_completion_surfaces_fatal_error() {
    let orch = orchestrator(
        FakeProvider::no_captions(),
        FakeGenerator::ok(),
        OrchestratorConfig::default(),
    );

    let err = orch
        .run_to_completion(request("X", &["A"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PostwrightError::TranscriptUnavailable { .. }
    ));
}

#[tokio::test]
async fn dropping_the_stream_stops_undispatched_platforms() {
    let provider = FakeProvider::text("some transcript");
    let generator = FakeGenerator::gated(1);
    let orch = orchestrator(provider, Arc::clone(&generator), OrchestratorConfig::default());

    let mut stream = orch.run(request("X", &["A", "B", "C"])).unwrap();
    loop {
        match stream.next().await {
            Some(StreamEvent::Post { platform, .. }) if platform == "A" => break,
            Some(_) => {}
            None => panic!("stream ended before first post"),
        }
    }
    drop(stream);

    // Let the in-flight call for B finish; its result is discarded and
    // the failed emit stops dispatch, so C is never started.
    if let Some(gate) = &generator.gate {
        gate.add_permits(2);
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let called = generator.called();
    assert!(called.contains(&"A".to_string()));
    assert!(!called.contains(&"C".to_string()));
}

#[tokio::test]
async fn generator_input_is_truncated_but_length_is_exact() {
    let transcript = "x".repeat(100);
    let provider = FakeProvider::text(transcript);
    let generator = FakeGenerator::ok();
    let config = OrchestratorConfig {
        max_transcript_chars: 50,
        ..OrchestratorConfig::default()
    };
    let orch = orchestrator(provider, Arc::clone(&generator), config);

    let events = orch.run(request("X", &["A"])).unwrap().collect().await;

    assert!(events.contains(&StreamEvent::Transcript {
        preview: "x".repeat(100),
        length: 100,
    }));
    assert_eq!(
        generator.seen_transcript_chars.lock().unwrap().as_slice(),
        &[50]
    );
}

#[tokio::test]
async fn transcript_lookup_reads_through_the_cache() {
    let provider = FakeProvider::per_call();
    let generator = FakeGenerator::ok();
    let orch = orchestrator(Arc::clone(&provider), generator, OrchestratorConfig::default());

    let first = orch.transcript("X", "en", false).await.unwrap();
    assert_eq!(first.transcript, "transcript v1");
    assert_eq!(first.length, "transcript v1".chars().count());
    assert_eq!(first.video_id, "X");
    assert_eq!(first.language, "en");

    let second = orch.transcript("X", "en", false).await.unwrap();
    assert_eq!(second.transcript, "transcript v1");
    assert_eq!(provider.calls(), 1);

    let refreshed = orch.transcript("X", "en", true).await.unwrap();
    assert_eq!(refreshed.transcript, "transcript v2");
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn sse_output_preserves_order_and_framing() {
    let provider = FakeProvider::text("tiny");
    let generator = FakeGenerator::ok();
    let orch = orchestrator(provider, generator, OrchestratorConfig::default());

    let stream = orch.run(request("X", &["LinkedIn"])).unwrap();
    let mut out: Vec<u8> = Vec::new();
    stream_events(stream, &mut out).await.unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("retry: 2000\n\n"));

    let expected = concat!(
        "retry: 2000\n\n",
        "event: status\ndata: {\"stage\":\"starting\"}\n\n",
        "event: status\ndata: {\"stage\":\"transcript_ready\"}\n\n",
        "event: transcript\ndata: {\"preview\":\"tiny\",\"length\":4}\n\n",
        "event: status\ndata: {\"stage\":\"generating\",\"platform\":\"LinkedIn\",\"index\":0}\n\n",
        "event: post\ndata: {\"platform\":\"LinkedIn\",\"content\":\"LinkedIn post\"}\n\n",
        "event: status\ndata: {\"stage\":\"done\"}\n\n",
        "event: done\ndata: {}\n\n",
    );
    assert_eq!(text, expected);
}

struct FailingWriter {
    writes: usize,
}

impl AsyncWrite for FailingWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.writes == 0 {
            self.writes += 1;
            Poll::Ready(Ok(buf.len()))
        } else {
            Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe)))
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn write_failure_surfaces_as_disconnect() {
    let provider = FakeProvider::text("tiny");
    let generator = FakeGenerator::ok();
    let orch = orchestrator(provider, generator, OrchestratorConfig::default());

    let stream = orch.run(request("X", &["LinkedIn"])).unwrap();
    let mut writer = FailingWriter { writes: 0 };
    let err = stream_events(stream, &mut writer).await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
}
