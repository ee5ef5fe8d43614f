use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use postwright_core::{
    ApiContentGenerator, DEFAULT_LANGUAGE, GenerationRequest, Orchestrator, OrchestratorConfig,
    Provider, TranscriptCache, YtDlpTranscriptProvider, stream_events,
};

use crate::video_id::extract_video_id;

mod video_id;

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Grok,
    Openai,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Grok => Provider::Grok,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Parser)]
#[command(name = "postwright")]
#[command(about = "Generate platform-tailored social media posts from YouTube video transcripts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate posts and print them once everything has finished
    Generate {
        /// Video URL or id
        video: String,

        /// Target platform, repeatable; order is emission order
        #[arg(short = 'P', long = "platform")]
        platforms: Vec<String>,

        /// Transcript language code (e.g. "en", "es", "fr")
        #[arg(short, long, default_value = DEFAULT_LANGUAGE)]
        lang: String,

        /// Bypass the transcript cache and refetch
        #[arg(long)]
        refresh: bool,

        /// AI provider for post generation
        #[arg(short, long, default_value = "grok")]
        provider: CliProvider,

        /// Print the outcome as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
    /// Generate posts, emitting SSE frames on stdout as work progresses
    Stream {
        /// Video URL or id
        video: String,

        /// Target platform, repeatable; order is emission order
        #[arg(short = 'P', long = "platform")]
        platforms: Vec<String>,

        /// Transcript language code (e.g. "en", "es", "fr")
        #[arg(short, long, default_value = DEFAULT_LANGUAGE)]
        lang: String,

        /// Bypass the transcript cache and refetch
        #[arg(long)]
        refresh: bool,

        /// AI provider for post generation
        #[arg(short, long, default_value = "grok")]
        provider: CliProvider,
    },
    /// Fetch and print the transcript only, no generation
    Transcript {
        /// Video URL or id
        video: String,

        /// Transcript language code (e.g. "en", "es", "fr")
        #[arg(short, long, default_value = DEFAULT_LANGUAGE)]
        lang: String,

        /// Bypass the transcript cache and refetch
        #[arg(long)]
        refresh: bool,

        /// Print the transcript as JSON with metadata
        #[arg(long)]
        json: bool,
    },
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn build_orchestrator(provider: Provider) -> Orchestrator {
    Orchestrator::new(
        Arc::new(TranscriptCache::default()),
        Arc::new(YtDlpTranscriptProvider::new()),
        Arc::new(ApiContentGenerator::new(provider)),
        OrchestratorConfig::default(),
    )
}

fn build_request(
    video: &str,
    platforms: Vec<String>,
    lang: String,
    refresh: bool,
) -> GenerationRequest {
    let mut request = GenerationRequest::new(extract_video_id(video));
    if !platforms.is_empty() {
        request.platforms = platforms;
    }
    request.language = lang;
    request.refresh_transcript = refresh;
    request
}

fn validated_provider(provider: CliProvider) -> Provider {
    let provider: Provider = provider.into();
    if let Err(e) = provider.validate_api_key() {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
    provider
}

async fn generate(
    video: String,
    platforms: Vec<String>,
    lang: String,
    refresh: bool,
    provider: CliProvider,
    json: bool,
) -> Result<()> {
    let provider = validated_provider(provider);
    let orchestrator = build_orchestrator(provider);
    let request = build_request(&video, platforms, lang, refresh);

    let spinner = create_spinner("Generating posts...");
    let outcome = orchestrator.run_to_completion(request).await;
    spinner.finish_and_clear();
    let outcome = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!(
        "\n{}  {}\n",
        style("postwright").cyan().bold(),
        style("Social Post Generator").dim()
    );
    println!(
        "{} {}",
        style("Transcript:").dim(),
        style(&outcome.transcript_preview).dim()
    );
    println!("{}", style("─".repeat(60)).dim());

    if outcome.posts.is_empty() {
        println!("{}", style("No posts were generated.").yellow());
        return Ok(());
    }

    for post in &outcome.posts {
        println!("\n{}\n", style(&post.platform).green().bold());
        println!("{}", post.content);
        println!("\n{}", style("─".repeat(60)).dim());
    }

    Ok(())
}

async fn stream(
    video: String,
    platforms: Vec<String>,
    lang: String,
    refresh: bool,
    provider: CliProvider,
) -> Result<()> {
    let provider = validated_provider(provider);
    let orchestrator = build_orchestrator(provider);
    let request = build_request(&video, platforms, lang, refresh);

    let events = orchestrator.run(request)?;
    let mut stdout = tokio::io::stdout();
    stream_events(events, &mut stdout).await?;
    Ok(())
}

async fn transcript(video: String, lang: String, refresh: bool, json: bool) -> Result<()> {
    let orchestrator = build_orchestrator(Provider::default());

    let spinner = create_spinner("Fetching transcript...");
    let result = orchestrator
        .transcript(&extract_video_id(&video), &lang, refresh)
        .await;
    spinner.finish_and_clear();
    let result = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.transcript);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("postwright_core=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Generate {
            video,
            platforms,
            lang,
            refresh,
            provider,
            json,
        } => generate(video, platforms, lang, refresh, provider, json).await,
        Command::Stream {
            video,
            platforms,
            lang,
            refresh,
            provider,
        } => stream(video, platforms, lang, refresh, provider).await,
        Command::Transcript {
            video,
            lang,
            refresh,
            json,
        } => transcript(video, lang, refresh, json).await,
    }
}
