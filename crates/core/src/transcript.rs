use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, process::Command};
use tracing::info;
use uuid::Uuid;

use crate::error::TranscriptError;

/// Fetches the raw transcript text for a video in a given language.
/// Implementations talk to the outside world and may fail; the
/// orchestrator translates failures into the event protocol.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    async fn fetch(&self, video_id: &str, language: &str) -> Result<String, TranscriptError>;
}

/// Pulls caption tracks with yt-dlp and flattens the VTT cues into
/// plain text. Prefers uploaded subtitles, falls back to auto-generated
/// ones when those are the only tracks available.
pub struct YtDlpTranscriptProvider;

impl YtDlpTranscriptProvider {
    pub fn new() -> Self {
        Self
    }

    async fn download_captions(
        &self,
        video_id: &str,
        language: &str,
        out_dir: &Path,
    ) -> Result<PathBuf, TranscriptError> {
        let url = format!("https://www.youtube.com/watch?v={video_id}");
        let output = Command::new("yt-dlp")
            .arg(&url)
            .arg("--skip-download")
            .arg("--write-subs")
            .arg("--write-auto-subs")
            .arg("--sub-langs")
            .arg(language)
            .arg("--sub-format")
            .arg("vtt")
            .arg("-o")
            .arg(out_dir.join("captions"))
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            if stderr.contains("Video unavailable") || stderr.contains("Private video") {
                return Err(TranscriptError::VideoUnavailable {
                    video_id: video_id.to_string(),
                    reason: stderr,
                });
            }
            return Err(TranscriptError::FetchFailed {
                video_id: video_id.to_string(),
                reason: stderr,
            });
        }

        // yt-dlp names the track captions.<lang>.vtt; auto subs may land
        // under a regional variant like en-orig, so take any vtt match.
        let mut entries = fs::read_dir(out_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "vtt") {
                return Ok(path);
            }
        }

        Err(TranscriptError::NoCaptions {
            video_id: video_id.to_string(),
            language: language.to_string(),
        })
    }
}

impl Default for YtDlpTranscriptProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptProvider for YtDlpTranscriptProvider {
    async fn fetch(&self, video_id: &str, language: &str) -> Result<String, TranscriptError> {
        info!(video_id, language, "fetching captions via yt-dlp");
        let out_dir = std::env::temp_dir().join(format!("postwright-{}", Uuid::new_v4()));
        fs::create_dir_all(&out_dir).await?;

        let result = async {
            let vtt_path = self.download_captions(video_id, language, &out_dir).await?;
            let raw = fs::read_to_string(&vtt_path).await?;
            let text = parse_vtt(&raw);
            if text.is_empty() {
                return Err(TranscriptError::NoCaptions {
                    video_id: video_id.to_string(),
                    language: language.to_string(),
                });
            }
            Ok(text)
        }
        .await;

        let _ = fs::remove_dir_all(&out_dir).await;
        result
    }
}

/// Flatten a WebVTT document into plain transcript text: drops the
/// header, cue ids, timestamp lines and inline tags, and collapses the
/// repeated cue text auto-generated captions emit.
pub fn parse_vtt(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty()
            || line.starts_with("WEBVTT")
            || line.starts_with("Kind:")
            || line.starts_with("Language:")
            || line.starts_with("NOTE")
            || line.contains("-->")
            || line.chars().all(|c| c.is_ascii_digit())
        {
            continue;
        }

        let text = strip_inline_tags(line);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if lines.last().map(String::as_str) == Some(text) {
            continue;
        }
        lines.push(text.to_string());
    }

    lines.join(" ")
}

fn strip_inline_tags(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
