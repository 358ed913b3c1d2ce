use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use crate::error::{Result, TutorError};

const WATCH_URL: &str = "https://www.youtube.com/watch";

static VIDEO_ID_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([^&\n?#]+)")
            .expect("static video id pattern"),
        Regex::new(r"youtube\.com/watch\?.*v=([^&\n?#]+)").expect("static video id pattern"),
    ]
});
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace pattern"));
static ANNOTATIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]|\(.*?\)").expect("static annotation pattern"));

/// Fetches caption text for a video
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch(&self, video_id: &str) -> Result<String>;
}

pub fn validate_youtube_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    [
        "youtube.com/watch",
        "youtu.be/",
        "youtube.com/embed/",
        "m.youtube.com/watch",
    ]
    .iter()
    .any(|pattern| lower.contains(pattern))
}

pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Collapse whitespace and drop `[Music]` / `(inaudible)` style annotations
pub fn clean_transcript(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text, " ");
    let stripped = ANNOTATIONS.replace_all(&collapsed, "");
    WHITESPACE.replace_all(stripped.trim(), " ").into_owned()
}

pub fn validate_transcript(text: &str, min_chars: usize) -> Result<()> {
    if text.trim().chars().count() < min_chars {
        return Err(TutorError::Validation(format!(
            "Transcript is too short or invalid (minimum {min_chars} characters)"
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    #[serde(default)]
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEvent {
    #[serde(default)]
    segs: Vec<TimedTextSegment>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSegment {
    #[serde(default)]
    utf8: String,
}

/// Reads the `captionTracks` array embedded in a watch page
fn extract_caption_tracks(html: &str) -> Result<Vec<CaptionTrack>> {
    const MARKER: &str = "\"captionTracks\":";
    let start = html
        .find(MARKER)
        .map(|idx| idx + MARKER.len())
        .ok_or_else(|| TutorError::TranscriptUnavailable("No captions available for this video".to_string()))?;

    serde_json::Deserializer::from_str(&html[start..])
        .into_iter::<Vec<CaptionTrack>>()
        .next()
        .ok_or_else(|| TutorError::TranscriptUnavailable("Caption list is empty".to_string()))?
        .map_err(|e| TutorError::TranscriptUnavailable(format!("Unreadable caption list: {e}")))
}

/// English manual captions first, then English auto-generated, then whatever exists
fn pick_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    let english = |t: &&CaptionTrack| t.language_code.starts_with("en");
    tracks
        .iter()
        .filter(english)
        .find(|t| t.kind.as_deref() != Some("asr"))
        .or_else(|| tracks.iter().find(english))
        .or_else(|| tracks.first())
}

fn join_segments(timed: TimedText) -> String {
    timed
        .events
        .into_iter()
        .flat_map(|event| event.segs)
        .map(|seg| seg.utf8)
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Caption downloader backed by the public watch page and timedtext endpoint
pub struct YouTubeTranscripts {
    client: Client,
}

impl YouTubeTranscripts {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TutorError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let response = self
            .client
            .get(url)
            .query(query)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| TutorError::TranscriptUnavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TutorError::TranscriptUnavailable(format!(
                "YouTube returned {}",
                response.status()
            )));
        }
        response
            .text()
            .await
            .map_err(|e| TutorError::TranscriptUnavailable(e.to_string()))
    }
}

#[async_trait]
impl TranscriptSource for YouTubeTranscripts {
    async fn fetch(&self, video_id: &str) -> Result<String> {
        tracing::info!("Fetching captions for video {}", video_id);

        let page = self.get_text(WATCH_URL, &[("v", video_id)]).await?;
        let tracks = extract_caption_tracks(&page)?;
        let track = pick_track(&tracks).ok_or_else(|| {
            TutorError::TranscriptUnavailable("No captions available for this video".to_string())
        })?;
        tracing::debug!(
            language = %track.language_code,
            auto_generated = track.kind.as_deref() == Some("asr"),
            "Selected caption track"
        );

        let body = self.get_text(&track.base_url, &[("fmt", "json3")]).await?;
        let timed: TimedText = serde_json::from_str(&body)
            .map_err(|e| TutorError::TranscriptUnavailable(format!("Unreadable captions: {e}")))?;
        let text = join_segments(timed);
        if text.is_empty() {
            return Err(TutorError::TranscriptUnavailable(
                "Caption track contained no text".to_string(),
            ));
        }
        Ok(clean_transcript(&text))
    }
}
