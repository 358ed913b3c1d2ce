use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use std::time::Instant;

use super::{AppState, json_body};
use crate::error::{Result, TutorError};
use crate::models::{ProcessTutorialRequest, TranscriptSourceKind, TutorialRecord};
use crate::transcript::{extract_video_id, validate_transcript, validate_youtube_url};

pub async fn process_tutorial(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ProcessTutorialRequest>, JsonRejection>,
) -> Result<Json<TutorialRecord>> {
    let start_time = Instant::now();
    let request = json_body(payload)?;

    let content = request.content.trim();
    if content.is_empty() {
        return Err(TutorError::Validation("`content` must not be empty".to_string()));
    }

    let (transcript, source_url) = match request.source {
        TranscriptSourceKind::Url => {
            if !validate_youtube_url(content) {
                return Err(TutorError::Validation("Invalid YouTube URL format".to_string()));
            }
            let video_id = extract_video_id(content).ok_or_else(|| {
                TutorError::Validation("Could not find a video id in the URL".to_string())
            })?;
            let transcript = state.transcripts.fetch(&video_id).await?;
            (transcript, Some(content))
        }
        TranscriptSourceKind::Transcript => (content.to_string(), None),
    };

    validate_transcript(&transcript, state.config.tutorial.min_transcript_chars)?;

    let mut record = state
        .processor
        .process(&transcript, source_url, request.target_language)
        .await?;
    record.processing_time_secs = start_time.elapsed().as_secs_f64();
    tracing::info!(
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "process-tutorial completed"
    );
    Ok(Json(record))
}
