/// HTTP handlers for the TutorMate API
pub mod chat;
pub mod export;
pub mod health;
pub mod tutorial;

#[cfg(test)]
mod test_handlers;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use std::sync::Arc;

use crate::chat::ChatHandler;
use crate::config::Config;
use crate::error::{Result, TutorError};
use crate::transcript::TranscriptSource;
use crate::transport::LlmClient;
use crate::tutorial::TutorialProcessor;

/// Shared, read-only state handed to every request
#[derive(Clone)]
pub struct AppState {
    pub(crate) llm: Arc<dyn LlmClient>,
    pub(crate) transcripts: Arc<dyn TranscriptSource>,
    pub(crate) processor: Arc<TutorialProcessor>,
    pub(crate) chat: Arc<ChatHandler>,
    pub(crate) config: Arc<Config>,
}

impl AppState {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        transcripts: Arc<dyn TranscriptSource>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            processor: Arc::new(TutorialProcessor::new(
                llm.clone(),
                config.tutorial.clone(),
            )),
            chat: Arc::new(ChatHandler::new(llm.clone(), config.chat.clone())),
            llm,
            transcripts,
            config,
        }
    }
}

/// Unwrap a JSON body, reporting bad payloads as validation errors
pub(crate) fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| TutorError::Validation(rejection.body_text()))
}
