use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use chrono::{SecondsFormat, Utc};

use super::{AppState, json_body};
use crate::error::Result;
use crate::models::{ChatRequest, ChatResponse};

pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let request = json_body(payload)?;
    let reply = state
        .chat
        .reply(&request.tutorial, &request.history, &request.message)
        .await?;

    Ok(Json(ChatResponse {
        reply: reply.text,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}
