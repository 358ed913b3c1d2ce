use axum::Json;
use axum::extract::State;
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

use super::AppState;
use crate::models::HealthResponse;

const PROBE_PROMPT: &str = "Hello, respond with 'OK'";

/// Liveness banner; never touches the model
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": format!("{} is running!", state.config.server.name),
        "version": state.config.server.version,
        "status": "healthy",
    }))
}

/// Always 200; the Bedrock status reflects a fresh, time-boxed probe
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let probe = tokio::time::timeout(
        state.config.get_probe_timeout(),
        state
            .llm
            .invoke(PROBE_PROMPT, state.config.bedrock.probe_max_tokens),
    )
    .await;

    let connected = match probe {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            tracing::warn!("Bedrock health probe failed: {}", e);
            false
        }
        Err(_) => {
            tracing::warn!(
                "Bedrock health probe timed out after {:?}",
                state.config.get_probe_timeout()
            );
            false
        }
    };

    Json(HealthResponse {
        api_status: if connected { "healthy" } else { "degraded" }.to_string(),
        bedrock_status: if connected { "connected" } else { "error" }.to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}
