use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use tutormate::config::Config;
use tutormate::handlers::AppState;
use tutormate::server::{build_router, shutdown_signal};
use tutormate::transcript::YouTubeTranscripts;
use tutormate::transport::BedrockClient;

const TRANSCRIPT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = Config::load_dotenv();
    tutormate::init_tracing(Config::debug_requested());
    if let Some(path) = env_file {
        tracing::info!("Loaded .env from: {}", path);
    }

    let config = Arc::new(Config::load());

    let llm = Arc::new(BedrockClient::new(&config)?);
    let transcripts = Arc::new(YouTubeTranscripts::new(TRANSCRIPT_FETCH_TIMEOUT)?);
    let state = AppState::new(llm, transcripts, config.clone());

    let bind = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(
        %bind,
        region = %config.bedrock.region,
        model = %config.bedrock.model_id,
        "Starting TutorMate API"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server shut down");
    Ok(())
}
