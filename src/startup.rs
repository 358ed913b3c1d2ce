use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

use crate::config::StartupConfig;

/// Floor for a single health request so a short interval still allows a reply
const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("API did not become healthy at {url} after {attempts} attempts")]
    HealthProbeExhausted { url: String, attempts: u32 },

    #[error("Invalid presentation-layer command `{command}`: {reason}")]
    InvalidUiCommand { command: String, reason: String },
}

/// Program and arguments of the presentation-layer command, honouring shell quoting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl UiCommand {
    /// `Ok(None)` when no command is configured
    pub fn parse(command: &str) -> Result<Option<Self>, StartupError> {
        let mut words = shell_words::split(command).map_err(|e| StartupError::InvalidUiCommand {
            command: command.to_string(),
            reason: e.to_string(),
        })?;
        if words.is_empty() {
            return Ok(None);
        }
        let program = words.remove(0);
        Ok(Some(Self {
            program,
            args: words,
        }))
    }
}

/// Fixed-interval, bounded health polling
#[derive(Debug, Clone, Copy)]
pub struct HealthPoll {
    pub max_attempts: u32,
    pub interval: Duration,
    /// Bound on each request; a port that accepts but never answers counts as a failed attempt
    pub request_timeout: Duration,
}

impl HealthPoll {
    pub fn from_config(cfg: &StartupConfig) -> Self {
        let interval = Duration::from_millis(cfg.interval_ms);
        Self {
            max_attempts: cfg.max_attempts.max(1),
            interval,
            request_timeout: interval.max(MIN_REQUEST_TIMEOUT),
        }
    }
}

/// Poll `url` until it answers 200; returns the attempt that succeeded
pub async fn wait_until_healthy(
    client: &Client,
    url: &str,
    poll: HealthPoll,
) -> Result<u32, StartupError> {
    for attempt in 1..=poll.max_attempts {
        match client.get(url).timeout(poll.request_timeout).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(attempt, "API is healthy at {}", url);
                return Ok(attempt);
            }
            Ok(resp) => {
                tracing::debug!(attempt, status = %resp.status(), "Health check not ready");
            }
            Err(e) => {
                tracing::debug!(attempt, "Health check failed: {}", e);
            }
        }
        if attempt < poll.max_attempts {
            sleep(poll.interval).await;
        }
    }
    Err(StartupError::HealthProbeExhausted {
        url: url.to_string(),
        attempts: poll.max_attempts,
    })
}
