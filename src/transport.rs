use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tokio::time::sleep;

#[cfg(test)]
use mockall::automock;

use crate::config::Config;
use crate::error::{Result, TutorError};
use crate::models::{InvokeContent, InvokeMessage, InvokeRequest, InvokeResponse};
use crate::retry::RetryPolicy;

/// Single logical "prompt in, text out" call against the hosted model
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

/// Outcome of one HTTP attempt inside a logical invocation
enum AttemptError {
    Retryable(String),
    Fatal(TutorError),
}

/// Bedrock runtime `InvokeModel` client for Anthropic models
pub struct BedrockClient {
    client: Client,
    invoke_url: String,
    bearer_token: Option<String>,
    anthropic_version: String,
    deadline: Duration,
    retry: RetryPolicy,
}

impl BedrockClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(cfg.get_connect_timeout())
            .build()
            .map_err(|e| TutorError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            invoke_url: format!(
                "{}/model/{}/invoke",
                cfg.bedrock_endpoint(),
                cfg.bedrock.model_id
            ),
            bearer_token: cfg.bedrock.bearer_token.clone(),
            anthropic_version: cfg.bedrock.anthropic_version.clone(),
            deadline: cfg.get_bedrock_timeout(),
            retry: RetryPolicy::from_config(&cfg.retry),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    async fn attempt(
        &self,
        body: &InvokeRequest<'_>,
    ) -> std::result::Result<String, AttemptError> {
        let mut request = self
            .client
            .post(&self.invoke_url)
            .header("Accept", "application/json")
            .json(body);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() || e.is_request() {
                AttemptError::Retryable(format!("Failed to reach Bedrock: {e}"))
            } else {
                AttemptError::Fatal(TutorError::UpstreamUnavailable(format!(
                    "Failed to send request to Bedrock: {e}"
                )))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = format!("Bedrock returned {status}: {detail}");
            return if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                Err(AttemptError::Retryable(message))
            } else {
                Err(AttemptError::Fatal(TutorError::UpstreamUnavailable(message)))
            };
        }

        let parsed: InvokeResponse = response.json().await.map_err(|e| {
            AttemptError::Fatal(TutorError::UpstreamUnavailable(format!(
                "Failed to parse Bedrock response: {e}"
            )))
        })?;
        parsed.text().ok_or_else(|| {
            AttemptError::Fatal(TutorError::UpstreamUnavailable(
                "Bedrock response contained no text content".to_string(),
            ))
        })
    }

    async fn invoke_with_retry(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let body = InvokeRequest {
            anthropic_version: &self.anthropic_version,
            max_tokens,
            messages: vec![InvokeMessage {
                role: "user",
                content: vec![InvokeContent {
                    kind: "text",
                    text: prompt,
                }],
            }],
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(&body).await {
                Ok(text) => return Ok(text),
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Retryable(message)) => {
                    if !self.retry.should_retry(attempt) {
                        return Err(TutorError::UpstreamUnavailable(format!(
                            "{message} (after {attempt} attempts)"
                        )));
                    }
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transient Bedrock failure, retrying: {}",
                        message
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl LlmClient for BedrockClient {
    async fn invoke(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let start_time = Instant::now();
        tracing::debug!(
            url = %self.invoke_url,
            prompt_chars = prompt.len(),
            max_tokens,
            "Invoking Bedrock model"
        );

        let result = tokio::time::timeout(self.deadline, self.invoke_with_retry(prompt, max_tokens))
            .await
            .unwrap_or(Err(TutorError::UpstreamTimeout(self.deadline)));

        match &result {
            Ok(text) => tracing::info!(
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                reply_chars = text.len(),
                "Bedrock invocation succeeded"
            ),
            Err(e) => tracing::warn!(
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Bedrock invocation failed: {}",
                e
            ),
        }
        result
    }
}
