use std::fmt::Write as _;
use std::sync::Arc;

use crate::config::ChatConfig;
use crate::error::{Result, TutorError};
use crate::models::{ChatMessage, ChatRole, TutorialRecord};
use crate::transport::LlmClient;

/// Answers follow-up questions grounded in a tutorial. Holds no session state.
pub struct ChatHandler {
    llm: Arc<dyn LlmClient>,
    cfg: ChatConfig,
}

impl ChatHandler {
    pub fn new(llm: Arc<dyn LlmClient>, cfg: ChatConfig) -> Self {
        Self { llm, cfg }
    }

    /// Returns the assistant reply; the caller appends it to its session
    pub async fn reply(
        &self,
        tutorial: &TutorialRecord,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<ChatMessage> {
        let message = message.trim();
        if message.is_empty() {
            return Err(TutorError::Validation("Message must not be empty".to_string()));
        }
        tracing::info!(
            history_len = history.len(),
            "Answering chat message about '{}'",
            tutorial.title
        );

        let prompt = self.build_prompt(tutorial, history, message);
        let reply = self.llm.invoke(&prompt, self.cfg.max_tokens).await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(TutorError::UpstreamUnavailable(
                "Model returned an empty reply".to_string(),
            ));
        }
        Ok(ChatMessage::assistant(reply))
    }

    fn build_prompt(&self, tutorial: &TutorialRecord, history: &[ChatMessage], message: &str) -> String {
        let mut steps = String::new();
        for (i, step) in tutorial.action_steps.iter().enumerate() {
            let _ = writeln!(steps, "{}. {}", i + 1, step);
        }

        let transcript = truncate_chars(&tutorial.original_transcript, self.cfg.max_transcript_chars);
        let transcript = if transcript.trim().is_empty() {
            "Transcript not available"
        } else {
            transcript
        };

        let window_start = history.len().saturating_sub(self.cfg.history_window);
        let mut conversation = String::new();
        for msg in &history[window_start..] {
            let speaker = match msg.role {
                ChatRole::User => "User",
                ChatRole::Assistant => "Assistant",
            };
            let _ = writeln!(conversation, "{speaker}: {}", msg.text.trim());
        }
        if conversation.is_empty() {
            conversation.push_str("(no earlier messages)\n");
        }

        format!(
            r#"You are a helpful AI tutor assistant. The user has been studying the tutorial below. Answer their question based on the tutorial content.

TUTORIAL INFORMATION:
Title: {title}
Summary: {summary}
Key Topics: {topics}

ORIGINAL TRANSCRIPT:
{transcript}

ACTION STEPS:
{steps}
CONVERSATION SO FAR:
{conversation}
USER QUESTION: {message}

INSTRUCTIONS:
1. Answer based ONLY on the tutorial content provided above
2. If the question is about something the tutorial does not cover, say so and offer help with what it does cover
3. Refer to the relevant action steps or parts of the transcript when explaining
4. Keep the answer concise: at most 2-3 short paragraphs
5. If the question repeats an earlier one, offer a different angle or additional detail
6. Respond in {language}
"#,
            title = tutorial.title,
            summary = tutorial.summary,
            topics = tutorial.key_topics.join(", "),
            language = tutorial.target_language.as_str(),
        )
    }
}

/// Longest prefix of at most `max` characters, cut on a char boundary
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
