use serde::{Deserialize, Serialize};

/// Language the model is asked to write the tutorial in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Spanish,
    French,
    German,
    Hindi,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Spanish => "spanish",
            Self::French => "french",
            Self::German => "german",
            Self::Hindi => "hindi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl QuestionKind {
    /// Lenient parse of model-supplied labels such as "Multiple Choice" or "true-false"
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase().replace(['-', ' ', '/'], "_");
        match normalized.as_str() {
            "multiple_choice" | "multiplechoice" | "mcq" => Some(Self::MultipleChoice),
            "true_false" | "truefalse" | "boolean" => Some(Self::TrueFalse),
            "short_answer" | "shortanswer" | "open_ended" => Some(Self::ShortAnswer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "easy" | "beginner" => Self::Easy,
            "hard" | "advanced" => Self::Hard,
            _ => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

/// A single practice question. `options` is empty unless `kind` is multiple choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub prompt: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
}

fn default_topic() -> String {
    "General".to_string()
}

fn default_title() -> String {
    "Tutorial".to_string()
}

fn default_difficulty_level() -> String {
    "Intermediate".to_string()
}

/// Structured tutorial derived from a transcript. Lives only in the caller's session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorialRecord {
    #[serde(default = "default_title")]
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub key_topics: Vec<String>,
    #[serde(default = "default_difficulty_level")]
    pub difficulty_level: String,
    pub action_steps: Vec<String>,
    #[serde(default)]
    pub practice_questions: Vec<Question>,
    #[serde(default)]
    pub original_transcript: String,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub target_language: Language,
    #[serde(default)]
    pub processing_time_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

/// Conversation so far, owned by the caller and passed in on every chat request
pub type ChatSession = Vec<ChatMessage>;

// ---- API request / response bodies ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptSourceKind {
    Url,
    Transcript,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessTutorialRequest {
    pub source: TranscriptSourceKind,
    pub content: String,
    #[serde(default)]
    pub target_language: Language,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub tutorial: TutorialRecord,
    #[serde(default)]
    pub history: ChatSession,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub api_status: String,
    pub bedrock_status: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Markdown,
    Json,
    Checklist,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    pub tutorial: TutorialRecord,
    #[serde(default)]
    pub format: ExportFormat,
}

// ---- Bedrock InvokeModel wire format (Anthropic messages) ----

#[derive(Debug, Serialize)]
pub struct InvokeRequest<'a> {
    pub anthropic_version: &'a str,
    pub max_tokens: u32,
    pub messages: Vec<InvokeMessage<'a>>,
}

#[derive(Debug, Serialize)]
pub struct InvokeMessage<'a> {
    pub role: &'a str,
    pub content: Vec<InvokeContent<'a>>,
}

#[derive(Debug, Serialize)]
pub struct InvokeContent<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub text: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct InvokeResponse {
    pub content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

impl InvokeResponse {
    /// Joined text blocks, or None when the model produced no text
    pub fn text(self) -> Option<String> {
        let text = self
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text),
                ResponseBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        if text.trim().is_empty() { None } else { Some(text) }
    }
}
