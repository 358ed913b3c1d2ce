use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::sync::{Arc, LazyLock};

use crate::config::TutorialConfig;
use crate::error::{Result, TutorError};
use crate::models::{Difficulty, Language, Question, QuestionKind, TutorialRecord};
use crate::transport::LlmClient;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*").expect("static fence pattern"));

/// Turns a transcript into a structured tutorial with one model call
pub struct TutorialProcessor {
    llm: Arc<dyn LlmClient>,
    cfg: TutorialConfig,
}

impl TutorialProcessor {
    pub fn new(llm: Arc<dyn LlmClient>, cfg: TutorialConfig) -> Self {
        Self { llm, cfg }
    }

    pub async fn process(
        &self,
        transcript: &str,
        source_url: Option<&str>,
        language: Language,
    ) -> Result<TutorialRecord> {
        if transcript.trim().is_empty() {
            return Err(TutorError::Validation("Transcript must not be empty".to_string()));
        }
        tracing::info!(
            transcript_chars = transcript.len(),
            language = language.as_str(),
            "Processing tutorial transcript"
        );

        let prompt = self.build_prompt(transcript, source_url, language);
        let response = self.llm.invoke(&prompt, self.cfg.max_tokens).await?;

        let mut record = parse_tutorial(&response, &self.cfg).inspect_err(|e| {
            let preview: String = response.chars().take(300).collect();
            tracing::warn!("{} - response starts with: {}", e, preview);
        })?;
        record.original_transcript = transcript.to_string();
        record.source_url = source_url.map(str::to_string);
        record.target_language = language;

        tracing::info!(
            steps = record.action_steps.len(),
            questions = record.practice_questions.len(),
            "Tutorial processed"
        );
        Ok(record)
    }

    fn build_prompt(&self, transcript: &str, source_url: Option<&str>, language: Language) -> String {
        let source = source_url
            .map(|url| format!("SOURCE VIDEO: {url}\n\n"))
            .unwrap_or_default();
        let lang = language.as_str();
        let (min_q, max_q) = (self.cfg.min_questions, self.cfg.max_questions);

        format!(
            r#"You are an expert tutorial analyzer and educator. Process this tutorial transcript into a structured learning plan.

{source}TRANSCRIPT:
{transcript}

INSTRUCTIONS:
1. Infer a short title and write a 2-4 sentence summary of what the tutorial teaches
2. Extract the concrete actions a learner should take, in order, as short imperative steps
3. Create between {min_q} and {max_q} practice questions about the SPECIFIC content of the transcript
4. Mix question types: "multiple_choice", "true_false" and "short_answer"
5. For multiple_choice, provide 4 options and make correct_answer exactly equal to one of them
6. For true_false, correct_answer must be "True" or "False"
7. Tag every question with a topic from the transcript and a difficulty of "easy", "medium" or "hard"
8. Write all text in {lang}, keeping technical terms intact

Respond with ONLY a JSON object in this exact format, no markdown and no extra text:
{{
    "title": "Tutorial title",
    "summary": "What the tutorial covers",
    "key_topics": ["topic1", "topic2"],
    "difficulty_level": "Beginner/Intermediate/Advanced",
    "action_steps": ["First step", "Second step"],
    "practice_questions": [
        {{
            "question": "Based on the transcript, what is ...?",
            "question_type": "multiple_choice",
            "options": ["Option A", "Option B", "Option C", "Option D"],
            "correct_answer": "Option A",
            "explanation": "The transcript says ...",
            "difficulty": "easy",
            "topic": "Specific topic"
        }}
    ]
}}
"#
        )
    }
}

/// Action steps arrive either as plain strings or as `{title, description}` objects
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawStep {
    Text(String),
    Detailed {
        #[serde(default)]
        title: String,
        #[serde(default)]
        description: String,
    },
}

impl RawStep {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Detailed { title, description } => {
                match (title.trim(), description.trim()) {
                    ("", desc) => desc.to_string(),
                    (title, "") => title.to_string(),
                    (title, desc) => format!("{title}: {desc}"),
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(alias = "prompt", default, deserialize_with = "deserialize_text")]
    question: String,
    #[serde(alias = "kind", alias = "type", default, deserialize_with = "deserialize_text")]
    question_type: String,
    #[serde(default, deserialize_with = "deserialize_list")]
    options: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    correct_answer: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    explanation: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    topic: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    difficulty: String,
}

/// Questions stay as raw values so one unreadable item only drops itself
#[derive(Debug, Deserialize)]
struct RawTutorial {
    #[serde(default, deserialize_with = "deserialize_text")]
    title: String,
    #[serde(alias = "short_summary", deserialize_with = "deserialize_text")]
    summary: String,
    #[serde(default, deserialize_with = "deserialize_list")]
    key_topics: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    difficulty_level: String,
    action_steps: Vec<RawStep>,
    #[serde(alias = "questions")]
    practice_questions: Vec<serde_json::Value>,
}

/// Scalar-ish model output, e.g. `"correct_answer": true` or `"options": [3, 4]`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlexibleText {
    Text(String),
    Bool(bool),
    Number(serde_json::Number),
    List(Vec<FlexibleText>),
}

impl FlexibleText {
    fn into_text(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::Number(n) => n.to_string(),
            Self::List(items) => items
                .into_iter()
                .map(|item| format!("• {}", item.into_text()))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// `null` reads as an empty string
fn deserialize_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<FlexibleText>::deserialize(deserializer)?
        .map(FlexibleText::into_text)
        .unwrap_or_default())
}

/// `null` reads as an empty list; scalar entries are stringified
fn deserialize_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<FlexibleText>>::deserialize(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .map(FlexibleText::into_text)
        .collect())
}

/// Strip code fences and control characters, then cut to the outermost braces
fn extract_json_object(response: &str) -> Option<String> {
    let without_fences = CODE_FENCE.replace_all(response, "");
    let cleaned: String = without_fences
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect();
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    (end > start).then(|| cleaned[start..=end].to_string())
}

/// Match a multiple-choice answer to its option text, by value or by letter
fn resolve_choice(answer: &str, options: &[String]) -> Option<String> {
    let wanted = answer.trim();
    if let Some(option) = options
        .iter()
        .find(|opt| opt.trim().eq_ignore_ascii_case(wanted))
    {
        return Some(option.clone());
    }

    let letter = wanted
        .trim_end_matches(['.', ')', ':'])
        .trim()
        .to_ascii_uppercase();
    if letter.len() == 1 {
        let idx = letter.as_bytes()[0].checked_sub(b'A')? as usize;
        return options.get(idx).cloned();
    }
    None
}

fn normalize_question(raw: RawQuestion) -> Option<Question> {
    let prompt = raw.question.trim().to_string();
    if prompt.is_empty() {
        tracing::debug!("Dropping question with empty prompt");
        return None;
    }
    let Some(kind) = QuestionKind::parse(&raw.question_type) else {
        tracing::debug!("Dropping question with unknown type '{}'", raw.question_type);
        return None;
    };

    let (options, correct_answer) = match kind {
        QuestionKind::MultipleChoice => {
            let options: Vec<String> = raw
                .options
                .into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
            let Some(answer) = resolve_choice(&raw.correct_answer, &options) else {
                tracing::debug!(
                    "Dropping multiple choice question whose answer '{}' is not an option",
                    raw.correct_answer
                );
                return None;
            };
            (options, answer)
        }
        QuestionKind::TrueFalse => {
            let answer = match raw.correct_answer.trim().to_lowercase().as_str() {
                "true" | "t" | "yes" => "True",
                "false" | "f" | "no" => "False",
                other => {
                    tracing::debug!("Dropping true/false question with answer '{}'", other);
                    return None;
                }
            };
            (Vec::new(), answer.to_string())
        }
        QuestionKind::ShortAnswer => (Vec::new(), raw.correct_answer.trim().to_string()),
    };

    let topic = match raw.topic.trim() {
        "" => "General".to_string(),
        topic => topic.to_string(),
    };

    Some(Question {
        id: 0,
        prompt,
        kind,
        options,
        correct_answer,
        explanation: raw.explanation.trim().to_string(),
        topic,
        difficulty: Difficulty::parse(&raw.difficulty),
    })
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    match value.trim() {
        "" => fallback.to_string(),
        v => v.to_string(),
    }
}

/// Parse a model response into a tutorial record, enforcing the question bounds
pub fn parse_tutorial(response: &str, cfg: &TutorialConfig) -> Result<TutorialRecord> {
    let json = extract_json_object(response).ok_or_else(|| {
        TutorError::MalformedModelOutput("No JSON object found in model response".to_string())
    })?;
    let raw: RawTutorial = serde_json::from_str(&json)
        .map_err(|e| TutorError::MalformedModelOutput(format!("Invalid tutorial JSON: {e}")))?;

    let action_steps: Vec<String> = raw
        .action_steps
        .into_iter()
        .map(RawStep::into_text)
        .filter(|step| !step.is_empty())
        .collect();

    let offered = raw.practice_questions.len();
    let mut practice_questions: Vec<Question> = raw
        .practice_questions
        .into_iter()
        .filter_map(|value| {
            serde_json::from_value::<RawQuestion>(value)
                .inspect_err(|e| tracing::debug!("Dropping unreadable question: {}", e))
                .ok()
        })
        .filter_map(normalize_question)
        .collect();
    if practice_questions.len() < offered {
        tracing::warn!(
            "Discarded {} of {} practice questions that failed validation",
            offered - practice_questions.len(),
            offered
        );
    }
    if practice_questions.len() < cfg.min_questions {
        return Err(TutorError::MalformedModelOutput(format!(
            "Expected at least {} valid practice questions, got {}",
            cfg.min_questions,
            practice_questions.len()
        )));
    }
    practice_questions.truncate(cfg.max_questions);
    for (i, question) in practice_questions.iter_mut().enumerate() {
        question.id = i as u32 + 1;
    }

    Ok(TutorialRecord {
        title: non_empty_or(&raw.title, "Tutorial"),
        summary: raw.summary.trim().to_string(),
        key_topics: raw
            .key_topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        difficulty_level: non_empty_or(&raw.difficulty_level, "Intermediate"),
        action_steps,
        practice_questions,
        original_transcript: String::new(),
        source_url: None,
        target_language: Language::default(),
        processing_time_secs: 0.0,
    })
}
