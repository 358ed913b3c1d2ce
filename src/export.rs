use std::fmt::Write as _;

use crate::error::Result;
use crate::models::{ExportFormat, QuestionKind, TutorialRecord};

const MAX_FILENAME_CHARS: usize = 100;

/// Rendered export ready to be sent as an attachment
#[derive(Debug)]
pub struct ExportedDocument {
    pub content: String,
    pub content_type: &'static str,
    pub filename: String,
}

pub fn export(tutorial: &TutorialRecord, format: ExportFormat) -> Result<ExportedDocument> {
    let stem = sanitize_filename(&tutorial.title);
    let doc = match format {
        ExportFormat::Markdown => ExportedDocument {
            content: to_markdown(tutorial),
            content_type: "text/markdown; charset=utf-8",
            filename: format!("{stem}.md"),
        },
        ExportFormat::Json => ExportedDocument {
            content: serde_json::to_string_pretty(tutorial)?,
            content_type: "application/json",
            filename: format!("{stem}.json"),
        },
        ExportFormat::Checklist => ExportedDocument {
            content: to_checklist(tutorial),
            content_type: "text/plain; charset=utf-8",
            filename: format!("{stem}_checklist.txt"),
        },
    };
    Ok(doc)
}

/// Replace characters that are unsafe in filenames and cap the length
pub fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_whitespace() || c.is_control() || !c.is_ascii() => '_',
            c => c,
        })
        .take(MAX_FILENAME_CHARS)
        .collect();
    if cleaned.is_empty() {
        "tutorial".to_string()
    } else {
        cleaned
    }
}

pub fn to_markdown(tutorial: &TutorialRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", tutorial.title);
    let _ = writeln!(out, "**Difficulty:** {}\n", tutorial.difficulty_level);

    let _ = writeln!(out, "## Summary\n\n{}\n", tutorial.summary);

    if !tutorial.key_topics.is_empty() {
        let _ = writeln!(out, "## Key Topics\n");
        for topic in &tutorial.key_topics {
            let _ = writeln!(out, "- {topic}");
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## Action Steps\n");
    for (i, step) in tutorial.action_steps.iter().enumerate() {
        let _ = writeln!(out, "- [ ] {}. {}", i + 1, step);
    }
    out.push('\n');

    if !tutorial.practice_questions.is_empty() {
        let _ = writeln!(out, "## Practice Questions\n");
        for q in &tutorial.practice_questions {
            let _ = writeln!(
                out,
                "### Question {} ({}, {})\n\n{}\n",
                q.id,
                q.topic,
                q.difficulty.as_str(),
                q.prompt
            );
            if q.kind == QuestionKind::MultipleChoice {
                for (i, option) in q.options.iter().enumerate() {
                    let letter = (b'A' + (i as u8 % 26)) as char;
                    let _ = writeln!(out, "{letter}. {option}");
                }
                out.push('\n');
            }
            let label = match q.kind {
                QuestionKind::ShortAnswer => "Sample answer",
                _ => "Answer",
            };
            let _ = writeln!(out, "**{label}:** {}\n", q.correct_answer);
            if !q.explanation.is_empty() {
                let _ = writeln!(out, "**Explanation:** {}\n", q.explanation);
            }
        }
    }

    if let Some(url) = &tutorial.source_url {
        let _ = writeln!(out, "---\nSource: {url}");
    }
    out
}

pub fn to_checklist(tutorial: &TutorialRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", tutorial.title);
    let _ = writeln!(out, "{}\n", "=".repeat(tutorial.title.chars().count()));
    for step in &tutorial.action_steps {
        let _ = writeln!(out, "[ ] {step}");
    }
    out
}
