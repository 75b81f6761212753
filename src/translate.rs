use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chapters::ChapterSegment;
use crate::llm::Completion;
use crate::subtitles::get_last_lines;

/// One successfully translated chapter, ready for document assembly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatedChapter {
    pub time_range: String,
    pub title: String,
    pub content: String,
}

impl TranslatedChapter {
    /// Render as a dialect-2 chapter block for the translation section.
    pub fn to_markdown(&self) -> String {
        format!("### ({}) {}\n\n{}", self.time_range, self.title, self.content)
    }
}

/// A chapter that exhausted its retries or had nothing to translate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedChapter {
    pub index: usize,
    pub title: String,
    pub time_range: String,
    pub error: String,
}

/// Result of translating every chapter of one video
#[derive(Debug, Clone, Default)]
pub struct TranslationOutcome {
    pub translated: Vec<TranslatedChapter>,
    pub failed: Vec<FailedChapter>,
}

/// Translator tuning knobs, carried from config
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    /// Lines of rolling context threaded between chapters
    pub context_lines: usize,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base delay, doubled per attempt
    pub retry_delay_sec: u64,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            context_lines: 5,
            max_retries: 2,
            retry_delay_sec: 5,
        }
    }
}

/// Built-in translation prompt used when no template file is configured.
pub const DEFAULT_TRANSLATE_PROMPT: &str = "\
You are translating one chapter of a {{VIDEO_TYPE}} video featuring {{SPEAKERS}}.

Chapter: {{CHAPTER_TITLE}} ({{TIME_RANGE}})

For continuity, the previous chapter ended with:

Original:
{{PREVIOUS_ORIGINAL}}

Translation:
{{PREVIOUS_TRANSLATION}}

Translate the following segment faithfully, keeping paragraph breaks:

{{SEGMENT_TEXT}}";

const FIRST_SEGMENT_CONTEXT: &str = "(First segment)";
const NO_SPEAKERS: &str = "(no speakers identified)";

/// Translate each chapter segment in order, threading rolling context.
///
/// Failures never abort the run: a chapter that stays empty after retries is
/// recorded in `failed` and the loop moves on, so one bad chapter cannot sink
/// the whole document.
pub async fn translate_chapters(
    completion: &dyn Completion,
    prompt_template: &str,
    segments: &[ChapterSegment],
    video_type: &str,
    speakers: &[String],
    options: &TranslateOptions,
) -> TranslationOutcome {
    let speaker_list = if speakers.is_empty() {
        NO_SPEAKERS.to_string()
    } else {
        speakers.join(", ")
    };

    let mut outcome = TranslationOutcome::default();
    let mut previous_original = FIRST_SEGMENT_CONTEXT.to_string();
    let mut previous_translation = FIRST_SEGMENT_CONTEXT.to_string();

    for segment in segments {
        if segment.text.trim().is_empty() {
            warn!("No text for chapter {}: {}", segment.index, segment.title);
            outcome.failed.push(FailedChapter {
                index: segment.index,
                title: segment.title.clone(),
                time_range: segment.time_range.clone(),
                error: "No text found".to_string(),
            });
            continue;
        }

        let prompt = render_template(
            prompt_template,
            segment,
            video_type,
            &speaker_list,
            &previous_original,
            &previous_translation,
        );
        debug!(
            "Translating chapter {} ({}, {} chars)",
            segment.index,
            segment.time_range,
            segment.text.len()
        );

        match complete_with_retries(completion, &prompt, segment, options).await {
            Ok(translated_text) => {
                for issue in validate_translation(&segment.text, &translated_text) {
                    warn!("Chapter {} translation issue: {}", segment.index, issue);
                }

                previous_original = get_last_lines(&segment.text, options.context_lines);
                previous_translation = get_last_lines(&translated_text, options.context_lines);
                outcome.translated.push(TranslatedChapter {
                    time_range: segment.time_range.clone(),
                    title: segment.title.clone(),
                    content: translated_text,
                });
            }
            Err(error) => {
                warn!(
                    "Chapter {} failed after {} attempts: {}",
                    segment.index,
                    options.max_retries + 1,
                    error
                );
                outcome.failed.push(FailedChapter {
                    index: segment.index,
                    title: segment.title.clone(),
                    time_range: segment.time_range.clone(),
                    error,
                });
            }
        }
    }

    info!(
        "Translation complete: {}/{} successful",
        outcome.translated.len(),
        segments.len()
    );
    outcome
}

async fn complete_with_retries(
    completion: &dyn Completion,
    prompt: &str,
    segment: &ChapterSegment,
    options: &TranslateOptions,
) -> Result<String, String> {
    let mut last_error = String::new();

    for attempt in 0..=options.max_retries {
        match completion.complete(prompt).await {
            Ok(text) if !text.trim().is_empty() => return Ok(text),
            Ok(_) => last_error = "Completion returned an empty translation".to_string(),
            Err(error) => last_error = error.to_string(),
        }

        if attempt < options.max_retries {
            let delay = options.retry_delay_sec * 2u64.pow(attempt);
            warn!(
                "Translation attempt {} failed for '{}', retrying in {}s",
                attempt + 1,
                segment.title,
                delay
            );
            tokio::time::sleep(Duration::from_secs(delay)).await;
        }
    }

    Err(last_error)
}

fn render_template(
    template: &str,
    segment: &ChapterSegment,
    video_type: &str,
    speakers: &str,
    previous_original: &str,
    previous_translation: &str,
) -> String {
    template
        .replace("{{VIDEO_TYPE}}", video_type)
        .replace("{{SPEAKERS}}", speakers)
        .replace("{{CHAPTER_TITLE}}", &segment.title)
        .replace("{{TIME_RANGE}}", &segment.time_range)
        .replace("{{SEGMENT_TEXT}}", &segment.text)
        .replace("{{PREVIOUS_ORIGINAL}}", previous_original)
        .replace("{{PREVIOUS_TRANSLATION}}", previous_translation)
}

/// Advisory checks comparing a translation against its source.
///
/// Length ratios are measured in characters so CJK output is not penalized.
pub fn validate_translation(original: &str, translated: &str) -> Vec<String> {
    let mut issues = Vec::new();

    if translated.trim().is_empty() {
        issues.push("Translation is empty".to_string());
        return issues;
    }

    let original_len = original.chars().count().max(1);
    let translated_len = translated.chars().count();
    let ratio = translated_len as f64 / original_len as f64;
    if ratio < 0.3 {
        issues.push(format!("Translation suspiciously short (ratio {:.2})", ratio));
    } else if ratio > 3.0 {
        issues.push(format!("Translation suspiciously long (ratio {:.2})", ratio));
    }

    if translated.trim() == original.trim() {
        issues.push("Translation identical to original".to_string());
    }

    issues
}
