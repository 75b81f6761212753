use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chapters::{
    detect_video_type, extract_key_points, extract_speakers, generate_fallback_proposals,
    parse_chapter_proposals, validate_proposals, ChapterProposal,
};
use crate::llm::Completion;

/// Everything extracted from one summary completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary_markdown: String,
    pub chapters: Vec<ChapterProposal>,
    pub video_type: String,
    pub speakers: Vec<String>,
    pub key_points: Vec<String>,
}

/// Built-in summary prompt used when no template file is configured.
pub const DEFAULT_SUMMARY_PROMPT: &str = "\
Analyze the following video transcript and produce a markdown summary.

Include these sections:

1. A short overview paragraph.
2. A chapter navigation table with rows in the form `| MM:SS - MM:SS | Title | one-line summary |`.
3. A `- **Speakers**: name, name` line identifying who appears.
4. A `### 💡 TL;DR` section with 3-5 bullet points.

Transcript:

$ARGUMENTS";

/// Substitute the transcript into a prompt template.
///
/// Templates may carry an `$ARGUMENTS` placeholder; when it is absent the
/// transcript is appended after a separator.
pub fn render_prompt(template: &str, transcript: &str) -> String {
    if template.contains("$ARGUMENTS") {
        template.replace("$ARGUMENTS", transcript)
    } else {
        format!("{}\n\n---\n\n{}", template, transcript)
    }
}

/// Run one summary completion over the transcript and parse its structure.
///
/// An empty completion is an error. A summary with no recognizable chapters
/// is not: interval-based fallback chapters are substituted with a warning.
pub async fn analyze(
    completion: &dyn Completion,
    prompt_template: &str,
    transcript: &str,
    total_duration_sec: f64,
    fallback_interval_sec: u64,
) -> Result<AnalysisResult> {
    let prompt = render_prompt(prompt_template, transcript);
    debug!(
        "Requesting summary for {} chars of transcript",
        transcript.len()
    );

    let summary = completion.complete(&prompt).await?;
    if summary.trim().is_empty() {
        return Err(anyhow!("Completion returned an empty summary"));
    }

    let mut chapters = parse_chapter_proposals(&summary);
    if chapters.is_empty() {
        warn!("Summary contained no usable chapters, using interval fallback");
        chapters = generate_fallback_proposals(total_duration_sec, fallback_interval_sec);
    }
    for issue in validate_proposals(&chapters) {
        warn!("Chapter proposal issue: {}", issue);
    }

    let video_type = detect_video_type(&summary).to_string();
    let speakers = extract_speakers(&summary);
    let key_points = extract_key_points(&summary);
    info!(
        "Analysis parsed {} chapters, type '{}', {} speakers",
        chapters.len(),
        video_type,
        speakers.len()
    );

    Ok(AnalysisResult {
        summary_markdown: summary,
        chapters,
        video_type,
        speakers,
        key_points,
    })
}

/// Issue list for a parsed analysis; empty means it looks usable.
pub fn validate_analysis(result: &AnalysisResult) -> Vec<String> {
    let mut issues = Vec::new();

    if result.summary_markdown.trim().is_empty() {
        issues.push("Summary is empty".to_string());
    } else if result.summary_markdown.len() > 50_000 {
        issues.push("Summary is too long".to_string());
    }

    if result.chapters.is_empty() {
        issues.push("No chapters found".to_string());
    }
    for (i, pair) in result.chapters.windows(2).enumerate() {
        if pair[1].start_sec < pair[0].start_sec {
            issues.push(format!("Chapters out of order at index {}", i + 1));
        }
    }

    issues
}
