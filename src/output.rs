use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use regex::Regex;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::fetcher::VideoInfo;
use crate::timecode::format_timestamp;
use crate::translate::{FailedChapter, TranslatedChapter};

/// Assemble the composite markdown document for one video.
///
/// Layout: title, video information block, summary, translation section
/// with one dialect-2 chapter block per translated chapter, a processing
/// log when chapters failed, and a generation footer. The translation
/// heading and footer also serve as the reconciler's section delimiters.
pub fn generate_markdown(
    info: &VideoInfo,
    summary: &str,
    translated: &[TranslatedChapter],
    failed: &[FailedChapter],
) -> String {
    let now = Local::now();
    let mut lines: Vec<String> = vec![
        format!("# {}", info.title),
        String::new(),
        "## 📹 Video Information".to_string(),
        String::new(),
        format!("- **Channel**: {}", info.channel),
        format!("- **Upload date**: {}", format_upload_date(&info.upload_date)),
    ];
    if let Some(duration) = info.duration_sec {
        lines.push(format!("- **Duration**: {}", format_timestamp(duration)));
    }
    lines.push(format!("- **Source**: [{}]({})", info.url, info.url));
    lines.push(format!("- **Processed**: {}", now.format("%Y-%m-%d %H:%M:%S")));
    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(String::new());
    lines.push(summary.trim().to_string());
    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(String::new());
    lines.push("## 📝 Full Translation".to_string());
    lines.push(String::new());

    if translated.is_empty() {
        warn!("No translated chapters for '{}'", info.title);
        lines.push("*No chapters were translated.*".to_string());
        lines.push(String::new());
    } else {
        for chapter in translated {
            lines.push(chapter.to_markdown());
            lines.push(String::new());
        }
    }

    if !failed.is_empty() {
        lines.push("---".to_string());
        lines.push(String::new());
        lines.push("## ⚠️ Processing Log".to_string());
        lines.push(String::new());
        lines.push(format!("- Failed chapters: {}", failed.len()));
        for chapter in failed {
            lines.push(format!(
                "  - Chapter {}: {} - {}",
                chapter.index + 1,
                chapter.title,
                chapter.error
            ));
        }
        lines.push(String::new());
    }

    lines.push("---".to_string());
    lines.push(String::new());
    lines.push(format!(
        "*Generated by yt-digest - {}*",
        now.format("%Y-%m-%d %H:%M:%S")
    ));

    lines.join("\n")
}

/// Strip path-hostile characters, collapse whitespace to underscores and
/// truncate to `max_length` characters. Falls back to "video" when nothing
/// survives.
pub fn sanitize_filename(title: &str, max_length: usize) -> String {
    let forbidden = Regex::new(r#"[<>:"/\\|?*“”‘’`']"#).unwrap();
    let cleaned = forbidden.replace_all(title.trim(), "");
    let whitespace = Regex::new(r"\s+").unwrap();
    let underscored = whitespace.replace_all(&cleaned, "_");

    let truncated: String = underscored.chars().take(max_length).collect();
    if truncated.is_empty() {
        "video".to_string()
    } else {
        truncated
    }
}

/// Issue list for a generated document; empty means it looks complete.
pub fn validate_document(doc: &str) -> Vec<String> {
    let mut issues = Vec::new();

    if doc.trim().is_empty() {
        issues.push("Document is empty".to_string());
        return issues;
    }

    if !Regex::new(r"(?m)^# .+").unwrap().is_match(doc) {
        issues.push("Missing document title".to_string());
    }
    if !doc.contains("## 📹 Video Information") {
        issues.push("Missing video information section".to_string());
    }
    if !doc.contains("## 📝 Full Translation") {
        issues.push("Missing translation section".to_string());
    }
    if doc.len() < 200 {
        issues.push("Document suspiciously short".to_string());
    }

    issues
}

/// Word count where each CJK character counts as one word.
pub fn word_count(text: &str) -> usize {
    let cjk = Regex::new(r"[\x{4e00}-\x{9fff}]").unwrap();
    let latin_words = Regex::new(r"[a-zA-Z]+").unwrap();
    cjk.find_iter(text).count() + latin_words.find_iter(text).count()
}

/// Write the document under `<output_dir>/<channel>/<title>.md`, appending
/// a timestamp suffix when the name is already taken.
pub async fn save_document(
    doc: &str,
    title: &str,
    channel: &str,
    output_dir: &Path,
    max_filename_length: usize,
) -> Result<PathBuf> {
    let dir = output_dir.join(sanitize_filename(channel, max_filename_length));
    fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let stem = sanitize_filename(title, max_filename_length);
    let mut path = dir.join(format!("{}.md", stem));
    if fs::metadata(&path).await.is_ok() {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        path = dir.join(format!("{}_{}.md", stem, stamp));
        debug!("Output name taken, using {}", path.display());
    }

    fs::write(&path, doc)
        .await
        .with_context(|| format!("Failed to write document {}", path.display()))?;
    info!("💾 Saved document: {}", path.display());
    Ok(path)
}

/// Write the cleaned transcript under `<output_dir>/clean/<channel>/`.
pub async fn save_clean_transcript(
    transcript: &str,
    title: &str,
    channel: &str,
    output_dir: &Path,
    max_filename_length: usize,
) -> Result<PathBuf> {
    let dir = output_dir
        .join("clean")
        .join(sanitize_filename(channel, max_filename_length));
    fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create transcript directory {}", dir.display()))?;

    let path = dir.join(format!(
        "{}.txt",
        sanitize_filename(title, max_filename_length)
    ));
    fs::write(&path, transcript)
        .await
        .with_context(|| format!("Failed to write transcript {}", path.display()))?;
    debug!("Saved clean transcript: {}", path.display());
    Ok(path)
}

fn format_upload_date(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw, "%Y%m%d") {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_info() -> VideoInfo {
        VideoInfo {
            video_id: "dQw4w9WgXcQ".to_string(),
            title: "Launch Interview".to_string(),
            channel: "Test Channel".to_string(),
            upload_date: "20260815".to_string(),
            url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            duration_sec: Some(1500.0),
        }
    }

    fn sample_translated() -> Vec<TranslatedChapter> {
        vec![TranslatedChapter {
            time_range: "00:00 - 05:00".to_string(),
            title: "Intro".to_string(),
            content: "Translated intro.".to_string(),
        }]
    }

    #[test]
    fn test_generate_markdown_layout() {
        let failed = vec![FailedChapter {
            index: 1,
            title: "Main".to_string(),
            time_range: "05:00 - End".to_string(),
            error: "No text found".to_string(),
        }];

        let doc = generate_markdown(
            &video_info(),
            "## Summary\n\n| 00:00 - 05:00 | Intro | opening |",
            &sample_translated(),
            &failed,
        );

        assert!(doc.starts_with("# Launch Interview"));
        assert!(doc.contains("## 📹 Video Information"));
        assert!(doc.contains("- **Upload date**: 2026-08-15"));
        assert!(doc.contains("- **Duration**: 25:00"));
        assert!(doc.contains("## 📝 Full Translation"));
        assert!(doc.contains("### (00:00 - 05:00) Intro"));
        assert!(doc.contains("## ⚠️ Processing Log"));
        assert!(doc.contains("- Failed chapters: 1"));
        assert!(doc.contains("  - Chapter 2: Main - No text found"));
        assert!(doc.contains("*Generated by yt-digest - "));
        assert!(validate_document(&doc).is_empty());
    }

    #[test]
    fn test_generate_markdown_without_translations() {
        let doc = generate_markdown(&video_info(), "Summary.", &[], &[]);
        assert!(doc.contains("*No chapters were translated.*"));
        assert!(!doc.contains("## ⚠️ Processing Log"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My: Video / Test?", 50), "My_Video_Test");
        assert_eq!(sanitize_filename("  spaced   out  ", 50), "spaced_out");
        assert_eq!(sanitize_filename("????", 50), "video");
        assert_eq!(sanitize_filename("abcdefghij", 5), "abcde");
        assert_eq!(sanitize_filename("日本語のタイトル", 4), "日本語の");
    }

    #[test]
    fn test_validate_document() {
        assert_eq!(validate_document(""), vec!["Document is empty"]);

        let issues = validate_document("# Title only");
        assert!(issues.iter().any(|i| i.contains("video information")));
        assert!(issues.iter().any(|i| i.contains("translation section")));
    }

    #[test]
    fn test_word_count_mixed_scripts() {
        assert_eq!(word_count("Hello world"), 2);
        assert_eq!(word_count("你好世界"), 4);
        assert_eq!(word_count("Hello 你好 world 世界"), 6);
        assert_eq!(word_count("123 456"), 0);
    }

    #[tokio::test]
    async fn test_save_document_avoids_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let first = save_document("doc one", "Title", "Channel", dir.path(), 50)
            .await
            .unwrap();
        let second = save_document("doc two", "Title", "Channel", dir.path(), 50)
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(tokio::fs::read_to_string(&first).await.unwrap(), "doc one");
        assert_eq!(tokio::fs::read_to_string(&second).await.unwrap(), "doc two");
        assert!(first.starts_with(dir.path().join("Channel")));
    }

    #[tokio::test]
    async fn test_save_clean_transcript_layout() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = save_clean_transcript("(00:00) text", "My Title", "Chan", dir.path(), 50)
            .await
            .unwrap();

        assert!(path.ends_with("clean/Chan/My_Title.txt"));
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            "(00:00) text"
        );
    }
}
