use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const YTDLP: &str = "yt-dlp";
/// How deep into a channel's upload list discovery looks
const PLAYLIST_SCAN_LIMIT: &str = "30";

/// Metadata for one video as reported by yt-dlp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    /// Raw date string, typically `YYYYMMDD`; may be empty
    pub upload_date: String,
    pub url: String,
    pub duration_sec: Option<f64>,
}

/// Pull the 11-character video id out of a watch URL, a short URL or a bare id.
pub fn extract_video_id(url: &str) -> Option<String> {
    if let Some((_, rest)) = url.split_once("v=") {
        let id = rest.split('&').next().unwrap_or("");
        if !id.is_empty() {
            return Some(id.to_string());
        }
    }
    if let Some((_, rest)) = url.split_once("youtu.be/") {
        let id = rest.split('?').next().unwrap_or("");
        if !id.is_empty() {
            return Some(id.to_string());
        }
    }

    let bare = Regex::new(r"^[a-zA-Z0-9_-]{11}$").unwrap();
    if bare.is_match(url) {
        return Some(url.to_string());
    }

    warn!("Could not extract video id from '{}'", url);
    None
}

pub fn video_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Whether an upload date falls within the lookback window.
///
/// Accepts the date formats yt-dlp and feeds produce; a date that cannot be
/// parsed keeps the video rather than silently dropping it.
pub fn is_recent(upload_date: &str, lookback_hours: u64, reference: DateTime<Utc>) -> bool {
    match parse_upload_date(upload_date) {
        Some(uploaded) => {
            let age = reference.signed_duration_since(uploaded);
            age <= chrono::Duration::hours(lookback_hours as i64)
        }
        None => {
            debug!("Unparseable upload date '{}', keeping video", upload_date);
            true
        }
    }
}

/// List a channel's recent uploads via flat-playlist JSON lines.
pub async fn list_recent_videos(channel_url: &str, lookback_hours: u64) -> Result<Vec<VideoInfo>> {
    let stdout = run_ytdlp(
        &[
            "--flat-playlist",
            "-j",
            "--no-warnings",
            "--playlist-end",
            PLAYLIST_SCAN_LIMIT,
            channel_url,
        ],
        120,
    )
    .await?;

    let now = Utc::now();
    let mut videos = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: serde_json::Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(error) => {
                warn!("Skipping malformed playlist entry: {}", error);
                continue;
            }
        };
        let video_id = match value.get("id").and_then(|v| v.as_str()) {
            Some(id) => id.to_string(),
            None => continue,
        };
        let url = value
            .get("url")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| video_url(&video_id));

        let info = video_info_from_json(&video_id, &url, &value);
        if is_recent(&info.upload_date, lookback_hours, now) {
            videos.push(info);
        }
    }

    debug!("{}: {} recent videos", channel_url, videos.len());
    Ok(videos)
}

/// Fetch full metadata for one video.
pub async fn fetch_video_info(video_id: &str) -> Result<VideoInfo> {
    let url = video_url(video_id);
    let stdout = run_ytdlp(&["--dump-json", "--no-warnings", "--quiet", &url], 60).await?;
    let value: serde_json::Value =
        serde_json::from_str(stdout.trim()).context("yt-dlp returned invalid JSON metadata")?;
    Ok(video_info_from_json(video_id, &url, &value))
}

/// Download the video's subtitles converted to SRT and return the raw text.
///
/// Prefers manual subtitles, falls back to auto-generated ones; the exact
/// filename yt-dlp picks varies with the language tag, so a directory scan
/// backs up the expected candidates.
pub async fn download_subtitles(video_id: &str, lang: &str, dir: &Path) -> Result<String> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create subtitle directory {}", dir.display()))?;

    let url = video_url(video_id);
    let template = dir.join(video_id);
    let template = template.to_string_lossy();
    run_ytdlp(
        &[
            "--skip-download",
            "--write-subs",
            "--write-auto-subs",
            "--sub-langs",
            lang,
            "--sub-format",
            "srt",
            "--convert-subs",
            "srt",
            "--no-warnings",
            "-o",
            template.as_ref(),
            &url,
        ],
        120,
    )
    .await?;

    let candidates = [
        dir.join(format!("{}.{}.srt", video_id, lang)),
        dir.join(format!("{}.srt", video_id)),
    ];
    for candidate in &candidates {
        if fs::metadata(candidate).await.is_ok() {
            info!("📥 Downloaded subtitles: {}", candidate.display());
            return fs::read_to_string(candidate)
                .await
                .with_context(|| format!("Failed to read {}", candidate.display()));
        }
    }

    // Language variants like <id>.en-US.srt
    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(video_id) && name.ends_with(".srt") {
            info!("📥 Downloaded subtitles: {}", entry.path().display());
            return fs::read_to_string(entry.path())
                .await
                .with_context(|| format!("Failed to read {}", entry.path().display()));
        }
    }

    bail!("No subtitles available for {}", video_id)
}

/// Recursive scan for `.srt` files, for offline batch runs.
pub fn discover_srt_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                warn!("Skipping unreadable path: {}", error);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("srt"))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

async fn run_ytdlp(args: &[&str], timeout_sec: u64) -> Result<String> {
    debug!("Running yt-dlp {:?}", args);
    let output = timeout(
        Duration::from_secs(timeout_sec),
        Command::new(YTDLP).args(args).stdin(Stdio::null()).output(),
    )
    .await
    .map_err(|_| anyhow!("yt-dlp timed out after {}s", timeout_sec))?
    .context("Failed to run yt-dlp (is it installed?)")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("yt-dlp exited with {}: {}", output.status, stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn video_info_from_json(video_id: &str, url: &str, value: &serde_json::Value) -> VideoInfo {
    let title = value
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown Title")
        .to_string();
    let channel = value
        .get("channel")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("uploader").and_then(|v| v.as_str()))
        .unwrap_or("Unknown Channel")
        .to_string();
    let upload_date = value
        .get("upload_date")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    VideoInfo {
        video_id: video_id.to_string(),
        title,
        channel,
        upload_date,
        url: url.to_string(),
        duration_sec: value.get("duration").and_then(|v| v.as_f64()),
    }
}

fn parse_upload_date(raw: &str) -> Option<DateTime<Utc>> {
    const FORMATS: [&str; 5] = [
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d",
        "%Y%m%d",
    ];

    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for format in FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(datetime.and_utc());
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_extract_video_id_variants() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(extract_video_id("not a url"), None);
        assert_eq!(extract_video_id("https://example.com/watch?v="), None);
    }

    #[test]
    fn test_video_url() {
        assert_eq!(
            video_url("dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_is_recent_window() {
        let reference = Utc.with_ymd_and_hms(2026, 8, 23, 12, 0, 0).unwrap();

        assert!(is_recent("2026-08-23T10:00:00Z", 20, reference));
        assert!(!is_recent("20260822", 20, reference));
        assert!(is_recent("20260822", 48, reference));
        // Unparseable dates keep the video
        assert!(is_recent("soon", 20, reference));
        assert!(is_recent("", 20, reference));
    }

    #[test]
    fn test_video_info_from_json() {
        let value: serde_json::Value = serde_json::from_str(
            r#"{"title": "A Video", "uploader": "Some Uploader", "upload_date": "20260815", "duration": 1500.0}"#,
        )
        .unwrap();

        let info = video_info_from_json("abc123def45", "https://example.com", &value);
        assert_eq!(info.title, "A Video");
        // Falls back to uploader when channel is absent
        assert_eq!(info.channel, "Some Uploader");
        assert_eq!(info.upload_date, "20260815");
        assert_eq!(info.duration_sec, Some(1500.0));
    }

    #[test]
    fn test_video_info_from_json_defaults() {
        let value: serde_json::Value = serde_json::from_str("{}").unwrap();
        let info = video_info_from_json("abc123def45", "https://example.com", &value);
        assert_eq!(info.title, "Unknown Title");
        assert_eq!(info.channel, "Unknown Channel");
        assert!(info.duration_sec.is_none());
    }

    #[test]
    fn test_discover_srt_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("b.srt"), "x").unwrap();
        std::fs::write(dir.path().join("a.SRT"), "x").unwrap();
        std::fs::write(nested.join("c.srt"), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = discover_srt_files(dir.path());
        assert_eq!(files.len(), 3);
        assert!(files[0].ends_with("a.SRT"));
        assert!(files.iter().any(|p| p.ends_with("nested/c.srt")));
    }
}
