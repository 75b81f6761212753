use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

/// Record of one successfully processed video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub title: String,
    pub output_path: String,
    pub failed_chapters: usize,
    pub processed_at: String,
}

/// Record of a video deliberately not processed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub title: String,
    pub reason: String,
    pub skipped_at: String,
}

/// Record of a video that failed processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRecord {
    pub title: String,
    pub error: String,
    pub failed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArchiveStats {
    pub total_processed: u64,
    pub total_skipped: u64,
    pub total_failed: u64,
    pub last_update: Option<String>,
}

/// JSON ledger of which videos have been handled.
///
/// Processed and skipped videos count as done; failed videos stay eligible
/// so a later run retries them.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Archive {
    #[serde(default)]
    pub processed: HashMap<String, ProcessedRecord>,
    #[serde(default)]
    pub skipped: HashMap<String, SkippedRecord>,
    #[serde(default)]
    pub failed: HashMap<String, FailedRecord>,
    #[serde(default)]
    pub stats: ArchiveStats,
    #[serde(skip)]
    path: PathBuf,
}

impl Archive {
    /// Load the ledger, starting fresh on a missing or corrupt file.
    pub async fn load(path: &Path) -> Self {
        let mut archive = match fs::read_to_string(path).await {
            Ok(raw) => match serde_json::from_str::<Archive>(&raw) {
                Ok(archive) => archive,
                Err(error) => {
                    warn!("Archive file corrupt, starting fresh: {}", error);
                    Archive::default()
                }
            },
            Err(_) => {
                debug!("No archive at {}, starting fresh", path.display());
                Archive::default()
            }
        };
        archive.path = path.to_path_buf();
        archive
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create archive directory {}", parent.display())
                })?;
            }
        }

        let raw = serde_json::to_string_pretty(self).context("Failed to serialize archive")?;
        fs::write(&self.path, raw)
            .await
            .with_context(|| format!("Failed to write archive {}", self.path.display()))?;
        Ok(())
    }

    pub fn is_processed(&self, video_id: &str) -> bool {
        self.processed.contains_key(video_id) || self.skipped.contains_key(video_id)
    }

    pub fn mark_processed(
        &mut self,
        video_id: &str,
        title: &str,
        output_path: &Path,
        failed_chapters: usize,
    ) {
        self.failed.remove(video_id);
        self.processed.insert(
            video_id.to_string(),
            ProcessedRecord {
                title: title.to_string(),
                output_path: output_path.display().to_string(),
                failed_chapters,
                processed_at: Utc::now().to_rfc3339(),
            },
        );
        self.touch();
    }

    pub fn mark_skipped(&mut self, video_id: &str, title: &str, reason: &str) {
        self.skipped.insert(
            video_id.to_string(),
            SkippedRecord {
                title: title.to_string(),
                reason: reason.to_string(),
                skipped_at: Utc::now().to_rfc3339(),
            },
        );
        self.touch();
    }

    pub fn mark_failed(&mut self, video_id: &str, title: &str, error: &str) {
        self.failed.insert(
            video_id.to_string(),
            FailedRecord {
                title: title.to_string(),
                error: error.to_string(),
                failed_at: Utc::now().to_rfc3339(),
            },
        );
        self.touch();
    }

    /// Clear failure records so the next run picks those videos up again.
    pub fn retry_failed(&mut self) -> usize {
        let count = self.failed.len();
        self.failed.clear();
        self.touch();
        count
    }

    pub fn stats(&self) -> &ArchiveStats {
        &self.stats
    }

    fn touch(&mut self) {
        self.stats = ArchiveStats {
            total_processed: self.processed.len() as u64,
            total_skipped: self.skipped.len() as u64,
            total_failed: self.failed.len() as u64,
            last_update: Some(Utc::now().to_rfc3339()),
        };
    }
}
