use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::llm::CompletionConfig;

/// Configuration for the digest pipeline
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Channel monitoring settings
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Subtitle processing settings
    #[serde(default)]
    pub subtitles: SubtitleConfig,

    /// Chapter duration policy
    #[serde(default)]
    pub chapters: ChapterConfig,

    /// Completion provider settings
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Translation loop settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Document review settings
    #[serde(default)]
    pub review: ReviewConfig,

    /// Output and storage settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Prompt template locations
    #[serde(default)]
    pub prompts: PromptConfig,

    /// Concurrency settings
    #[serde(default)]
    pub performance: PerformanceConfig,

    /// Channels to monitor; usually loaded from the separate channel list
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// How far back to look for new uploads
    pub lookback_hours: u64,

    /// Videos shorter than this are skipped
    pub min_duration_minutes: u64,

    /// Sleep between monitor iterations; 0 runs a single pass
    pub check_interval_hours: u64,

    /// Subtitle language code passed to the downloader
    pub subtitle_language: String,

    /// Channel list file
    pub channels_file: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            lookback_hours: 20,
            min_duration_minutes: 10,
            check_interval_hours: 3,
            subtitle_language: "en".to_string(),
            channels_file: PathBuf::from("channels.toml"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    /// Paragraph span before a merged transcript block is cut
    pub merge_interval_sec: u64,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            merge_interval_sec: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterConfig {
    /// Chapters shorter than this merge into their successor
    pub min_duration_sec: u64,

    /// Chapters longer than this are split into equal parts
    pub max_duration_sec: u64,

    /// Interval for fallback chapters when the summary has none
    pub fallback_interval_sec: u64,
}

impl Default for ChapterConfig {
    fn default() -> Self {
        Self {
            min_duration_sec: 180,
            max_duration_sec: 900,
            fallback_interval_sec: 900,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Lines of rolling context threaded between chapters
    pub context_lines: usize,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Base retry delay, doubled per attempt
    pub retry_delay_sec: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            context_lines: 5,
            max_retries: 2,
            retry_delay_sec: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Reconcile chapter boundaries after generation
    pub enabled: bool,

    /// Strip fine-grained timestamps from the reviewed document
    pub strip_fine_timestamps: bool,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strip_fine_timestamps: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Base output directory
    pub dir: PathBuf,

    /// Maximum filename length after sanitization
    pub filename_max_length: usize,

    /// Processed-video ledger, relative to the output directory
    pub archive_file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            filename_max_length: 50,
            archive_file: PathBuf::from("archive.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Base directory for prompt files
    pub dir: PathBuf,

    /// Summary prompt template
    pub summary_file: String,

    /// Translation prompt template
    pub translate_file: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("prompts"),
            summary_file: "yt-summary.md".to_string(),
            translate_file: "yt-translate.md".to_string(),
        }
    }
}

impl PromptConfig {
    /// Load a prompt template, or fall back to the built-in default.
    pub async fn load_or(&self, filename: &str, fallback: &str) -> String {
        let path = self.dir.join(filename);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => content.trim().to_string(),
            Err(_) => {
                debug!("No prompt file at {}, using built-in", path.display());
                fallback.to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Concurrent videos in offline directory mode
    pub max_concurrent: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_concurrent: num_cpus::get().min(4),
        }
    }
}

/// One monitored channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelList {
    #[serde(default)]
    channels: Vec<ChannelConfig>,
}

impl Config {
    /// Load configuration from an explicit path or the usual locations.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config = toml::from_str(&raw)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            info!("📄 Loaded configuration from: {}", path.display());
            return Ok(config);
        }

        for path in ["ytdigest.toml", "config/ytdigest.toml"] {
            if let Ok(raw) = std::fs::read_to_string(path) {
                match toml::from_str(&raw) {
                    Ok(config) => {
                        info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(error) => {
                        warn!("Failed to parse config file {}: {}", path, error);
                    }
                }
            }
        }

        debug!("No configuration file found, using defaults with env overrides");
        Self::from_env()
    }

    /// Defaults with `YTDIGEST_*` environment variable overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(output_dir) = std::env::var("YTDIGEST_OUTPUT_DIR") {
            config.output.dir = PathBuf::from(output_dir);
        }
        if let Ok(lang) = std::env::var("YTDIGEST_SUBTITLE_LANG") {
            config.monitor.subtitle_language = lang;
        }
        if let Ok(lookback) = std::env::var("YTDIGEST_LOOKBACK_HOURS") {
            config.monitor.lookback_hours = lookback.parse().unwrap_or(20);
        }
        if let Ok(command) = std::env::var("YTDIGEST_COMPLETION_COMMAND") {
            config.completion.command = command;
        }
        if let Ok(model) = std::env::var("YTDIGEST_MODEL") {
            config.completion.model = Some(model);
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration, reporting every violation at once.
    pub fn validate(&self) -> Result<()> {
        let mut issues = Vec::new();

        if self.chapters.min_duration_sec == 0 {
            issues.push("chapters.min_duration_sec must be positive".to_string());
        }
        if self.chapters.max_duration_sec < self.chapters.min_duration_sec {
            issues.push(
                "chapters.min_duration_sec must not exceed chapters.max_duration_sec".to_string(),
            );
        }
        if self.monitor.lookback_hours == 0 {
            issues.push("monitor.lookback_hours must be positive".to_string());
        }
        if self.subtitles.merge_interval_sec == 0 {
            issues.push("subtitles.merge_interval_sec must be positive".to_string());
        }
        if self.completion.command.trim().is_empty() {
            issues.push("completion.command must not be empty".to_string());
        }
        if self.completion.timeout_sec == 0 {
            issues.push("completion.timeout_sec must be positive".to_string());
        }
        if self.output.filename_max_length == 0 {
            issues.push("output.filename_max_length must be positive".to_string());
        }
        if self.performance.max_concurrent == 0 {
            issues.push("performance.max_concurrent must be positive".to_string());
        }

        if !issues.is_empty() {
            bail!("Invalid configuration: {}", issues.join("; "));
        }

        info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "yt-digest configuration:\n\
            - Channels: {}\n\
            - Lookback: {}h\n\
            - Subtitle language: {}\n\
            - Chapter bounds: {}s..{}s\n\
            - Completion: {:?} via '{}'\n\
            - Output directory: {}",
            self.channels.len(),
            self.monitor.lookback_hours,
            self.monitor.subtitle_language,
            self.chapters.min_duration_sec,
            self.chapters.max_duration_sec,
            self.completion.provider,
            self.completion.command,
            self.output.dir.display()
        )
    }

    /// Archive path anchored under the output directory.
    pub fn archive_path(&self) -> PathBuf {
        if self.output.archive_file.is_absolute() {
            self.output.archive_file.clone()
        } else {
            self.output.dir.join(&self.output.archive_file)
        }
    }
}

/// Load the channel list, tolerating a missing or malformed file.
pub fn load_channels(path: &Path) -> Vec<ChannelConfig> {
    match std::fs::read_to_string(path) {
        Ok(raw) => match toml::from_str::<ChannelList>(&raw) {
            Ok(list) => {
                debug!("Loaded {} channels from {}", list.channels.len(), path.display());
                list.channels
            }
            Err(error) => {
                warn!("Failed to parse channel list {}: {}", path.display(), error);
                Vec::new()
            }
        },
        Err(_) => {
            warn!("No channel list at {}, nothing to monitor", path.display());
            Vec::new()
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.dir = dir;
        self
    }

    pub fn with_completion_command(mut self, command: impl Into<String>) -> Self {
        self.config.completion.command = command.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.completion.model = Some(model.into());
        self
    }

    pub fn with_chapter_bounds(mut self, min_sec: u64, max_sec: u64) -> Self {
        self.config.chapters.min_duration_sec = min_sec;
        self.config.chapters.max_duration_sec = max_sec;
        self
    }

    pub fn with_lookback_hours(mut self, hours: u64) -> Self {
        self.config.monitor.lookback_hours = hours;
        self
    }

    pub fn with_channels(mut self, channels: Vec<ChannelConfig>) -> Self {
        self.config.channels = channels;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.monitor.lookback_hours, 20);
        assert_eq!(config.chapters.min_duration_sec, 180);
        assert_eq!(config.chapters.max_duration_sec, 900);
        assert_eq!(config.completion.command, "claude");
        assert!(config.review.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_output_dir(PathBuf::from("/tmp/digest"))
            .with_completion_command("my-llm")
            .with_chapter_bounds(60, 600)
            .build();

        assert_eq!(config.output.dir, PathBuf::from("/tmp/digest"));
        assert_eq!(config.completion.command, "my-llm");
        assert_eq!(config.chapters.min_duration_sec, 60);
    }

    #[test]
    fn test_validation_reports_all_violations() {
        let mut config = Config::default();
        config.chapters.min_duration_sec = 900;
        config.chapters.max_duration_sec = 300;
        config.completion.command = String::new();

        let error = config.validate().unwrap_err().to_string();
        assert!(error.contains("min_duration_sec must not exceed"));
        assert!(error.contains("completion.command"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            "[chapters]\nmin_duration_sec = 60\n\n[monitor]\nsubtitle_language = \"ja\"\n",
        )
        .unwrap();

        assert_eq!(config.chapters.min_duration_sec, 60);
        assert_eq!(config.chapters.max_duration_sec, 900);
        assert_eq!(config.monitor.subtitle_language, "ja");
        assert_eq!(config.monitor.lookback_hours, 20);
    }

    #[test]
    fn test_load_channels() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("channels.toml");
        std::fs::write(
            &path,
            "[[channels]]\nname = \"Test\"\nurl = \"https://www.youtube.com/@test\"\n",
        )
        .unwrap();

        let channels = load_channels(&path);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "Test");
        assert!(channels[0].tags.is_empty());

        assert!(load_channels(&dir.path().join("missing.toml")).is_empty());
    }

    #[test]
    fn test_archive_path_anchoring() {
        let config = Config::default();
        assert_eq!(config.archive_path(), PathBuf::from("output/archive.json"));
    }
}
