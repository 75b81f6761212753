/// yt-digest - YouTube channel digest pipeline
///
/// Monitors channels for new uploads, pulls subtitles, and produces
/// bilingual summary/translation documents through CLI completion tools.

pub mod analysis;
pub mod archive;
pub mod chapters;
pub mod config;
pub mod fetcher;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod review;
pub mod subtitles;
pub mod timecode;
pub mod translate;

// Re-export main types for easy access
pub use crate::analysis::AnalysisResult;
pub use crate::archive::Archive;
pub use crate::chapters::{ChapterProposal, ChapterSegment, OptimizedChapter};
pub use crate::config::{ChannelConfig, Config, ConfigBuilder};
pub use crate::fetcher::VideoInfo;
pub use crate::llm::{Completion, CompletionConfig, CompletionProvider};
pub use crate::pipeline::{BatchSummary, Pipeline, PipelineOptions, PipelineResult};
pub use crate::subtitles::{SubtitleEntry, SubtitleTrack};
pub use crate::translate::{TranslatedChapter, TranslationOutcome};
