pub mod cli;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Completion provider kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionProvider {
    /// claude-style CLI: `--output-format text`, prompt via `-p` or stdin
    ClaudeCli,
    /// Arbitrary CLI driven by an argument template with `{model}` and
    /// `{prompt}` placeholders
    GenericCli,
}

/// Completion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub provider: CompletionProvider,
    /// Command name or path; resolved through PATH, never discovered by
    /// scanning the filesystem
    pub command: String,
    pub model: Option<String>,
    pub timeout_sec: u64,
    /// Deliver the prompt on stdin instead of as an argument
    pub use_stdin: bool,
    /// For `GenericCli`, the full argument template; for `ClaudeCli`,
    /// arguments appended after the standard ones
    pub extra_args: Vec<String>,
    /// Dot path (`output[0].content`) to extract from JSON stdout
    pub json_path: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: CompletionProvider::ClaudeCli,
            command: "claude".to_string(),
            model: None,
            timeout_sec: 600,
            use_stdin: false,
            extra_args: Vec::new(),
            json_path: None,
        }
    }
}

/// Trait for opaque text-generation capabilities
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
    async fn is_available(&self) -> bool;
    fn provider_type(&self) -> CompletionProvider;
}

/// Create a completion instance based on configuration
pub fn create_completion(config: &CompletionConfig) -> Result<Box<dyn Completion>> {
    match config.provider {
        CompletionProvider::ClaudeCli | CompletionProvider::GenericCli => {
            Ok(Box::new(cli::CliCompletion::new(config.clone())?))
        }
    }
}
