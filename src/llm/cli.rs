use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{Completion, CompletionConfig, CompletionProvider};

/// Argument template used for generic providers when none is configured;
/// mirrors the OpenAI CLI's `responses create` invocation.
const DEFAULT_GENERIC_ARGS: &[&str] = &["responses", "create", "-m", "{model}", "-i", "-"];

/// Subprocess-based completion provider.
///
/// Spawns the configured CLI per request, delivers the prompt via argument
/// or stdin, and enforces the configured timeout around the whole call.
pub struct CliCompletion {
    config: CompletionConfig,
}

impl CliCompletion {
    pub fn new(config: CompletionConfig) -> Result<Self> {
        if config.command.trim().is_empty() {
            return Err(anyhow!("Completion command not configured"));
        }
        Ok(Self { config })
    }

    /// Build the argument vector and decide whether the prompt goes to stdin.
    fn build_invocation(&self, prompt: &str) -> (Vec<String>, bool) {
        match self.config.provider {
            CompletionProvider::ClaudeCli => {
                let mut args = vec!["--output-format".to_string(), "text".to_string()];
                if let Some(model) = &self.config.model {
                    args.push("--model".to_string());
                    args.push(model.clone());
                }
                args.extend(self.config.extra_args.iter().cloned());

                if self.config.use_stdin {
                    (args, true)
                } else {
                    args.push("-p".to_string());
                    args.push(prompt.to_string());
                    (args, false)
                }
            }
            CompletionProvider::GenericCli => {
                let template: Vec<String> = if self.config.extra_args.is_empty() {
                    DEFAULT_GENERIC_ARGS.iter().map(|s| s.to_string()).collect()
                } else {
                    self.config.extra_args.clone()
                };

                let mut args = Vec::new();
                let mut prompt_in_args = false;
                for arg in &template {
                    match arg.as_str() {
                        "{model}" => match &self.config.model {
                            Some(model) => args.push(model.clone()),
                            None => {
                                // Drop the flag that introduced the placeholder
                                if args.last().map(|prev| prev.starts_with('-')).unwrap_or(false)
                                {
                                    args.pop();
                                }
                            }
                        },
                        "{prompt}" => {
                            args.push(prompt.to_string());
                            prompt_in_args = true;
                        }
                        other => args.push(other.to_string()),
                    }
                }

                (args, !prompt_in_args && self.config.use_stdin)
            }
        }
    }
}

#[async_trait]
impl Completion for CliCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let (args, prompt_on_stdin) = self.build_invocation(prompt);
        debug!(
            "Running completion: {} ({} args, stdin: {})",
            self.config.command,
            args.len(),
            prompt_on_stdin
        );

        let mut command = Command::new(&self.config.command);
        command
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if prompt_on_stdin {
            command.stdin(Stdio::piped());
        } else {
            command.stdin(Stdio::null());
        }

        let mut child = command.spawn().with_context(|| {
            format!("Failed to run completion command '{}'", self.config.command)
        })?;

        if prompt_on_stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(prompt.as_bytes())
                    .await
                    .context("Failed to write prompt to completion stdin")?;
            }
        }

        let output = timeout(
            Duration::from_secs(self.config.timeout_sec),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| anyhow!("Completion timed out after {}s", self.config.timeout_sec))?
        .context("Failed to collect completion output")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "Completion command exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        match &self.config.json_path {
            Some(path) => extract_json_path(&stdout, path),
            None => Ok(stdout),
        }
    }

    async fn is_available(&self) -> bool {
        let probe = Command::new(&self.config.command)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match timeout(Duration::from_secs(10), probe).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(_)) | Err(_) => {
                warn!("Completion command '{}' not available", self.config.command);
                false
            }
        }
    }

    fn provider_type(&self) -> CompletionProvider {
        self.config.provider
    }
}

/// Walk a dot path like `output[0].content` through JSON stdout.
fn extract_json_path(raw: &str, path: &str) -> Result<String> {
    let parsed: serde_json::Value =
        serde_json::from_str(raw).context("Completion output was not valid JSON")?;

    let mut current = &parsed;
    for segment in path.split('.') {
        let (key, indexes) = split_indexes(segment)?;
        if !key.is_empty() {
            current = current
                .get(key)
                .ok_or_else(|| anyhow!("JSON path key '{}' not found in output", key))?;
        }
        for index in indexes {
            current = current
                .get(index)
                .ok_or_else(|| anyhow!("JSON path index {} out of range", index))?;
        }
    }

    match current {
        serde_json::Value::String(text) => Ok(text.clone()),
        other => Ok(other.to_string()),
    }
}

/// Split `output[0][1]` into `("output", [0, 1])`.
fn split_indexes(segment: &str) -> Result<(&str, Vec<usize>)> {
    let bracket = match segment.find('[') {
        Some(pos) => pos,
        None => return Ok((segment, Vec::new())),
    };

    let mut indexes = Vec::new();
    for part in segment[bracket..].split('[').skip(1) {
        let digits = part
            .strip_suffix(']')
            .ok_or_else(|| anyhow!("Malformed JSON path segment '{}'", segment))?;
        let index = digits
            .parse()
            .with_context(|| format!("Malformed JSON path segment '{}'", segment))?;
        indexes.push(index);
    }

    Ok((&segment[..bracket], indexes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claude_config() -> CompletionConfig {
        CompletionConfig {
            provider: CompletionProvider::ClaudeCli,
            command: "claude".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_claude_args_with_prompt_argument() {
        let provider = CliCompletion::new(claude_config()).unwrap();
        let (args, stdin) = provider.build_invocation("hello");
        assert_eq!(args, vec!["--output-format", "text", "-p", "hello"]);
        assert!(!stdin);
    }

    #[test]
    fn test_claude_args_with_model_and_stdin() {
        let config = CompletionConfig {
            model: Some("claude-3-5-haiku-latest".to_string()),
            use_stdin: true,
            ..claude_config()
        };
        let provider = CliCompletion::new(config).unwrap();
        let (args, stdin) = provider.build_invocation("hello");
        assert_eq!(
            args,
            vec![
                "--output-format",
                "text",
                "--model",
                "claude-3-5-haiku-latest"
            ]
        );
        assert!(stdin);
    }

    #[test]
    fn test_generic_template_substitution() {
        let config = CompletionConfig {
            provider: CompletionProvider::GenericCli,
            command: "llm".to_string(),
            model: Some("gpt-4o".to_string()),
            extra_args: vec!["-m".into(), "{model}".into(), "{prompt}".into()],
            ..Default::default()
        };
        let provider = CliCompletion::new(config).unwrap();
        let (args, stdin) = provider.build_invocation("translate this");
        assert_eq!(args, vec!["-m", "gpt-4o", "translate this"]);
        assert!(!stdin);
    }

    #[test]
    fn test_generic_template_drops_model_flag_pair() {
        let config = CompletionConfig {
            provider: CompletionProvider::GenericCli,
            command: "openai".to_string(),
            model: None,
            use_stdin: true,
            ..Default::default()
        };
        let provider = CliCompletion::new(config).unwrap();
        let (args, stdin) = provider.build_invocation("p");
        // Default template minus the "-m {model}" pair
        assert_eq!(args, vec!["responses", "create", "-i", "-"]);
        assert!(stdin);
    }

    #[test]
    fn test_extract_json_path() {
        let raw = r#"{"output": [{"content": [{"text": "result text"}]}]}"#;
        let text = extract_json_path(raw, "output[0].content[0].text").unwrap();
        assert_eq!(text, "result text");
    }

    #[test]
    fn test_extract_json_path_missing_key() {
        assert!(extract_json_path(r#"{"a": 1}"#, "b").is_err());
    }

    #[test]
    fn test_split_indexes_malformed() {
        assert!(split_indexes("output[x]").is_err());
        assert!(split_indexes("output[0").is_err());
    }

    #[tokio::test]
    async fn test_complete_runs_command() {
        let config = CompletionConfig {
            provider: CompletionProvider::GenericCli,
            command: "echo".to_string(),
            extra_args: vec!["{prompt}".into()],
            timeout_sec: 30,
            ..Default::default()
        };
        let provider = CliCompletion::new(config).unwrap();
        let result = provider.complete("hello world").await.unwrap();
        assert_eq!(result, "hello world");
    }

    #[tokio::test]
    async fn test_complete_missing_command_errors() {
        let config = CompletionConfig {
            command: "definitely-not-a-real-command-xyz".to_string(),
            ..claude_config()
        };
        let provider = CliCompletion::new(config).unwrap();
        assert!(provider.complete("p").await.is_err());
        assert!(!provider.is_available().await);
    }
}
