use super::{build_prompt, ContentBlob, ContentGenerator, GenerationContext};
use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::planner::DocumentSpec;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout as tokio_timeout;

/// Generates documents by running an external CLI once per attempt
pub struct CommandGenerator {
    pub binary: PathBuf,
    pub args: Vec<String>,
    pub prompt_via_stdin: bool,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
}

impl CommandGenerator {
    pub fn from_config(config: &GeneratorConfig, timeout: Duration) -> Self {
        Self {
            binary: config.binary.clone(),
            args: config.args.clone(),
            prompt_via_stdin: config.prompt_via_stdin,
            working_dir: config.working_dir.clone(),
            timeout,
        }
    }

    fn command(&self) -> Command {
        // Plain names go through PATH lookup
        let binary_str = self.binary.to_string_lossy();
        let mut cmd = if binary_str.contains('/') || binary_str.contains('\\') {
            Command::new(&self.binary)
        } else {
            Command::new(binary_str.as_ref())
        };
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.args(&self.args);
        // Dropping the future (timeout or cancellation) must not leave the child running
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ContentGenerator for CommandGenerator {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn generate(
        &self,
        spec: &DocumentSpec,
        context: &GenerationContext,
    ) -> Result<ContentBlob, GenerationError> {
        let prompt = build_prompt(spec, context);
        let mut cmd = self.command();
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let run = async {
            if self.prompt_via_stdin {
                cmd.stdin(Stdio::piped());
                let mut child = cmd.spawn()?;
                if let Some(mut stdin) = child.stdin.take() {
                    stdin.write_all(prompt.as_bytes()).await?;
                    drop(stdin);
                }
                child.wait_with_output().await
            } else {
                cmd.arg(&prompt).stdin(Stdio::null());
                cmd.output().await
            }
        };

        let output = tokio_timeout(self.timeout, run)
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(GenerationError::NonZeroExit {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let content = parse_output(&String::from_utf8_lossy(&output.stdout))?;
        if content.is_blank() {
            return Err(GenerationError::EmptyOutput);
        }
        Ok(content)
    }
}

/// Unwrap `{"result": "...", ...}` style JSON envelopes; otherwise the raw text.
/// An envelope flagged `is_error` is a rejection carrying its message.
pub fn parse_output(raw: &str) -> Result<ContentBlob, GenerationError> {
    #[derive(Deserialize)]
    struct Envelope {
        result: String,
        #[serde(default)]
        is_error: bool,
    }

    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if let Ok(envelope) = serde_json::from_value::<Envelope>(value.clone()) {
                if !envelope.is_error {
                    let mut metadata = value;
                    if let Some(obj) = metadata.as_object_mut() {
                        obj.remove("result");
                    }
                    return Ok(ContentBlob {
                        text: envelope.result,
                        metadata,
                    });
                }
                return Err(GenerationError::Rejected(envelope.result));
            }
            if let Some(text) = value.get("text").and_then(|t| t.as_str()) {
                return Ok(ContentBlob {
                    text: text.to_string(),
                    metadata: value.clone(),
                });
            }
        }
    }

    Ok(ContentBlob::from_text(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_envelope() {
        let blob = parse_output(r#"{"result": "Privacy Policy text", "duration_ms": 12}"#).unwrap();
        assert_eq!(blob.text, "Privacy Policy text");
        assert_eq!(blob.metadata["duration_ms"], 12);
        assert!(blob.metadata.get("result").is_none());
    }

    #[test]
    fn test_parse_error_envelope_keeps_message() {
        let err = parse_output(r#"{"result": "rate limited", "is_error": true}"#).unwrap_err();
        assert_eq!(err, GenerationError::Rejected("rate limited".to_string()));
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_parse_text_field() {
        let blob = parse_output(r#"{"text": "Body", "sections": 3}"#).unwrap();
        assert_eq!(blob.text, "Body");
    }

    #[test]
    fn test_parse_plain_text() {
        let blob = parse_output("  # Cookie Policy\n\nWe use cookies.\n").unwrap();
        assert_eq!(blob.text, "# Cookie Policy\n\nWe use cookies.");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_generator_runs_binary() {
        let generator = CommandGenerator {
            binary: PathBuf::from("cat"),
            args: Vec::new(),
            prompt_via_stdin: true,
            working_dir: None,
            timeout: Duration::from_secs(10),
        };
        let spec = DocumentSpec {
            id: "doc_001".to_string(),
            title: "Cookie Policy".to_string(),
            description: String::new(),
            document_type: "cookie_policy".to_string(),
            format_hints: Vec::new(),
            dependencies: Vec::new(),
            frameworks: Vec::new(),
            required: false,
            target_audience: "legal".to_string(),
            position: 0,
        };
        let blob = generator
            .generate(&spec, &GenerationContext::default())
            .await
            .unwrap();
        assert!(blob.text.contains("Cookie Policy"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_generator_reports_exit_code() {
        let generator = CommandGenerator {
            binary: PathBuf::from("false"),
            args: Vec::new(),
            prompt_via_stdin: false,
            working_dir: None,
            timeout: Duration::from_secs(10),
        };
        let spec = DocumentSpec {
            id: "doc_001".to_string(),
            title: "Cookie Policy".to_string(),
            description: String::new(),
            document_type: "cookie_policy".to_string(),
            format_hints: Vec::new(),
            dependencies: Vec::new(),
            frameworks: Vec::new(),
            required: false,
            target_audience: "legal".to_string(),
            position: 0,
        };
        let err = generator
            .generate(&spec, &GenerationContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::NonZeroExit { code: 1, .. }));
    }
}
