use std::path::PathBuf;
use std::process::Stdio;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};

use super::{FragmentStream, LanguageModel};
use crate::error::{RagError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClaudeModel {
    Opus,
    #[default]
    Sonnet,
    Haiku,
}

impl ClaudeModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaudeModel::Opus => "opus",
            ClaudeModel::Sonnet => "sonnet",
            ClaudeModel::Haiku => "haiku",
        }
    }
}

impl FromStr for ClaudeModel {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "opus" => Ok(ClaudeModel::Opus),
            "sonnet" => Ok(ClaudeModel::Sonnet),
            "haiku" => Ok(ClaudeModel::Haiku),
            other => Err(RagError::Configuration(format!(
                "Unknown claude model: {}",
                other
            ))),
        }
    }
}

/// Language model backed by the local `claude` command line in print mode
#[derive(Clone)]
pub struct ClaudeCli {
    claude_path: PathBuf,
    working_dir: PathBuf,
    model: ClaudeModel,
}

impl ClaudeCli {
    pub fn new(working_dir: PathBuf, model: ClaudeModel) -> Self {
        Self {
            claude_path: PathBuf::from("claude"),
            working_dir,
            model,
        }
    }

    pub fn with_claude_path(mut self, path: PathBuf) -> Self {
        self.claude_path = path;
        self
    }

    fn command(&self, prompt: &str) -> Command {
        let mut cmd = Command::new(&self.claude_path);
        cmd.current_dir(&self.working_dir);
        cmd.arg("--print");
        cmd.arg("--model").arg(self.model.as_str());

        // Prompt as positional argument (must be last)
        cmd.arg(prompt);

        // Close stdin to prevent blocking
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }
}

struct CliStream {
    // Held so the process is killed when the stream is dropped
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    done: bool,
}

#[async_trait]
impl LanguageModel for ClaudeCli {
    fn model_id(&self) -> &str {
        self.model.as_str()
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut cmd = self.command(prompt);
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running claude CLI: {:?}", cmd);

        let output = cmd
            .output()
            .await
            .map_err(|e| RagError::Generation(format!("Failed to execute claude CLI: {}", e)))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(RagError::Generation(format!(
                "claude CLI exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        if !stderr.is_empty() {
            tracing::warn!("claude stderr: {}", stderr);
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn stream(&self, prompt: &str) -> Result<FragmentStream> {
        let mut cmd = self.command(prompt);
        // Unread stderr could fill its pipe and stall the child
        cmd.stderr(Stdio::null());

        let mut child = cmd
            .spawn()
            .map_err(|e| RagError::Generation(format!("Failed to spawn claude CLI: {}", e)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RagError::Generation("claude CLI stdout unavailable".to_string()))?;

        let state = CliStream {
            child,
            lines: BufReader::new(stdout).lines(),
            done: false,
        };

        let stream = futures::stream::unfold(state, |mut st| async move {
            if st.done {
                return None;
            }

            match st.lines.next_line().await {
                Ok(Some(line)) => Some((Ok(format!("{}\n", line)), st)),
                Ok(None) => {
                    st.done = true;
                    match st.child.wait().await {
                        Ok(status) if status.success() => None,
                        Ok(status) => Some((
                            Err(RagError::Generation(format!("claude CLI exited with {}", status))),
                            st,
                        )),
                        Err(e) => Some((
                            Err(RagError::Generation(format!("Failed to wait for claude CLI: {}", e))),
                            st,
                        )),
                    }
                }
                Err(e) => {
                    st.done = true;
                    Some((
                        Err(RagError::Generation(format!("Failed to read claude CLI output: {}", e))),
                        st,
                    ))
                }
            }
        });

        Ok(Box::pin(stream))
    }
}
