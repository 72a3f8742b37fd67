//! Shell-out token source.
//!
//! Runs an external program on every fetch and uses its trimmed stdout as the
//! token. This is how `gcloud auth print-access-token` and similar helpers are
//! plugged in without the proxy knowing how they refresh credentials.

use async_trait::async_trait;
use broxy_types::{BearerToken, BroxyError, Result, TokenSource};
use tokio::process::Command;

/// Token source backed by an external command.
#[derive(Debug, Clone)]
pub struct CommandTokenSource {
    program: String,
    args: Vec<String>,
}

impl CommandTokenSource {
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl TokenSource for CommandTokenSource {
    async fn get_token(&self) -> Result<BearerToken> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BroxyError::Credential(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BroxyError::Credential(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| {
            BroxyError::Credential(format!("{} printed a non UTF-8 token", self.program))
        })?;
        let token = stdout.trim();
        if token.is_empty() {
            return Err(BroxyError::Credential(format!(
                "{} printed an empty token",
                self.program
            )));
        }
        tracing::debug!(program = %self.program, "obtained token from command");
        Ok(BearerToken::new(token))
    }
}
