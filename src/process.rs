// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Subprocess execution for the external control-plane clients

use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Whether the failure is a Kubernetes or Helm "not found"
    pub fn is_not_found(&self) -> bool {
        let stderr = self.stderr.to_ascii_lowercase();
        stderr.contains("notfound") || stderr.contains("not found")
    }
}

/// Runs external programs
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, feeding `stdin` when given.
    /// A program that does not exist yields `ToolMissing`.
    async fn run(&self, program: &str, args: &[String], stdin: Option<&[u8]>) -> Result<CommandOutput>;

    /// Whether `program` can be spawned at all; its exit status is ignored
    async fn is_installed(&self, program: &str) -> bool {
        !matches!(
            self.run(program, &["version".to_string()], None).await,
            Err(GatewayError::ToolMissing(_))
        )
    }
}

/// Render a command line for logs and error messages
pub fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turn a failed output into `CommandFailed`
pub fn check_output(program: &str, args: &[String], output: CommandOutput) -> Result<CommandOutput> {
    if output.success() {
        Ok(output)
    } else {
        Err(GatewayError::CommandFailed {
            command: display_command(program, args),
            stderr: output.stderr.trim().to_string(),
        })
    }
}

/// Runs programs on the local machine
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    #[instrument(skip(self, args, stdin), fields(command = %display_command(program, args)))]
    async fn run(&self, program: &str, args: &[String], stdin: Option<&[u8]>) -> Result<CommandOutput> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = command.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => GatewayError::ToolMissing(program.to_string()),
            _ => GatewayError::IoError(e),
        })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input).await?;
            // Closing stdin lets the child see end of input
            drop(pipe);
        }

        let output = child.wait_with_output().await?;
        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        debug!("exited with {:?}", result.code);
        Ok(result)
    }
}
