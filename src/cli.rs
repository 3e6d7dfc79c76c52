// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Command-line interface

use crate::config::Config;
use clap::{Args, Parser, Subcommand};

/// Deploys the LLM gateway, its database and its exposure onto Kubernetes
#[derive(Parser, Debug)]
#[command(
    name = "gatewayctl",
    version,
    about = "Deploy and operate the LLM gateway on Kubernetes",
    after_help = "Examples:\n  \
                  gatewayctl                       # Deploy (same as `gatewayctl deploy`)\n  \
                  gatewayctl status                # Show resources and the external endpoint\n  \
                  gatewayctl logs --tail 20        # Last gateway log lines\n  \
                  gatewayctl encode-key            # Base64 of credentials.json"
)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The subcommand to run; deploying when none is given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or_default()
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Check prerequisites and deploy everything in order
    Deploy(DeployArgs),

    /// Show the deployed resources and the external endpoint
    Status,

    /// Issue one request against the gateway health endpoint
    Test,

    /// Print recent gateway logs
    Logs(LogsArgs),

    /// Delete the namespace and everything in it
    Cleanup,

    /// Print the credential file as base64
    EncodeKey,
}

impl Default for Command {
    fn default() -> Self {
        Command::Deploy(DeployArgs::default())
    }
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployArgs {
    /// Do not check the health endpoint after deploying
    #[arg(long)]
    pub skip_health_check: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct LogsArgs {
    /// Number of lines per pod
    #[arg(long, default_value_t = 100)]
    pub tail: i64,
}
