// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use gatewayctl::cli::{Cli, Command};
use gatewayctl::config::{Backend, Config};
use gatewayctl::constants::timing;
use gatewayctl::deploy::{encode_key, DeployOptions, HealthOutcome, Orchestrator};
use gatewayctl::health::HttpHealthProbe;
use gatewayctl::helm::HelmCli;
use gatewayctl::kubernetes::{create_client, ClusterOps, Deletion, KubeApi, KubectlCli};
use gatewayctl::process::{CommandRunner, SystemRunner};

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn cluster_backend(config: &Config, runner: Arc<dyn CommandRunner>) -> Result<Box<dyn ClusterOps>> {
    match config.backend {
        Backend::Kubectl => {
            debug!("Using {} for cluster access", config.kubectl);
            Ok(Box::new(
                KubectlCli::new(runner, config.kubectl.clone())
                    .with_kubeconfig(config.kubeconfig.clone(), config.context.clone())
                    .with_retry_interval(config.readiness_interval()),
            ))
        }
        Backend::Api => {
            let client = create_client(config).await?;
            info!("Connected to Kubernetes cluster");
            Ok(Box::new(KubeApi::new(client, config.readiness_interval())))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = cli.config.clone();

    let command = cli.command();
    if command == Command::EncodeKey {
        println!("{}", encode_key(&config.credentials_file)?);
        return Ok(());
    }

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let cluster = cluster_backend(&config, runner.clone()).await?;
    let helm = HelmCli::new(runner.clone(), config.helm.clone())
        .with_kubeconfig(config.kubeconfig.clone(), config.context.clone());
    let health = HttpHealthProbe::new(Duration::from_secs(timing::HEALTH_CHECK_TIMEOUT_SECS));

    let orchestrator = Orchestrator::new(cluster.as_ref(), &helm, runner.as_ref(), &health, &config);

    match command {
        Command::Deploy(args) => {
            let outcome = orchestrator
                .deploy(DeployOptions {
                    health_check: !args.skip_health_check,
                })
                .await?;
            print!("{}", outcome.report);
            print_health(&outcome.health);
        }
        Command::Status => print!("{}", orchestrator.status().await?),
        Command::Test => print_health(&orchestrator.test().await?),
        Command::Logs(args) => print!("{}", orchestrator.logs(args.tail).await?),
        Command::Cleanup => match orchestrator.cleanup().await? {
            Deletion::Deleted => println!("Namespace deleted"),
            Deletion::NotFound => println!("Namespace already absent"),
        },
        // answered before connecting
        Command::EncodeKey => {}
    }

    Ok(())
}

fn print_health(health: &HealthOutcome) {
    match health {
        HealthOutcome::Healthy(status) => println!("Health:    ok (HTTP {})", status),
        HealthOutcome::Unhealthy(reason) => println!("Health:    failing ({})", reason),
        HealthOutcome::Skipped => println!("Health:    not checked"),
    }
}
