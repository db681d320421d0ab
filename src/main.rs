// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use azenv::azdevops::AzDevOpsClient;
use azenv::cli::{Cli, Command, CreateCommand, KubernetesArgs};
use azenv::kubernetes::KubeCluster;
use azenv::provision::{ProvisionRequest, Provisioner};
use clap::Parser;
use tracing::info;

fn main() -> Result<()> {
    // The workflow is strictly sequential, so a current-thread runtime is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.quiet);

    match cli.command {
        Command::Create(CreateCommand::Kubernetes(args)) => create_kubernetes(args).await,
    }
}

/// Initialize logging.
///
/// Respects the RUST_LOG environment variable if set, otherwise defaults to
/// INFO level (ERROR with --quiet). Respects RUST_LOG_FORMAT for the output
/// format. Example: RUST_LOG_FORMAT=json azenv create kubernetes ...
fn init_tracing(quiet: bool) {
    let default_level = if quiet { "error" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn create_kubernetes(args: KubernetesArgs) -> Result<()> {
    // Validation happens before either client is constructed, so a malformed
    // flag never triggers a remote call.
    let request = ProvisionRequest::parse(
        &args.project,
        &args.name,
        &args.service_account,
        &args.service_connection,
        &args.namespace_labels,
    )?;

    let azdevops = AzDevOpsClient::new(&request.organization, &args.pat);
    let cluster = KubeCluster::try_default().await?;

    let report = Provisioner::new(azdevops, cluster)
        .provision(&request)
        .await?;

    if args.show_kubeconfig {
        if let Some(kubeconfig) = &report.kubeconfig {
            println!("{kubeconfig}");
        }
    }

    info!(
        environment = %report.environment.name,
        service_connection = %report.service_endpoint.name,
        namespace = %request.namespace,
        "environment provisioned"
    );

    Ok(())
}
