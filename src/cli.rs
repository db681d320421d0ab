// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line interface for azenv.
//!
//! The command tree mirrors the resource types the tool can provision; for
//! now that is `create kubernetes`.

use clap::{Args, Parser, Subcommand};

/// Azure DevOps environment management.
#[derive(Debug, Parser)]
#[command(
    name = "azenv",
    version,
    about = "Provision Azure DevOps Kubernetes environments",
    long_about = "Provisions an Azure DevOps Kubernetes environment: the \
                  environment itself, a namespace and service account on the \
                  cluster, a service connection embedding a generated \
                  kubeconfig, and the link tying them together."
)]
pub struct Cli {
    /// Only show output when errors are found
    #[arg(long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a new environment
    #[command(subcommand)]
    Create(CreateCommand),
}

#[derive(Debug, Subcommand)]
pub enum CreateCommand {
    /// Create a new Azure DevOps Kubernetes environment
    Kubernetes(KubernetesArgs),
}

#[derive(Debug, Args)]
pub struct KubernetesArgs {
    /// Azure DevOps personal access token
    #[arg(long, env = "AZENV_PAT", hide_env_values = true)]
    pub pat: String,

    /// Azure DevOps project name with organization (ex: myorg/myproject)
    #[arg(short = 'p', long)]
    pub project: String,

    /// Azure DevOps environment name
    #[arg(short = 'n', long)]
    pub name: String,

    /// Kubernetes service account name with namespace (ex: namespace/service-account-name)
    #[arg(short = 'a', long)]
    pub service_account: String,

    /// Azure DevOps service connection name
    #[arg(short = 'c', long)]
    pub service_connection: String,

    /// Labels merged into the namespace (repeatable, ex: -l team=payments)
    #[arg(short = 'l', long = "namespace-label", value_name = "KEY=VALUE")]
    pub namespace_labels: Vec<String>,

    /// Print the generated kubeconfig when a service connection is created
    #[arg(long)]
    pub show_kubeconfig: bool,
}
