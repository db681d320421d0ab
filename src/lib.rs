// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # azenv - Azure DevOps Kubernetes environment provisioning
//!
//! azenv provisions an Azure DevOps "Kubernetes environment" in one pass: it
//! reconciles six linked resources across two eventually-consistent control
//! planes (an Azure DevOps organization and a Kubernetes cluster) and wires
//! them together.
//!
//! ## Modules
//!
//! - [`provision`] - the orchestrator sequencing the provisioning stages
//! - [`resolver`] - the generic find-or-create primitive every stage uses
//! - [`secrets`] - bounded polling for token secret materialization
//! - [`kubeconfig`] - pure construction of the embedded kubeconfig document
//! - [`azdevops`] - Azure DevOps REST client (environments, endpoints, projects)
//! - [`kubernetes`] - Kubernetes client (namespaces, service accounts, secrets)
//! - [`errors`] - the shared error taxonomy
//! - [`cli`] - clap command definitions
//!
//! ## Workflow
//!
//! Each resource is looked up before it is created, so re-running after a
//! failure resumes at the first missing resource instead of duplicating
//! earlier work. The only exception is the final environment-resource link,
//! which is always attempted and whose duplicate rejection is left to the
//! server.

pub mod azdevops;
pub mod cli;
pub mod constants;
pub mod errors;
pub mod kubeconfig;
pub mod kubernetes;
pub mod provision;
pub mod resolver;
pub mod secrets;

#[cfg(test)]
mod errors_tests;
#[cfg(test)]
mod kubeconfig_tests;
#[cfg(test)]
mod secrets_tests;
