// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the provisioning workflow.
//!
//! This module provides the error taxonomy shared by the Azure DevOps client,
//! the Kubernetes client, and the orchestrator:
//! - [`UpstreamError`] - a failed remote call (non-2xx response or transport failure)
//! - [`LookupError`] - the outcome of a lookup that distinguishes "not found"
//!   from every other failure, consumed by the find-or-create resolver
//! - [`ProvisionError`] - the terminal error surfaced to the caller
//!
//! "Not found" is never surfaced to the caller as an error; the resolver
//! consumes it to choose the create path.

use thiserror::Error;

/// A failed call against one of the two remote systems.
///
/// Carries enough context (system, operation, resource, HTTP status when one
/// was received) to diagnose the failure without re-running the command.
#[derive(Error, Debug)]
#[error("{system} {operation} failed for {resource}: {message}")]
pub struct UpstreamError {
    /// Which remote system failed ("Azure DevOps" or "Kubernetes")
    pub system: &'static str,
    /// The operation being performed (e.g. "find environment")
    pub operation: &'static str,
    /// The resource the operation targeted (e.g. "env1")
    pub resource: String,
    /// HTTP status code, when the remote answered at all
    pub status: Option<u16>,
    /// Human-readable failure detail
    pub message: String,
}

impl UpstreamError {
    /// Build an upstream error for a call that received a non-2xx response.
    pub fn status(
        system: &'static str,
        operation: &'static str,
        resource: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self {
            system,
            operation,
            resource: resource.into(),
            status: Some(status),
            message: format!("{} (HTTP {status})", message.into()),
        }
    }

    /// Build an upstream error for a call that failed before any response
    /// (connection refused, TLS failure, serialization error).
    pub fn transport(
        system: &'static str,
        operation: &'static str,
        resource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            system,
            operation,
            resource: resource.into(),
            status: None,
            message: message.into(),
        }
    }
}

/// Outcome of a resource lookup.
///
/// Lookups return this instead of a plain [`UpstreamError`] so the resolver's
/// branch is a pure pattern match: `NotFound` selects the create path, any
/// other failure aborts the run.
#[derive(Error, Debug)]
pub enum LookupError {
    /// The resource does not exist. Expected, not a failure.
    #[error("{resource} not found")]
    NotFound {
        /// The kind of resource that was looked up (e.g. "environment")
        resource: &'static str,
    },

    /// The lookup itself failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Terminal errors for a provisioning run.
///
/// Every variant aborts the run; there is no partial-success mode. Re-running
/// after a failure re-discovers already-created resources through the
/// find-or-create pattern and resumes from the first missing one.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Malformed input, detected before any remote call is made.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A remote call failed; propagated verbatim.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// An existing secret does not carry the service-account-token type.
    ///
    /// Not retried: waiting cannot change an object's type. A prior run (or
    /// another tool) left an incompatible object behind.
    #[error(
        "secret {namespace}/{name} exists but has type {found:?}, not \
         service-account-token; delete the secret and re-run to let the tool \
         recreate it"
    )]
    SecretTypeMismatch {
        /// Namespace of the offending secret
        namespace: String,
        /// Name of the offending secret
        name: String,
        /// The type the secret actually declared
        found: String,
    },

    /// The secret poller exhausted its attempts without the cluster
    /// populating the token data fields.
    #[error(
        "secret {namespace}/{name} never materialized fields [{fields}] after {attempts} \
         attempts; delete the secret and retry",
        fields = missing.join(", ")
    )]
    MaterializationTimeout {
        /// Namespace of the secret being polled
        namespace: String,
        /// Name of the secret being polled
        name: String,
        /// The data fields that were still absent on the last attempt
        missing: Vec<String>,
        /// How many attempts were made
        attempts: u32,
    },

    /// The kubeconfig builder was handed incomplete inputs.
    #[error("cannot build kubeconfig: {0}")]
    Kubeconfig(String),
}
