// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the azenv CLI.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

use std::time::Duration;

// ============================================================================
// Azure DevOps REST API
// ============================================================================

/// Base URL for the Azure DevOps REST API. Tests override this with a mock server.
pub const AZURE_DEVOPS_BASE_URL: &str = "https://dev.azure.com";

/// API version for the distributed task environments endpoint
pub const API_VERSION_ENVIRONMENTS: &str = "6.1-preview.1";

/// API version for the service endpoint (service connection) endpoints
pub const API_VERSION_SERVICE_ENDPOINTS: &str = "7.1-preview.4";

/// API version for the projects endpoint
pub const API_VERSION_PROJECTS: &str = "7.1-preview.4";

/// API version for the environment Kubernetes resource provider endpoint
pub const API_VERSION_ENVIRONMENT_RESOURCES: &str = "7.1-preview.1";

/// Service endpoint type for Kubernetes service connections
pub const SERVICE_ENDPOINT_TYPE_KUBERNETES: &str = "kubernetes";

/// Authorization scheme used by Kubernetes service connections
pub const SERVICE_ENDPOINT_SCHEME_KUBERNETES: &str = "Kubernetes";

// ============================================================================
// Kubernetes Objects
// ============================================================================

/// Secret type reserved for service-account token secrets
pub const SECRET_TYPE_SERVICE_ACCOUNT_TOKEN: &str = "kubernetes.io/service-account-token";

/// Annotation binding a token secret to its service account
pub const SERVICE_ACCOUNT_NAME_ANNOTATION: &str = "kubernetes.io/service-account.name";

/// Data field holding the bearer token inside a token secret
pub const SECRET_FIELD_TOKEN: &str = "token";

/// Data field holding the cluster CA bundle inside a token secret
pub const SECRET_FIELD_CA_CRT: &str = "ca.crt";

/// Suffix appended to the service-account name to form the token secret name
pub const TOKEN_SECRET_SUFFIX: &str = "-token";

// ============================================================================
// Kubeconfig
// ============================================================================

/// Name used for the cluster, context, and current-context entries in
/// generated kubeconfigs. A fixed name keeps the document reproducible.
pub const KUBECONFIG_CONTEXT_NAME: &str = "default";

// ============================================================================
// Secret Materialization Polling
// ============================================================================

/// Number of times the token secret's data fields are inspected before
/// giving up. The cluster populates them out-of-band after creation.
pub const SECRET_POLL_ATTEMPTS: u32 = 5;

/// Pause between secret field inspections
pub const SECRET_POLL_INTERVAL: Duration = Duration::from_millis(250);
