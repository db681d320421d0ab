// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubeconfig document builder.
//!
//! Pure construction of the minimal single-context kubeconfig that gets
//! embedded in the Kubernetes service connection: one cluster (server + CA),
//! one user (bearer token), one context binding the two to a namespace, and
//! that context set as current. No I/O happens here.
//!
//! Cluster, context, and current-context all use the fixed name
//! [`KUBECONFIG_CONTEXT_NAME`](crate::constants::KUBECONFIG_CONTEXT_NAME) so
//! rendering the same inputs twice yields byte-identical output.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::KUBECONFIG_CONTEXT_NAME;
use crate::errors::ProvisionError;

/// A kubeconfig document in its canonical `v1` shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Kubeconfig {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub clusters: Vec<NamedCluster>,
    pub users: Vec<NamedUser>,
    pub contexts: Vec<NamedContext>,
    #[serde(rename = "current-context")]
    pub current_context: String,
}

/// A named cluster entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: Cluster,
}

/// Connection details for a cluster: API server URL and CA bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cluster {
    pub server: String,
    /// Base64-encoded PEM bundle
    #[serde(rename = "certificate-authority-data")]
    pub certificate_authority_data: String,
}

/// A named credential entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedUser {
    pub name: String,
    pub user: User,
}

/// Bearer-token credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub token: String,
}

/// A named context entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedContext {
    pub name: String,
    pub context: Context,
}

/// A context binding a cluster and a user to a default namespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Context {
    pub cluster: String,
    pub user: String,
    pub namespace: String,
}

/// Build a single-context kubeconfig for a service-account credential.
///
/// `auth_name` names the user entry (the service-account name); the cluster
/// and context entries use the fixed default name.
///
/// # Errors
///
/// Returns [`ProvisionError::Kubeconfig`] when the server URL or the CA
/// bundle is empty. An incomplete document would render without complaint and
/// fail much later inside a pipeline, so this is checked up front.
pub fn build(
    server_url: &str,
    ca_bundle: &[u8],
    namespace: &str,
    auth_name: &str,
    token: &str,
) -> Result<Kubeconfig, ProvisionError> {
    if server_url.is_empty() {
        return Err(ProvisionError::Kubeconfig(
            "cluster server URL is empty".into(),
        ));
    }
    Url::parse(server_url).map_err(|e| {
        ProvisionError::Kubeconfig(format!("cluster server URL {server_url:?} is invalid: {e}"))
    })?;
    if ca_bundle.is_empty() {
        return Err(ProvisionError::Kubeconfig(format!(
            "CA bundle for {server_url} is empty"
        )));
    }

    Ok(Kubeconfig {
        api_version: "v1".into(),
        kind: "Config".into(),
        clusters: vec![NamedCluster {
            name: KUBECONFIG_CONTEXT_NAME.into(),
            cluster: Cluster {
                server: server_url.into(),
                certificate_authority_data: BASE64.encode(ca_bundle),
            },
        }],
        users: vec![NamedUser {
            name: auth_name.into(),
            user: User {
                token: token.into(),
            },
        }],
        contexts: vec![NamedContext {
            name: KUBECONFIG_CONTEXT_NAME.into(),
            context: Context {
                cluster: KUBECONFIG_CONTEXT_NAME.into(),
                user: auth_name.into(),
                namespace: namespace.into(),
            },
        }],
        current_context: KUBECONFIG_CONTEXT_NAME.into(),
    })
}

/// Render a kubeconfig to its canonical YAML text.
///
/// # Errors
///
/// Returns [`ProvisionError::Kubeconfig`] if serialization fails.
pub fn render(config: &Kubeconfig) -> Result<String, ProvisionError> {
    serde_yaml::to_string(config).map_err(|e| ProvisionError::Kubeconfig(e.to_string()))
}
