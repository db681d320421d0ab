// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes API operations for the provisioning workflow.
//!
//! The orchestrator talks to the cluster through the [`ClusterApi`] trait;
//! [`KubeCluster`] is the kube-client-backed implementation. The trait works
//! in terms of small domain types ([`NamespaceInfo`], [`ServiceAccountInfo`],
//! [`TokenSecret`]) rather than raw API objects so test fakes stay trivial.
//!
//! Lookups map an API 404 to [`LookupError::NotFound`]; everything else is an
//! [`UpstreamError`].

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret, ServiceAccount};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{Api, PostParams};
use kube::{Client, Config};
use std::collections::BTreeMap;
use tracing::debug;

use crate::constants::{SECRET_TYPE_SERVICE_ACCOUNT_TOKEN, SERVICE_ACCOUNT_NAME_ANNOTATION};
use crate::errors::{LookupError, UpstreamError};

const SYSTEM: &str = "Kubernetes";

// ============================================================================
// Domain Types
// ============================================================================

/// A namespace and its current label set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceInfo {
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

/// A service account within a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccountInfo {
    pub name: String,
    pub namespace: String,
}

/// A secret expected to hold a service-account token.
///
/// The `token` and `ca.crt` entries of `data` are populated out-of-band by
/// the cluster's token controller and may be absent right after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSecret {
    pub name: String,
    pub namespace: String,
    /// The declared secret type (expected: `kubernetes.io/service-account-token`)
    pub secret_type: String,
    pub data: BTreeMap<String, Vec<u8>>,
}

impl TokenSecret {
    /// Fetch a data field as raw bytes.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&[u8]> {
        self.data.get(name).map(Vec::as_slice)
    }
}

/// Merge supplied labels into an existing label map.
///
/// Existing labels are preserved; supplied labels overwrite on key conflict.
pub fn merge_labels(existing: &mut BTreeMap<String, String>, supplied: &BTreeMap<String, String>) {
    for (key, value) in supplied {
        existing.insert(key.clone(), value.clone());
    }
}

// ============================================================================
// API Trait
// ============================================================================

/// Kubernetes operations consumed by the orchestrator and the secret poller.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// The API server URL of the cluster, for embedding in kubeconfigs.
    fn server_url(&self) -> &str;

    /// Look up a namespace by name.
    async fn get_namespace(&self, name: &str) -> Result<NamespaceInfo, LookupError>;

    /// Create a namespace.
    async fn create_namespace(&self, name: &str) -> Result<NamespaceInfo, UpstreamError>;

    /// Merge labels into a namespace (existing preserved, supplied overwrite).
    async fn update_namespace_labels(
        &self,
        name: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<(), UpstreamError>;

    /// Look up a service account within a namespace.
    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ServiceAccountInfo, LookupError>;

    /// Create a service account within a namespace.
    async fn create_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ServiceAccountInfo, UpstreamError>;

    /// Look up a secret within a namespace.
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<TokenSecret, LookupError>;

    /// Create a service-account token secret, annotated so the token
    /// controller binds it to `service_account` and fills in its data fields.
    async fn create_token_secret(
        &self,
        namespace: &str,
        name: &str,
        service_account: &str,
    ) -> Result<TokenSecret, UpstreamError>;
}

// ============================================================================
// kube Client Implementation
// ============================================================================

/// Cluster access through the local kubeconfig or in-cluster credentials.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    server_url: String,
}

impl KubeCluster {
    /// Connect using the inferred configuration (kubeconfig or in-cluster).
    ///
    /// # Errors
    ///
    /// Returns an error when no usable configuration can be found or the
    /// client cannot be constructed from it.
    pub async fn try_default() -> anyhow::Result<Self> {
        let config = Config::infer().await?;
        let server_url = config.cluster_url.to_string();
        let client = Client::try_from(config)?;
        debug!(server = %server_url, "connected to Kubernetes cluster");
        Ok(Self { client, server_url })
    }

    /// Wrap an existing client, e.g. one pointed at a test apiserver.
    pub fn with_client(client: Client, server_url: impl Into<String>) -> Self {
        Self {
            client,
            server_url: server_url.into(),
        }
    }

    fn namespaces(&self) -> Api<Namespace> {
        Api::all(self.client.clone())
    }

    fn service_accounts(&self, namespace: &str) -> Api<ServiceAccount> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

fn lookup_error(
    err: kube::Error,
    resource: &'static str,
    operation: &'static str,
    name: &str,
) -> LookupError {
    if is_not_found(&err) {
        LookupError::NotFound { resource }
    } else {
        LookupError::Upstream(upstream_error(err, operation, name))
    }
}

fn upstream_error(err: kube::Error, operation: &'static str, name: &str) -> UpstreamError {
    match err {
        kube::Error::Api(ae) => UpstreamError::status(SYSTEM, operation, name, ae.code, ae.message),
        other => UpstreamError::transport(SYSTEM, operation, name, other.to_string()),
    }
}

fn namespace_info(ns: Namespace) -> NamespaceInfo {
    NamespaceInfo {
        name: ns.metadata.name.unwrap_or_default(),
        labels: ns.metadata.labels.unwrap_or_default(),
    }
}

fn token_secret(secret: Secret) -> TokenSecret {
    TokenSecret {
        name: secret.metadata.name.unwrap_or_default(),
        namespace: secret.metadata.namespace.unwrap_or_default(),
        secret_type: secret.type_.unwrap_or_default(),
        data: secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(k, ByteString(v))| (k, v))
            .collect(),
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    fn server_url(&self) -> &str {
        &self.server_url
    }

    async fn get_namespace(&self, name: &str) -> Result<NamespaceInfo, LookupError> {
        debug!(name, "looking up namespace");
        self.namespaces()
            .get(name)
            .await
            .map(namespace_info)
            .map_err(|e| lookup_error(e, "namespace", "get namespace", name))
    }

    async fn create_namespace(&self, name: &str) -> Result<NamespaceInfo, UpstreamError> {
        debug!(name, "creating namespace");
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        self.namespaces()
            .create(&PostParams::default(), &namespace)
            .await
            .map(namespace_info)
            .map_err(|e| upstream_error(e, "create namespace", name))
    }

    async fn update_namespace_labels(
        &self,
        name: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<(), UpstreamError> {
        debug!(name, count = labels.len(), "merging namespace labels");
        let api = self.namespaces();
        let mut namespace = api
            .get(name)
            .await
            .map_err(|e| upstream_error(e, "get namespace", name))?;

        let merged = namespace.metadata.labels.get_or_insert_with(BTreeMap::new);
        merge_labels(merged, labels);

        api.replace(name, &PostParams::default(), &namespace)
            .await
            .map_err(|e| upstream_error(e, "update namespace labels", name))?;
        Ok(())
    }

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ServiceAccountInfo, LookupError> {
        debug!(namespace, name, "looking up service account");
        self.service_accounts(namespace)
            .get(name)
            .await
            .map(|sa| ServiceAccountInfo {
                name: sa.metadata.name.unwrap_or_default(),
                namespace: sa.metadata.namespace.unwrap_or_default(),
            })
            .map_err(|e| lookup_error(e, "service account", "get service account", name))
    }

    async fn create_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ServiceAccountInfo, UpstreamError> {
        debug!(namespace, name, "creating service account");
        let service_account = ServiceAccount {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        self.service_accounts(namespace)
            .create(&PostParams::default(), &service_account)
            .await
            .map(|sa| ServiceAccountInfo {
                name: sa.metadata.name.unwrap_or_default(),
                namespace: sa.metadata.namespace.unwrap_or_default(),
            })
            .map_err(|e| upstream_error(e, "create service account", name))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<TokenSecret, LookupError> {
        debug!(namespace, name, "looking up secret");
        self.secrets(namespace)
            .get(name)
            .await
            .map(token_secret)
            .map_err(|e| lookup_error(e, "secret", "get secret", name))
    }

    async fn create_token_secret(
        &self,
        namespace: &str,
        name: &str,
        service_account: &str,
    ) -> Result<TokenSecret, UpstreamError> {
        debug!(namespace, name, service_account, "creating token secret");
        let mut annotations = BTreeMap::new();
        annotations.insert(
            SERVICE_ACCOUNT_NAME_ANNOTATION.to_string(),
            service_account.to_string(),
        );

        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                annotations: Some(annotations),
                ..Default::default()
            },
            type_: Some(SECRET_TYPE_SERVICE_ACCOUNT_TOKEN.to_string()),
            ..Default::default()
        };
        self.secrets(namespace)
            .create(&PostParams::default(), &secret)
            .await
            .map(token_secret)
            .map_err(|e| upstream_error(e, "create secret", name))
    }
}
