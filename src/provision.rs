// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provisioning orchestrator.
//!
//! One pass of reconciliation across the two control planes, in dependency
//! order:
//!
//! 1. find-or-create the Azure DevOps environment
//! 2. find-or-create the namespace, merging supplied labels
//! 3. find the Kubernetes service endpoint; when it already exists the
//!    credential stages are skipped entirely
//! 4. otherwise: find-or-create the service account, materialize its token
//!    secret, build the kubeconfig, resolve the project GUID, and create the
//!    service endpoint embedding the kubeconfig
//! 5. register the endpoint as a Kubernetes resource of the environment —
//!    always, even when the endpoint was found; the server is the arbiter of
//!    duplicate-link rejection
//!
//! Failure at any stage aborts the rest. Nothing already created is rolled
//! back; re-running re-discovers prior creations through find-or-create and
//! resumes at the first missing resource.

use chrono::Local;
use std::collections::BTreeMap;
use tracing::info;

use crate::azdevops::{AzDevOpsApi, Environment, ServiceEndpoint};
use crate::errors::{LookupError, ProvisionError, UpstreamError};
use crate::kubeconfig;
use crate::kubernetes::ClusterApi;
use crate::resolver::resolve;
use crate::secrets::materialize_token_secret;

/// How a resource came to exist during the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The lookup found an existing resource
    Found,
    /// The resource was created during this run
    Created,
}

impl Outcome {
    fn from_created(created: bool) -> Self {
        if created {
            Outcome::Created
        } else {
            Outcome::Found
        }
    }

    /// `true` when the resource was created during this run.
    #[must_use]
    pub fn was_created(self) -> bool {
        matches!(self, Outcome::Created)
    }
}

/// Validated input for one provisioning run.
///
/// Construction via [`ProvisionRequest::parse`] is the validation boundary:
/// every format error is caught here, before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    /// Azure DevOps organization name
    pub organization: String,
    /// Azure DevOps project name
    pub project: String,
    /// Environment name
    pub environment: String,
    /// Kubernetes namespace name
    pub namespace: String,
    /// Kubernetes service account name
    pub service_account: String,
    /// Service connection (service endpoint) name
    pub service_connection: String,
    /// Labels to merge into the namespace
    pub labels: BTreeMap<String, String>,
}

impl ProvisionRequest {
    /// Parse and validate the raw flag values.
    ///
    /// * `organization_project` must be `organization/project`
    /// * `namespace_service_account` must be `namespace/service-account`
    /// * each label entry must contain exactly one `=`
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] for any malformed value.
    pub fn parse(
        organization_project: &str,
        environment: &str,
        namespace_service_account: &str,
        service_connection: &str,
        labels: &[String],
    ) -> Result<Self, ProvisionError> {
        let (organization, project) = split_pair(
            organization_project,
            "invalid format for Azure DevOps organization project, use: organization/project-name",
        )?;
        let (namespace, service_account) = split_pair(
            namespace_service_account,
            "invalid format for service account, use: namespace/service-account-name",
        )?;

        Ok(Self {
            organization,
            project,
            environment: environment.to_string(),
            namespace,
            service_account,
            service_connection: service_connection.to_string(),
            labels: parse_labels(labels)?,
        })
    }
}

fn split_pair(value: &str, message: &str) -> Result<(String, String), ProvisionError> {
    let parts: Vec<&str> = value.split('/').collect();
    match parts.as_slice() {
        [left, right] if !left.is_empty() && !right.is_empty() => {
            Ok(((*left).to_string(), (*right).to_string()))
        }
        _ => Err(ProvisionError::Validation(message.to_string())),
    }
}

/// Parse `key=value` label entries, requiring exactly one `=` per entry.
pub fn parse_labels(entries: &[String]) -> Result<BTreeMap<String, String>, ProvisionError> {
    let mut labels = BTreeMap::new();
    for entry in entries {
        let parts: Vec<&str> = entry.split('=').collect();
        match parts.as_slice() {
            [key, value] => {
                labels.insert((*key).to_string(), (*value).to_string());
            }
            _ => {
                return Err(ProvisionError::Validation(format!(
                    "label {entry:?} has an invalid format, use: key=value"
                )))
            }
        }
    }
    Ok(labels)
}

/// What one run found or created, plus the rendered kubeconfig when a new
/// service endpoint was created.
#[derive(Debug)]
pub struct ProvisionReport {
    pub environment: Environment,
    pub environment_outcome: Outcome,
    pub namespace_outcome: Outcome,
    pub service_endpoint: ServiceEndpoint,
    pub service_endpoint_outcome: Outcome,
    /// `None` when the endpoint already existed and the stage was skipped
    pub service_account_outcome: Option<Outcome>,
    /// `None` when the endpoint already existed and the stage was skipped
    pub secret_outcome: Option<Outcome>,
    /// The kubeconfig embedded in a freshly created endpoint
    pub kubeconfig: Option<String>,
}

/// Sequences the provisioning stages across both control planes.
pub struct Provisioner<A, K> {
    azdevops: A,
    cluster: K,
}

impl<A: AzDevOpsApi, K: ClusterApi> Provisioner<A, K> {
    pub fn new(azdevops: A, cluster: K) -> Self {
        Self { azdevops, cluster }
    }

    /// Run one provisioning pass.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure; later stages do not run and earlier
    /// creations are not rolled back.
    pub async fn provision(
        &self,
        request: &ProvisionRequest,
    ) -> Result<ProvisionReport, ProvisionError> {
        // Stage 1: environment
        let environment = resolve(
            self.azdevops
                .find_environment(&request.project, &request.environment),
            self.azdevops
                .create_environment(&request.project, &request.environment),
        )
        .await?;
        report_outcome("environment", &request.environment, environment.created);

        // Stage 2: namespace, with label merge
        let namespace = resolve(
            self.cluster.get_namespace(&request.namespace),
            self.cluster.create_namespace(&request.namespace),
        )
        .await?;
        report_outcome("namespace", &request.namespace, namespace.created);

        if !request.labels.is_empty() {
            self.cluster
                .update_namespace_labels(&request.namespace, &request.labels)
                .await?;
            info!(
                namespace = %request.namespace,
                count = request.labels.len(),
                "namespace labels merged"
            );
        }

        // Stage 3: service endpoint lookup; a hit skips the credential stages
        let (endpoint, endpoint_outcome, sa_outcome, secret_outcome, kubeconfig_text) = match self
            .azdevops
            .find_service_endpoint(&request.project, &request.service_connection)
            .await
        {
            Ok(endpoint) => {
                report_outcome("service endpoint", &request.service_connection, false);
                (endpoint, Outcome::Found, None, None, None)
            }
            Err(LookupError::Upstream(err)) => return Err(err.into()),
            Err(LookupError::NotFound { .. }) => {
                let (endpoint, sa_outcome, secret_outcome, text) =
                    self.create_endpoint_with_credential(request).await?;
                report_outcome("service endpoint", &request.service_connection, true);
                (
                    endpoint,
                    Outcome::Created,
                    Some(sa_outcome),
                    Some(secret_outcome),
                    Some(text),
                )
            }
        };

        // Stage 5: always link, even when the endpoint already existed
        if endpoint.id.is_empty() {
            return Err(UpstreamError::transport(
                "Azure DevOps",
                "create environment resource",
                request.service_connection.clone(),
                "service endpoint id is empty",
            )
            .into());
        }
        self.azdevops
            .create_environment_resource(
                &request.project,
                environment.resource.id,
                &request.service_connection,
                &request.namespace,
                &endpoint.id,
            )
            .await?;
        info!(
            environment = %request.environment,
            resource = %request.service_connection,
            namespace = %request.namespace,
            "resource registered in environment"
        );

        Ok(ProvisionReport {
            environment: environment.resource,
            environment_outcome: Outcome::from_created(environment.created),
            namespace_outcome: Outcome::from_created(namespace.created),
            service_endpoint: endpoint,
            service_endpoint_outcome: endpoint_outcome,
            service_account_outcome: sa_outcome,
            secret_outcome,
            kubeconfig: kubeconfig_text,
        })
    }

    /// Stages 4a-4e: build the credential and create the service endpoint.
    async fn create_endpoint_with_credential(
        &self,
        request: &ProvisionRequest,
    ) -> Result<(ServiceEndpoint, Outcome, Outcome, String), ProvisionError> {
        // Stage 4a: service account
        let service_account = resolve(
            self.cluster
                .get_service_account(&request.namespace, &request.service_account),
            self.cluster
                .create_service_account(&request.namespace, &request.service_account),
        )
        .await?;
        report_outcome(
            "service account",
            &request.service_account,
            service_account.created,
        );

        // Stage 4b: validated token secret
        let secret =
            materialize_token_secret(&self.cluster, &request.namespace, &request.service_account)
                .await?;
        report_outcome("token secret", &secret.resource.name, secret.created);

        // Stage 4c: kubeconfig
        let token = secret
            .resource
            .field(crate::constants::SECRET_FIELD_TOKEN)
            .unwrap_or_default();
        let token = std::str::from_utf8(token)
            .map_err(|_| ProvisionError::Kubeconfig("token is not valid UTF-8".into()))?;
        let ca = secret
            .resource
            .field(crate::constants::SECRET_FIELD_CA_CRT)
            .unwrap_or_default();

        let document = kubeconfig::build(
            self.cluster.server_url(),
            ca,
            &request.namespace,
            &service_account.resource.name,
            token,
        )?;
        let text = kubeconfig::render(&document)?;
        info!(namespace = %request.namespace, "kubeconfig built");

        // Stage 4d: project GUID
        let project = self
            .azdevops
            .find_project(&request.project)
            .await
            .map_err(|err| match err {
                LookupError::Upstream(upstream) => ProvisionError::Upstream(upstream),
                LookupError::NotFound { .. } => ProvisionError::Upstream(UpstreamError::transport(
                    "Azure DevOps",
                    "find project",
                    request.project.clone(),
                    "project not found in organization",
                )),
            })?;

        // Stage 4e: service endpoint with embedded kubeconfig
        let description = format!(
            "Created by cli azenv at {}",
            Local::now().format("%-d %b %Y %H:%M:%S")
        );
        let endpoint = self
            .azdevops
            .create_service_endpoint(
                &project.id,
                &request.service_connection,
                &description,
                &text,
            )
            .await?;

        Ok((
            endpoint,
            Outcome::from_created(service_account.created),
            Outcome::from_created(secret.created),
            text,
        ))
    }
}

fn report_outcome(kind: &str, name: &str, created: bool) {
    if created {
        info!(%name, "{kind} created");
    } else {
        info!(%name, "{kind} found");
    }
}
