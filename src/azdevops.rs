// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Azure DevOps REST API client.
//!
//! This module covers the handful of Azure DevOps operations the provisioner
//! needs: environments and their Kubernetes resources (distributed task API),
//! service endpoints (service connection API), and project lookup. The
//! [`AzDevOpsApi`] trait is the seam the orchestrator is tested through;
//! [`AzDevOpsClient`] is the reqwest-backed implementation.
//!
//! Lookups return [`LookupError::NotFound`] when the name is absent from the
//! listing, which the resolver consumes to choose the create path. Every
//! non-2xx response maps to an [`UpstreamError`] carrying the HTTP status.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::constants::{
    API_VERSION_ENVIRONMENTS, API_VERSION_ENVIRONMENT_RESOURCES, API_VERSION_PROJECTS,
    API_VERSION_SERVICE_ENDPOINTS, AZURE_DEVOPS_BASE_URL, KUBECONFIG_CONTEXT_NAME,
    SERVICE_ENDPOINT_SCHEME_KUBERNETES, SERVICE_ENDPOINT_TYPE_KUBERNETES,
};
use crate::errors::{LookupError, UpstreamError};

const SYSTEM: &str = "Azure DevOps";

// ============================================================================
// Wire Types
// ============================================================================

/// An Azure DevOps environment (distributed task API).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Organization-scoped numeric id
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct EnvironmentList {
    value: Vec<Environment>,
}

/// An Azure DevOps project, identified by GUID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ProjectList {
    value: Vec<Project>,
}

/// A service endpoint (service connection) as read back from the API.
///
/// Listing responses mask credential material, so only the identifying
/// fields are modeled here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub endpoint_type: String,
}

#[derive(Debug, Deserialize)]
struct ServiceEndpointList {
    value: Vec<ServiceEndpoint>,
}

/// Creation payload for a Kubernetes service endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewServiceEndpoint {
    name: String,
    #[serde(rename = "type")]
    endpoint_type: String,
    url: String,
    description: String,
    data: BTreeMap<String, String>,
    authorization: EndpointAuthorization,
    service_endpoint_project_references: Vec<EndpointProjectReference>,
    is_shared: bool,
}

#[derive(Debug, Serialize)]
struct EndpointAuthorization {
    parameters: EndpointAuthorizationParameters,
    scheme: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EndpointAuthorizationParameters {
    cluster_context: String,
    kube_config: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EndpointProjectReference {
    description: String,
    name: String,
    project_reference: ProjectReference,
}

#[derive(Debug, Serialize)]
struct ProjectReference {
    id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewEnvironmentResource<'a> {
    name: &'a str,
    namespace: &'a str,
    service_endpoint_id: &'a str,
}

// ============================================================================
// API Trait
// ============================================================================

/// Azure DevOps operations consumed by the orchestrator.
#[async_trait]
pub trait AzDevOpsApi: Send + Sync {
    /// Look up an environment by name within a project.
    async fn find_environment(&self, project: &str, name: &str)
        -> Result<Environment, LookupError>;

    /// Create an environment within a project.
    async fn create_environment(
        &self,
        project: &str,
        name: &str,
    ) -> Result<Environment, UpstreamError>;

    /// Look up a Kubernetes-typed service endpoint by name within a project.
    async fn find_service_endpoint(
        &self,
        project: &str,
        name: &str,
    ) -> Result<ServiceEndpoint, LookupError>;

    /// Create a Kubernetes service endpoint embedding a kubeconfig credential.
    async fn create_service_endpoint(
        &self,
        project_id: &str,
        name: &str,
        description: &str,
        kubeconfig: &str,
    ) -> Result<ServiceEndpoint, UpstreamError>;

    /// Look up a project by name to obtain its GUID.
    async fn find_project(&self, name: &str) -> Result<Project, LookupError>;

    /// Register a service endpoint as a Kubernetes resource of an environment.
    ///
    /// There is no lookup counterpart: the server rejects duplicate links and
    /// that rejection is propagated, not skipped.
    async fn create_environment_resource(
        &self,
        project: &str,
        environment_id: i64,
        name: &str,
        namespace: &str,
        service_endpoint_id: &str,
    ) -> Result<(), UpstreamError>;
}

// ============================================================================
// REST Client
// ============================================================================

/// Azure DevOps REST client authenticated with a personal access token.
#[derive(Clone)]
pub struct AzDevOpsClient {
    http: reqwest::Client,
    base_url: String,
    organization: String,
    pat: String,
}

impl AzDevOpsClient {
    /// Create a client for an organization, talking to the public service.
    pub fn new(organization: impl Into<String>, pat: impl Into<String>) -> Self {
        Self::with_base_url(AZURE_DEVOPS_BASE_URL, organization, pat)
    }

    /// Create a client against an alternate base URL (used by tests).
    pub fn with_base_url(
        base_url: impl Into<String>,
        organization: impl Into<String>,
        pat: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            organization: organization.into(),
            pat: pat.into(),
        }
    }

    fn org_url(&self, path: &str) -> String {
        format!("{}/{}/{path}", self.base_url, self.organization)
    }

    fn project_url(&self, project: &str, path: &str) -> String {
        format!("{}/{}/{project}/{path}", self.base_url, self.organization)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth("pat", Some(&self.pat))
            .header("Accept", "application/json")
    }

    /// Send a request, enforce a 2xx status, and deserialize the body.
    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        operation: &'static str,
        resource: &str,
    ) -> Result<T, UpstreamError> {
        let response = builder
            .send()
            .await
            .map_err(|e| UpstreamError::transport(SYSTEM, operation, resource, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::status(
                SYSTEM,
                operation,
                resource,
                status.as_u16(),
                if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::transport(SYSTEM, operation, resource, e.to_string()))
    }

    /// Send a request and enforce a 2xx status, discarding the body.
    async fn send_no_content(
        &self,
        builder: reqwest::RequestBuilder,
        operation: &'static str,
        resource: &str,
    ) -> Result<(), UpstreamError> {
        let response = builder
            .send()
            .await
            .map_err(|e| UpstreamError::transport(SYSTEM, operation, resource, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::status(
                SYSTEM,
                operation,
                resource,
                status.as_u16(),
                if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl AzDevOpsApi for AzDevOpsClient {
    async fn find_environment(
        &self,
        project: &str,
        name: &str,
    ) -> Result<Environment, LookupError> {
        let url = self.project_url(project, "_apis/distributedtask/environments");
        debug!(project, name, "looking up environment");
        let list: EnvironmentList = self
            .send(
                self.request(reqwest::Method::GET, &url)
                    .query(&[("name", name), ("api-version", API_VERSION_ENVIRONMENTS)]),
                "find environment",
                name,
            )
            .await?;

        list.value
            .into_iter()
            .find(|e| e.name == name)
            .ok_or(LookupError::NotFound {
                resource: "environment",
            })
    }

    async fn create_environment(
        &self,
        project: &str,
        name: &str,
    ) -> Result<Environment, UpstreamError> {
        let url = self.project_url(project, "_apis/distributedtask/environments");
        debug!(project, name, "creating environment");
        self.send(
            self.request(reqwest::Method::POST, &url)
                .query(&[("api-version", API_VERSION_ENVIRONMENTS)])
                .json(&serde_json::json!({ "name": name })),
            "create environment",
            name,
        )
        .await
    }

    async fn find_service_endpoint(
        &self,
        project: &str,
        name: &str,
    ) -> Result<ServiceEndpoint, LookupError> {
        let url = self.project_url(project, "_apis/serviceendpoint/endpoints");
        debug!(project, name, "looking up service endpoint");
        let list: ServiceEndpointList = self
            .send(
                self.request(reqwest::Method::GET, &url).query(&[
                    ("endpointNames", name),
                    ("type", SERVICE_ENDPOINT_TYPE_KUBERNETES),
                    ("api-version", API_VERSION_SERVICE_ENDPOINTS),
                ]),
                "find service endpoint",
                name,
            )
            .await?;

        list.value
            .into_iter()
            .find(|e| e.name == name)
            .ok_or(LookupError::NotFound {
                resource: "service endpoint",
            })
    }

    async fn create_service_endpoint(
        &self,
        project_id: &str,
        name: &str,
        description: &str,
        kubeconfig: &str,
    ) -> Result<ServiceEndpoint, UpstreamError> {
        let url = self.org_url("_apis/serviceendpoint/endpoints");
        debug!(project_id, name, "creating service endpoint");

        let mut data = BTreeMap::new();
        data.insert("acceptUntrustedCerts".to_string(), "true".to_string());
        data.insert("authorizationType".to_string(), "Kubeconfig".to_string());

        let payload = NewServiceEndpoint {
            name: name.to_string(),
            endpoint_type: SERVICE_ENDPOINT_TYPE_KUBERNETES.to_string(),
            url: "https://azuredevops.com".to_string(),
            description: description.to_string(),
            data,
            authorization: EndpointAuthorization {
                parameters: EndpointAuthorizationParameters {
                    cluster_context: KUBECONFIG_CONTEXT_NAME.to_string(),
                    kube_config: kubeconfig.to_string(),
                },
                scheme: SERVICE_ENDPOINT_SCHEME_KUBERNETES.to_string(),
            },
            service_endpoint_project_references: vec![EndpointProjectReference {
                description: description.to_string(),
                name: name.to_string(),
                project_reference: ProjectReference {
                    id: project_id.to_string(),
                },
            }],
            is_shared: false,
        };

        self.send(
            self.request(reqwest::Method::POST, &url)
                .query(&[("api-version", API_VERSION_SERVICE_ENDPOINTS)])
                .json(&payload),
            "create service endpoint",
            name,
        )
        .await
    }

    async fn find_project(&self, name: &str) -> Result<Project, LookupError> {
        let url = self.org_url("_apis/projects");
        debug!(name, "looking up project");
        let list: ProjectList = self
            .send(
                self.request(reqwest::Method::GET, &url)
                    .query(&[("api-version", API_VERSION_PROJECTS)]),
                "find project",
                name,
            )
            .await?;

        list.value
            .into_iter()
            .find(|p| p.name == name)
            .ok_or(LookupError::NotFound {
                resource: "project",
            })
    }

    async fn create_environment_resource(
        &self,
        project: &str,
        environment_id: i64,
        name: &str,
        namespace: &str,
        service_endpoint_id: &str,
    ) -> Result<(), UpstreamError> {
        let url = self.project_url(
            project,
            &format!("_apis/distributedtask/environments/{environment_id}/providers/kubernetes"),
        );
        debug!(project, environment_id, name, "linking service endpoint to environment");

        let payload = NewEnvironmentResource {
            name,
            namespace,
            service_endpoint_id,
        };

        // The response body is the created resource; nothing in it is needed.
        self.send_no_content(
            self.request(reqwest::Method::POST, &url)
                .query(&[("api-version", API_VERSION_ENVIRONMENT_RESOURCES)])
                .json(&payload),
            "create environment resource",
            name,
        )
        .await
        .map_err(|mut err| {
            // Duplicate links are rejected server-side; point the operator there.
            err.message
                .push_str("; check whether the resource already exists in the environment");
            err
        })
    }
}
