// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service-account token secret materialization.
//!
//! Kubernetes populates the `token` and `ca.crt` fields of a
//! service-account token secret out-of-band, after the object is created.
//! This module owns the bounded wait for that to happen: find or create the
//! secret under its deterministic `<service-account>-token` name, validate
//! its type, then inspect the data fields up to
//! [`SECRET_POLL_ATTEMPTS`](crate::constants::SECRET_POLL_ATTEMPTS) times
//! with a fixed pause between attempts.
//!
//! A type mismatch fails immediately: more waiting cannot change an object's
//! type, it means a prior run left an incompatible secret behind.

use tracing::{debug, info};

use crate::constants::{
    SECRET_FIELD_CA_CRT, SECRET_FIELD_TOKEN, SECRET_POLL_ATTEMPTS, SECRET_POLL_INTERVAL,
    SECRET_TYPE_SERVICE_ACCOUNT_TOKEN, TOKEN_SECRET_SUFFIX,
};
use crate::errors::{ProvisionError, UpstreamError};
use crate::kubernetes::{ClusterApi, TokenSecret};
use crate::resolver::{resolve, Resolved};

/// Deterministic name of the token secret for a service account.
#[must_use]
pub fn token_secret_name(service_account: &str) -> String {
    format!("{service_account}{TOKEN_SECRET_SUFFIX}")
}

fn missing_fields(secret: &TokenSecret) -> Vec<String> {
    [SECRET_FIELD_TOKEN, SECRET_FIELD_CA_CRT]
        .into_iter()
        .filter(|field| secret.field(field).is_none())
        .map(str::to_string)
        .collect()
}

/// Obtain a validated, fully materialized token secret for a service account.
///
/// Finds or creates the secret under its deterministic name, rejects it if
/// its declared type is not `kubernetes.io/service-account-token`, then polls
/// until both the `token` and `ca.crt` data fields are present. The secret is
/// re-fetched before every attempt after the first.
///
/// # Errors
///
/// * [`ProvisionError::SecretTypeMismatch`] - the existing secret has the wrong type
/// * [`ProvisionError::MaterializationTimeout`] - the fields never appeared
/// * [`ProvisionError::Upstream`] - any Kubernetes call failed
pub async fn materialize_token_secret<K: ClusterApi + ?Sized>(
    cluster: &K,
    namespace: &str,
    service_account: &str,
) -> Result<Resolved<TokenSecret>, ProvisionError> {
    let name = token_secret_name(service_account);

    let Resolved {
        resource: mut secret,
        created,
    } = resolve(
        cluster.get_secret(namespace, &name),
        cluster.create_token_secret(namespace, &name, service_account),
    )
    .await?;

    if secret.secret_type != SECRET_TYPE_SERVICE_ACCOUNT_TOKEN {
        return Err(ProvisionError::SecretTypeMismatch {
            namespace: namespace.to_string(),
            name,
            found: secret.secret_type,
        });
    }

    for attempt in 1..=SECRET_POLL_ATTEMPTS {
        let missing = missing_fields(&secret);
        if missing.is_empty() {
            info!(namespace, secret = %name, attempt, "token secret materialized");
            return Ok(Resolved {
                resource: secret,
                created,
            });
        }

        if attempt == SECRET_POLL_ATTEMPTS {
            return Err(ProvisionError::MaterializationTimeout {
                namespace: namespace.to_string(),
                name,
                missing,
                attempts: SECRET_POLL_ATTEMPTS,
            });
        }

        debug!(
            namespace,
            secret = %name,
            attempt,
            missing = ?missing,
            "token secret not yet materialized, waiting"
        );
        tokio::time::sleep(SECRET_POLL_INTERVAL).await;

        secret = cluster.get_secret(namespace, &name).await.map_err(|err| {
            ProvisionError::Upstream(match err {
                crate::errors::LookupError::Upstream(upstream) => upstream,
                crate::errors::LookupError::NotFound { .. } => UpstreamError::transport(
                    "Kubernetes",
                    "get secret",
                    name.clone(),
                    "secret disappeared while waiting for token data",
                ),
            })
        })?;
    }

    unreachable!("poll loop returns or errors within SECRET_POLL_ATTEMPTS attempts")
}
