// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic find-or-create primitive.
//!
//! Every provisioning stage that is idempotent on re-run goes through
//! [`resolve`]: look the resource up, create it only when the lookup reports
//! "not found", and abort on any other failure. The side effects (network
//! calls) live entirely in the futures supplied by the caller; this layer
//! only decides which of them runs.

use std::future::Future;

use crate::errors::{LookupError, ProvisionError, UpstreamError};

/// A resource returned by [`resolve`], tagged with how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    /// The resource, whether found or freshly created
    pub resource: T,
    /// `true` when the create path ran, `false` when the lookup found it
    pub created: bool,
}

/// Look a resource up, creating it if — and only if — it does not exist.
///
/// * The lookup returning a resource short-circuits with `created = false`.
/// * The lookup reporting [`LookupError::NotFound`] runs `create` and returns
///   its result with `created = true`.
/// * Any other error from either future aborts immediately and propagates
///   verbatim. There is no retry at this layer.
///
/// # Errors
///
/// Returns the upstream error from whichever call failed.
pub async fn resolve<T, L, C>(lookup: L, create: C) -> Result<Resolved<T>, ProvisionError>
where
    L: Future<Output = Result<T, LookupError>>,
    C: Future<Output = Result<T, UpstreamError>>,
{
    match lookup.await {
        Ok(resource) => Ok(Resolved {
            resource,
            created: false,
        }),
        Err(LookupError::NotFound { .. }) => {
            let resource = create.await?;
            Ok(Resolved {
                resource,
                created: true,
            })
        }
        Err(LookupError::Upstream(err)) => Err(err.into()),
    }
}
