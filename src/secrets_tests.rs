// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for token secret materialization polling.
//!
//! These use a scripted fake cluster that controls on which fetch the token
//! fields appear, and run under paused tokio time so the fixed 250 ms pauses
//! do not slow the suite down.

#[cfg(test)]
mod tests {
    use crate::constants::{SECRET_FIELD_CA_CRT, SECRET_FIELD_TOKEN};
    use crate::errors::{LookupError, ProvisionError, UpstreamError};
    use crate::kubernetes::{ClusterApi, NamespaceInfo, ServiceAccountInfo, TokenSecret};
    use crate::secrets::{materialize_token_secret, token_secret_name};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    const SA_TOKEN_TYPE: &str = "kubernetes.io/service-account-token";

    /// Fake cluster whose secret materializes on a scripted fetch number.
    struct FakeSecretSource {
        /// Declared type of the secret served back
        secret_type: String,
        /// Whether the secret exists before the first get
        exists: bool,
        /// 1-based get call number at which the data fields appear; `None` = never
        materialize_on_get: Option<u32>,
        get_calls: AtomicU32,
        create_calls: AtomicU32,
    }

    impl FakeSecretSource {
        fn new(exists: bool, materialize_on_get: Option<u32>) -> Self {
            Self {
                secret_type: SA_TOKEN_TYPE.to_string(),
                exists,
                materialize_on_get,
                get_calls: AtomicU32::new(0),
                create_calls: AtomicU32::new(0),
            }
        }

        fn secret(&self, fetch_number: u32) -> TokenSecret {
            let mut data = BTreeMap::new();
            if self.materialize_on_get.is_some_and(|m| fetch_number >= m) {
                data.insert(SECRET_FIELD_TOKEN.to_string(), b"tok123".to_vec());
                data.insert(SECRET_FIELD_CA_CRT.to_string(), b"ca-bytes".to_vec());
            }
            TokenSecret {
                name: token_secret_name("sa1"),
                namespace: "ns1".to_string(),
                secret_type: self.secret_type.clone(),
                data,
            }
        }
    }

    #[async_trait]
    impl ClusterApi for FakeSecretSource {
        fn server_url(&self) -> &str {
            "https://cluster.example:6443"
        }

        async fn get_secret(
            &self,
            _namespace: &str,
            _name: &str,
        ) -> Result<TokenSecret, LookupError> {
            let fetch_number = self.get_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.exists && self.create_calls.load(Ordering::SeqCst) == 0 {
                return Err(LookupError::NotFound { resource: "secret" });
            }
            Ok(self.secret(fetch_number))
        }

        async fn create_token_secret(
            &self,
            _namespace: &str,
            _name: &str,
            _service_account: &str,
        ) -> Result<TokenSecret, UpstreamError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            // Freshly created secrets never have their data fields yet
            Ok(self.secret(0))
        }

        async fn get_namespace(&self, _name: &str) -> Result<NamespaceInfo, LookupError> {
            unimplemented!("not used by the poller")
        }

        async fn create_namespace(&self, _name: &str) -> Result<NamespaceInfo, UpstreamError> {
            unimplemented!("not used by the poller")
        }

        async fn update_namespace_labels(
            &self,
            _name: &str,
            _labels: &BTreeMap<String, String>,
        ) -> Result<(), UpstreamError> {
            unimplemented!("not used by the poller")
        }

        async fn get_service_account(
            &self,
            _namespace: &str,
            _name: &str,
        ) -> Result<ServiceAccountInfo, LookupError> {
            unimplemented!("not used by the poller")
        }

        async fn create_service_account(
            &self,
            _namespace: &str,
            _name: &str,
        ) -> Result<ServiceAccountInfo, UpstreamError> {
            unimplemented!("not used by the poller")
        }
    }

    #[test]
    fn test_token_secret_name_is_deterministic() {
        assert_eq!(token_secret_name("sa1"), "sa1-token");
        assert_eq!(token_secret_name("deployer"), "deployer-token");
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediately_materialized_secret_needs_one_attempt() {
        let cluster = FakeSecretSource::new(true, Some(1));

        let resolved = materialize_token_secret(&cluster, "ns1", "sa1")
            .await
            .expect("materialized secret should be returned");

        assert!(!resolved.created, "the existing secret was reused");
        assert_eq!(resolved.resource.field(SECRET_FIELD_TOKEN), Some(b"tok123".as_slice()));
        assert_eq!(cluster.get_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cluster.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_secret_materializing_on_fifth_attempt_succeeds() {
        let cluster = FakeSecretSource::new(true, Some(5));

        let resolved = materialize_token_secret(&cluster, "ns1", "sa1")
            .await
            .expect("secret completing on the last attempt should succeed");

        assert_eq!(
            cluster.get_calls.load(Ordering::SeqCst),
            5,
            "initial fetch plus four re-fetches"
        );
        assert!(resolved.resource.field(SECRET_FIELD_CA_CRT).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_materializing_secret_fails_after_exactly_five_attempts() {
        let cluster = FakeSecretSource::new(true, None);

        let err = materialize_token_secret(&cluster, "ns1", "sa1")
            .await
            .expect_err("a secret that never materializes must time out");

        match err {
            ProvisionError::MaterializationTimeout {
                namespace,
                name,
                missing,
                attempts,
            } => {
                assert_eq!(namespace, "ns1");
                assert_eq!(name, "sa1-token");
                assert_eq!(attempts, 5);
                assert_eq!(missing, vec!["token".to_string(), "ca.crt".to_string()]);
            }
            other => panic!("expected MaterializationTimeout, got {other:?}"),
        }

        assert_eq!(
            cluster.get_calls.load(Ordering::SeqCst),
            5,
            "never a sixth fetch"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_secret_is_created_then_polled() {
        let cluster = FakeSecretSource::new(false, Some(2));

        let resolved = materialize_token_secret(&cluster, "ns1", "sa1")
            .await
            .expect("created secret should materialize on re-fetch");

        assert!(resolved.created, "the secret was created by this run");
        assert_eq!(cluster.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cluster.get_calls.load(Ordering::SeqCst),
            2,
            "not-found lookup, then one re-fetch after creation"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_secret_type_fails_immediately_without_polling() {
        let mut cluster = FakeSecretSource::new(true, Some(1));
        cluster.secret_type = "Opaque".to_string();

        let err = materialize_token_secret(&cluster, "ns1", "sa1")
            .await
            .expect_err("a type mismatch cannot be fixed by waiting");

        match err {
            ProvisionError::SecretTypeMismatch { found, .. } => assert_eq!(found, "Opaque"),
            other => panic!("expected SecretTypeMismatch, got {other:?}"),
        }

        assert_eq!(
            cluster.get_calls.load(Ordering::SeqCst),
            1,
            "no retry after a type mismatch"
        );
    }
}
