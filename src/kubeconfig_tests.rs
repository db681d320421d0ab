// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for kubeconfig construction and rendering

#[cfg(test)]
mod tests {
    use crate::constants::KUBECONFIG_CONTEXT_NAME;
    use crate::errors::ProvisionError;
    use crate::kubeconfig::{build, render};
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;

    const SERVER: &str = "https://cluster.example:6443";
    const CA: &[u8] = b"-----BEGIN CERTIFICATE-----\nabc\n-----END CERTIFICATE-----\n";

    // ========================================================================
    // Structure
    // ========================================================================

    #[test]
    fn test_build_single_cluster_context_and_user() {
        let config = build(SERVER, CA, "ns1", "sa1", "tok123").unwrap();

        assert_eq!(config.api_version, "v1");
        assert_eq!(config.kind, "Config");
        assert_eq!(config.clusters.len(), 1, "exactly one cluster entry");
        assert_eq!(config.contexts.len(), 1, "exactly one context entry");
        assert_eq!(config.users.len(), 1, "exactly one credential entry");

        let cluster = &config.clusters[0];
        assert_eq!(cluster.name, KUBECONFIG_CONTEXT_NAME);
        assert_eq!(cluster.cluster.server, SERVER);
        assert_eq!(
            cluster.cluster.certificate_authority_data,
            BASE64.encode(CA),
            "CA bundle is embedded base64-encoded"
        );

        let user = &config.users[0];
        assert_eq!(user.name, "sa1");
        assert_eq!(user.user.token, "tok123");

        let context = &config.contexts[0];
        assert_eq!(context.name, KUBECONFIG_CONTEXT_NAME);
        assert_eq!(context.context.cluster, KUBECONFIG_CONTEXT_NAME);
        assert_eq!(context.context.user, "sa1");
        assert_eq!(context.context.namespace, "ns1");

        assert_eq!(
            config.current_context, KUBECONFIG_CONTEXT_NAME,
            "the single context is set as current"
        );
    }

    #[test]
    fn test_rendered_yaml_contains_expected_keys() {
        let config = build(SERVER, CA, "ns1", "sa1", "tok123").unwrap();
        let text = render(&config).unwrap();

        assert!(text.contains("apiVersion: v1"));
        assert!(text.contains("kind: Config"));
        assert!(text.contains("current-context: default"));
        assert!(text.contains("server: https://cluster.example:6443"));
        assert!(text.contains("certificate-authority-data:"));
        assert!(text.contains("namespace: ns1"));
        assert!(text.contains("token: tok123"));
    }

    // ========================================================================
    // Determinism
    // ========================================================================

    #[test]
    fn test_rendering_identical_inputs_is_byte_identical() {
        let first = render(&build(SERVER, CA, "ns1", "sa1", "tok123").unwrap()).unwrap();
        let second = render(&build(SERVER, CA, "ns1", "sa1", "tok123").unwrap()).unwrap();

        assert_eq!(first, second, "same inputs must render identically");
    }

    // ========================================================================
    // Input Validation
    // ========================================================================

    #[test]
    fn test_empty_server_url_is_rejected() {
        let err = build("", CA, "ns1", "sa1", "tok123").unwrap_err();
        assert!(
            matches!(err, ProvisionError::Kubeconfig(_)),
            "an empty server URL must not produce a document"
        );
        assert!(err.to_string().contains("server URL"));
    }

    #[test]
    fn test_empty_ca_bundle_is_rejected() {
        let err = build(SERVER, b"", "ns1", "sa1", "tok123").unwrap_err();
        assert!(
            matches!(err, ProvisionError::Kubeconfig(_)),
            "an empty CA bundle must not produce a document"
        );
        assert!(err.to_string().contains("CA bundle"));
    }
}
