// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for error display and construction

#[cfg(test)]
mod tests {
    use crate::errors::{LookupError, ProvisionError, UpstreamError};

    #[test]
    fn test_upstream_status_error_names_system_operation_and_status() {
        let err = UpstreamError::status(
            "Azure DevOps",
            "find environment",
            "env1",
            503,
            "Service Unavailable",
        );

        let text = err.to_string();
        assert!(text.contains("Azure DevOps"));
        assert!(text.contains("find environment"));
        assert!(text.contains("env1"));
        assert!(text.contains("503"));
        assert_eq!(err.status, Some(503));
    }

    #[test]
    fn test_upstream_transport_error_has_no_status() {
        let err = UpstreamError::transport(
            "Kubernetes",
            "get namespace",
            "ns1",
            "connection refused",
        );

        assert_eq!(err.status, None);
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_not_found_is_distinguishable_from_upstream() {
        let not_found = LookupError::NotFound {
            resource: "environment",
        };
        assert!(matches!(not_found, LookupError::NotFound { .. }));
        assert_eq!(not_found.to_string(), "environment not found");
    }

    #[test]
    fn test_type_mismatch_message_carries_remediation_hint() {
        let err = ProvisionError::SecretTypeMismatch {
            namespace: "ns1".to_string(),
            name: "sa1-token".to_string(),
            found: "Opaque".to_string(),
        };

        let text = err.to_string();
        assert!(text.contains("ns1/sa1-token"));
        assert!(text.contains("Opaque"));
        assert!(
            text.contains("delete the secret"),
            "the operator is told how to recover"
        );
    }

    #[test]
    fn test_materialization_timeout_names_missing_fields() {
        let err = ProvisionError::MaterializationTimeout {
            namespace: "ns1".to_string(),
            name: "sa1-token".to_string(),
            missing: vec!["token".to_string(), "ca.crt".to_string()],
            attempts: 5,
        };

        let text = err.to_string();
        assert!(text.contains("token, ca.crt"));
        assert!(text.contains('5'));
        assert!(text.contains("retry"));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ProvisionError::Validation("label \"a=b=c\" has an invalid format".to_string());
        assert!(err.to_string().starts_with("invalid input:"));
    }
}
