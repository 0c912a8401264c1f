// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::kind_registry::*;
use serde_json::json;

#[test]
pub fn test_fills_api_version_of_well_known_kinds() {
    let registry = KindRegistry::default();
    let doc = registry
        .decode(json!({"kind": "RoleBinding", "metadata": {"name": "rb"}}))
        .unwrap();
    assert_eq!(doc.api_version(), Some("rbac.authorization.k8s.io/v1"));
    assert_eq!(registry.default_api_version("Deployment"), Some("apps/v1"));
    assert_eq!(registry.default_api_version("Widget"), None);
}

#[test]
pub fn test_keeps_explicit_api_version() {
    let doc = KindRegistry::default()
        .decode(json!({"apiVersion": "example.com/v1", "kind": "Widget", "metadata": {"name": "w"}}))
        .unwrap();
    assert_eq!(doc.api_version(), Some("example.com/v1"));
}

#[test]
pub fn test_decode_errors() {
    let registry = KindRegistry::default();
    assert_eq!(registry.decode(json!("text")), Err(DecodeError::NotAnObject));
    assert_eq!(
        registry.decode(json!({"metadata": {"name": "x"}})),
        Err(DecodeError::MissingKind)
    );
    assert_eq!(
        registry.decode(json!({"kind": "Widget", "metadata": {"name": "w"}})),
        Err(DecodeError::UnknownKind("Widget".to_string()))
    );
    assert_eq!(
        registry.decode(json!({"kind": "Secret", "metadata": {}})),
        Err(DecodeError::MissingName("Secret".to_string()))
    );
}
