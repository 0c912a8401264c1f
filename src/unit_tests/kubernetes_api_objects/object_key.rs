// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::document::Document;
use crate::kubernetes_api_objects::object_key::*;
use serde_json::json;

#[test]
pub fn test_from_document_and_stub() {
    let doc = Document::try_from(json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {"name": "web", "namespace": "ns1", "labels": {"a": "b"}},
        "spec": {"replicas": 2}
    }))
    .unwrap();
    let key = ObjectKey::from_document(&doc).unwrap();
    assert_eq!(key, ObjectKey::new("apps/v1", "Deployment", Some("ns1"), "web"));
    assert_eq!(key.to_string(), "Deployment/ns1/web");

    let stub = key.to_stub();
    assert_eq!(
        stub.as_value(),
        &json!({"apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "web", "namespace": "ns1"}})
    );
}

#[test]
pub fn test_empty_namespace_is_cluster_scoped() {
    let key = ObjectKey::new("v1", "Namespace", Some(""), "ns1");
    assert_eq!(key.namespace, None);
    assert_eq!(key.to_string(), "Namespace/ns1");
}

#[test]
pub fn test_gvk_of() {
    let core = gvk_of("v1", "ConfigMap");
    assert_eq!((core.group.as_str(), core.version.as_str()), ("", "v1"));
    let grouped = gvk_of("networking.k8s.io/v1", "NetworkPolicy");
    assert_eq!(grouped.group, "networking.k8s.io");
    assert_eq!(grouped.kind, "NetworkPolicy");
}
