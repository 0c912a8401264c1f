// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use super::{namespace, string_map, tenant};
use crate::crds::{ContextSpec, Owner, OwnerScope, ResourceReference, ResourceSpec, TENANT_LABEL};
use crate::error::ProcessError;
use crate::executable_model::ApiServerModel;
use crate::kubernetes_api_objects::document::{Document, Pointer};
use crate::processor::collect::*;
use crate::processor::render::RESOURCES_LABEL;
use crate::processor::target::Target;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use serde_json::json;

fn config_map(namespace: &str, name: &str, labels: &[(&str, &str)]) -> Document {
    Document::try_from(json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {"name": name, "namespace": namespace, "labels": string_map(labels)},
        "data": {"source": name},
    }))
    .unwrap()
}

fn target(ns: &str) -> Target {
    Target {
        tenant: tenant("acme", &[], &["ns1", "ns2"]),
        namespace: Some(namespace(ns, &[])),
        owner: Owner {
            scope: OwnerScope::Namespace,
            name: ns.to_string(),
            uid: format!("{}-uid", ns),
        },
    }
}

fn config_maps(index: Option<&str>, namespace: Option<&str>, name: Option<&str>, labels: &[(&str, &str)]) -> ResourceReference {
    ResourceReference {
        index: index.map(str::to_string),
        api_version: "v1".to_string(),
        kind: "ConfigMap".to_string(),
        namespace: namespace.map(str::to_string),
        name: name.map(str::to_string),
        selector: (!labels.is_empty()).then(|| LabelSelector {
            match_labels: Some(string_map(labels)),
            ..LabelSelector::default()
        }),
    }
}

fn with_context(resources: Vec<ResourceReference>) -> ResourceSpec {
    ResourceSpec {
        context: Some(ContextSpec { resources }),
        ..ResourceSpec::default()
    }
}

#[test]
pub fn test_sanitize_strips_server_fields() {
    let mut doc = Document::try_from(json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": "cfg",
            "uid": "u",
            "resourceVersion": "7",
            "managedFields": [],
            "annotations": {"kubectl.kubernetes.io/last-applied-configuration": "{}", "keep": "me"},
        },
        "status": {"phase": "x"},
    }))
    .unwrap();
    sanitize(&mut doc);
    assert_eq!(
        doc.as_value(),
        &json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "cfg", "annotations": {"keep": "me"}},
        })
    );
}

#[tokio::test]
pub async fn test_gather_context_by_selector_and_name() {
    let api = ApiServerModel::new();
    api.create(config_map("ns1", "a", &[("app", "web")]));
    api.create(config_map("ns1", "b", &[]));
    api.create(config_map("ns2", "c", &[("app", "web")]));

    let section = with_context(vec![
        config_maps(Some("web"), None, None, &[("app", "web")]),
        config_maps(None, Some("ns2"), Some("c"), &[]),
        config_maps(None, None, Some("missing"), &[]),
    ]);
    let values = gather_context(&api, &section, 0, &target("ns1")).await.unwrap();

    let web = values["web"].as_array().unwrap();
    assert_eq!(web.len(), 1);
    assert_eq!(web[0]["metadata"]["name"], "a");
    assert!(web[0]["metadata"].get("uid").is_none());
    assert!(web[0]["metadata"].get("resourceVersion").is_none());
    assert_eq!(values["1"][0]["data"]["source"], "c");
    assert_eq!(values["2"], json!([]));
}

#[tokio::test]
pub async fn test_gather_context_rejects_reserved_index() {
    let api = ApiServerModel::new();
    let section = with_context(vec![config_maps(Some("tenant"), None, None, &[])]);
    let err = gather_context(&api, &section, 3, &target("ns1")).await.unwrap_err();
    assert!(matches!(err, ProcessError::Gather { section: 3, .. }));
    assert!(err.is_render_error());
}

#[tokio::test]
pub async fn test_namespaced_items_are_copied_into_the_target() {
    let api = ApiServerModel::new();
    api.create(config_map("ns1", "shared", &[("share", "yes")]));
    api.create(config_map("ns1", "private", &[]));
    api.create(config_map("ns1", "replica", &[("share", "yes"), (RESOURCES_LABEL, "0")]));

    let section = ResourceSpec {
        namespaced_items: vec![
            config_maps(None, Some("ns1"), None, &[("share", "yes")]),
            config_maps(None, Some("ns1"), Some("shared"), &[]),
            config_maps(None, Some("ns1"), Some("replica"), &[]),
        ],
        ..ResourceSpec::default()
    };
    let items = collect_namespaced_items(&api, &section, 0, &target("ns2"), false)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name(), Some("shared"));
    assert_eq!(items[0].namespace(), Some("ns2"));
    assert!(!items[0].contains(&Pointer::from_tokens(["metadata", "uid"])));
}

#[tokio::test]
pub async fn test_namespaced_items_stay_inside_the_tenant() {
    let api = ApiServerModel::new();
    api.create(config_map("kube-system", "ca", &[]));
    let section = ResourceSpec {
        namespaced_items: vec![config_maps(None, Some("kube-system"), Some("ca"), &[])],
        ..ResourceSpec::default()
    };

    let err = collect_namespaced_items(&api, &section, 1, &target("ns1"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::NamespacedItems { section: 1, .. }));

    let items = collect_namespaced_items(&api, &section, 1, &target("ns1"), true)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].namespace(), Some("ns1"));
}

#[tokio::test]
pub async fn test_namespaced_items_from_labelled_tenant_namespaces() {
    let api = ApiServerModel::new();
    api.add_namespace("ns5", &[(TENANT_LABEL, "acme")]);
    api.add_namespace("ns6", &[(TENANT_LABEL, "umbrella")]);
    api.create(config_map("ns5", "labelled", &[]));
    api.create(config_map("ns6", "foreign", &[]));

    let section = ResourceSpec {
        namespaced_items: vec![config_maps(None, Some("ns5"), Some("labelled"), &[])],
        ..ResourceSpec::default()
    };
    let items = collect_namespaced_items(&api, &section, 0, &target("ns1"), false)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].namespace(), Some("ns1"));

    let section = ResourceSpec {
        namespaced_items: vec![config_maps(None, Some("ns6"), Some("foreign"), &[])],
        ..ResourceSpec::default()
    };
    let err = collect_namespaced_items(&api, &section, 0, &target("ns1"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::NamespacedItems { section: 0, .. }));
}
