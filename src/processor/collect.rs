// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::crds::{ResourceReference, ResourceSpec};
use crate::error::ProcessError;
use crate::kubernetes_api_objects::document::{Document, Pointer};
use crate::kubernetes_api_objects::label_selector::{Requirement, Selector};
use crate::kubernetes_api_objects::object_key::ObjectKey;
use crate::processor::render::RESOURCES_LABEL;
use crate::processor::target::Target;
use crate::shim_layer::api::{to_typed, KubeApi};
use k8s_openapi::api::core::v1::Namespace;
use kube::ResourceExt;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const SERVER_FIELDS: [&[&str]; 8] = [
    &["metadata", "managedFields"],
    &["metadata", "resourceVersion"],
    &["metadata", "uid"],
    &["metadata", "creationTimestamp"],
    &["metadata", "generation"],
    &["metadata", "ownerReferences"],
    &["metadata", "annotations", "kubectl.kubernetes.io/last-applied-configuration"],
    &["status"],
];

const RESERVED_INDEXES: [&str; 2] = ["tenant", "namespace"];

// Strips server-populated fields so a loaded object can be re-applied or rendered.
pub fn sanitize(doc: &mut Document) {
    for tokens in SERVER_FIELDS {
        doc.remove(&Pointer::from_tokens(tokens.iter().copied()));
    }
}

async fn load(
    api: &dyn KubeApi,
    reference: &ResourceReference,
    namespace: Option<&str>,
    exclude: Option<Requirement>,
) -> Result<Vec<Document>, String> {
    if let Some(name) = &reference.name {
        let key = ObjectKey::new(&reference.api_version, &reference.kind, namespace, name);
        return match api.get(&key).await {
            Ok(Some(doc)) => Ok(vec![doc]),
            Ok(None) => Ok(Vec::new()),
            Err(e) => Err(format!("getting {}: {}", key, e)),
        };
    }
    let mut selector =
        Selector::from_optional(reference.selector.as_ref()).map_err(|e| e.to_string())?;
    if let Some(requirement) = exclude {
        selector = selector.with(requirement);
    }
    api.list(&reference.api_version, &reference.kind, namespace, &selector)
        .await
        .map_err(|e| format!("listing {} {}: {}", reference.api_version, reference.kind, e))
}

// Loads the section's context resources and exposes them by index.
pub async fn gather_context(
    api: &dyn KubeApi,
    section: &ResourceSpec,
    index: usize,
    target: &Target,
) -> Result<Map<String, Value>, ProcessError> {
    let mut values = Map::new();
    let Some(context) = &section.context else {
        return Ok(values);
    };
    let target_ns = target.namespace_name();
    for (position, reference) in context.resources.iter().enumerate() {
        let name = reference
            .index
            .clone()
            .unwrap_or_else(|| position.to_string());
        if RESERVED_INDEXES.contains(&name.as_str()) {
            return Err(ProcessError::Gather {
                section: index,
                message: format!("context index {:?} is reserved", name),
            });
        }
        let namespace = reference.namespace.as_deref().or(target_ns.as_deref());
        let docs = load(api, reference, namespace, None)
            .await
            .map_err(|message| ProcessError::Gather {
                section: index,
                message,
            })?;
        let items = docs
            .into_iter()
            .map(|mut doc| {
                sanitize(&mut doc);
                doc.into_value()
            })
            .collect();
        values.insert(name, Value::Array(items));
    }
    Ok(values)
}

async fn claimed_by_tenant(api: &dyn KubeApi, target: &Target, namespace: &str) -> Result<bool, String> {
    if target.namespace_name().as_deref() == Some(namespace) || target.tenant.owns_namespace(namespace) {
        return Ok(true);
    }
    let key = ObjectKey::new("v1", "Namespace", None, namespace);
    match api.get(&key).await.map_err(|e| e.to_string())? {
        Some(doc) => {
            let namespace: Namespace = to_typed(doc, "Namespace").map_err(|e| e.to_string())?;
            Ok(target.tenant.claims_namespace(&namespace))
        }
        None => Ok(false),
    }
}

// Copies existing objects into the target. Objects this controller produced are never copied, and the
// source namespace must belong to the tenant unless cross-namespace selection is allowed.
pub async fn collect_namespaced_items(
    api: &dyn KubeApi,
    section: &ResourceSpec,
    index: usize,
    target: &Target,
    allow_cross_namespace: bool,
) -> Result<Vec<Document>, ProcessError> {
    let error = |message: String| ProcessError::NamespacedItems {
        section: index,
        message,
    };
    let target_ns = target.namespace_name();
    let mut seen: BTreeMap<ObjectKey, Document> = BTreeMap::new();
    for reference in &section.namespaced_items {
        let source_ns = reference.namespace.clone().or_else(|| target_ns.clone());
        if !allow_cross_namespace {
            let owned = match source_ns.as_deref() {
                Some(ns) => claimed_by_tenant(api, target, ns).await.map_err(error)?,
                None => false,
            };
            if !owned {
                return Err(error(format!(
                    "namespace {:?} is not part of tenant {}",
                    source_ns.unwrap_or_default(),
                    target.tenant.name_any()
                )));
            }
        }
        let docs = load(
            api,
            reference,
            source_ns.as_deref(),
            Some(Requirement::does_not_exist(RESOURCES_LABEL)),
        )
        .await
        .map_err(error)?;
        for mut doc in docs {
            if doc.labels().contains_key(RESOURCES_LABEL) {
                continue;
            }
            sanitize(&mut doc);
            if let Some(ns) = &target_ns {
                doc.set_namespace(ns).map_err(|e| error(e.to_string()))?;
            }
            if let Some(key) = ObjectKey::from_document(&doc) {
                seen.entry(key).or_insert(doc);
            }
        }
    }
    Ok(seen.into_values().collect())
}
