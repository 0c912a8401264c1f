// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::crds::Tenant;
use crate::processor::target::Target;
use k8s_openapi::api::core::v1::Namespace;
use kube::ResourceExt;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TenantInfo {
    pub name: String,
    pub uid: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub namespaces: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceInfo {
    pub name: String,
    pub uid: String,
    pub labels: BTreeMap<String, String>,
}

// RenderContext is everything a template can see while rendering for one target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    pub tenant: TenantInfo,
    pub namespace: Option<NamespaceInfo>,
    pub values: Map<String, Value>,
}

impl RenderContext {
    pub fn new(tenant: &Tenant, namespace: Option<&Namespace>) -> RenderContext {
        RenderContext {
            tenant: TenantInfo {
                name: tenant.name_any(),
                uid: tenant.uid().unwrap_or_default(),
                labels: tenant.labels().clone(),
                annotations: tenant.annotations().clone(),
                namespaces: tenant.namespaces().to_vec(),
            },
            namespace: namespace.map(|ns| NamespaceInfo {
                name: ns.name_any(),
                uid: ns.uid().unwrap_or_default(),
                labels: ns.labels().clone(),
            }),
            values: Map::new(),
        }
    }

    pub fn for_target(target: &Target) -> RenderContext {
        RenderContext::new(&target.tenant, target.namespace.as_ref())
    }

    pub fn with_values(mut self, values: Map<String, Value>) -> RenderContext {
        self.values = values;
        self
    }

    pub fn namespace_name(&self) -> Option<&str> {
        self.namespace.as_ref().map(|ns| ns.name.as_str())
    }

    // The two keys available to raw items and metadata values.
    pub fn fast_lookup(&self, key: &str) -> Option<String> {
        match key {
            "tenant.name" => Some(self.tenant.name.clone()),
            "namespace" => self.namespace_name().map(str::to_string),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        let mut root = self.values.clone();
        root.insert(
            "tenant".to_string(),
            json!({
                "name": self.tenant.name,
                "uid": self.tenant.uid,
                "labels": self.tenant.labels,
                "annotations": self.tenant.annotations,
                "namespaces": self.tenant.namespaces,
            }),
        );
        if let Some(ns) = &self.namespace {
            root.insert("namespace".to_string(), Value::String(ns.name.clone()));
            root.insert("namespaceLabels".to_string(), json!(ns.labels));
        }
        Value::Object(root)
    }
}
