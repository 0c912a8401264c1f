// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::crds::{IgnoreRule, IgnoreTarget};
use crate::error::Error;
use crate::kubernetes_api_objects::document::{Document, Pointer};
use crate::kubernetes_api_objects::error::APIError;
use crate::kubernetes_api_objects::label_selector::Selector;
use crate::kubernetes_api_objects::object_key::{gvk_of, ObjectKey};
use crate::shim_layer::api::KubeApi;
use tracing::*;

#[derive(Debug, Clone, Default)]
struct CompiledTarget {
    group: Option<String>,
    version: Option<String>,
    kind: Option<String>,
    namespace: Option<String>,
    name: Option<String>,
    labels: Option<Selector>,
    annotations: Option<Selector>,
}

fn field_matches(expected: &Option<String>, actual: &str) -> bool {
    expected.as_deref().map_or(true, |e| e == actual)
}

impl CompiledTarget {
    fn compile(target: &IgnoreTarget) -> Result<CompiledTarget, Error> {
        Ok(CompiledTarget {
            group: target.group.clone(),
            version: target.version.clone(),
            kind: target.kind.clone(),
            namespace: target.namespace.clone(),
            name: target.name.clone(),
            labels: target
                .label_selector
                .as_ref()
                .map(Selector::from_label_selector)
                .transpose()?,
            annotations: target
                .annotation_selector
                .as_ref()
                .map(Selector::from_annotation_selector)
                .transpose()?,
        })
    }

    fn matches(&self, doc: &Document) -> bool {
        let gvk = gvk_of(
            doc.api_version().unwrap_or_default(),
            doc.kind().unwrap_or_default(),
        );
        field_matches(&self.group, &gvk.group)
            && field_matches(&self.version, &gvk.version)
            && field_matches(&self.kind, &gvk.kind)
            && field_matches(&self.namespace, doc.namespace().unwrap_or_default())
            && field_matches(&self.name, doc.name().unwrap_or_default())
            && self.labels.as_ref().map_or(true, |s| s.matches(&doc.labels()))
            && self
                .annotations
                .as_ref()
                .map_or(true, |s| s.matches(&doc.annotations()))
    }
}

#[derive(Debug, Clone, Default)]
struct CompiledRule {
    pointers: Vec<Pointer>,
    target: Option<CompiledTarget>,
}

// IgnoreRules is the compiled form of a section's ignore list.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    rules: Vec<CompiledRule>,
}

impl IgnoreRules {
    pub fn compile(rules: &[IgnoreRule]) -> Result<IgnoreRules, Error> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let pointers = rule
                .paths
                .iter()
                .map(|p| p.parse::<Pointer>())
                .collect::<Result<Vec<_>, _>>()?;
            let target = rule.target.as_ref().map(CompiledTarget::compile).transpose()?;
            compiled.push(CompiledRule { pointers, target });
        }
        Ok(IgnoreRules { rules: compiled })
    }

    pub fn pointers_for(&self, doc: &Document) -> Vec<&Pointer> {
        self.rules
            .iter()
            .filter(|r| r.target.as_ref().map_or(true, |t| t.matches(doc)))
            .flat_map(|r| r.pointers.iter())
            .collect()
    }
}

// Live values at ignored paths win over the candidate; ignored paths absent from the live object are
// not asserted at all.
pub fn apply_ignore_rules(candidate: &mut Document, live: Option<&Document>, rules: &IgnoreRules) {
    let pointers: Vec<Pointer> = rules.pointers_for(candidate).into_iter().cloned().collect();
    for pointer in pointers {
        if pointer.is_root() {
            continue;
        }
        match live.and_then(|l| l.get(&pointer)) {
            Some(value) => {
                if let Err(e) = candidate.set(&pointer, value.clone()) {
                    warn!("cannot preserve ignored path {}: {}", pointer, e);
                }
            }
            None => {
                candidate.remove(&pointer);
            }
        }
    }
}

// The manager identity for one section of one spec in one target. It stays the same across
// reconciles so that re-applies continue the same ownership.
pub fn field_owner(
    prefix: &str,
    spec_namespace: Option<&str>,
    spec_name: &str,
    tenant: &str,
    namespace: Option<&str>,
    section: usize,
) -> String {
    let scope = spec_namespace.unwrap_or("cluster");
    match namespace {
        Some(ns) => format!("{}/{}/{}/{}/{}/{}", prefix, scope, spec_name, tenant, ns, section),
        None => format!("{}/{}/{}/{}/{}", prefix, scope, spec_name, tenant, section),
    }
}

// Fetches the live object, folds the ignore rules in and server-side applies the result.
pub async fn apply(
    api: &dyn KubeApi,
    mut candidate: Document,
    rules: &IgnoreRules,
    field_owner: &str,
    force: bool,
) -> Result<Document, APIError> {
    let key = ObjectKey::from_document(&candidate)
        .ok_or_else(|| APIError::Invalid("object lacks apiVersion, kind or name".into()))?;
    let live = api.get(&key).await?;
    apply_ignore_rules(&mut candidate, live.as_ref(), rules);
    debug!("applying {} as {}", key, field_owner);
    api.apply(&candidate, field_owner, force).await
}
