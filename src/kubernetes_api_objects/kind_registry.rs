// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::document::{Document, Pointer};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("document is not an object")]
    NotAnObject,
    #[error("document has no kind")]
    MissingKind,
    #[error("document of kind {0} has no apiVersion and the kind is not well known")]
    UnknownKind(String),
    #[error("{0} has no metadata.name")]
    MissingName(String),
}

// KindRegistry maps well-known kinds to their default apiVersion. It is built once and shared
// read-only by every renderer.
#[derive(Debug, Clone)]
pub struct KindRegistry {
    versions: BTreeMap<&'static str, &'static str>,
}

impl Default for KindRegistry {
    fn default() -> KindRegistry {
        let versions = BTreeMap::from([
            ("ConfigMap", "v1"),
            ("Secret", "v1"),
            ("Service", "v1"),
            ("ServiceAccount", "v1"),
            ("LimitRange", "v1"),
            ("ResourceQuota", "v1"),
            ("PersistentVolumeClaim", "v1"),
            ("Pod", "v1"),
            ("Endpoints", "v1"),
            ("Role", "rbac.authorization.k8s.io/v1"),
            ("RoleBinding", "rbac.authorization.k8s.io/v1"),
            ("ClusterRole", "rbac.authorization.k8s.io/v1"),
            ("ClusterRoleBinding", "rbac.authorization.k8s.io/v1"),
            ("NetworkPolicy", "networking.k8s.io/v1"),
            ("Ingress", "networking.k8s.io/v1"),
            ("Deployment", "apps/v1"),
            ("StatefulSet", "apps/v1"),
            ("DaemonSet", "apps/v1"),
            ("ReplicaSet", "apps/v1"),
            ("Job", "batch/v1"),
            ("CronJob", "batch/v1"),
            ("PodDisruptionBudget", "policy/v1"),
            ("HorizontalPodAutoscaler", "autoscaling/v2"),
        ]);
        KindRegistry { versions }
    }
}

impl KindRegistry {
    pub fn default_api_version(&self, kind: &str) -> Option<&'static str> {
        self.versions.get(kind).copied()
    }

    // Turns a decoded value into a Document, filling in the apiVersion of well-known kinds.
    pub fn decode(&self, value: Value) -> Result<Document, DecodeError> {
        let mut doc = Document::try_from(value).map_err(|_| DecodeError::NotAnObject)?;
        let kind = doc.kind().ok_or(DecodeError::MissingKind)?.to_string();
        if doc.api_version().map_or(true, str::is_empty) {
            let version = self
                .default_api_version(&kind)
                .ok_or_else(|| DecodeError::UnknownKind(kind.clone()))?;
            doc.set(
                &Pointer::from_tokens(["apiVersion"]),
                Value::String(version.to_string()),
            )
            .map_err(|_| DecodeError::NotAnObject)?;
        }
        if doc.name().map_or(true, str::is_empty) {
            return Err(DecodeError::MissingName(kind));
        }
        Ok(doc)
    }
}
