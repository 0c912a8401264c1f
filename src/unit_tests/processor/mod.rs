pub mod collect;
pub mod ledger;

use crate::crds::{Tenant, TenantSpec, TenantStatus};
use k8s_openapi::api::core::v1::Namespace;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

pub fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn tenant(name: &str, labels: &[(&str, &str)], namespaces: &[&str]) -> Tenant {
    let mut tenant = Tenant::new(name, TenantSpec::default());
    tenant.metadata.uid = Some(format!("{}-uid", name));
    tenant.metadata.labels = Some(string_map(labels));
    tenant.status = Some(TenantStatus {
        namespaces: namespaces.iter().map(|ns| ns.to_string()).collect(),
        size: namespaces.len(),
    });
    tenant
}

pub fn namespace(name: &str, labels: &[(&str, &str)]) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            uid: Some(format!("{}-uid", name)),
            labels: Some(string_map(labels)),
            ..ObjectMeta::default()
        },
        ..Namespace::default()
    }
}
