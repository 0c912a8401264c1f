// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use super::*;
use crate::crds::{Dependency, Tenant, TENANT_LABEL};
use crate::shim_layer::controller_runtime::*;
use crate::unit_tests::processor::{namespace, tenant};
use k8s_openapi::api::core::v1::Namespace;
use kube::runtime::{reflector, watcher};

fn names<K: kube::Resource>(refs: Vec<reflector::ObjectRef<K>>) -> Vec<String> {
    let mut names: Vec<String> = refs.into_iter().map(|r| r.name).collect();
    names.sort();
    names
}

fn acme() -> Tenant {
    tenant("acme", &[("tier", "gold")], &["ns1", "ns2"])
}

#[test]
pub fn test_tenant_changes_map_to_global_specs() {
    let (store, mut writer) = reflector::store::<GlobalTenantResource>();
    for (name, tier) in [("gold-only", "gold"), ("silver-only", "silver")] {
        writer.apply_watcher_event(&watcher::Event::Apply(global(name, tier, replication(Vec::new()))));
    }
    assert_eq!(names(global_specs_for_tenant(&store, &acme())), vec!["gold-only"]);
}

#[test]
pub fn test_tenant_changes_map_to_resources_in_its_namespaces() {
    let (store, mut writer) = reflector::store::<TenantResource>();
    for (ns, name) in [("ns1", "a"), ("ns2", "b"), ("ns3", "c"), ("ns4", "d")] {
        writer.apply_watcher_event(&watcher::Event::Apply(tenant_resource(
            ns,
            name,
            TenantResourceSpec::default(),
        )));
    }
    let (namespaces, mut ns_writer) = reflector::store::<Namespace>();
    ns_writer.apply_watcher_event(&watcher::Event::Apply(namespace("ns3", &[(TENANT_LABEL, "umbrella")])));
    ns_writer.apply_watcher_event(&watcher::Event::Apply(namespace("ns4", &[(TENANT_LABEL, "acme")])));
    assert_eq!(
        names(tenant_resources_for_tenant(&store, &namespaces, &acme())),
        vec!["a", "b", "d"]
    );
}

#[test]
pub fn test_resource_changes_map_to_dependents() {
    let (store, mut writer) = reflector::store::<TenantResource>();
    let depending = |ns: &str, name: &str| {
        tenant_resource(
            ns,
            name,
            TenantResourceSpec {
                depends_on: vec![Dependency {
                    name: "base".to_string(),
                }],
                ..TenantResourceSpec::default()
            },
        )
    };
    let base = tenant_resource("ns1", "base", TenantResourceSpec::default());
    writer.apply_watcher_event(&watcher::Event::Apply(base.clone()));
    writer.apply_watcher_event(&watcher::Event::Apply(depending("ns1", "app")));
    writer.apply_watcher_event(&watcher::Event::Apply(depending("ns2", "elsewhere")));
    assert_eq!(names(dependents_of(&store, &base)), vec!["app"]);
}
