// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use k8s_openapi::api::core::v1::Namespace;
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// Namespaces carrying this label belong to the named tenant.
pub const TENANT_LABEL: &str = "capsule.clastix.io/tenant";

// Tenant is owned by the tenancy controller; this controller only reads its labels and the
// namespaces recorded in its status.
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(group = "capsule.clastix.io", version = "v1beta2", kind = "Tenant")]
#[kube(status = "TenantStatus")]
pub struct TenantSpec {
    #[serde(default)]
    pub owners: Vec<TenantOwner>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct TenantOwner {
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct TenantStatus {
    #[serde(default)]
    pub namespaces: Vec<String>,
    #[serde(default)]
    pub size: usize,
}

impl Tenant {
    pub fn namespaces(&self) -> &[String] {
        self.status
            .as_ref()
            .map(|s| s.namespaces.as_slice())
            .unwrap_or_default()
    }

    pub fn owns_namespace(&self, namespace: &str) -> bool {
        self.namespaces().iter().any(|ns| ns == namespace)
    }

    // A namespace belongs to a tenant when the tenant lists it or it carries the tenant label.
    pub fn claims_namespace(&self, namespace: &Namespace) -> bool {
        self.owns_namespace(&namespace.name_any())
            || namespace.labels().get(TENANT_LABEL) == Some(&self.name_any())
    }
}

// Finds the tenant whose status lists the namespace.
pub fn owning_tenant<'a>(tenants: &'a [Tenant], namespace: &str) -> Option<&'a Tenant> {
    tenants.iter().find(|t| t.owns_namespace(namespace))
}
