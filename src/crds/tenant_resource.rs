// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::crds::resource_spec::ReplicationSpec;
use crate::crds::status::ReplicationStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// TenantResource replicates resources into the namespaces of the tenant owning its namespace.
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(group = "capsule.clastix.io", version = "v1beta2", kind = "TenantResource")]
#[kube(namespaced, shortname = "tntres", status = "TenantResourceStatus")]
#[serde(rename_all = "camelCase")]
pub struct TenantResourceSpec {
    #[serde(default)]
    pub depends_on: Vec<Dependency>,
    #[serde(flatten)]
    pub replication: ReplicationSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct Dependency {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct TenantResourceStatus {
    #[serde(flatten)]
    pub replication: ReplicationStatus,
}
