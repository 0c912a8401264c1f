// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::crds::resource_spec::ReplicationSpec;
use crate::crds::status::ReplicationStatus;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// GlobalTenantResource replicates resources into every tenant matched by its tenant selector.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(group = "capsule.clastix.io", version = "v1beta2", kind = "GlobalTenantResource")]
#[kube(shortname = "gtr", status = "GlobalTenantResourceStatus")]
#[serde(rename_all = "camelCase")]
pub struct GlobalTenantResourceSpec {
    #[serde(default)]
    pub tenant_selector: LabelSelector,
    #[serde(flatten)]
    pub replication: ReplicationSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GlobalTenantResourceStatus {
    #[serde(default)]
    pub selected_tenants: Vec<String>,
    #[serde(flatten)]
    pub replication: ReplicationStatus,
}
