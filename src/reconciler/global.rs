// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::config::ControllerConfig;
use crate::crds::{
    GlobalTenantResource, ReplicationSpec, ReplicationStatus, ServiceAccountReference, Tenant,
};
use crate::error::Error;
use crate::kubernetes_api_objects::label_selector::Selector;
use crate::processor::target::list_tenants;
use crate::reconciler::ReplicationResource;
use crate::shim_layer::api::KubeApi;
use async_trait::async_trait;

#[async_trait]
impl ReplicationResource for GlobalTenantResource {
    fn replication(&self) -> &ReplicationSpec {
        &self.spec.replication
    }

    fn replication_status(&self) -> ReplicationStatus {
        self.status
            .as_ref()
            .map(|s| s.replication.clone())
            .unwrap_or_default()
    }

    fn set_replication_status(&mut self, replication: ReplicationStatus) {
        self.status.get_or_insert_with(Default::default).replication = replication;
    }

    fn set_selected_tenants(&mut self, tenants: Vec<String>) {
        self.status.get_or_insert_with(Default::default).selected_tenants = tenants;
    }

    fn service_account_namespace(&self, account: &ServiceAccountReference) -> Option<String> {
        account.namespace.clone().filter(|ns| !ns.is_empty())
    }

    fn default_service_account(config: &ControllerConfig) -> Option<ServiceAccountReference> {
        let name = config.global_default_service_account.clone()?;
        Some(ServiceAccountReference {
            name,
            namespace: config.global_default_service_account_namespace.clone(),
        })
    }

    async fn select_tenants(&self, api: &dyn KubeApi) -> Result<Option<Vec<Tenant>>, Error> {
        let selector = Selector::from_label_selector(&self.spec.tenant_selector)?;
        list_tenants(api, &selector).await.map(Some)
    }
}
