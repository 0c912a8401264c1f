// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::config::ControllerConfig;
use crate::crds::{
    owning_tenant, ConditionStatus, ReplicationSpec, ReplicationStatus, ServiceAccountReference,
    Tenant, TenantResource, READY_CONDITION,
};
use crate::error::{Error, ProcessError};
use crate::kubernetes_api_objects::label_selector::Selector;
use crate::kubernetes_api_objects::object_key::ObjectKey;
use crate::processor::render::TENANT_LABEL;
use crate::processor::target::list_tenants;
use crate::reconciler::ReplicationResource;
use crate::shim_layer::api::{to_typed, KubeApi};
use async_trait::async_trait;
use kube::{Resource, ResourceExt};

#[async_trait]
impl ReplicationResource for TenantResource {
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

    // A TenantResource can only act as a service account of its own namespace.
    fn service_account_namespace(&self, _account: &ServiceAccountReference) -> Option<String> {
        self.namespace()
    }

    fn default_service_account(config: &ControllerConfig) -> Option<ServiceAccountReference> {
        let name = config.tenant_default_service_account.clone()?;
        Some(ServiceAccountReference {
            name,
            namespace: None,
        })
    }

    // The tenant listing the namespace in its status wins; otherwise the namespace's tenant label decides.
    async fn select_tenants(&self, api: &dyn KubeApi) -> Result<Option<Vec<Tenant>>, Error> {
        let Some(namespace) = self.namespace() else {
            return Ok(None);
        };
        let tenants = list_tenants(api, &Selector::everything()).await?;
        if let Some(tenant) = owning_tenant(&tenants, &namespace) {
            return Ok(Some(vec![tenant.clone()]));
        }
        let ns_key = ObjectKey::new("v1", "Namespace", None, &namespace);
        let labelled = api
            .get(&ns_key)
            .await
            .map_err(|e| Error::ListFailed("namespaces", e))?
            .and_then(|doc| doc.labels().get(TENANT_LABEL).cloned());
        Ok(labelled.and_then(|name| {
            tenants
                .into_iter()
                .find(|t| t.name_any() == name)
                .map(|t| vec![t])
        }))
    }

    async fn check_dependencies(&self, api: &dyn KubeApi) -> Result<(), ProcessError> {
        let namespace = self.namespace();
        for dependency in &self.spec.depends_on {
            let key = ObjectKey::new(
                &TenantResource::api_version(&()),
                &TenantResource::kind(&()),
                namespace.as_deref(),
                &dependency.name,
            );
            let doc = api
                .get(&key)
                .await
                .map_err(|e| ProcessError::Dependency(format!("{}: {}", dependency.name, e)))?
                .ok_or_else(|| ProcessError::Dependency(format!("{} not found", dependency.name)))?;
            let other: TenantResource = to_typed(doc, "TenantResource")
                .map_err(|e| ProcessError::Dependency(format!("{}: {}", dependency.name, e)))?;
            let ready = other
                .replication_status()
                .condition(READY_CONDITION)
                .map_or(false, |c| c.status == ConditionStatus::True);
            if !ready {
                return Err(ProcessError::Dependency(format!(
                    "{} is not ready",
                    dependency.name
                )));
            }
        }
        Ok(())
    }
}
