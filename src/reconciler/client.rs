// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::crds::ServiceAccountReference;
use crate::error::Error;
use crate::kubernetes_api_objects::object_key::ObjectKey;
use crate::reconciler::{Data, ReplicationResource};
use crate::shim_layer::api::KubeApi;
use serde_json::json;
use std::sync::Arc;
use tracing::*;

// Accepts a bare name or a full "system:serviceaccount:ns:name" string.
pub fn sanitize_account_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

pub fn impersonation_user(namespace: &str, name: &str) -> String {
    format!(
        "system:serviceaccount:{}:{}",
        namespace,
        sanitize_account_name(name)
    )
}

fn impersonate<K: ReplicationResource>(
    data: &Data,
    resource: &K,
    account: &ServiceAccountReference,
) -> Result<Arc<dyn KubeApi>, Error> {
    let namespace = resource
        .service_account_namespace(account)
        .ok_or(Error::MissingObjectKey(".spec.serviceAccount.namespace"))?;
    let user = impersonation_user(&namespace, &account.name);
    debug!("impersonating {}", user);
    data.api
        .impersonate(&user)
        .map_err(|e| Error::ImpersonationFailed(user, e))
}

// The client a reconcile acts with. Ok(None) means a default service account was just written onto
// the spec and this pass should stop; the resulting update triggers the next one.
pub async fn resolve_client<K: ReplicationResource>(
    data: &Data,
    key: &ObjectKey,
    resource: &K,
) -> Result<Option<Arc<dyn KubeApi>>, Error> {
    if let Some(account) = &resource.replication().service_account {
        return impersonate(data, resource, account).map(Some);
    }
    match K::default_service_account(&data.config) {
        Some(account) => {
            info!("assigning default service account {} to {}", account.name, key);
            let patch = json!({ "spec": { "serviceAccount": account } });
            data.api
                .merge_patch(key, &patch)
                .await
                .map_err(Error::PatchFailed)?;
            Ok(None)
        }
        None => Ok(Some(data.api.clone())),
    }
}

// Deletion never writes the spec, so a missing service account falls back to the controller's own client.
pub fn deletion_client<K: ReplicationResource>(data: &Data, resource: &K) -> Result<Arc<dyn KubeApi>, Error> {
    match &resource.replication().service_account {
        Some(account) => impersonate(data, resource, account),
        None => Ok(data.api.clone()),
    }
}
