// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
pub mod client;
pub mod global;
pub mod namespaced;
pub mod status;

use crate::config::ControllerConfig;
use crate::crds::{
    Condition, ConditionStatus, ReplicationSpec, ReplicationStatus, ServiceAccountReference,
    Tenant, CORDONED_CONDITION, READY_CONDITION,
};
use crate::error::{Error, ErrorList, ProcessError};
use crate::kubernetes_api_objects::kind_registry::KindRegistry;
use crate::kubernetes_api_objects::object_key::ObjectKey;
use crate::metrics::Metrics;
use crate::processor::ledger::ProcessedSet;
use crate::processor::prune::{prune, status_changed};
use crate::processor::target::TargetResolver;
use crate::processor::{Processor, SpecIdentity};
use crate::reconciler::client::resolve_client;
use crate::reconciler::status::{publish_transition, update_status, StatusUpdate};
use crate::shim_layer::api::{to_typed, KubeApi};
use async_trait::async_trait;
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::*;

// Guards pruning on delete.
pub const FINALIZER: &str = "capsule.clastix.io/resources";

// ReplicationResource is what the reconcile driver needs from a replication spec. The global and
// namespaced flavors differ only in how they find tenants, service accounts and dependencies.
#[async_trait]
pub trait ReplicationResource:
    Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    fn replication(&self) -> &ReplicationSpec;

    fn replication_status(&self) -> ReplicationStatus;

    fn set_replication_status(&mut self, status: ReplicationStatus);

    fn set_selected_tenants(&mut self, _tenants: Vec<String>) {}

    // Namespace of the service account to impersonate.
    fn service_account_namespace(&self, account: &ServiceAccountReference) -> Option<String>;

    fn default_service_account(config: &ControllerConfig) -> Option<ServiceAccountReference>;

    // None means there is nothing to replicate into yet. Pruning is skipped in that case.
    async fn select_tenants(&self, api: &dyn KubeApi) -> Result<Option<Vec<Tenant>>, Error>;

    async fn check_dependencies(&self, _api: &dyn KubeApi) -> Result<(), ProcessError> {
        Ok(())
    }
}

// Data we want access to in error/reconcile calls
pub struct Data {
    pub api: Arc<dyn KubeApi>,
    pub config: Arc<ControllerConfig>,
    pub registry: Arc<KindRegistry>,
    pub metrics: Metrics,
}

impl Data {
    pub fn new(api: Arc<dyn KubeApi>, config: ControllerConfig) -> Data {
        Data {
            api,
            config: Arc::new(config),
            registry: Arc::new(KindRegistry::default()),
            metrics: Metrics::default(),
        }
    }
}

pub fn object_key_of<K: ReplicationResource>(cr: &K) -> Result<ObjectKey, Error> {
    let name = cr
        .meta()
        .name
        .as_deref()
        .ok_or(Error::MissingObjectKey(".metadata.name"))?;
    Ok(ObjectKey::new(
        &K::api_version(&()),
        &K::kind(&()),
        cr.meta().namespace.as_deref(),
        name,
    ))
}

fn condition(type_: &str, status: ConditionStatus, reason: &str, message: String, generation: Option<i64>) -> Condition {
    Condition {
        type_: type_.to_string(),
        status,
        reason: reason.to_string(),
        message,
        last_transition_time: Some(chrono::Utc::now().to_rfc3339()),
        observed_generation: generation,
    }
}

fn ready_condition(errors: &ErrorList, generation: Option<i64>) -> Condition {
    if errors.is_empty() {
        condition(READY_CONDITION, ConditionStatus::True, "Succeeded", String::new(), generation)
    } else {
        condition(READY_CONDITION, ConditionStatus::False, "Failed", errors.to_string(), generation)
    }
}

fn cordoned_condition(cordoned: bool, generation: Option<i64>) -> Condition {
    if cordoned {
        condition(
            CORDONED_CONDITION,
            ConditionStatus::True,
            "Cordoned",
            "replication is paused".to_string(),
            generation,
        )
    } else {
        condition(CORDONED_CONDITION, ConditionStatus::False, "Active", String::new(), generation)
    }
}

/// Controller triggers this whenever a replication spec, or something it depends on, changed.
pub async fn reconcile_with<K: ReplicationResource>(cr: Arc<K>, data: Arc<Data>) -> Result<Action, Error> {
    let key = object_key_of(cr.as_ref())?;
    let log_header = format!("Reconciling {}:", key);
    let api = data.api.as_ref();

    // Get the custom resource again: the cached copy may be stale.
    let resource: K = match api.get(&key).await.map_err(Error::CRGetFailed)? {
        Some(doc) => to_typed(doc, "replication spec")?,
        None => {
            info!("{} not found, end reconcile", log_header);
            data.metrics.forget(&key);
            return Ok(Action::await_change());
        }
    };
    let spec = resource.replication();
    let resync = spec.resync_period.unwrap_or(data.config.default_resync_period);
    let generation = resource.meta().generation;
    let previous = ProcessedSet::from_items(&resource.replication_status().processed_items);

    if resource.meta().deletion_timestamp.is_some() {
        return finalize(&data, &key, &resource, &previous, &log_header).await;
    }

    if spec.pruning_on_delete && !resource.finalizers().iter().any(|f| f == FINALIZER) {
        info!("{} adding finalizer", log_header);
        let mut finalizers = resource.finalizers().to_vec();
        finalizers.push(FINALIZER.to_string());
        patch_finalizers(api, &key, &resource, finalizers).await?;
    }

    if spec.cordoned {
        info!("{} cordoned, replication paused", log_header);
        let update = StatusUpdate {
            cordoned: Some(cordoned_condition(true, generation)),
            ..StatusUpdate::default()
        };
        update_status::<K>(api, &key, &update).await?;
        return Ok(Action::requeue(resync));
    }

    if let Err(e) = resource.check_dependencies(api).await {
        info!("{} {}", log_header, e);
        let update = StatusUpdate {
            ready: Some(condition(
                READY_CONDITION,
                ConditionStatus::False,
                "DependencyNotReady",
                e.to_string(),
                generation,
            )),
            cordoned: Some(cordoned_condition(false, generation)),
            ..StatusUpdate::default()
        };
        update_and_report::<K>(&data, &key, &resource, &update).await?;
        return Ok(Action::requeue(resync));
    }

    let Some(client) = resolve_client(&data, &key, &resource).await? else {
        info!("{} default service account assigned, waiting for the update", log_header);
        return Ok(Action::requeue(resync));
    };

    let Some(tenants) = resource.select_tenants(api).await? else {
        info!("{} no owning tenant, nothing to replicate", log_header);
        return Ok(Action::requeue(resync));
    };
    let resolver = TargetResolver::new(api, spec.scope, tenants).await?;
    let selected_tenants = resolver.tenant_names();
    debug!("{} selected tenants {:?}", log_header, selected_tenants);

    let identity = SpecIdentity {
        namespace: key.namespace.clone(),
        name: key.name.clone(),
    };
    let processor = Processor::new(client.as_ref(), &data.registry, &data.config);
    let outcome = processor.process(&identity, &resolver, &spec.resources).await?;
    let mut errors = outcome.errors;
    info!(
        "{} applied {} objects with {} errors",
        log_header,
        outcome.applied,
        errors.len()
    );

    debug!(
        "{} next pass in {}",
        log_header,
        humantime::format_duration(resync)
    );
    let current = if errors.has_render_errors() {
        warn!("{} some items could not be rendered, skipping prune", log_header);
        outcome.processed.union(&previous)
    } else if status_changed(&previous, &outcome.processed) {
        let pruned = prune(client.as_ref(), &previous, &outcome.processed).await;
        info!(
            "{} pruned {} objects, {} retained for retry",
            log_header,
            pruned.pruned.len(),
            pruned.retained.len()
        );
        errors.extend(pruned.errors);
        outcome.processed.union(&pruned.retained)
    } else {
        outcome.processed
    };

    let update = StatusUpdate {
        processed_items: Some(current.to_items()),
        selected_tenants: Some(selected_tenants),
        ready: Some(ready_condition(&errors, generation)),
        cordoned: Some(cordoned_condition(false, generation)),
    };
    update_and_report::<K>(&data, &key, &resource, &update).await?;
    Ok(Action::requeue(resync))
}

// Prunes everything this spec created, then lets the deletion proceed.
async fn finalize<K: ReplicationResource>(
    data: &Data,
    key: &ObjectKey,
    resource: &K,
    previous: &ProcessedSet,
    log_header: &str,
) -> Result<Action, Error> {
    if !resource.finalizers().iter().any(|f| f == FINALIZER) {
        return Ok(Action::await_change());
    }
    if resource.replication().pruning_on_delete {
        let client = client::deletion_client(data, resource)?;
        let pruned = prune(client.as_ref(), previous, &ProcessedSet::new()).await;
        info!("{} pruned {} objects on delete", log_header, pruned.pruned.len());
        if !pruned.errors.is_empty() {
            warn!("{} keeping finalizer: {}", log_header, pruned.errors);
            let update = StatusUpdate {
                processed_items: Some(pruned.retained.to_items()),
                ready: Some(ready_condition(&pruned.errors, resource.meta().generation)),
                ..StatusUpdate::default()
            };
            update_and_report::<K>(data, key, resource, &update).await?;
            return Ok(Action::requeue(data.config.error_requeue));
        }
    }
    let finalizers = resource
        .finalizers()
        .iter()
        .filter(|f| *f != FINALIZER)
        .cloned()
        .collect();
    info!("{} removing finalizer", log_header);
    patch_finalizers(data.api.as_ref(), key, resource, finalizers).await?;
    data.metrics.forget(key);
    Ok(Action::await_change())
}

// The resourceVersion makes the patch fail instead of clobbering a concurrent finalizer change.
async fn patch_finalizers<K: ReplicationResource>(
    api: &dyn KubeApi,
    key: &ObjectKey,
    resource: &K,
    finalizers: Vec<String>,
) -> Result<(), Error> {
    let patch = json!({
        "metadata": {
            "finalizers": finalizers,
            "resourceVersion": resource.resource_version(),
        }
    });
    api.merge_patch(key, &patch).await.map_err(Error::PatchFailed)?;
    Ok(())
}

async fn update_and_report<K: ReplicationResource>(
    data: &Data,
    key: &ObjectKey,
    resource: &K,
    update: &StatusUpdate,
) -> Result<(), Error> {
    update_status::<K>(data.api.as_ref(), key, update).await?;
    if let Some(ready) = &update.ready {
        let before = resource
            .replication_status()
            .condition(READY_CONDITION)
            .map(|c| c.status);
        if before.is_some_and(|before| before != ready.status) {
            publish_transition(data.api.as_ref(), key, resource.uid(), ready).await;
        }
        data.metrics.record(key, ready);
    }
    Ok(())
}

/// The controller triggers this on reconcile errors
pub fn error_policy<K: ReplicationResource>(_object: Arc<K>, error: &Error, ctx: Arc<Data>) -> Action {
    warn!("Reconcile failed due to error: {}", error);
    Action::requeue(ctx.config.error_requeue)
}
