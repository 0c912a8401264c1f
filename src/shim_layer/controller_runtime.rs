// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::config::ControllerConfig;
use crate::crds::{GlobalTenantResource, Tenant, TenantResource};
use crate::error::Error;
use crate::kubernetes_api_objects::label_selector::Selector;
use crate::reconciler::{error_policy, reconcile_with, Data};
use crate::shim_layer::kube_api::KubeClient;
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::Api,
    runtime::{
        controller::{self, Action, Controller},
        reflector::{self, ObjectRef, Store},
        watcher, WatchStreamExt,
    },
    Resource, ResourceExt,
};
use std::sync::Arc;
use tracing::*;

pub fn report_controller_reconciled<K, QueueErr>(
    controller_name: &str,
    result: &Result<(ObjectRef<K>, Action), controller::Error<Error, QueueErr>>,
) where
    K: Resource,
    QueueErr: std::error::Error,
{
    match result {
        Ok((obj, _)) => {
            tracing::info!(
                controller.name = controller_name,
                object = %obj,
                "Reconciled object"
            );
        }
        Err(err) => {
            tracing::error!(
                controller.name = controller_name,
                error = err as &dyn std::error::Error,
                "Failed to reconcile object",
            );
        }
    }
}

// Every global spec whose tenant selector matches the tenant.
pub fn global_specs_for_tenant(
    store: &Store<GlobalTenantResource>,
    tenant: &Tenant,
) -> Vec<ObjectRef<GlobalTenantResource>> {
    store
        .state()
        .into_iter()
        .filter(|gtr| {
            Selector::from_label_selector(&gtr.spec.tenant_selector)
                .map_or(false, |selector| selector.matches(tenant.labels()))
        })
        .map(|gtr| ObjectRef::from_obj(gtr.as_ref()))
        .collect()
}

// Every TenantResource living in one of the tenant's namespaces, listed or labelled.
pub fn tenant_resources_for_tenant(
    store: &Store<TenantResource>,
    namespaces: &Store<Namespace>,
    tenant: &Tenant,
) -> Vec<ObjectRef<TenantResource>> {
    store
        .state()
        .into_iter()
        .filter(|tr| {
            tr.namespace().map_or(false, |ns| {
                tenant.owns_namespace(&ns)
                    || namespaces
                        .get(&ObjectRef::new(&ns))
                        .map_or(false, |namespace| tenant.claims_namespace(&namespace))
            })
        })
        .map(|tr| ObjectRef::from_obj(tr.as_ref()))
        .collect()
}

// Every TenantResource that depends on the changed one.
pub fn dependents_of(
    store: &Store<TenantResource>,
    changed: &TenantResource,
) -> Vec<ObjectRef<TenantResource>> {
    let name = changed.name_any();
    let namespace = changed.namespace();
    store
        .state()
        .into_iter()
        .filter(|tr| tr.namespace() == namespace && tr.spec.depends_on.iter().any(|d| d.name == name))
        .map(|tr| ObjectRef::from_obj(tr.as_ref()))
        .collect()
}

// Runs the global and the namespaced controller until a shutdown signal arrives.
pub async fn run(config: ControllerConfig) -> Result<()> {
    let kube_client = KubeClient::try_default(&config.reporter).await?;
    let client = kube_client.client();
    let concurrency = config.concurrency;
    let data = Arc::new(Data::new(Arc::new(kube_client), config));

    let gtr_api = Api::<GlobalTenantResource>::all(client.clone());
    let tr_api = Api::<TenantResource>::all(client.clone());
    let tenant_api = Api::<Tenant>::all(client.clone());
    let namespace_api = Api::<Namespace>::all(client.clone());

    let (namespace_store, namespace_writer) = reflector::store::<Namespace>();
    let namespace_reflector = watcher(namespace_api, watcher::Config::default())
        .default_backoff()
        .reflect(namespace_writer)
        .for_each(|_| futures::future::ready(()));

    let global = Controller::new(gtr_api, watcher::Config::default())
        .with_config(controller::Config::default().concurrency(concurrency));
    let global_store = global.store();
    let global = global
        .watches(tenant_api.clone(), watcher::Config::default(), move |tenant: Tenant| {
            global_specs_for_tenant(&global_store, &tenant)
        })
        .shutdown_on_signal()
        .run(
            reconcile_with::<GlobalTenantResource>,
            error_policy::<GlobalTenantResource>,
            data.clone(),
        )
        .map(|res| report_controller_reconciled("global-tenant-resource-controller", &res));

    let namespaced = Controller::new(tr_api.clone(), watcher::Config::default())
        .with_config(controller::Config::default().concurrency(concurrency));
    let tenant_store = namespaced.store();
    let dependency_store = namespaced.store();
    let namespaced = namespaced
        .watches(tenant_api, watcher::Config::default(), move |tenant: Tenant| {
            tenant_resources_for_tenant(&tenant_store, &namespace_store, &tenant)
        })
        .watches(tr_api, watcher::Config::default(), move |changed: TenantResource| {
            dependents_of(&dependency_store, &changed)
        })
        .shutdown_on_signal()
        .run(
            reconcile_with::<TenantResource>,
            error_policy::<TenantResource>,
            data,
        )
        .map(|res| report_controller_reconciled("tenant-resource-controller", &res));

    info!("starting controllers");
    let controllers = futures::stream::select(global, namespaced).collect::<()>();
    tokio::select! {
        _ = controllers => info!("controller terminated"),
        _ = namespace_reflector => warn!("namespace watch ended"),
    }
    Ok(())
}
