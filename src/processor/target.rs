// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::crds::{Owner, OwnerScope, Scope, Tenant, API_VERSION};
use crate::error::Error;
use crate::kubernetes_api_objects::label_selector::Selector;
use crate::shim_layer::api::{to_typed, KubeApi};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::ResourceExt;

// One place replicated objects go: a tenant, or one of its namespaces.
#[derive(Debug, Clone)]
pub struct Target {
    pub tenant: Tenant,
    pub namespace: Option<Namespace>,
    pub owner: Owner,
}

impl Target {
    pub fn namespace_name(&self) -> Option<String> {
        self.namespace.as_ref().map(|ns| ns.name_any())
    }
}

pub async fn list_tenants(api: &dyn KubeApi, selector: &Selector) -> Result<Vec<Tenant>, Error> {
    let docs = api
        .list(API_VERSION, "Tenant", None, selector)
        .await
        .map_err(|e| Error::ListFailed("tenants", e))?;
    let mut tenants = docs
        .into_iter()
        .map(|doc| to_typed::<Tenant>(doc, "Tenant"))
        .collect::<Result<Vec<_>, _>>()?;
    tenants.sort_by_key(|t| t.name_any());
    Ok(tenants)
}

// TargetResolver expands tenants into targets. Namespaces are listed once per reconcile and filtered
// per section.
pub struct TargetResolver {
    scope: Scope,
    tenants: Vec<Tenant>,
    namespaces: Vec<Namespace>,
}

impl TargetResolver {
    pub async fn new(
        api: &dyn KubeApi,
        scope: Scope,
        tenants: Vec<Tenant>,
    ) -> Result<TargetResolver, Error> {
        let namespaces = match scope {
            Scope::Tenant => Vec::new(),
            Scope::Namespace => {
                let docs = api
                    .list("v1", "Namespace", None, &Selector::everything())
                    .await
                    .map_err(|e| Error::ListFailed("namespaces", e))?;
                let mut namespaces = docs
                    .into_iter()
                    .map(|doc| to_typed::<Namespace>(doc, "Namespace"))
                    .collect::<Result<Vec<_>, _>>()?;
                namespaces.sort_by_key(|ns| ns.name_any());
                namespaces
            }
        };
        Ok(TargetResolver::from_parts(scope, tenants, namespaces))
    }

    pub fn from_parts(scope: Scope, tenants: Vec<Tenant>, namespaces: Vec<Namespace>) -> TargetResolver {
        TargetResolver {
            scope,
            tenants,
            namespaces,
        }
    }

    pub fn tenant_names(&self) -> Vec<String> {
        self.tenants.iter().map(|t| t.name_any()).collect()
    }

    pub fn targets(&self, namespace_selector: Option<&LabelSelector>) -> Result<Vec<Target>, Error> {
        match self.scope {
            Scope::Tenant => Ok(self
                .tenants
                .iter()
                .map(|tenant| Target {
                    tenant: tenant.clone(),
                    namespace: None,
                    owner: Owner {
                        scope: OwnerScope::Tenant,
                        name: tenant.name_any(),
                        uid: tenant.uid().unwrap_or_default(),
                    },
                })
                .collect()),
            Scope::Namespace => {
                let selector = Selector::from_optional(namespace_selector)?;
                let mut targets = Vec::new();
                for tenant in &self.tenants {
                    for namespace in &self.namespaces {
                        if !tenant.claims_namespace(namespace)
                            || !selector.matches(namespace.labels())
                        {
                            continue;
                        }
                        targets.push(Target {
                            tenant: tenant.clone(),
                            namespace: Some(namespace.clone()),
                            owner: Owner {
                                scope: OwnerScope::Namespace,
                                name: namespace.name_any(),
                                uid: namespace.uid().unwrap_or_default(),
                            },
                        });
                    }
                }
                Ok(targets)
            }
        }
    }
}
