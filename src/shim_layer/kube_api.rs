// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::document::Document;
use crate::kubernetes_api_objects::error::APIError;
use crate::kubernetes_api_objects::label_selector::Selector;
use crate::kubernetes_api_objects::object_key::{gvk_of, ObjectKey};
use crate::shim_layer::api::{EventRecord, EventSubject, EventType, KubeApi};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::api::{
    Api, ApiResource, DeleteParams, DynamicObject, ListParams, Patch, PatchParams, PostParams,
};
use kube::discovery::{self, ApiCapabilities, Scope};
use kube::runtime::events::{Event, EventType as KubeEventType, Recorder, Reporter};
use kube::{Client, Config};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::*;

type ResourceCache = Arc<RwLock<BTreeMap<String, (ApiResource, ApiCapabilities)>>>;

// KubeClient serves KubeApi with a kube::Client. Discovery results are cached and shared with
// impersonated clients derived from it.
#[derive(Clone)]
pub struct KubeClient {
    client: Client,
    config: Config,
    reporter: Reporter,
    resources: ResourceCache,
}

impl KubeClient {
    pub async fn try_default(reporter: &str) -> anyhow::Result<KubeClient> {
        let config = Config::infer().await?;
        Ok(KubeClient::from_config(config, reporter)?)
    }

    pub fn from_config(config: Config, reporter: &str) -> Result<KubeClient, kube::Error> {
        let client = Client::try_from(config.clone())?;
        Ok(KubeClient {
            client,
            config,
            reporter: Reporter {
                controller: reporter.to_string(),
                instance: std::env::var("POD_NAME").ok(),
            },
            resources: ResourceCache::default(),
        })
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    async fn resolve(
        &self,
        api_version: &str,
        kind: &str,
    ) -> Result<(ApiResource, ApiCapabilities), APIError> {
        let cache_key = format!("{}/{}", api_version, kind);
        if let Some(found) = self.resources.read().await.get(&cache_key) {
            return Ok(found.clone());
        }
        let gvk = gvk_of(api_version, kind);
        let resolved = discovery::pinned_kind(&self.client, &gvk).await?;
        debug!("discovered {} as {}", cache_key, resolved.0.plural);
        self.resources
            .write()
            .await
            .insert(cache_key, resolved.clone());
        Ok(resolved)
    }

    async fn dynamic_api(
        &self,
        api_version: &str,
        kind: &str,
        namespace: Option<&str>,
    ) -> Result<Api<DynamicObject>, APIError> {
        let (resource, capabilities) = self.resolve(api_version, kind).await?;
        Ok(match (capabilities.scope, namespace) {
            (Scope::Namespaced, Some(ns)) => {
                Api::namespaced_with(self.client.clone(), ns, &resource)
            }
            _ => Api::all_with(self.client.clone(), &resource),
        })
    }

    async fn api_for(&self, key: &ObjectKey) -> Result<Api<DynamicObject>, APIError> {
        self.dynamic_api(&key.api_version, &key.kind, key.namespace.as_deref())
            .await
    }
}

fn into_document(obj: DynamicObject) -> Result<Document, APIError> {
    let value = serde_json::to_value(obj).map_err(|e| APIError::Other(e.to_string()))?;
    Document::try_from(value).map_err(|e| APIError::Other(e.to_string()))
}

#[async_trait]
impl KubeApi for KubeClient {
    async fn get(&self, key: &ObjectKey) -> Result<Option<Document>, APIError> {
        let api = self.api_for(key).await?;
        match api.get_opt(&key.name).await? {
            Some(obj) => Ok(Some(into_document(obj)?)),
            None => Ok(None),
        }
    }

    async fn list(
        &self,
        api_version: &str,
        kind: &str,
        namespace: Option<&str>,
        selector: &Selector,
    ) -> Result<Vec<Document>, APIError> {
        let api = self.dynamic_api(api_version, kind, namespace).await?;
        let mut lp = ListParams::default();
        if !selector.is_everything() {
            lp = lp.labels(&selector.to_string());
        }
        api.list(&lp)
            .await?
            .items
            .into_iter()
            .map(into_document)
            .collect()
    }

    async fn apply(
        &self,
        object: &Document,
        field_manager: &str,
        force: bool,
    ) -> Result<Document, APIError> {
        let key = ObjectKey::from_document(object)
            .ok_or_else(|| APIError::Invalid("object lacks apiVersion, kind or name".into()))?;
        let api = self.api_for(&key).await?;
        let mut pp = PatchParams::apply(field_manager);
        if force {
            pp = pp.force();
        }
        let applied = api
            .patch(&key.name, &pp, &Patch::Apply(object.as_value()))
            .await?;
        into_document(applied)
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), APIError> {
        let api = self.api_for(key).await?;
        api.delete(&key.name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn merge_patch(
        &self,
        key: &ObjectKey,
        patch: &serde_json::Value,
    ) -> Result<Document, APIError> {
        let api = self.api_for(key).await?;
        let patched = api
            .patch(&key.name, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        into_document(patched)
    }

    async fn replace_status(&self, key: &ObjectKey, object: &Document) -> Result<Document, APIError> {
        let api = self.api_for(key).await?;
        let data = serde_json::to_vec(object.as_value()).map_err(|e| APIError::Other(e.to_string()))?;
        let replaced = api
            .replace_status(&key.name, &PostParams::default(), data)
            .await?;
        into_document(replaced)
    }

    async fn publish_event(&self, subject: &EventSubject, event: &EventRecord) -> Result<(), APIError> {
        let recorder = Recorder::new(self.client.clone(), self.reporter.clone());
        let reference = ObjectReference {
            api_version: Some(subject.key.api_version.clone()),
            kind: Some(subject.key.kind.clone()),
            name: Some(subject.key.name.clone()),
            namespace: subject.key.namespace.clone(),
            uid: subject.uid.clone(),
            ..ObjectReference::default()
        };
        let type_ = match event.type_ {
            EventType::Normal => KubeEventType::Normal,
            EventType::Warning => KubeEventType::Warning,
        };
        recorder
            .publish(
                &Event {
                    type_,
                    reason: event.reason.clone(),
                    note: Some(event.note.clone()),
                    action: event.action.clone(),
                    secondary: None,
                },
                &reference,
            )
            .await?;
        Ok(())
    }

    fn impersonate(&self, user: &str) -> Result<Arc<dyn KubeApi>, APIError> {
        let mut config = self.config.clone();
        config.auth_info.impersonate = Some(user.to_string());
        let client = Client::try_from(config.clone())?;
        Ok(Arc::new(KubeClient {
            client,
            config,
            reporter: self.reporter.clone(),
            resources: self.resources.clone(),
        }))
    }
}
