// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::error::Error;
use crate::kubernetes_api_objects::document::Document;
use crate::kubernetes_api_objects::error::APIError;
use crate::kubernetes_api_objects::label_selector::Selector;
use crate::kubernetes_api_objects::object_key::ObjectKey;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub type_: EventType,
    pub reason: String,
    pub note: String,
    pub action: String,
}

// The object an event is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSubject {
    pub key: ObjectKey,
    pub uid: Option<String>,
}

// KubeApi is everything the controller asks of the API server. Objects travel as Documents so that
// one surface serves every group-version-kind.
#[async_trait]
pub trait KubeApi: Send + Sync {
    // Absence is Ok(None), not an error.
    async fn get(&self, key: &ObjectKey) -> Result<Option<Document>, APIError>;

    // Lists objects of a type, in one namespace or across all of them when namespace is None.
    async fn list(
        &self,
        api_version: &str,
        kind: &str,
        namespace: Option<&str>,
        selector: &Selector,
    ) -> Result<Vec<Document>, APIError>;

    // Server-side apply under the given field manager.
    async fn apply(
        &self,
        object: &Document,
        field_manager: &str,
        force: bool,
    ) -> Result<Document, APIError>;

    async fn delete(&self, key: &ObjectKey) -> Result<(), APIError>;

    // JSON merge patch. A metadata.resourceVersion in the patch makes the write conditional.
    async fn merge_patch(
        &self,
        key: &ObjectKey,
        patch: &serde_json::Value,
    ) -> Result<Document, APIError>;

    // Replaces the status subresource; fails with Conflict when the resourceVersion is stale.
    async fn replace_status(&self, key: &ObjectKey, object: &Document) -> Result<Document, APIError>;

    async fn publish_event(&self, subject: &EventSubject, event: &EventRecord) -> Result<(), APIError>;

    // A client acting as the given user.
    fn impersonate(&self, user: &str) -> Result<Arc<dyn KubeApi>, APIError>;
}

pub fn to_typed<T: DeserializeOwned>(doc: Document, what: &'static str) -> Result<T, Error> {
    serde_json::from_value(doc.into_value()).map_err(|e| Error::ConversionFailed(what, e))
}

pub fn from_typed<T: Serialize>(obj: &T, what: &'static str) -> Result<Document, Error> {
    let value = serde_json::to_value(obj).map_err(|e| Error::ConversionFailed(what, e))?;
    match value {
        serde_json::Value::Object(map) => Ok(Document::from(map)),
        _ => Err(Error::MissingObjectKey(".metadata")),
    }
}
