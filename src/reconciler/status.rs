// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::crds::{Condition, ConditionStatus, ProcessedItem};
use crate::error::Error;
use crate::kubernetes_api_objects::object_key::ObjectKey;
use crate::reconciler::ReplicationResource;
use crate::shim_layer::api::{from_typed, to_typed, EventRecord, EventSubject, EventType, KubeApi};
use tracing::*;

// Attempts before a conflicting status write is given up until the next reconcile.
pub const STATUS_RETRIES: usize = 5;

// The parts of the status one reconcile wants to set. Unset fields keep their persisted value.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub processed_items: Option<Vec<ProcessedItem>>,
    pub selected_tenants: Option<Vec<String>>,
    pub ready: Option<Condition>,
    pub cordoned: Option<Condition>,
}

impl StatusUpdate {
    pub fn apply_to<K: ReplicationResource>(&self, resource: &mut K) {
        let mut status = resource.replication_status();
        if let Some(items) = &self.processed_items {
            status.processed_items = items.clone();
        }
        if let Some(ready) = &self.ready {
            status.set_condition(ready.clone());
        }
        if let Some(cordoned) = &self.cordoned {
            status.set_condition(cordoned.clone());
        }
        resource.set_replication_status(status);
        if let Some(tenants) = &self.selected_tenants {
            resource.set_selected_tenants(tenants.clone());
        }
    }
}

// Timestamps move on every pass, so they are left out when deciding whether a write is needed.
fn comparable<K: ReplicationResource>(resource: &K) -> Result<serde_json::Value, Error> {
    let mut status = resource.replication_status();
    for condition in status.conditions.iter_mut() {
        condition.last_transition_time = None;
    }
    let mut value = serde_json::to_value(resource).map_err(|e| Error::ConversionFailed("status", e))?;
    let replication = serde_json::to_value(&status).map_err(|e| Error::ConversionFailed("status", e))?;
    value["status"]["conditions"] = replication["conditions"].clone();
    Ok(value["status"].clone())
}

// Writes the status subresource under optimistic concurrency: re-read the latest object, apply the
// update, skip the write when nothing changed, retry on conflict. Returns whether a write happened.
pub async fn update_status<K: ReplicationResource>(
    api: &dyn KubeApi,
    key: &ObjectKey,
    update: &StatusUpdate,
) -> Result<bool, Error> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let Some(doc) = api.get(key).await.map_err(Error::UpdateStatusFailed)? else {
            debug!("{} disappeared before its status could be written", key);
            return Ok(false);
        };
        let mut latest: K = to_typed(doc, "replication spec")?;
        let before = comparable(&latest)?;
        update.apply_to(&mut latest);
        if comparable(&latest)? == before {
            return Ok(false);
        }
        let doc = from_typed(&latest, "replication spec")?;
        match api.replace_status(key, &doc).await {
            Ok(_) => return Ok(true),
            Err(e) if e.is_conflict() && attempt < STATUS_RETRIES => {
                debug!("status of {} changed underneath, retrying ({})", key, attempt);
            }
            Err(e) => return Err(Error::UpdateStatusFailed(e)),
        }
    }
}

// Events are best effort: a failure is logged and the reconcile goes on.
pub async fn publish_transition(
    api: &dyn KubeApi,
    key: &ObjectKey,
    uid: Option<String>,
    ready: &Condition,
) {
    let (type_, reason) = match ready.status {
        ConditionStatus::True => (EventType::Normal, "Ready"),
        _ => (EventType::Warning, "Failed"),
    };
    let note = if ready.message.is_empty() {
        format!("{} is {}", key, ready.reason)
    } else {
        ready.message.clone()
    };
    let record = EventRecord {
        type_,
        reason: reason.to_string(),
        note,
        action: "Reconcile".to_string(),
    };
    let subject = EventSubject {
        key: key.clone(),
        uid,
    };
    if let Err(e) = api.publish_event(&subject, &record).await {
        warn!("failed to publish event for {}: {}", key, e);
    }
}
