// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::crds::{ItemCondition, ObjectReference};
use crate::error::{ErrorList, ProcessError};
use crate::kubernetes_api_objects::object_key::ObjectKey;
use crate::processor::ledger::ProcessedSet;
use crate::shim_layer::api::KubeApi;
use tracing::*;

// Keys recorded last time that this reconcile did not produce.
pub fn orphaned(previous: &ProcessedSet, current: &ProcessedSet) -> Vec<String> {
    previous
        .keys()
        .filter(|key| !current.contains(key))
        .cloned()
        .collect()
}

// Only identities are compared: a changed condition on the same object does not count.
pub fn status_changed(previous: &ProcessedSet, current: &ProcessedSet) -> bool {
    !orphaned(previous, current).is_empty() || previous.len() != current.len()
}

#[derive(Debug, Default)]
pub struct PruneOutcome {
    // References whose deletion failed. They stay in the ledger so the next pass retries them.
    pub retained: ProcessedSet,
    pub errors: ErrorList,
    pub pruned: Vec<ObjectKey>,
    pub skipped: usize,
}

// Deletes every orphaned reference. Missing objects count as pruned, malformed entries are logged and
// dropped, and an object still produced under another owner is left alone.
pub async fn prune(api: &dyn KubeApi, previous: &ProcessedSet, current: &ProcessedSet) -> PruneOutcome {
    let mut outcome = PruneOutcome::default();
    let desired = current.object_keys();
    for encoded in orphaned(previous, current) {
        let reference = match encoded.parse::<ObjectReference>() {
            Ok(reference) => reference,
            Err(e) => {
                warn!("skipping malformed processed item {:?}: {}", encoded, e);
                outcome.skipped += 1;
                continue;
            }
        };
        let key = reference.object_key();
        if desired.contains(&key) {
            debug!("{} changed owner, not pruning", key);
            continue;
        }
        match api.delete(&key).await {
            Ok(()) => {
                info!("pruned {}", key);
                outcome.pruned.push(key);
            }
            Err(e) if e.is_not_found() => {
                debug!("{} already gone", key);
                outcome.pruned.push(key);
            }
            Err(e) => {
                warn!("failed to prune {}: {}", key, e);
                outcome
                    .retained
                    .record(&reference, ItemCondition::failed("PruneFailed", e.to_string()));
                outcome.errors.push(ProcessError::Prune { key, source: e });
            }
        }
    }
    outcome
}
