// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::crds::Condition;
use crate::kubernetes_api_objects::object_key::ObjectKey;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

// Metrics keeps the last Ready condition of every live replication spec.
#[derive(Debug, Default)]
pub struct Metrics {
    conditions: Mutex<BTreeMap<ObjectKey, Condition>>,
}

impl Metrics {
    fn table(&self) -> MutexGuard<'_, BTreeMap<ObjectKey, Condition>> {
        self.conditions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, key: &ObjectKey, condition: &Condition) {
        self.table().insert(key.clone(), condition.clone());
    }

    pub fn forget(&self, key: &ObjectKey) {
        self.table().remove(key);
    }

}

#[cfg(test)]
impl Metrics {
    pub fn condition(&self, key: &ObjectKey) -> Option<Condition> {
        self.table().get(key).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }
}
