// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::document::{Document, Pointer};
use crate::kubernetes_api_objects::object_key::ObjectKey;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

// Fields the server owns. Appliers never manage them.
const SERVER_FIELDS: [&str; 4] = ["apiVersion", "kind", "metadata", "status"];
const IDENTITY_METADATA: [&str; 9] = [
    "name",
    "namespace",
    "uid",
    "resourceVersion",
    "generation",
    "creationTimestamp",
    "deletionTimestamp",
    "managedFields",
    "finalizers",
];

// One stored object with the leaf fields each field manager has applied.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub object: Document,
    pub managers: BTreeMap<String, BTreeSet<Pointer>>,
}

impl StoredObject {
    pub fn new(object: Document) -> StoredObject {
        StoredObject {
            object,
            managers: BTreeMap::new(),
        }
    }

    // Managers other than the given one that own the field or something above or below it.
    pub fn owners_of(&self, field: &Pointer, except: &str) -> Vec<String> {
        self.managers
            .iter()
            .filter(|(manager, _)| manager.as_str() != except)
            .filter(|(_, fields)| fields.iter().any(|f| overlaps(f, field)))
            .map(|(manager, _)| manager.clone())
            .collect()
    }
}

fn overlaps(a: &Pointer, b: &Pointer) -> bool {
    let (short, long) = if a.tokens().len() <= b.tokens().len() {
        (a, b)
    } else {
        (b, a)
    };
    long.tokens().starts_with(short.tokens())
}

// The leaf fields an applied configuration sets. Arrays are atomic, like lists without merge keys.
pub fn leaf_fields(object: &Document) -> BTreeSet<Pointer> {
    let mut leaves = BTreeSet::new();
    if let Value::Object(map) = object.as_value() {
        for (key, value) in map {
            if key == "metadata" {
                if let Value::Object(meta) = value {
                    for (meta_key, meta_value) in meta {
                        if IDENTITY_METADATA.contains(&meta_key.as_str()) {
                            continue;
                        }
                        collect(
                            &Pointer::from_tokens(["metadata", meta_key.as_str()]),
                            meta_value,
                            &mut leaves,
                        );
                    }
                }
            } else if !SERVER_FIELDS.contains(&key.as_str()) {
                collect(&Pointer::from_tokens([key.as_str()]), value, &mut leaves);
            }
        }
    }
    leaves
}

fn collect(at: &Pointer, value: &Value, leaves: &mut BTreeSet<Pointer>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                collect(&at.child(key.as_str()), child, leaves);
            }
        }
        _ => {
            leaves.insert(at.clone());
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectMap {
    inner: BTreeMap<ObjectKey, StoredObject>,
}

impl ObjectMap {
    pub fn get(&self, key: &ObjectKey) -> Option<&StoredObject> {
        self.inner.get(key)
    }

    pub fn get_mut(&mut self, key: &ObjectKey) -> Option<&mut StoredObject> {
        self.inner.get_mut(key)
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.inner.contains_key(key)
    }

    pub fn insert(&mut self, key: ObjectKey, stored: StoredObject) {
        self.inner.insert(key, stored);
    }

    pub fn remove(&mut self, key: &ObjectKey) -> Option<StoredObject> {
        self.inner.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectKey, &StoredObject)> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}
