// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::crds::{ConditionStatus, ItemCondition, ObjectReference, Owner, OwnerScope, ProcessedItem};
use crate::kubernetes_api_objects::document::Document;
use crate::kubernetes_api_objects::object_key::ObjectKey;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::*;

// The canonical form is
//   Kind=<kind>,APIVersion=<apiVersion>,Namespace=<namespace>,Name=<name>,Owner=<scope>/<name>/<uid>
// with '%', ',' and '=' percent-escaped in every value and '/' additionally escaped inside the owner.
const FIELDS: [&str; 5] = ["Kind", "APIVersion", "Namespace", "Name", "Owner"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("expected {} fields, found {0}", FIELDS.len())]
    FieldCount(usize),
    #[error("expected field {expected}, found {found:?}")]
    UnexpectedField { expected: &'static str, found: String },
    #[error("invalid escape in {0:?}")]
    InvalidEscape(String),
    #[error("field {0} must not be empty")]
    Empty(&'static str),
    #[error("malformed owner {0:?}")]
    MalformedOwner(String),
    #[error("unknown owner scope {0:?}")]
    UnknownScope(String),
}

fn escape(value: &str, owner_part: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' => out.push_str("%25"),
            ',' => out.push_str("%2C"),
            '=' => out.push_str("%3D"),
            '/' if owner_part => out.push_str("%2F"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(value: &str) -> Result<String, LedgerError> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let code = rest
            .get(pos + 1..pos + 3)
            .ok_or_else(|| LedgerError::InvalidEscape(value.to_string()))?;
        let c = match code {
            "25" => '%',
            "2C" => ',',
            "3D" => '=',
            "2F" => '/',
            _ => return Err(LedgerError::InvalidEscape(value.to_string())),
        };
        out.push(c);
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Ok(out)
}

impl ObjectReference {
    pub fn for_document(doc: &Document, owner: &Owner) -> Option<ObjectReference> {
        let key = ObjectKey::from_document(doc)?;
        Some(ObjectReference {
            kind: key.kind,
            api_version: key.api_version,
            namespace: key.namespace,
            name: key.name,
            owner: owner.clone(),
        })
    }

    pub fn object_key(&self) -> ObjectKey {
        ObjectKey::new(
            &self.api_version,
            &self.kind,
            self.namespace.as_deref(),
            &self.name,
        )
    }

    pub fn encode(&self) -> String {
        format!(
            "Kind={},APIVersion={},Namespace={},Name={},Owner={}/{}/{}",
            escape(&self.kind, false),
            escape(&self.api_version, false),
            escape(self.namespace.as_deref().unwrap_or_default(), false),
            escape(&self.name, false),
            self.owner.scope,
            escape(&self.owner.name, true),
            escape(&self.owner.uid, true),
        )
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn parse_owner(raw: &str) -> Result<Owner, LedgerError> {
    let parts: Vec<&str> = raw.split('/').collect();
    let [scope, name, uid] = parts.as_slice() else {
        return Err(LedgerError::MalformedOwner(raw.to_string()));
    };
    let scope = match *scope {
        "Tenant" => OwnerScope::Tenant,
        "Namespace" => OwnerScope::Namespace,
        other => return Err(LedgerError::UnknownScope(other.to_string())),
    };
    let name = unescape(name)?;
    if name.is_empty() {
        return Err(LedgerError::Empty("Owner"));
    }
    Ok(Owner {
        scope,
        name,
        uid: unescape(uid)?,
    })
}

impl FromStr for ObjectReference {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<ObjectReference, LedgerError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != FIELDS.len() {
            return Err(LedgerError::FieldCount(parts.len()));
        }
        let mut values = Vec::with_capacity(FIELDS.len());
        for (expected, part) in FIELDS.iter().zip(parts) {
            match part.split_once('=') {
                Some((key, value)) if key == *expected => values.push(value),
                _ => {
                    return Err(LedgerError::UnexpectedField {
                        expected: *expected,
                        found: part.to_string(),
                    })
                }
            }
        }
        let required = |idx: usize| -> Result<String, LedgerError> {
            let value = unescape(values[idx])?;
            if value.is_empty() {
                return Err(LedgerError::Empty(FIELDS[idx]));
            }
            Ok(value)
        };
        let namespace = unescape(values[2])?;
        Ok(ObjectReference {
            kind: required(0)?,
            api_version: required(1)?,
            namespace: Some(namespace).filter(|ns| !ns.is_empty()),
            name: required(3)?,
            owner: parse_owner(values[4])?,
        })
    }
}

// ProcessedSet is the ledger of one reconcile, keyed by the canonical encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedSet {
    entries: BTreeMap<String, ItemCondition>,
}

impl ProcessedSet {
    pub fn new() -> ProcessedSet {
        ProcessedSet::default()
    }

    pub fn from_items(items: &[ProcessedItem]) -> ProcessedSet {
        let mut set = ProcessedSet::new();
        for item in items {
            set.record(&item.reference, item.condition.clone());
        }
        set
    }

    // A failure recorded for an object is not overwritten by a later success for the same object.
    pub fn record(&mut self, reference: &ObjectReference, condition: ItemCondition) {
        let key = reference.encode();
        match self.entries.get(&key) {
            Some(existing) if existing.status == ConditionStatus::False => {}
            _ => {
                self.entries.insert(key, condition);
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Entries of self override entries of other.
    pub fn union(&self, other: &ProcessedSet) -> ProcessedSet {
        let mut entries = other.entries.clone();
        entries.extend(self.entries.clone());
        ProcessedSet { entries }
    }

    // Identities of every decodable entry, regardless of owner.
    pub fn object_keys(&self) -> BTreeSet<ObjectKey> {
        self.entries
            .keys()
            .filter_map(|k| k.parse::<ObjectReference>().ok())
            .map(|r| r.object_key())
            .collect()
    }

    // Decodes the ledger for persistence. Undecodable entries are dropped.
    pub fn to_items(&self) -> Vec<ProcessedItem> {
        let mut items = Vec::with_capacity(self.entries.len());
        for (key, condition) in &self.entries {
            match key.parse::<ObjectReference>() {
                Ok(reference) => items.push(ProcessedItem {
                    reference,
                    condition: condition.clone(),
                }),
                Err(e) => warn!("dropping malformed ledger entry {:?}: {}", key, e),
            }
        }
        items
    }
}

#[cfg(test)]
impl ProcessedSet {
    pub fn condition(&self, key: &str) -> Option<&ItemCondition> {
        self.entries.get(key)
    }
}
