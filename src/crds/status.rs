// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::*;

pub const READY_CONDITION: &str = "Ready";
pub const CORDONED_CONDITION: &str = "Cordoned";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, JsonSchema)]
pub enum OwnerScope {
    Tenant,
    #[default]
    Namespace,
}

impl fmt::Display for OwnerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerScope::Tenant => f.write_str("Tenant"),
            OwnerScope::Namespace => f.write_str("Namespace"),
        }
    }
}

// Owner is the tenant or namespace that claims a replicated object.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, JsonSchema)]
pub struct Owner {
    pub scope: OwnerScope,
    pub name: String,
    #[serde(default)]
    pub uid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub kind: String,
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
    #[serde(default)]
    pub owner: Owner,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ItemCondition {
    #[serde(default)]
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ItemCondition {
    pub fn succeeded() -> ItemCondition {
        ItemCondition {
            status: ConditionStatus::True,
            reason: "Applied".to_string(),
            message: String::new(),
        }
    }

    pub fn failed(reason: &str, message: impl Into<String>) -> ItemCondition {
        ItemCondition {
            status: ConditionStatus::False,
            reason: reason.to_string(),
            message: message.into(),
        }
    }
}

// One ledger entry as persisted in status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ProcessedItem {
    #[serde(flatten)]
    pub reference: ObjectReference,
    #[serde(flatten)]
    pub condition: ItemCondition,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationStatus {
    #[serde(default, deserialize_with = "decode_processed_items")]
    #[schemars(with = "Vec<ProcessedItem>")]
    pub processed_items: Vec<ProcessedItem>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

// The persisted ledger is decoded entry by entry. Entries that no longer decode are dropped with a
// warning and the rest of the status stays usable.
fn decode_processed_items<'de, D>(deserializer: D) -> Result<Vec<ProcessedItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            warn!("dropping malformed processedItems {}", other);
            return Ok(Vec::new());
        }
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<ProcessedItem>(entry.clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("dropping malformed ledger entry {}: {}", entry, e);
                None
            }
        })
        .collect())
}

impl ReplicationStatus {
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    // Replaces the condition of the same type. The transition time only moves when the status flips.
    pub fn set_condition(&mut self, mut condition: Condition) {
        match self.conditions.iter_mut().find(|c| c.type_ == condition.type_) {
            Some(existing) => {
                if existing.status == condition.status {
                    condition.last_transition_time = existing.last_transition_time.clone();
                }
                *existing = condition;
            }
            None => self.conditions.push(condition),
        }
    }
}
