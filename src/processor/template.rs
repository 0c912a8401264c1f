// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::crds::MissingKey;
use serde_json::Value;
use thiserror::Error;

pub const TAG_START: &str = "{{ ";
pub const TAG_END: &str = " }}";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("no value for key {0:?}")]
    MissingKey(String),
}

// Replaces every "{{ key }}" tag with the looked-up value. An opening tag without a closing one is
// copied through as text.
pub fn substitute<F>(template: &str, missing: MissingKey, lookup: F) -> Result<String, TemplateError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find(TAG_START) {
        let after = &rest[start + TAG_START.len()..];
        let Some(end) = after.find(TAG_END) else {
            break;
        };
        out.push_str(&rest[..start]);
        let key = after[..end].trim();
        match (lookup(key), missing) {
            (Some(value), _) => out.push_str(&value),
            (None, MissingKey::Zero) => {}
            (None, MissingKey::Error) => return Err(TemplateError::MissingKey(key.to_string())),
        }
        rest = &after[end + TAG_END.len()..];
    }
    out.push_str(rest);
    Ok(out)
}

// Resolves a dotted path ("tenant.labels.env", "secrets.0.metadata.name") inside a JSON value.
// Strings render bare, scalars with their JSON text and containers as compact JSON.
pub fn lookup_path(root: &Value, path: &str) -> Option<String> {
    let mut cur = root;
    for segment in path.split('.') {
        cur = match cur {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match cur {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
