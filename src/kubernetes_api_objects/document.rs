// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerError {
    #[error("pointer {0:?} must be empty or start with '/'")]
    MissingLeadingSlash(String),
    #[error("pointer {0:?} contains an invalid '~' escape")]
    InvalidEscape(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("cannot set the document root to a non-object value")]
    RootNotObject,
    #[error("path {path} crosses a scalar value at {at}")]
    NotAContainer { path: String, at: String },
    #[error("path {path} uses {token:?} as an index into an array of length {len}")]
    BadIndex { path: String, token: String, len: usize },
}

// Pointer is a parsed RFC 6901 JSON pointer. The empty pointer addresses the whole document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pointer {
    tokens: Vec<String>,
}

impl Pointer {
    pub fn root() -> Pointer {
        Pointer::default()
    }

    pub fn from_tokens<I, S>(tokens: I) -> Pointer
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Pointer {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn child(&self, token: impl Into<String>) -> Pointer {
        let mut tokens = self.tokens.clone();
        tokens.push(token.into());
        Pointer { tokens }
    }

    fn prefix(&self, len: usize) -> Pointer {
        Pointer {
            tokens: self.tokens[..len].to_vec(),
        }
    }
}

fn unescape(token: &str, whole: &str) -> Result<String, PointerError> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => return Err(PointerError::InvalidEscape(whole.to_string())),
        }
    }
    Ok(out)
}

impl FromStr for Pointer {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Pointer, PointerError> {
        if s.is_empty() {
            return Ok(Pointer::root());
        }
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| PointerError::MissingLeadingSlash(s.to_string()))?;
        let tokens = rest
            .split('/')
            .map(|t| unescape(t, s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Pointer { tokens })
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{}", token.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

fn array_index(token: &str, len: usize) -> Option<usize> {
    // Leading zeros and signs are not valid array indices.
    if token.is_empty() || (token.len() > 1 && token.starts_with('0')) {
        return None;
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse::<usize>().ok().filter(|i| *i < len)
}

// Document is an unstructured Kubernetes object. All reads and writes go through JSON pointers so
// that callers never index into the raw value directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    inner: Value,
}

impl Default for Document {
    fn default() -> Document {
        Document {
            inner: Value::Object(Map::new()),
        }
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Document {
        Document {
            inner: Value::Object(map),
        }
    }
}

impl TryFrom<Value> for Document {
    type Error = DocumentError;

    fn try_from(value: Value) -> Result<Document, DocumentError> {
        match value {
            Value::Object(map) => Ok(Document::from(map)),
            _ => Err(DocumentError::RootNotObject),
        }
    }
}

impl Document {
    pub fn as_value(&self) -> &Value {
        &self.inner
    }

    pub fn into_value(self) -> Value {
        self.inner
    }

    pub fn get(&self, pointer: &Pointer) -> Option<&Value> {
        let mut cur = &self.inner;
        for token in pointer.tokens() {
            cur = match cur {
                Value::Object(map) => map.get(token)?,
                Value::Array(items) => items.get(array_index(token, items.len())?)?,
                _ => return None,
            };
        }
        Some(cur)
    }

    pub fn contains(&self, pointer: &Pointer) -> bool {
        self.get(pointer).is_some()
    }

    // Sets the value at the pointer, creating intermediate objects as needed. "-" appends to an array.
    pub fn set(&mut self, pointer: &Pointer, value: Value) -> Result<(), DocumentError> {
        let Some((last, parents)) = pointer.tokens().split_last() else {
            return match value {
                Value::Object(_) => {
                    self.inner = value;
                    Ok(())
                }
                _ => Err(DocumentError::RootNotObject),
            };
        };
        let mut cur = &mut self.inner;
        for (depth, token) in parents.iter().enumerate() {
            cur = match cur {
                Value::Object(map) => map
                    .entry(token.clone())
                    .or_insert_with(|| Value::Object(Map::new())),
                Value::Array(items) => {
                    let len = items.len();
                    let idx = array_index(token, len).ok_or_else(|| DocumentError::BadIndex {
                        path: pointer.to_string(),
                        token: token.clone(),
                        len,
                    })?;
                    &mut items[idx]
                }
                _ => {
                    return Err(DocumentError::NotAContainer {
                        path: pointer.to_string(),
                        at: pointer.prefix(depth).to_string(),
                    })
                }
            };
        }
        match cur {
            Value::Object(map) => {
                map.insert(last.clone(), value);
                Ok(())
            }
            Value::Array(items) if last == "-" => {
                items.push(value);
                Ok(())
            }
            Value::Array(items) => {
                let len = items.len();
                let idx = array_index(last, len).ok_or_else(|| DocumentError::BadIndex {
                    path: pointer.to_string(),
                    token: last.clone(),
                    len,
                })?;
                items[idx] = value;
                Ok(())
            }
            _ => Err(DocumentError::NotAContainer {
                path: pointer.to_string(),
                at: pointer.prefix(parents.len()).to_string(),
            }),
        }
    }

    // Removes the value at the pointer. Removing an absent path is a no-op.
    pub fn remove(&mut self, pointer: &Pointer) -> Option<Value> {
        let (last, parents) = pointer.tokens().split_last()?;
        let mut cur = &mut self.inner;
        for token in parents {
            cur = match cur {
                Value::Object(map) => map.get_mut(token)?,
                Value::Array(items) => {
                    let idx = array_index(token, items.len())?;
                    items.get_mut(idx)?
                }
                _ => return None,
            };
        }
        match cur {
            Value::Object(map) => map.remove(last),
            Value::Array(items) => {
                let idx = array_index(last, items.len())?;
                Some(items.remove(idx))
            }
            _ => None,
        }
    }

    fn str_at(&self, tokens: &[&str]) -> Option<&str> {
        self.get(&Pointer::from_tokens(tokens.iter().copied()))
            .and_then(Value::as_str)
    }

    fn string_map_at(&self, tokens: &[&str]) -> BTreeMap<String, String> {
        match self.get(&Pointer::from_tokens(tokens.iter().copied())) {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    pub fn api_version(&self) -> Option<&str> {
        self.str_at(&["apiVersion"])
    }

    pub fn kind(&self) -> Option<&str> {
        self.str_at(&["kind"])
    }

    pub fn name(&self) -> Option<&str> {
        self.str_at(&["metadata", "name"])
    }

    pub fn namespace(&self) -> Option<&str> {
        self.str_at(&["metadata", "namespace"]).filter(|ns| !ns.is_empty())
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        self.string_map_at(&["metadata", "labels"])
    }

    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.string_map_at(&["metadata", "annotations"])
    }

    pub fn set_namespace(&mut self, namespace: &str) -> Result<(), DocumentError> {
        self.set(
            &Pointer::from_tokens(["metadata", "namespace"]),
            Value::String(namespace.to_string()),
        )
    }

    pub fn set_label(&mut self, key: &str, value: &str) -> Result<(), DocumentError> {
        self.set(
            &Pointer::from_tokens(["metadata", "labels", key]),
            Value::String(value.to_string()),
        )
    }

    pub fn set_annotation(&mut self, key: &str, value: &str) -> Result<(), DocumentError> {
        self.set(
            &Pointer::from_tokens(["metadata", "annotations", key]),
            Value::String(value.to_string()),
        )
    }
}
