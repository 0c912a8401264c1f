// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::document::{DocumentError, PointerError};
use crate::kubernetes_api_objects::error::APIError;
use crate::kubernetes_api_objects::kind_registry::DecodeError;
use crate::kubernetes_api_objects::label_selector::SelectorError;
use crate::kubernetes_api_objects::object_key::ObjectKey;
use crate::processor::template::TemplateError;
use std::fmt;
use thiserror::Error;

// Errors that abort a whole reconcile attempt. The controller requeues with backoff.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to get custom resource: {0}")]
    CRGetFailed(#[source] APIError),
    #[error("Failed to update status: {0}")]
    UpdateStatusFailed(#[source] APIError),
    #[error("Failed to patch custom resource: {0}")]
    PatchFailed(#[source] APIError),
    #[error("Failed to list {0}: {1}")]
    ListFailed(&'static str, #[source] APIError),
    #[error("Invalid selector: {0}")]
    InvalidSelector(#[from] SelectorError),
    #[error("Invalid ignore path: {0}")]
    InvalidIgnorePath(#[from] PointerError),
    #[error("Failed to build impersonated client for {0}: {1}")]
    ImpersonationFailed(String, #[source] APIError),
    #[error("Failed to convert {0}: {1}")]
    ConversionFailed(&'static str, #[source] serde_json::Error),
    #[error("Missing object key {0}")]
    MissingObjectKey(&'static str),
}

// Recoverable errors for a single item. They are collected, never raised.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("rendering raw item {item} of section {section}: {source}")]
    RawItem {
        section: usize,
        item: usize,
        #[source]
        source: RenderError,
    },
    #[error("running generator {item} of section {section}: {source}")]
    Generator {
        section: usize,
        item: usize,
        #[source]
        source: RenderError,
    },
    #[error("gathering context for section {section}: {message}")]
    Gather { section: usize, message: String },
    #[error("collecting namespaced items for section {section}: {message}")]
    NamespacedItems { section: usize, message: String },
    #[error("applying {key}: {source}")]
    Apply {
        key: ObjectKey,
        #[source]
        source: APIError,
    },
    #[error("pruning {key}: {source}")]
    Prune {
        key: ObjectKey,
        #[source]
        source: APIError,
    },
    #[error("dependency {0}")]
    Dependency(String),
}

impl ProcessError {
    // Render-side failures mean the desired set is incomplete for this pass.
    pub fn is_render_error(&self) -> bool {
        matches!(
            self,
            ProcessError::RawItem { .. }
                | ProcessError::Generator { .. }
                | ProcessError::Gather { .. }
                | ProcessError::NamespacedItems { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("decoding JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("decoding YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

// ErrorList accumulates per-item errors while the caller keeps going.
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<ProcessError>,
}

impl ErrorList {
    pub fn new() -> ErrorList {
        ErrorList::default()
    }

    pub fn push(&mut self, error: ProcessError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: ErrorList) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[ProcessError] {
        &self.errors
    }

    pub fn has_render_errors(&self) -> bool {
        self.errors.iter().any(ProcessError::is_render_error)
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ErrorList {}

impl From<ProcessError> for ErrorList {
    fn from(error: ProcessError) -> ErrorList {
        ErrorList {
            errors: vec![error],
        }
    }
}
