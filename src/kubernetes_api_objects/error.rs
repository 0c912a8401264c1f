// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use kube_core::ErrorResponse;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum APIError {
    #[error("object not found")]
    ObjectNotFound,
    #[error("object already exists")]
    ObjectAlreadyExists,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid: {0}")]
    Invalid(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("internal error: {0}")]
    InternalError(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("{0}")]
    Other(String),
}

impl APIError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, APIError::ObjectNotFound)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, APIError::Conflict(_))
    }
}

// Maps an API server response onto APIError by its reason, falling back to the HTTP code.
pub fn kube_error_to_api_error(error: &kube_client::Error) -> APIError {
    match error {
        kube_client::Error::Api(ErrorResponse {
            reason,
            message,
            code,
            ..
        }) => {
            let message = message.clone();
            match reason.as_str() {
                "NotFound" => APIError::ObjectNotFound,
                "AlreadyExists" => APIError::ObjectAlreadyExists,
                "BadRequest" => APIError::BadRequest(message),
                "Conflict" => APIError::Conflict(message),
                "Invalid" => APIError::Invalid(message),
                "Forbidden" => APIError::Forbidden(message),
                "InternalError" => APIError::InternalError(message),
                "Timeout" | "ServerTimeout" => APIError::Timeout(message),
                _ => match code {
                    404 => APIError::ObjectNotFound,
                    409 => APIError::Conflict(message),
                    _ => APIError::Other(message),
                },
            }
        }
        other => APIError::Other(other.to_string()),
    }
}

impl From<kube_client::Error> for APIError {
    fn from(error: kube_client::Error) -> APIError {
        kube_error_to_api_error(&error)
    }
}
