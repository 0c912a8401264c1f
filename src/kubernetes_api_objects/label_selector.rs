// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// Selector is the compiled form of a LabelSelector. Compiling validates keys, values and operators
// up front so that matching can never fail.
//
// More detailed information: https://kubernetes.io/docs/concepts/overview/working-with-objects/labels/#label-selectors.

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("invalid label key {0:?}")]
    InvalidKey(String),
    #[error("invalid label value {value:?} for key {key:?}")]
    InvalidValue { key: String, value: String },
    #[error("unknown operator {operator:?} for key {key:?}")]
    UnknownOperator { key: String, operator: String },
    #[error("operator {operator} for key {key:?} requires at least one value")]
    MissingValues { key: String, operator: Operator },
    #[error("operator {operator} for key {key:?} does not accept values")]
    UnexpectedValues { key: String, operator: Operator },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::In => "In",
            Operator::NotIn => "NotIn",
            Operator::Exists => "Exists",
            Operator::DoesNotExist => "DoesNotExist",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    key: String,
    operator: Operator,
    values: Vec<String>,
}

impl Requirement {
    pub fn equals(key: &str, value: &str) -> Requirement {
        Requirement {
            key: key.to_string(),
            operator: Operator::In,
            values: vec![value.to_string()],
        }
    }

    pub fn does_not_exist(key: &str) -> Requirement {
        Requirement {
            key: key.to_string(),
            operator: Operator::DoesNotExist,
            values: Vec::new(),
        }
    }

    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let value = labels.get(&self.key);
        match self.operator {
            Operator::In => value.map_or(false, |v| self.values.contains(v)),
            Operator::NotIn => value.map_or(true, |v| !self.values.contains(v)),
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::In if self.values.len() == 1 => write!(f, "{}={}", self.key, self.values[0]),
            Operator::In => write!(f, "{} in ({})", self.key, self.values.join(",")),
            Operator::NotIn => write!(f, "{} notin ({})", self.key, self.values.join(",")),
            Operator::Exists => write!(f, "{}", self.key),
            Operator::DoesNotExist => write!(f, "!{}", self.key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

#[derive(Clone, Copy)]
enum ValueRules {
    Label,
    Annotation,
}

impl Selector {
    // The empty selector matches everything.
    pub fn everything() -> Selector {
        Selector::default()
    }

    pub fn is_everything(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn from_label_selector(selector: &LabelSelector) -> Result<Selector, SelectorError> {
        Selector::compile(selector, ValueRules::Label)
    }

    // Annotation values are free-form, so only keys are validated.
    pub fn from_annotation_selector(selector: &LabelSelector) -> Result<Selector, SelectorError> {
        Selector::compile(selector, ValueRules::Annotation)
    }

    pub fn from_optional(selector: Option<&LabelSelector>) -> Result<Selector, SelectorError> {
        match selector {
            Some(s) => Selector::from_label_selector(s),
            None => Ok(Selector::everything()),
        }
    }

    fn compile(selector: &LabelSelector, rules: ValueRules) -> Result<Selector, SelectorError> {
        let mut requirements = Vec::new();
        for (key, value) in selector.match_labels.iter().flatten() {
            validate_key(key)?;
            validate_value(key, value, rules)?;
            requirements.push(Requirement::equals(key, value));
        }
        for expr in selector.match_expressions.iter().flatten() {
            validate_key(&expr.key)?;
            let operator = match expr.operator.as_str() {
                "In" => Operator::In,
                "NotIn" => Operator::NotIn,
                "Exists" => Operator::Exists,
                "DoesNotExist" => Operator::DoesNotExist,
                other => {
                    return Err(SelectorError::UnknownOperator {
                        key: expr.key.clone(),
                        operator: other.to_string(),
                    })
                }
            };
            let values = expr.values.clone().unwrap_or_default();
            match operator {
                Operator::In | Operator::NotIn if values.is_empty() => {
                    return Err(SelectorError::MissingValues {
                        key: expr.key.clone(),
                        operator,
                    })
                }
                Operator::Exists | Operator::DoesNotExist if !values.is_empty() => {
                    return Err(SelectorError::UnexpectedValues {
                        key: expr.key.clone(),
                        operator,
                    })
                }
                _ => {}
            }
            for value in &values {
                validate_value(&expr.key, value, rules)?;
            }
            requirements.push(Requirement {
                key: expr.key.clone(),
                operator,
                values,
            });
        }
        Ok(Selector { requirements })
    }

    pub fn with(mut self, requirement: Requirement) -> Selector {
        self.requirements.push(requirement);
        self
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

// Renders the selector in the query syntax accepted by list requests.
impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.requirements.iter().map(|r| r.to_string()).collect();
        f.write_str(&parts.join(","))
    }
}

fn is_name_segment(s: &str, max: usize) -> bool {
    let bytes = s.as_bytes();
    !s.is_empty()
        && s.len() <= max
        && bytes[0].is_ascii_alphanumeric()
        && bytes[bytes.len() - 1].is_ascii_alphanumeric()
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

fn is_dns_subdomain(s: &str) -> bool {
    s.len() <= 253
        && s.split('.').all(|label| {
            let bytes = label.as_bytes();
            !label.is_empty()
                && bytes[0].is_ascii_alphanumeric()
                && bytes[bytes.len() - 1].is_ascii_alphanumeric()
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        })
}

fn validate_key(key: &str) -> Result<(), SelectorError> {
    let valid = match key.split_once('/') {
        Some((prefix, name)) => is_dns_subdomain(prefix) && is_name_segment(name, 63),
        None => is_name_segment(key, 63),
    };
    if valid {
        Ok(())
    } else {
        Err(SelectorError::InvalidKey(key.to_string()))
    }
}

fn validate_value(key: &str, value: &str, rules: ValueRules) -> Result<(), SelectorError> {
    match rules {
        ValueRules::Annotation => Ok(()),
        ValueRules::Label if value.is_empty() || is_name_segment(value, 63) => Ok(()),
        ValueRules::Label => Err(SelectorError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
