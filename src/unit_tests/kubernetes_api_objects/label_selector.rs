// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::label_selector::*;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use std::collections::BTreeMap;

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn expression(key: &str, operator: &str, values: Option<Vec<&str>>) -> LabelSelectorRequirement {
    LabelSelectorRequirement {
        key: key.to_string(),
        operator: operator.to_string(),
        values: values.map(|vs| vs.into_iter().map(str::to_string).collect()),
    }
}

#[test]
pub fn test_empty_selector_matches_everything() {
    let selector = Selector::from_label_selector(&LabelSelector::default()).unwrap();
    assert!(selector.is_everything());
    assert!(selector.matches(&BTreeMap::new()));
    assert!(Selector::from_optional(None).unwrap().matches(&labels(&[("a", "b")])));
}

#[test]
pub fn test_match_labels_and_expressions() {
    let selector = Selector::from_label_selector(&LabelSelector {
        match_labels: Some(labels(&[("env", "prod")]).into_iter().collect()),
        match_expressions: Some(vec![
            expression("tier", "In", Some(vec!["web", "api"])),
            expression("legacy", "DoesNotExist", None),
        ]),
    })
    .unwrap();
    assert!(selector.matches(&labels(&[("env", "prod"), ("tier", "api")])));
    assert!(!selector.matches(&labels(&[("env", "prod"), ("tier", "db")])));
    assert!(!selector.matches(&labels(&[("env", "prod"), ("tier", "web"), ("legacy", "")])));
    assert!(!selector.matches(&labels(&[("tier", "web")])));
}

#[test]
pub fn test_not_in_matches_missing_key() {
    let selector = Selector::from_label_selector(&LabelSelector {
        match_expressions: Some(vec![expression("env", "NotIn", Some(vec!["dev"]))]),
        ..LabelSelector::default()
    })
    .unwrap();
    assert!(selector.matches(&BTreeMap::new()));
    assert!(selector.matches(&labels(&[("env", "prod")])));
    assert!(!selector.matches(&labels(&[("env", "dev")])));
}

#[test]
pub fn test_invalid_selectors_are_rejected() {
    let unknown = LabelSelector {
        match_expressions: Some(vec![expression("env", "Matches", Some(vec!["x"]))]),
        ..LabelSelector::default()
    };
    assert!(matches!(
        Selector::from_label_selector(&unknown),
        Err(SelectorError::UnknownOperator { .. })
    ));

    let missing = LabelSelector {
        match_expressions: Some(vec![expression("env", "In", None)]),
        ..LabelSelector::default()
    };
    assert!(matches!(
        Selector::from_label_selector(&missing),
        Err(SelectorError::MissingValues { .. })
    ));

    let unexpected = LabelSelector {
        match_expressions: Some(vec![expression("env", "Exists", Some(vec!["x"]))]),
        ..LabelSelector::default()
    };
    assert!(matches!(
        Selector::from_label_selector(&unexpected),
        Err(SelectorError::UnexpectedValues { .. })
    ));

    let bad_key = LabelSelector {
        match_labels: Some(labels(&[("-env", "x")]).into_iter().collect()),
        ..LabelSelector::default()
    };
    assert_eq!(
        Selector::from_label_selector(&bad_key),
        Err(SelectorError::InvalidKey("-env".to_string()))
    );

    let bad_value = LabelSelector {
        match_labels: Some(labels(&[("env", "has space")]).into_iter().collect()),
        ..LabelSelector::default()
    };
    assert!(matches!(
        Selector::from_label_selector(&bad_value),
        Err(SelectorError::InvalidValue { .. })
    ));
}

#[test]
pub fn test_annotation_selector_accepts_free_form_values() {
    let selector = LabelSelector {
        match_labels: Some(labels(&[("example.com/owner", "Team A, B")]).into_iter().collect()),
        ..LabelSelector::default()
    };
    assert!(Selector::from_label_selector(&selector).is_err());
    let compiled = Selector::from_annotation_selector(&selector).unwrap();
    assert!(compiled.matches(&labels(&[("example.com/owner", "Team A, B")])));
}

#[test]
pub fn test_display_query_syntax() {
    let selector = Selector::from_label_selector(&LabelSelector {
        match_labels: Some(labels(&[("env", "prod")]).into_iter().collect()),
        match_expressions: Some(vec![
            expression("tier", "NotIn", Some(vec!["db", "cache"])),
            expression("canary", "Exists", None),
        ]),
    })
    .unwrap()
    .with(Requirement::does_not_exist("capsule.clastix.io/resources"));
    assert_eq!(
        selector.to_string(),
        "env=prod,tier notin (db,cache),canary,!capsule.clastix.io/resources"
    );
}
