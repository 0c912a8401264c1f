// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::crds::{
    ConditionStatus, ItemCondition, ObjectReference, Owner, OwnerScope, ProcessedItem, ReplicationStatus,
};
use crate::processor::ledger::*;
use serde_json::json;

pub fn reference(namespace: Option<&str>, name: &str, owner: &str) -> ObjectReference {
    ObjectReference {
        kind: "ConfigMap".to_string(),
        api_version: "v1".to_string(),
        namespace: namespace.map(str::to_string),
        name: name.to_string(),
        owner: Owner {
            scope: OwnerScope::Namespace,
            name: owner.to_string(),
            uid: format!("{}-uid", owner),
        },
    }
}

#[test]
pub fn test_encode() {
    let r = reference(Some("ns1"), "cfg", "ns1");
    assert_eq!(
        r.encode(),
        "Kind=ConfigMap,APIVersion=v1,Namespace=ns1,Name=cfg,Owner=Namespace/ns1/ns1-uid"
    );
    assert_eq!(r.to_string(), r.encode());
}

#[test]
pub fn test_decode_round_trips_awkward_values() {
    let r = ObjectReference {
        kind: "Widget".to_string(),
        api_version: "example.com/v1".to_string(),
        namespace: None,
        name: "a,b=c%d".to_string(),
        owner: Owner {
            scope: OwnerScope::Tenant,
            name: "team/one".to_string(),
            uid: String::new(),
        },
    };
    let encoded = r.encode();
    assert!(encoded.contains("Name=a%2Cb%3Dc%25d"));
    assert!(encoded.contains("Owner=Tenant/team%2Fone/"));
    assert_eq!(encoded.parse::<ObjectReference>(), Ok(r));
}

#[test]
pub fn test_decode_errors() {
    assert_eq!(
        "Kind=ConfigMap".parse::<ObjectReference>(),
        Err(LedgerError::FieldCount(1))
    );
    assert!(matches!(
        "Kind=A,Version=v1,Namespace=,Name=n,Owner=Tenant/t/u".parse::<ObjectReference>(),
        Err(LedgerError::UnexpectedField { expected: "APIVersion", .. })
    ));
    assert_eq!(
        "Kind=,APIVersion=v1,Namespace=,Name=n,Owner=Tenant/t/u".parse::<ObjectReference>(),
        Err(LedgerError::Empty("Kind"))
    );
    assert!(matches!(
        "Kind=A,APIVersion=v1,Namespace=,Name=n%zz,Owner=Tenant/t/u".parse::<ObjectReference>(),
        Err(LedgerError::InvalidEscape(_))
    ));
    assert!(matches!(
        "Kind=A,APIVersion=v1,Namespace=,Name=n,Owner=Tenant/t".parse::<ObjectReference>(),
        Err(LedgerError::MalformedOwner(_))
    ));
    assert_eq!(
        "Kind=A,APIVersion=v1,Namespace=,Name=n,Owner=Cluster/t/u".parse::<ObjectReference>(),
        Err(LedgerError::UnknownScope("Cluster".to_string()))
    );
}

#[test]
pub fn test_failure_is_not_overwritten_by_success() {
    let r = reference(Some("ns1"), "cfg", "ns1");
    let mut set = ProcessedSet::new();
    set.record(&r, ItemCondition::failed("ApplyFailed", "conflict"));
    set.record(&r, ItemCondition::succeeded());
    assert_eq!(set.len(), 1);
    assert_eq!(
        set.condition(&r.encode()).map(|c| c.status),
        Some(ConditionStatus::False)
    );

    let other = reference(Some("ns2"), "cfg", "ns2");
    set.record(&other, ItemCondition::succeeded());
    set.record(&other, ItemCondition::failed("ApplyFailed", "late"));
    assert_eq!(
        set.condition(&other.encode()).map(|c| c.reason.as_str()),
        Some("ApplyFailed")
    );
}

#[test]
pub fn test_union_prefers_self() {
    let a = reference(Some("ns1"), "a", "ns1");
    let b = reference(Some("ns1"), "b", "ns1");
    let mut current = ProcessedSet::new();
    current.record(&a, ItemCondition::succeeded());
    let mut previous = ProcessedSet::new();
    previous.record(&a, ItemCondition::failed("ApplyFailed", "old"));
    previous.record(&b, ItemCondition::succeeded());

    let merged = current.union(&previous);
    assert_eq!(merged.len(), 2);
    assert_eq!(
        merged.condition(&a.encode()).map(|c| c.status),
        Some(ConditionStatus::True)
    );
    assert!(merged.contains(&b.encode()));
}

#[test]
pub fn test_items_round_trip_and_drop_malformed() {
    let a = reference(Some("ns1"), "a", "ns1");
    let items = vec![ProcessedItem {
        reference: a.clone(),
        condition: ItemCondition::succeeded(),
    }];
    let set = ProcessedSet::from_items(&items);
    assert_eq!(set.to_items(), items);

    let mut with_malformed = set.clone();
    let nameless = ObjectReference {
        kind: String::new(),
        ..a.clone()
    };
    with_malformed.record(&nameless, ItemCondition::succeeded());
    assert_eq!(with_malformed.len(), 2);
    assert_eq!(with_malformed.to_items().len(), 1);
    assert_eq!(with_malformed.object_keys().len(), 1);
}

#[test]
pub fn test_status_decoding_drops_undecodable_entries() {
    let status: ReplicationStatus = serde_json::from_value(json!({
        "processedItems": [
            {
                "kind": "ConfigMap",
                "apiVersion": "v1",
                "namespace": "ns1",
                "name": "kept",
                "owner": {"scope": "Namespace", "name": "ns1", "uid": "ns1-uid"},
                "status": "False",
                "reason": "ApplyFailed",
            },
            {
                "kind": "ConfigMap",
                "apiVersion": "v1",
                "name": "old",
                "owner": {"scope": "Cluster", "name": "x"},
            },
            {"kind": "ConfigMap", "apiVersion": "v1"},
            "Kind=ConfigMap,APIVersion=v1,Namespace=ns1,Name=legacy,Owner=Namespace/ns1/",
        ],
        "conditions": [{"type": "Ready", "status": "True"}],
    }))
    .unwrap();
    assert_eq!(status.processed_items.len(), 1);
    assert_eq!(status.processed_items[0].reference.name, "kept");
    assert_eq!(status.processed_items[0].condition.reason, "ApplyFailed");
    assert_eq!(status.conditions.len(), 1);

    let status: ReplicationStatus = serde_json::from_value(json!({"processedItems": "garbage"})).unwrap();
    assert!(status.processed_items.is_empty());
    let status: ReplicationStatus = serde_json::from_value(json!({"processedItems": null})).unwrap();
    assert!(status.processed_items.is_empty());
}

#[test]
pub fn test_processed_item_serializes_flat() {
    let item = ProcessedItem {
        reference: reference(Some("ns1"), "cfg", "ns1"),
        condition: ItemCondition::failed("ApplyFailed", "boom"),
    };
    let value = serde_json::to_value(&item).unwrap();
    assert_eq!(value["kind"], "ConfigMap");
    assert_eq!(value["apiVersion"], "v1");
    assert_eq!(value["owner"]["scope"], "Namespace");
    assert_eq!(value["status"], "False");
    assert_eq!(value["reason"], "ApplyFailed");
    let back: ProcessedItem = serde_json::from_value(value).unwrap();
    assert_eq!(back, item);
}
