// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
pub mod apply;
pub mod collect;
pub mod context;
pub mod ledger;
pub mod prune;
pub mod render;
pub mod target;
pub mod template;

use crate::config::ControllerConfig;
use crate::crds::{ItemCondition, ObjectReference, ResourceSpec};
use crate::error::{Error, ErrorList, ProcessError};
use crate::kubernetes_api_objects::kind_registry::KindRegistry;
use crate::kubernetes_api_objects::object_key::ObjectKey;
use crate::processor::apply::{apply, field_owner, IgnoreRules};
use crate::processor::collect::{collect_namespaced_items, gather_context};
use crate::processor::context::RenderContext;
use crate::processor::ledger::ProcessedSet;
use crate::processor::render::{render_section, stamp};
use crate::processor::target::{Target, TargetResolver};
use crate::shim_layer::api::KubeApi;
use kube::ResourceExt;
use tracing::*;

// Identifies the replication resource being processed; feeds the field manager of every apply.
#[derive(Debug, Clone)]
pub struct SpecIdentity {
    pub namespace: Option<String>,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct ProcessOutcome {
    pub processed: ProcessedSet,
    pub errors: ErrorList,
    pub applied: usize,
}

// Processor renders and applies every section for every target.
pub struct Processor<'a> {
    api: &'a dyn KubeApi,
    registry: &'a KindRegistry,
    config: &'a ControllerConfig,
}

impl<'a> Processor<'a> {
    pub fn new(
        api: &'a dyn KubeApi,
        registry: &'a KindRegistry,
        config: &'a ControllerConfig,
    ) -> Processor<'a> {
        Processor {
            api,
            registry,
            config,
        }
    }

    // Selector and ignore-rule errors abort before anything is written. Everything else is per item.
    pub async fn process(
        &self,
        spec: &SpecIdentity,
        resolver: &TargetResolver,
        sections: &[ResourceSpec],
    ) -> Result<ProcessOutcome, Error> {
        let mut plan = Vec::with_capacity(sections.len());
        for section in sections {
            let rules = IgnoreRules::compile(&section.ignore)?;
            let targets = resolver.targets(section.namespace_selector.as_ref())?;
            plan.push((rules, targets));
        }

        let mut outcome = ProcessOutcome::default();
        for (index, (section, (rules, targets))) in sections.iter().zip(plan).enumerate() {
            for target in &targets {
                self.process_target(spec, index, section, &rules, target, &mut outcome)
                    .await;
            }
        }
        Ok(outcome)
    }

    async fn process_target(
        &self,
        spec: &SpecIdentity,
        index: usize,
        section: &ResourceSpec,
        rules: &IgnoreRules,
        target: &Target,
        outcome: &mut ProcessOutcome,
    ) {
        let values = match gather_context(self.api, section, index, target).await {
            Ok(values) => values,
            Err(e) => {
                outcome.errors.push(e);
                return;
            }
        };
        let ctx = RenderContext::for_target(target).with_values(values);
        let rendered = render_section(index, section, &ctx, self.registry);
        let mut candidates = rendered.candidates;
        outcome.errors.extend(rendered.errors);

        if !section.namespaced_items.is_empty() {
            match collect_namespaced_items(
                self.api,
                section,
                index,
                target,
                self.config.allow_cross_namespace_selection,
            )
            .await
            {
                Ok(items) => {
                    for mut item in items {
                        match stamp(&mut item, &ctx, index, section.additional_metadata.as_ref()) {
                            Ok(()) => candidates.push(item),
                            Err(e) => outcome.errors.push(ProcessError::NamespacedItems {
                                section: index,
                                message: e.to_string(),
                            }),
                        }
                    }
                }
                Err(e) => outcome.errors.push(e),
            }
        }

        let namespace = target.namespace_name();
        let manager = field_owner(
            &self.config.field_manager_prefix,
            spec.namespace.as_deref(),
            &spec.name,
            &target.tenant.name_any(),
            namespace.as_deref(),
            index,
        );
        for candidate in candidates {
            let Some(reference) = ObjectReference::for_document(&candidate, &target.owner) else {
                continue;
            };
            let key: ObjectKey = reference.object_key();
            match apply(self.api, candidate, rules, &manager, section.force).await {
                Ok(_) => {
                    outcome.applied += 1;
                    outcome
                        .processed
                        .record(&reference, ItemCondition::succeeded());
                }
                Err(e) => {
                    warn!("failed to apply {}: {}", key, e);
                    outcome
                        .processed
                        .record(&reference, ItemCondition::failed("ApplyFailed", e.to_string()));
                    outcome.errors.push(ProcessError::Apply { key, source: e });
                }
            }
        }
    }
}
