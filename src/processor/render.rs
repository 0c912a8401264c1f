// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::crds::{AdditionalMetadata, GeneratorSpec, MissingKey, ResourceSpec};
use crate::error::{ErrorList, ProcessError, RenderError};
use crate::kubernetes_api_objects::document::Document;
use crate::kubernetes_api_objects::kind_registry::KindRegistry;
use crate::processor::context::RenderContext;
use crate::processor::template::{lookup_path, substitute};
use serde::Deserialize;
use serde_json::Value;

pub use crate::crds::TENANT_LABEL;
pub const RESOURCES_LABEL: &str = "capsule.clastix.io/resources";

// ResourceItem is one entry of a section that produces candidate objects.
#[derive(Debug, Clone, Copy)]
pub enum ResourceItem<'a> {
    Raw(&'a Value),
    Generator(&'a GeneratorSpec),
}

impl<'a> ResourceItem<'a> {
    pub fn render(
        &self,
        ctx: &RenderContext,
        registry: &KindRegistry,
    ) -> Result<Vec<Document>, RenderError> {
        match self {
            ResourceItem::Raw(raw) => render_raw(raw, ctx, registry).map(|doc| vec![doc]),
            ResourceItem::Generator(generator) => render_generator(generator, ctx, registry),
        }
    }

    fn error(&self, section: usize, item: usize, source: RenderError) -> ProcessError {
        match self {
            ResourceItem::Raw(_) => ProcessError::RawItem {
                section,
                item,
                source,
            },
            ResourceItem::Generator(_) => ProcessError::Generator {
                section,
                item,
                source,
            },
        }
    }
}

// Raw items only see "tenant.name" and "namespace"; unknown tags render empty.
fn render_raw(
    raw: &Value,
    ctx: &RenderContext,
    registry: &KindRegistry,
) -> Result<Document, RenderError> {
    let text = serde_json::to_string(raw)?;
    let rendered = substitute(&text, MissingKey::Zero, |key| ctx.fast_lookup(key))?;
    let value: Value = serde_json::from_str(&rendered)?;
    Ok(registry.decode(value)?)
}

// A generator renders its template against the whole context and may yield several YAML documents.
// Empty documents and documents with neither apiVersion nor kind are skipped.
fn render_generator(
    generator: &GeneratorSpec,
    ctx: &RenderContext,
    registry: &KindRegistry,
) -> Result<Vec<Document>, RenderError> {
    let root = ctx.to_value();
    let rendered = substitute(&generator.template, generator.missing_key, |key| {
        lookup_path(&root, key)
    })?;
    let mut docs = Vec::new();
    for de in serde_yaml::Deserializer::from_str(&rendered) {
        let yaml = serde_yaml::Value::deserialize(de)?;
        if yaml.is_null() {
            continue;
        }
        let value = serde_json::to_value(&yaml)?;
        if value.get("apiVersion").is_none() && value.get("kind").is_none() {
            continue;
        }
        docs.push(registry.decode(value)?);
    }
    Ok(docs)
}

// Stamps provenance and section metadata onto a candidate and pins it to the target namespace.
pub fn stamp(
    doc: &mut Document,
    ctx: &RenderContext,
    section: usize,
    metadata: Option<&AdditionalMetadata>,
) -> Result<(), RenderError> {
    if let Some(metadata) = metadata {
        for (key, value) in &metadata.labels {
            let value = substitute(value, MissingKey::Zero, |k| ctx.fast_lookup(k))?;
            doc.set_label(key, &value)?;
        }
        for (key, value) in &metadata.annotations {
            let value = substitute(value, MissingKey::Zero, |k| ctx.fast_lookup(k))?;
            doc.set_annotation(key, &value)?;
        }
    }
    doc.set_label(TENANT_LABEL, &ctx.tenant.name)?;
    doc.set_label(RESOURCES_LABEL, &section.to_string())?;
    if let Some(namespace) = ctx.namespace_name() {
        doc.set_namespace(namespace)?;
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct RenderedSection {
    pub candidates: Vec<Document>,
    pub errors: ErrorList,
}

// Renders every item of a section. A failing item is recorded and the rest still render.
pub fn render_section(
    index: usize,
    section: &ResourceSpec,
    ctx: &RenderContext,
    registry: &KindRegistry,
) -> RenderedSection {
    let mut rendered = RenderedSection::default();
    let raw = section.raw_items.iter().map(ResourceItem::Raw).enumerate();
    let generators = section.generators.iter().map(ResourceItem::Generator).enumerate();
    for (position, item) in raw.chain(generators) {
        let produced = item.render(ctx, registry).and_then(|mut docs| {
            for doc in docs.iter_mut() {
                stamp(doc, ctx, index, section.additional_metadata.as_ref())?;
            }
            Ok(docs)
        });
        match produced {
            Ok(docs) => rendered.candidates.extend(docs),
            Err(e) => rendered.errors.push(item.error(index, position, e)),
        }
    }
    rendered
}
