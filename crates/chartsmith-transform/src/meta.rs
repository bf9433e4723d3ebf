//! Shared apiVersion/kind/metadata block rendering

use std::collections::BTreeMap;

use chartsmith_core::{to_lower_camel, MetaService, Values};

use crate::error::Result;
use crate::object::ManifestObject;

// Labels injected by the chart itself. They must not survive in templates
// or they would conflict with the generated label partials.
const CHART_MANAGED_LABELS: [&str; 5] = [
    "app.kubernetes.io/name",
    "app.kubernetes.io/instance",
    "app.kubernetes.io/version",
    "app.kubernetes.io/managed-by",
    "helm.sh/chart",
];

/// Render the `apiVersion`/`kind`/`metadata` header of a template, with the
/// resource name templated and annotations emitted literally.
pub fn object_meta(meta: &MetaService, obj: &ManifestObject) -> Result<String> {
    render(meta, obj, None)
}

/// Same as [`object_meta`], but the annotations are lifted into `values`
/// under `<name>.<kind>.annotations` and dereferenced from the template.
pub fn object_meta_with_annotations(
    meta: &MetaService,
    obj: &ManifestObject,
    values: &mut Values,
) -> Result<String> {
    render(meta, obj, Some(values))
}

fn render(
    meta: &MetaService,
    obj: &ManifestObject,
    lift_annotations: Option<&mut Values>,
) -> Result<String> {
    let mut labels = obj.labels();
    for key in CHART_MANAGED_LABELS {
        labels.remove(key);
    }
    let labels_block = if labels.is_empty() {
        String::new()
    } else {
        chartsmith_core::yamlfmt::marshal(&labels, 4)?
    };

    let annotations = obj.annotations();
    let annotations_block = match (lift_annotations, annotations.is_empty()) {
        (_, true) => String::new(),
        (None, false) => {
            let mut wrapper = BTreeMap::new();
            wrapper.insert("annotations", &annotations);
            chartsmith_core::yamlfmt::marshal(&wrapper, 2)?
        }
        (Some(values), false) => {
            let name = to_lower_camel(&meta.trim_name(obj.name()));
            let kind = to_lower_camel(obj.kind());
            values.set(&annotations, &[&name, &kind, "annotations"])?;
            format!(
                "  annotations:\n    {{{{- toYaml .Values.{name}.{kind}.annotations | nindent 4 }}}}"
            )
        }
    };

    let namespace_block = match obj.namespace() {
        Some(ns) if meta.config().preserve_ns => {
            let mut wrapper = BTreeMap::new();
            wrapper.insert("namespace", ns);
            chartsmith_core::yamlfmt::marshal(&wrapper, 2)?
        }
        _ => String::new(),
    };

    let header = format!(
        "apiVersion: {api_version}\n\
         kind: {kind}\n\
         metadata:\n\
         \x20 name: {name}\n\
         {namespace_block}\n\
         \x20 labels:\n\
         {labels_block}\n\
         \x20 {{{{- include \"{chart}.labels\" . | nindent 4 }}}}\n\
         {annotations_block}",
        api_version = obj.api_version(),
        kind = obj.kind(),
        name = meta.templated_name(obj.name()),
        chart = meta.chart_name(),
    );
    // Empty optional blocks leave blank lines behind.
    Ok(header.trim_matches([' ', '\n']).replace("\n\n", "\n"))
}
