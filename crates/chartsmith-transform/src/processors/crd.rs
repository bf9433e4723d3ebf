//! CustomResourceDefinition processor
//!
//! CRD names are cluster-global contracts and stay literal. Only the
//! cert-manager CA injection annotation and the conversion webhook service
//! reference follow the chart rename.

use chartsmith_core::{yamlfmt, MetaService, Values};
use serde_json::{Map, Value as JsonValue};

use crate::error::Result;
use crate::object::ManifestObject;
use crate::processors::{Fragment, Processor};

const INJECT_CA_ANNOTATION: &str = "cert-manager.io/inject-ca-from";

pub struct CrdProcessor;

impl Processor for CrdProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        if !obj.has_gvk("apiextensions.k8s.io", "v1", "CustomResourceDefinition") {
            return Ok(None);
        }

        let mut annotations_block = String::new();
        let mut annotations = obj.annotations();
        if let Some(inject) = annotations.get(INJECT_CA_ANNOTATION) {
            // Value is "<namespace>/<certificate name>".
            if let Some((_, cert_name)) = inject.split_once('/') {
                let rewritten = format!(
                    "{{{{ .Release.Namespace }}}}/{}",
                    meta.templated_name(cert_name)
                );
                annotations.insert(INJECT_CA_ANNOTATION.to_string(), rewritten);
            }
        }
        if !annotations.is_empty() {
            let mut wrapper = Map::new();
            wrapper.insert(
                "annotations".to_string(),
                serde_json::to_value(&annotations)?,
            );
            annotations_block = format!("{}\n", yamlfmt::marshal(&wrapper, 2)?);
        }

        let mut spec = obj.spec().cloned().unwrap_or_else(|| JsonValue::Object(Map::new()));
        if let Some(service) = spec
            .pointer_mut("/conversion/webhook/clientConfig/service")
            .and_then(JsonValue::as_object_mut)
        {
            if let Some(JsonValue::String(name)) = service.get("name") {
                let templated = meta.templated_name(name);
                service.insert("name".to_string(), JsonValue::String(templated));
            }
            service.insert(
                "namespace".to_string(),
                JsonValue::String("{{ .Release.Namespace }}".to_string()),
            );
        }

        let body = format!(
            "apiVersion: apiextensions.k8s.io/v1\n\
             kind: CustomResourceDefinition\n\
             metadata:\n\
             \x20 name: {name}\n\
             {annotations_block}\
             \x20 labels:\n\
             \x20 {{{{- include \"{chart}.labels\" . | nindent 4 }}}}\n\
             spec:\n\
             {spec}",
            name = obj.name(),
            chart = meta.chart_name(),
            spec = yamlfmt::marshal(&spec, 2)?,
        );

        let group = obj.name().split('.').next().unwrap_or_default();
        Ok(Some(Fragment::new(
            format!("crd-{group}.yaml"),
            body,
            Values::new(),
        )))
    }
}
