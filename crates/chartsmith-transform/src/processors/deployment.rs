//! Deployment processor

use chartsmith_core::{to_lower_camel, MetaService, Values};
use k8s_openapi::api::apps::v1::DeploymentSpec;
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::meta::object_meta_with_annotations;
use crate::object::ManifestObject;
use crate::pod;
use crate::processors::{cast_spec, set_pod_template, to_spec_map, workload_body, Fragment, Processor};

pub struct DeploymentProcessor;

impl Processor for DeploymentProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        if !obj.has_gvk("apps", "v1", "Deployment") {
            return Ok(None);
        }
        let spec: DeploymentSpec = cast_spec(obj)?;
        let mut values = Values::new();
        // Deployment annotations are a common rollout knob, so they get
        // lifted instead of staying literal.
        let header = object_meta_with_annotations(meta, obj, &mut values)?;
        let name_camel = to_lower_camel(&meta.trim_name(obj.name()));

        let pod_spec = spec.template.spec.clone().unwrap_or_default();
        let (pod_map, pod_values) = pod::process_spec(&name_camel, meta, pod_spec)?;
        let mut spec_map = to_spec_map(&spec)?;
        if let Some(replicas) = spec.replicas {
            let placeholder = values.add(replicas, &[&name_camel, "replicas"])?;
            spec_map.insert("replicas".to_string(), JsonValue::String(placeholder));
        }
        if let Some(limit) = spec.revision_history_limit {
            let placeholder = values.add(limit, &[&name_camel, "revisionHistoryLimit"])?;
            spec_map.insert(
                "revisionHistoryLimit".to_string(),
                JsonValue::String(placeholder),
            );
        }
        values.merge(pod_values)?;
        set_pod_template(&mut spec_map, pod_map)?;

        let body = workload_body(&header, &spec_map)?;
        Ok(Some(Fragment::new("deployment.yaml", body, values)))
    }
}
