//! StatefulSet processor
//!
//! On top of the shared pod handling this lifts volume claim templates
//! wholesale into values and templates the headless service reference.

use chartsmith_core::{to_lower_camel, MetaService, Values};
use k8s_openapi::api::apps::v1::StatefulSetSpec;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use serde_json::Value as JsonValue;

use crate::error::{Result, TransformError};
use crate::meta::object_meta;
use crate::object::ManifestObject;
use crate::pod;
use crate::processors::{cast_spec, set_pod_template, to_spec_map, workload_body, Fragment, Processor};

pub struct StatefulSetProcessor;

impl Processor for StatefulSetProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        if !obj.has_gvk("apps", "v1", "StatefulSet") {
            return Ok(None);
        }
        let spec: StatefulSetSpec = cast_spec(obj)?;
        let header = object_meta(meta, obj)?;
        let name_camel = to_lower_camel(&meta.trim_name(obj.name()));

        let pod_spec = spec.template.spec.clone().unwrap_or_default();
        let (pod_map, pod_values) = pod::process_spec(&name_camel, meta, pod_spec)?;

        let mut values = Values::new();
        for claim in spec.volume_claim_templates.iter().flatten() {
            lift_claim_template(meta, &name_camel, claim, &mut values)?;
        }
        values.merge(pod_values)?;

        let mut spec_map = to_spec_map(&spec)?;
        if !spec.service_name.is_empty() {
            spec_map.insert(
                "serviceName".to_string(),
                JsonValue::String(meta.templated_name(&spec.service_name)),
            );
        }
        if let Some(replicas) = spec.replicas {
            let placeholder = values.add(replicas, &[&name_camel, "replicas"])?;
            spec_map.insert("replicas".to_string(), JsonValue::String(placeholder));
        }
        if let Some(JsonValue::Array(claims)) = spec_map.get_mut("volumeClaimTemplates") {
            for claim in claims {
                let name = claim
                    .pointer("/metadata/name")
                    .and_then(JsonValue::as_str)
                    .unwrap_or_default();
                let key = to_lower_camel(name);
                *claim = JsonValue::String(format!(
                    "{{{{- toYaml .Values.{name_camel}.volumeClaimTemplates.{key} | nindent 8 }}}}"
                ));
            }
        }
        set_pod_template(&mut spec_map, pod_map)?;

        let body = workload_body(&header, &spec_map)?;
        Ok(Some(Fragment::new("statefulset.yaml", body, values)))
    }
}

// A claim template without requests or access modes renders a chart that
// cannot install; reject it up front naming the claim.
fn lift_claim_template(
    meta: &MetaService,
    name_camel: &str,
    claim: &PersistentVolumeClaim,
    values: &mut Values,
) -> Result<()> {
    let claim_name = claim.metadata.name.clone().unwrap_or_default();
    let has_requests = claim
        .spec
        .as_ref()
        .and_then(|s| s.resources.as_ref())
        .and_then(|r| r.requests.as_ref())
        .is_some_and(|r| !r.is_empty());
    if !has_requests {
        return Err(TransformError::ClaimMissingRequests { claim: claim_name });
    }
    let has_modes = claim
        .spec
        .as_ref()
        .and_then(|s| s.access_modes.as_ref())
        .is_some_and(|m| !m.is_empty());
    if !has_modes {
        return Err(TransformError::ClaimMissingAccessModes { claim: claim_name });
    }

    let mut claim_map = to_spec_map(claim)?;
    // PVC serializes as a full object; only the template part belongs here.
    claim_map.remove("apiVersion");
    claim_map.remove("kind");
    claim_map.remove("status");
    if let Some(spec_obj) = claim_map.get_mut("spec").and_then(JsonValue::as_object_mut) {
        for field in ["storageClassName", "volumeName"] {
            if let Some(JsonValue::String(name)) = spec_obj.get(field) {
                let templated = meta.templated_name(name);
                spec_obj.insert(field.to_string(), JsonValue::String(templated));
            }
        }
    }
    values.set(
        claim_map,
        &[name_camel, "volumeClaimTemplates", &to_lower_camel(&claim_name)],
    )?;
    Ok(())
}
