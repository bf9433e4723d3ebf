//! Job and CronJob processors

use chartsmith_core::{to_lower_camel, MetaService, Values};
use k8s_openapi::api::batch::v1::{CronJobSpec, JobSpec};
use serde_json::Value as JsonValue;

use crate::error::{Result, TransformError};
use crate::meta::object_meta;
use crate::object::ManifestObject;
use crate::pod;
use crate::processors::{cast_spec, set_pod_template, to_spec_map, workload_body, Fragment, Processor};

pub struct JobProcessor;

impl Processor for JobProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        if !obj.has_gvk("batch", "v1", "Job") {
            return Ok(None);
        }
        let spec: JobSpec = cast_spec(obj)?;
        let header = object_meta(meta, obj)?;
        let name_camel = to_lower_camel(&meta.trim_name(obj.name()));

        let pod_spec = spec.template.spec.clone().unwrap_or_default();
        let (pod_map, values) = pod::process_spec(&name_camel, meta, pod_spec)?;

        let mut spec_map = to_spec_map(&spec)?;
        set_pod_template(&mut spec_map, pod_map)?;

        let body = workload_body(&header, &spec_map)?;
        Ok(Some(Fragment::new("job.yaml", body, values)))
    }
}

pub struct CronJobProcessor;

impl Processor for CronJobProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        if !obj.has_gvk("batch", "v1", "CronJob") {
            return Ok(None);
        }
        let spec: CronJobSpec = cast_spec(obj)?;
        let header = object_meta(meta, obj)?;
        let name_camel = to_lower_camel(&meta.trim_name(obj.name()));

        let pod_spec = spec
            .job_template
            .spec
            .as_ref()
            .and_then(|job| job.template.spec.clone())
            .unwrap_or_default();
        let (pod_map, pod_values) = pod::process_spec(&name_camel, meta, pod_spec)?;

        let mut values = Values::new();
        let mut spec_map = to_spec_map(&spec)?;
        let placeholder = values.add(spec.schedule.as_str(), &[&name_camel, "schedule"])?;
        spec_map.insert("schedule".to_string(), JsonValue::String(placeholder));
        values.merge(pod_values)?;

        let job_template = spec_map
            .get_mut("jobTemplate")
            .and_then(|v| v.pointer_mut("/spec/template"))
            .and_then(JsonValue::as_object_mut)
            .ok_or_else(|| TransformError::InvalidObject {
                reason: "cron job has no pod template".to_string(),
            })?;
        job_template.insert("spec".to_string(), JsonValue::Object(pod_map));

        let body = workload_body(&header, &spec_map)?;
        Ok(Some(Fragment::new("cronjob.yaml", body, values)))
    }
}
