//! DaemonSet processor

use chartsmith_core::{to_lower_camel, MetaService};
use k8s_openapi::api::apps::v1::DaemonSetSpec;

use crate::error::Result;
use crate::meta::object_meta;
use crate::object::ManifestObject;
use crate::pod;
use crate::processors::{cast_spec, set_pod_template, to_spec_map, workload_body, Fragment, Processor};

pub struct DaemonSetProcessor;

impl Processor for DaemonSetProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        if !obj.has_gvk("apps", "v1", "DaemonSet") {
            return Ok(None);
        }
        let spec: DaemonSetSpec = cast_spec(obj)?;
        let header = object_meta(meta, obj)?;
        let name_camel = to_lower_camel(&meta.trim_name(obj.name()));

        let pod_spec = spec.template.spec.clone().unwrap_or_default();
        let (pod_map, values) = pod::process_spec(&name_camel, meta, pod_spec)?;

        let mut spec_map = to_spec_map(&spec)?;
        set_pod_template(&mut spec_map, pod_map)?;

        let body = workload_body(&header, &spec_map)?;
        Ok(Some(Fragment::new("daemonset.yaml", body, values)))
    }
}
