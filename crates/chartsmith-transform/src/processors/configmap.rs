//! ConfigMap processor
//!
//! Metadata is templated; the payload stays literal. Config file contents
//! routinely embed colons, templating syntax, and whole YAML documents, so
//! lifting them into values would corrupt more charts than it parameterizes.

use chartsmith_core::{yamlfmt, MetaService, Values};
use serde_json::Map;

use crate::error::Result;
use crate::meta::object_meta;
use crate::object::ManifestObject;
use crate::processors::{Fragment, Processor};

pub struct ConfigMapProcessor;

impl Processor for ConfigMapProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        if !obj.has_gvk("", "v1", "ConfigMap") {
            return Ok(None);
        }
        let header = object_meta(meta, obj)?;

        let mut payload = Map::new();
        for key in ["immutable", "data", "binaryData"] {
            if let Some(value) = obj.body().get(key) {
                payload.insert(key.to_string(), value.clone());
            }
        }
        let body = if payload.is_empty() {
            header
        } else {
            format!("{header}\n{}", yamlfmt::marshal(&payload, 0)?)
        };

        let filename = format!("{}.yaml", meta.trim_name(obj.name()));
        Ok(Some(Fragment::new(filename, body, Values::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartsmith_core::Config;

    const CONFIGMAP: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: my-operator-manager-config
data:
  controller_manager_config.yaml: |
    apiVersion: controller-runtime.sigs.k8s.io/v1alpha1
    kind: ControllerManagerConfig
    health:
      healthProbeBindAddress: :8081
"#;

    #[test]
    fn keeps_payload_literal() {
        let mut meta = MetaService::new(Config::new("my-chart"));
        meta.load("my-operator-manager-config", None);
        meta.load("my-operator-controller-manager", None);

        let obj = ManifestObject::from_yaml(CONFIGMAP).unwrap();
        let fragment = ConfigMapProcessor.process(&meta, &obj).unwrap().unwrap();

        assert_eq!(fragment.filename, "manager-config.yaml");
        assert!(fragment
            .body
            .contains("name: {{ include \"my-chart.fullname\" . }}-manager-config"));
        assert!(fragment.body.contains("healthProbeBindAddress: :8081"));
        assert!(fragment.values.is_empty());
    }
}
