//! Per-kind resource processors
//!
//! Each processor matches one exact group/version/kind signature and turns a
//! claimed object into a [`Fragment`]. Kind mismatch is `Ok(None)` so the
//! dispatcher can keep trying; any error after a claim is fatal for the run.

pub mod configmap;
pub mod crd;
pub mod daemonset;
pub mod deployment;
pub mod job;
pub mod passthrough;
pub mod poddisruptionbudget;
pub mod rbac;
pub mod secret;
pub mod service;
pub mod statefulset;
pub mod storage;
pub mod webhook;

use chartsmith_core::{yamlfmt, MetaService, Values};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use crate::error::{Result, TransformError};
use crate::object::ManifestObject;

/// Output of one claimed resource: template text, destination filename, and
/// the values subtree it produced.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub filename: String,
    pub body: String,
    pub values: Values,
}

impl Fragment {
    pub fn new(filename: impl Into<String>, body: impl Into<String>, values: Values) -> Self {
        Self {
            filename: filename.into(),
            body: body.into(),
            values,
        }
    }
}

/// One per-kind transformer. `Ok(None)` means the object's signature is not
/// this processor's and the next one should be tried.
pub trait Processor: Send + Sync {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>>;
}

/// The full registration list, in dispatch order.
pub fn default_set() -> Vec<Box<dyn Processor>> {
    vec![
        Box::new(configmap::ConfigMapProcessor),
        Box::new(crd::CrdProcessor),
        Box::new(daemonset::DaemonSetProcessor),
        Box::new(deployment::DeploymentProcessor),
        Box::new(statefulset::StatefulSetProcessor),
        Box::new(storage::StorageClassProcessor),
        Box::new(service::ServiceProcessor),
        Box::new(service::IngressProcessor),
        Box::new(rbac::RoleProcessor),
        Box::new(rbac::RoleBindingProcessor),
        Box::new(rbac::ServiceAccountProcessor),
        Box::new(secret::SecretProcessor),
        Box::new(webhook::IssuerProcessor),
        Box::new(webhook::CertificateProcessor),
        Box::new(webhook::ValidatingWebhookProcessor),
        Box::new(webhook::MutatingWebhookProcessor),
        Box::new(job::CronJobProcessor),
        Box::new(job::JobProcessor),
        Box::new(poddisruptionbudget::PodDisruptionBudgetProcessor),
    ]
}

/// Deserialize the object's `spec` into a typed view.
pub(crate) fn cast_spec<T: DeserializeOwned>(obj: &ManifestObject) -> Result<T> {
    let spec = obj
        .spec()
        .cloned()
        .unwrap_or_else(|| JsonValue::Object(Map::new()));
    serde_json::from_value(spec).map_err(|source| TransformError::Cast {
        kind: obj.kind().to_string(),
        name: obj.name().to_string(),
        source,
    })
}

/// Assemble a workload template: metadata header plus the spec mapping
/// serialized at two columns.
pub(crate) fn workload_body(header: &str, spec_map: &Map<String, JsonValue>) -> Result<String> {
    let spec = yamlfmt::marshal(spec_map, 2)?;
    Ok(format!("{header}\nspec:\n{spec}"))
}

/// Insert the processed pod mapping at `template.spec` of a workload spec.
pub(crate) fn set_pod_template(
    spec_map: &mut Map<String, JsonValue>,
    pod_map: Map<String, JsonValue>,
) -> Result<()> {
    let template = spec_map
        .get_mut("template")
        .and_then(JsonValue::as_object_mut)
        .ok_or_else(|| TransformError::InvalidObject {
            reason: "workload spec has no pod template".to_string(),
        })?;
    template.insert("spec".to_string(), JsonValue::Object(pod_map));
    Ok(())
}

/// Serialize a typed spec into the untyped mapping the lift passes work on.
pub(crate) fn to_spec_map<T: serde::Serialize>(spec: &T) -> Result<Map<String, JsonValue>> {
    match serde_json::to_value(spec)? {
        JsonValue::Object(map) => Ok(map),
        _ => Err(TransformError::InvalidObject {
            reason: "spec did not serialize to a mapping".to_string(),
        }),
    }
}
