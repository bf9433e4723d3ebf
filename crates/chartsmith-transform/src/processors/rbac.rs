//! RBAC processors: roles, bindings, service accounts

use chartsmith_core::{yamlfmt, MetaService, Values};
use serde_json::{Map, Value as JsonValue};

use crate::error::Result;
use crate::meta::object_meta;
use crate::object::ManifestObject;
use crate::processors::{Fragment, Processor};

const RBAC_GROUP: &str = "rbac.authorization.k8s.io";

/// Role and ClusterRole. Rules stay literal, only the metadata is templated.
pub struct RoleProcessor;

impl Processor for RoleProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        let gvk = obj.gvk();
        if gvk.group != RBAC_GROUP
            || gvk.version != "v1"
            || !matches!(gvk.kind.as_str(), "Role" | "ClusterRole")
        {
            return Ok(None);
        }
        let header = object_meta(meta, obj)?;
        let rules = obj
            .body()
            .get("rules")
            .cloned()
            .unwrap_or_else(|| JsonValue::Array(Vec::new()));
        let mut block = Map::new();
        block.insert("rules".to_string(), rules);
        let body = format!("{header}\n{}", yamlfmt::marshal(&block, 0)?);
        let filename = format!("{}.yaml", meta.trim_name(obj.name()));
        Ok(Some(Fragment::new(filename, body, Values::new())))
    }
}

/// RoleBinding and ClusterRoleBinding. Referenced names are templated and
/// subject namespaces follow the release.
pub struct RoleBindingProcessor;

impl Processor for RoleBindingProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        let gvk = obj.gvk();
        if gvk.group != RBAC_GROUP
            || gvk.version != "v1"
            || !matches!(gvk.kind.as_str(), "RoleBinding" | "ClusterRoleBinding")
        {
            return Ok(None);
        }
        let header = object_meta(meta, obj)?;

        let mut block = Map::new();
        if let Some(mut role_ref) = obj
            .body()
            .get("roleRef")
            .and_then(JsonValue::as_object)
            .cloned()
        {
            if let Some(JsonValue::String(name)) = role_ref.get("name") {
                let templated = meta.templated_name(name);
                role_ref.insert("name".to_string(), JsonValue::String(templated));
            }
            block.insert("roleRef".to_string(), JsonValue::Object(role_ref));
        }
        if let Some(mut subjects) = obj
            .body()
            .get("subjects")
            .and_then(JsonValue::as_array)
            .cloned()
        {
            for subject in &mut subjects {
                let Some(subject) = subject.as_object_mut() else {
                    continue;
                };
                if let Some(JsonValue::String(name)) = subject.get("name") {
                    let templated = meta.templated_name(name);
                    subject.insert("name".to_string(), JsonValue::String(templated));
                }
                if subject.contains_key("namespace") {
                    subject.insert(
                        "namespace".to_string(),
                        JsonValue::String("{{ .Release.Namespace }}".to_string()),
                    );
                }
            }
            block.insert("subjects".to_string(), JsonValue::Array(subjects));
        }

        let body = format!("{header}\n{}", yamlfmt::marshal(&block, 0)?);
        let filename = format!("{}.yaml", meta.trim_name(obj.name()));
        Ok(Some(Fragment::new(filename, body, Values::new())))
    }
}

/// ServiceAccount fragments are their templated metadata alone.
pub struct ServiceAccountProcessor;

impl Processor for ServiceAccountProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        if !obj.has_gvk("", "v1", "ServiceAccount") {
            return Ok(None);
        }
        let body = object_meta(meta, obj)?;
        let filename = format!("{}.yaml", meta.trim_name(obj.name()));
        Ok(Some(Fragment::new(filename, body, Values::new())))
    }
}
