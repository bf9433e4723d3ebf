//! Decoded resource objects
//!
//! A [`ManifestObject`] is one decoded manifest document held as an untyped
//! tree. Processors that need a typed view cast the relevant sub-tree with
//! `serde_json::from_value`; everything else reads through the accessors
//! here.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value as JsonValue;

use crate::error::{Result, TransformError};

/// Group/version/kind triple identifying a resource signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Gvk {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl Gvk {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Core-group resource (empty group).
    pub fn core(version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new("", version, kind)
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for Gvk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version(), self.kind)
    }
}

/// One decoded resource document.
#[derive(Debug, Clone)]
pub struct ManifestObject {
    body: JsonValue,
}

impl ManifestObject {
    /// Wrap a decoded document. The document must be a mapping with
    /// non-empty `apiVersion` and `kind`.
    pub fn new(body: JsonValue) -> Result<Self> {
        if !body.is_object() {
            return Err(TransformError::InvalidObject {
                reason: "document is not a mapping".to_string(),
            });
        }
        let obj = Self { body };
        if obj.api_version().is_empty() || obj.kind().is_empty() {
            return Err(TransformError::InvalidObject {
                reason: "apiVersion or kind missing".to_string(),
            });
        }
        Ok(obj)
    }

    /// Parse a single YAML document.
    pub fn from_yaml(doc: &str) -> Result<Self> {
        let body: JsonValue = serde_yaml::from_str(doc)?;
        Self::new(body)
    }

    pub fn body(&self) -> &JsonValue {
        &self.body
    }

    pub fn into_body(self) -> JsonValue {
        self.body
    }

    pub fn api_version(&self) -> &str {
        self.str_at(&["apiVersion"])
    }

    pub fn kind(&self) -> &str {
        self.str_at(&["kind"])
    }

    pub fn name(&self) -> &str {
        self.str_at(&["metadata", "name"])
    }

    pub fn namespace(&self) -> Option<&str> {
        let ns = self.str_at(&["metadata", "namespace"]);
        if ns.is_empty() { None } else { Some(ns) }
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        self.string_map(&["metadata", "labels"])
    }

    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.string_map(&["metadata", "annotations"])
    }

    pub fn spec(&self) -> Option<&JsonValue> {
        self.body.get("spec")
    }

    pub fn gvk(&self) -> Gvk {
        match self.api_version().split_once('/') {
            Some((group, version)) => Gvk::new(group, version, self.kind()),
            None => Gvk::core(self.api_version(), self.kind()),
        }
    }

    /// Exact signature comparison used by processors to claim objects.
    pub fn has_gvk(&self, group: &str, version: &str, kind: &str) -> bool {
        let gvk = self.gvk();
        gvk.group == group && gvk.version == version && gvk.kind == kind
    }

    fn str_at(&self, path: &[&str]) -> &str {
        let mut cursor = &self.body;
        for seg in path {
            match cursor.get(seg) {
                Some(v) => cursor = v,
                None => return "",
            }
        }
        cursor.as_str().unwrap_or("")
    }

    fn string_map(&self, path: &[&str]) -> BTreeMap<String, String> {
        let mut cursor = &self.body;
        for seg in path {
            match cursor.get(seg) {
                Some(v) => cursor = v,
                None => return BTreeMap::new(),
            }
        }
        cursor
            .as_object()
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }
}
