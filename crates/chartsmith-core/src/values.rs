//! Chart values tree with collision-checked insertion and deep merge

use serde::Serialize;
use serde_json::map::Entry;
use serde_json::{Map, Value as JsonValue};

use crate::error::{CoreError, Result};
use crate::strings::to_lower_camel;

/// The hierarchical default-values document built up during processing.
///
/// Keys inside a path are unique: inserting a scalar where a nested map
/// already lives (or the other way around) is a programming error and fails
/// fast instead of silently clobbering another resource's values.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Values(Map<String, JsonValue>);

impl Values {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Insert `value` at the camel-cased key path and return the placeholder
    /// expression that reproduces it at render time.
    ///
    /// Strings render quoted, everything else raw:
    /// `add("nginx", &["app", "image", "repository"])` returns
    /// `{{ .Values.app.image.repository | quote }}`.
    pub fn add<T: Serialize>(&mut self, value: T, path: &[&str]) -> Result<String> {
        let value = serde_json::to_value(value)?;
        let is_string = value.is_string();
        let path = camel_path(path);
        self.set_nested(&path, value)?;
        let joined = path.join(".");
        if is_string {
            Ok(format!("{{{{ .Values.{joined} | quote }}}}"))
        } else {
            Ok(format!("{{{{ .Values.{joined} }}}}"))
        }
    }

    /// Insert a structured subtree and return a block dereference that
    /// re-emits it as YAML, re-indented to `indent` columns.
    pub fn add_yaml<T: Serialize>(
        &mut self,
        value: T,
        indent: usize,
        newline: bool,
        path: &[&str],
    ) -> Result<String> {
        let value = serde_json::to_value(value)?;
        let path = camel_path(path);
        self.set_nested(&path, value)?;
        let joined = path.join(".");
        if newline {
            Ok(format!("{{{{- toYaml .Values.{joined} | nindent {indent} }}}}"))
        } else {
            Ok(format!("{{{{ toYaml .Values.{joined} | indent {indent} }}}}"))
        }
    }

    /// Raw insertion with path segments preserved verbatim and no
    /// placeholder returned. For subtrees whose keys must survive
    /// round-tripping untouched (resource names like `ephemeral-storage`);
    /// callers camel-case the derived segments themselves.
    pub fn set<T: Serialize>(&mut self, value: T, path: &[&str]) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let path: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        self.set_nested(&path, value)
    }

    /// Deep-union `other` into this tree.
    ///
    /// Equal leaves are a no-op, map-on-map recurses, anything else is a
    /// merge conflict naming the offending path: it means two resources
    /// derived the same values path for incompatible data.
    pub fn merge(&mut self, other: Values) -> Result<()> {
        let mut path = Vec::new();
        deep_merge(&mut self.0, other.0, &mut path)
    }

    /// Look up a value by dotted path (test and assembly helper).
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let mut cursor: Option<&JsonValue> = None;
        for seg in path.split('.') {
            cursor = match cursor {
                None => self.0.get(seg),
                Some(JsonValue::Object(map)) => map.get(seg),
                Some(_) => return None,
            };
            cursor?;
        }
        cursor
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn inner(&self) -> &Map<String, JsonValue> {
        &self.0
    }

    /// Serialize to the values.yaml text form. Keys come out sorted, so
    /// repeated runs over the same input are byte-stable.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    fn set_nested(&mut self, path: &[String], value: JsonValue) -> Result<()> {
        let Some((last, parents)) = path.split_last() else {
            return Err(CoreError::EmptyPath);
        };
        let mut cursor = &mut self.0;
        for (i, seg) in parents.iter().enumerate() {
            let slot = cursor
                .entry(seg.clone())
                .or_insert_with(|| JsonValue::Object(Map::new()));
            cursor = slot
                .as_object_mut()
                .ok_or_else(|| CoreError::PathConflict {
                    path: path[..=i].join("."),
                })?;
        }
        if let Some(existing) = cursor.get(last) {
            if existing.is_object() != value.is_object() {
                return Err(CoreError::PathConflict {
                    path: path.join("."),
                });
            }
        }
        cursor.insert(last.clone(), value);
        Ok(())
    }
}

fn camel_path(path: &[&str]) -> Vec<String> {
    path.iter().map(|seg| to_lower_camel(seg)).collect()
}

fn deep_merge(
    base: &mut Map<String, JsonValue>,
    other: Map<String, JsonValue>,
    path: &mut Vec<String>,
) -> Result<()> {
    for (key, incoming) in other {
        match base.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(incoming);
            }
            Entry::Occupied(mut slot) => {
                path.push(key);
                match (slot.get_mut(), incoming) {
                    (JsonValue::Object(base_child), JsonValue::Object(other_child)) => {
                        deep_merge(base_child, other_child, path)?;
                    }
                    (existing, incoming) => {
                        if *existing != incoming {
                            return Err(CoreError::MergeConflict {
                                path: path.join("."),
                            });
                        }
                    }
                }
                path.pop();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_returns_quoted_placeholder_for_strings() {
        let mut values = Values::new();
        let ph = values.add("nginx", &["app", "image", "repository"]).unwrap();
        assert_eq!(ph, "{{ .Values.app.image.repository | quote }}");
        assert_eq!(values.get("app.image.repository").unwrap(), "nginx");
    }

    #[test]
    fn add_returns_raw_placeholder_for_numbers() {
        let mut values = Values::new();
        let ph = values.add(3, &["app", "replicas"]).unwrap();
        assert_eq!(ph, "{{ .Values.app.replicas }}");
        assert_eq!(values.get("app.replicas").unwrap(), 3);
    }

    #[test]
    fn add_camel_cases_path_segments() {
        let mut values = Values::new();
        let ph = values.add("x", &["my-app", "host-data"]).unwrap();
        assert_eq!(ph, "{{ .Values.myApp.hostData | quote }}");
        assert!(values.get("myApp.hostData").is_some());
    }

    #[test]
    fn add_yaml_returns_block_dereference() {
        let mut values = Values::new();
        let ph = values
            .add_yaml(json!({"cpu": "100m"}), 10, true, &["app", "resources"])
            .unwrap();
        assert_eq!(ph, "{{- toYaml .Values.app.resources | nindent 10 }}");
        let inline = values
            .add_yaml(json!(["a"]), 2, false, &["app", "args"])
            .unwrap();
        assert_eq!(inline, "{{ toYaml .Values.app.args | indent 2 }}");
    }

    #[test]
    fn scalar_under_map_path_fails_fast() {
        let mut values = Values::new();
        values.add("x", &["app", "image", "repository"]).unwrap();
        let err = values.add("y", &["app", "image"]).unwrap_err();
        assert!(matches!(err, CoreError::PathConflict { .. }));

        let err = values.add("z", &["app", "image", "repository", "deep"]).unwrap_err();
        assert!(matches!(err, CoreError::PathConflict { .. }));
    }

    #[test]
    fn merge_accepts_equal_leaves() {
        let mut left = Values::new();
        left.add("nginx", &["app", "image", "repository"]).unwrap();
        let mut right = Values::new();
        right.add("nginx", &["app", "image", "repository"]).unwrap();
        right.add("1.14.2", &["app", "image", "tag"]).unwrap();

        left.merge(right).unwrap();
        assert_eq!(left.get("app.image.tag").unwrap(), "1.14.2");
    }

    #[test]
    fn merge_rejects_conflicting_leaves() {
        let mut left = Values::new();
        left.add("nginx", &["app", "image", "repository"]).unwrap();
        let mut right = Values::new();
        right.add("redis", &["app", "image", "repository"]).unwrap();

        let err = left.merge(right).unwrap_err();
        match err {
            CoreError::MergeConflict { path } => assert_eq!(path, "app.image.repository"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn merge_rejects_scalar_vs_map() {
        let mut left = Values::new();
        left.add("scalar", &["app", "node"]).unwrap();
        let mut right = Values::new();
        right.add("x", &["app", "node", "selector"]).unwrap();

        let err = left.merge(right).unwrap_err();
        assert!(matches!(err, CoreError::MergeConflict { .. }));
    }

    #[test]
    fn yaml_output_is_key_sorted() {
        let mut values = Values::new();
        values.add(1, &["zeta"]).unwrap();
        values.add(2, &["alpha"]).unwrap();
        let yaml = values.to_yaml().unwrap();
        assert!(yaml.find("alpha").unwrap() < yaml.find("zeta").unwrap());
    }
}
