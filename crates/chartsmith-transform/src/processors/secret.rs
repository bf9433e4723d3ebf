//! Secret processor
//!
//! `data` entries are base64-decoded into values and re-encoded at render
//! time, so the operator edits plain text in values.yaml. Entries that do
//! not decode to UTF-8 stay literal in the template.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chartsmith_core::{to_lower_camel, MetaService, Values};
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::error::Result;
use crate::meta::object_meta;
use crate::object::ManifestObject;
use crate::processors::{Fragment, Processor};

pub struct SecretProcessor;

impl Processor for SecretProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        if !obj.has_gvk("", "v1", "Secret") {
            return Ok(None);
        }
        let header = object_meta(meta, obj)?;
        let name = meta.trim_name(obj.name());
        let name_camel = to_lower_camel(&name);
        let mut values = Values::new();
        let mut lines = Vec::new();

        if let Some(JsonValue::Object(data)) = obj.body().get("data") {
            if !data.is_empty() {
                lines.push("data:".to_string());
                for (key, value) in data {
                    let encoded = value.as_str().unwrap_or_default();
                    let key_camel = to_lower_camel(&key.to_lowercase());
                    match decode_utf8(encoded) {
                        Some(text) => {
                            values.set(text, &[&name_camel, &key_camel])?;
                            lines.push(format!(
                                "  {key}: {{{{ .Values.{name_camel}.{key_camel} | b64enc | quote }}}}"
                            ));
                        }
                        None => {
                            warn!(key, secret = obj.name(), "secret entry is not UTF-8, kept literal");
                            lines.push(format!("  {key}: {encoded}"));
                        }
                    }
                }
            }
        }

        if let Some(JsonValue::Object(string_data)) = obj.body().get("stringData") {
            if !string_data.is_empty() {
                lines.push("stringData:".to_string());
                for (key, value) in string_data {
                    let text = value.as_str().unwrap_or_default();
                    let placeholder =
                        values.add(text, &[&name_camel, &to_lower_camel(&key.to_lowercase())])?;
                    lines.push(format!("  {key}: {placeholder}"));
                }
            }
        }

        if let Some(secret_type) = obj.body().get("type").and_then(JsonValue::as_str) {
            lines.push(format!("type: {secret_type}"));
        }

        let body = if lines.is_empty() {
            header
        } else {
            format!("{header}\n{}", lines.join("\n"))
        };
        Ok(Some(Fragment::new(format!("{name}.yaml"), body, values)))
    }
}

fn decode_utf8(encoded: &str) -> Option<String> {
    let bytes = STANDARD.decode(encoded).ok()?;
    String::from_utf8(bytes).ok()
}
