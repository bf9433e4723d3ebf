//! PodDisruptionBudget processor

use chartsmith_core::{yamlfmt, MetaService, Values};
use serde_json::{Map, Value as JsonValue};

use crate::error::Result;
use crate::meta::object_meta;
use crate::object::ManifestObject;
use crate::processors::{Fragment, Processor};

pub struct PodDisruptionBudgetProcessor;

impl Processor for PodDisruptionBudgetProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        if !obj.has_gvk("policy", "v1", "PodDisruptionBudget") {
            return Ok(None);
        }
        let header = object_meta(meta, obj)?;
        let spec = obj
            .spec()
            .cloned()
            .unwrap_or_else(|| JsonValue::Object(Map::new()));
        let body = format!("{header}\nspec:\n{}", yamlfmt::marshal(&spec, 2)?);

        let filename = format!("{}.yaml", meta.trim_name(obj.name()));
        Ok(Some(Fragment::new(filename, body, Values::new())))
    }
}
