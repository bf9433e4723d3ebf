//! StorageClass processor
//!
//! Provisioner, parameters and policies stay literal; only the metadata
//! follows the chart rename.

use chartsmith_core::{yamlfmt, MetaService, Values};
use serde_json::Map;

use crate::error::Result;
use crate::meta::object_meta;
use crate::object::ManifestObject;
use crate::processors::{Fragment, Processor};

pub struct StorageClassProcessor;

impl Processor for StorageClassProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        if !obj.has_gvk("storage.k8s.io", "v1", "StorageClass") {
            return Ok(None);
        }
        let header = object_meta(meta, obj)?;

        let mut payload = obj.body().as_object().cloned().unwrap_or_else(Map::new);
        for key in ["apiVersion", "kind", "metadata", "status"] {
            payload.remove(key);
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
