//! Fallback processor for unclaimed kinds
//!
//! Templates the metadata block and emits the rest of the object verbatim.

use chartsmith_core::{yamlfmt, MetaService, Values};

use crate::error::Result;
use crate::meta::object_meta;
use crate::object::ManifestObject;
use crate::processors::{Fragment, Processor};

pub struct DefaultProcessor;

impl Processor for DefaultProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        let header = object_meta(meta, obj)?;

        let mut body_map = obj
            .body()
            .as_object()
            .cloned()
            .unwrap_or_default();
        for key in ["apiVersion", "kind", "metadata", "status"] {
            body_map.remove(key);
        }
        let body = if body_map.is_empty() {
            header
        } else {
            format!("{header}\n{}", yamlfmt::marshal(&body_map, 0)?)
        };

        let filename = format!("{}.yaml", obj.kind().to_lowercase());
        Ok(Some(Fragment::new(filename, body, Values::new())))
    }
}
