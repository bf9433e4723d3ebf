//! Object dispatcher and chart assembly

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chartsmith_core::cluster::{DEFAULT_DOMAIN, DOMAIN_KEY};
use chartsmith_core::{Config, MetaService, Values};
use tracing::debug;

use crate::error::{Result, TransformError};
use crate::object::ManifestObject;
use crate::processors::{self, passthrough::DefaultProcessor, Fragment, Processor};

/// The assembled output bundle: grouped template files and the merged
/// values tree, ready for the chart writer.
#[derive(Debug)]
pub struct Chart {
    /// Filename to document-separated template text.
    pub files: BTreeMap<String, String>,
    pub values: Values,
}

/// Routes each decoded object to the first claiming processor, merges the
/// produced values and groups fragments per destination file.
pub struct App {
    meta: MetaService,
    processors: Vec<Box<dyn Processor>>,
    fallback: DefaultProcessor,
}

impl App {
    pub fn new(conf: Config) -> Result<Self> {
        conf.validate()?;
        Ok(Self {
            meta: MetaService::new(conf),
            processors: processors::default_set(),
            fallback: DefaultProcessor,
        })
    }

    pub fn meta(&self) -> &MetaService {
        &self.meta
    }

    /// Transform the full input set into a chart.
    ///
    /// Runs in two phases: first every object is registered with the
    /// metadata service so the common name prefix is known before any
    /// template is rendered, then objects are dispatched in input order.
    /// The cancel flag is honored between objects, never mid-resource.
    pub fn render(&mut self, objects: &[ManifestObject], cancel: &AtomicBool) -> Result<Chart> {
        for obj in objects {
            // CRD names are dotted group names, not prefixed resource names,
            // and would collapse the learned prefix to nothing.
            if obj.has_gvk("apiextensions.k8s.io", "v1", "CustomResourceDefinition") {
                continue;
            }
            self.meta.load(obj.name(), obj.namespace());
        }

        let mut values = Values::new();
        values.set(DEFAULT_DOMAIN, &[DOMAIN_KEY])?;

        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for obj in objects {
            if cancel.load(Ordering::Relaxed) {
                return Err(TransformError::Cancelled);
            }
            let fragment = self
                .dispatch(obj)
                .map_err(|e| e.for_resource(obj.kind(), obj.name()))?;
            debug!(
                kind = obj.kind(),
                name = obj.name(),
                file = %fragment.filename,
                "processed"
            );
            let Fragment {
                filename,
                body,
                values: fragment_values,
            } = fragment;
            values
                .merge(fragment_values)
                .map_err(|e| TransformError::Core(e).for_resource(obj.kind(), obj.name()))?;
            groups.entry(filename).or_default().push(body);
        }

        let conf = self.meta.config();
        if conf.cert_manager_as_subchart {
            values.add(conf.cert_manager_install_crd, &["certmanager", "installCRDs"])?;
            values.add(true, &["certmanager", "enabled"])?;
        }

        let files = groups
            .into_iter()
            .map(|(filename, bodies)| (filename, bodies.join("\n---\n") + "\n"))
            .collect();
        Ok(Chart { files, values })
    }

    fn dispatch(&self, obj: &ManifestObject) -> Result<Fragment> {
        for processor in &self.processors {
            if let Some(fragment) = processor.process(&self.meta, obj)? {
                return Ok(fragment);
            }
        }
        self.fallback
            .process(&self.meta, obj)?
            .ok_or_else(|| TransformError::InvalidObject {
                reason: "fallback processor declined the object".to_string(),
            })
    }
}
