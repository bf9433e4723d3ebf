//! Chart-wide configuration surface
//!
//! One read-only value threaded through the metadata service into every
//! processor. There is no ambient global state.

use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the generated chart.
    pub chart_name: String,
    /// Keep the original resource namespaces in generated metadata.
    pub preserve_ns: bool,
    /// Inject a chart-wide imagePullSecrets list into pod specs that do not
    /// declare one.
    pub image_pull_secrets: bool,
    /// Wrap webhook-related fragments in `{{- if .Values.webhook.enabled }}`.
    pub add_webhook_option: bool,
    /// Group CRD fragments into the chart's crds/ directory.
    pub crd_dir: bool,
    /// Declare cert-manager as a chart dependency instead of assuming it is
    /// installed, and annotate certificates with post-install hooks.
    pub cert_manager_as_subchart: bool,
    /// Version constraint for the cert-manager dependency.
    pub cert_manager_version: String,
    /// Default for `certmanager.installCRDs` in subchart mode.
    pub cert_manager_install_crd: bool,
}

impl Config {
    pub fn new(chart_name: impl Into<String>) -> Self {
        Self {
            chart_name: chart_name.into(),
            preserve_ns: false,
            image_pull_secrets: false,
            add_webhook_option: false,
            crd_dir: false,
            cert_manager_as_subchart: false,
            cert_manager_version: "v1.12.2".to_string(),
            cert_manager_install_crd: true,
        }
    }

    /// Chart names end up in release names and label values, so they follow
    /// the DNS-label rule.
    pub fn validate(&self) -> Result<()> {
        let name = self.chart_name.as_str();
        let valid = !name.is_empty()
            && name.len() <= 63
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !name.starts_with('-')
            && !name.ends_with('-');
        if valid {
            Ok(())
        } else {
            Err(CoreError::InvalidChartName {
                name: name.to_string(),
            })
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("chart")
    }
}
