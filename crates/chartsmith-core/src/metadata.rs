//! Chart-scoped name derivation and templating
//!
//! Resources generated by one tool usually share a common name prefix
//! (`my-operator-controller-manager`, `my-operator-metrics-service`, ...).
//! The service learns that prefix during the load phase and afterwards
//! answers, read-only, how any name looks once the chart owns it.

use crate::config::Config;

#[derive(Debug, Clone, Default)]
pub struct MetaService {
    conf: Config,
    common_prefix: Option<String>,
    namespace: String,
}

impl MetaService {
    pub fn new(conf: Config) -> Self {
        Self {
            conf,
            common_prefix: None,
            namespace: String::new(),
        }
    }

    /// Register one decoded object before processing starts. Maintains the
    /// longest dash-aligned common prefix over all names and remembers the
    /// target namespace.
    pub fn load(&mut self, name: &str, namespace: Option<&str>) {
        if !name.is_empty() {
            self.common_prefix = Some(match self.common_prefix.take() {
                None => name.to_string(),
                Some(prev) => common_prefix(&prev, name),
            });
        }
        if let Some(ns) = namespace {
            if !ns.is_empty() {
                self.namespace = ns.to_string();
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.conf
    }

    pub fn chart_name(&self) -> &str {
        &self.conf.chart_name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Strip the learned prefix (plus leading separators) from a resource
    /// name. Falls back to the full name when stripping would empty it.
    pub fn trim_name(&self, name: &str) -> String {
        let prefix = self.common_prefix.as_deref().unwrap_or("");
        let trimmed = name.strip_prefix(prefix).unwrap_or(name);
        let trimmed = trimmed.trim_start_matches(['-', '.']);
        if trimmed.is_empty() {
            name.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// The render-time form of a resource name, prefixed with the chart
    /// fullname. Empty names pass through so optional references stay unset.
    pub fn templated_name(&self, name: &str) -> String {
        if name.is_empty() {
            return String::new();
        }
        format!(
            "{{{{ include \"{}.fullname\" . }}}}-{}",
            self.conf.chart_name,
            self.trim_name(name)
        )
    }

    /// Replace every occurrence of the original name prefix inside an
    /// arbitrary string (DNS names and the like) with the fullname include.
    pub fn templated_string(&self, s: &str) -> String {
        let Some(prefix) = self.common_prefix.as_deref() else {
            return s.to_string();
        };
        let prefix = prefix.trim_end_matches('-');
        if prefix.is_empty() {
            return s.to_string();
        }
        s.replace(
            prefix,
            &format!("{{{{ include \"{}.fullname\" . }}}}", self.conf.chart_name),
        )
    }
}

// Longest common prefix of two names, cut back to the last `-` so a prefix
// never ends mid-word.
fn common_prefix(a: &str, b: &str) -> String {
    let mut end = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    while !a.is_char_boundary(end) {
        end -= 1;
    }
    let mut prefix = &a[..end];
    if end < a.len() || end < b.len() {
        prefix = match prefix.rfind('-') {
            Some(idx) => &prefix[..=idx],
            None => "",
        };
    }
    prefix.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_service() -> MetaService {
        let mut meta = MetaService::new(Config::new("my-chart"));
        meta.load("my-operator-controller-manager", Some("my-operator-system"));
        meta.load("my-operator-webhook-service", None);
        meta.load("my-operator-manager-config", None);
        meta
    }

    #[test]
    fn learns_common_prefix() {
        let meta = loaded_service();
        assert_eq!(meta.trim_name("my-operator-controller-manager"), "controller-manager");
        assert_eq!(meta.trim_name("my-operator-webhook-service"), "webhook-service");
    }

    #[test]
    fn trim_falls_back_to_full_name() {
        let mut meta = MetaService::new(Config::new("my-chart"));
        meta.load("my-operator", None);
        // The single loaded name is its own prefix.
        assert_eq!(meta.trim_name("my-operator"), "my-operator");
    }

    #[test]
    fn templated_name_uses_fullname_include() {
        let meta = loaded_service();
        assert_eq!(
            meta.templated_name("my-operator-webhook-service"),
            "{{ include \"my-chart.fullname\" . }}-webhook-service"
        );
        assert_eq!(meta.templated_name(""), "");
    }

    #[test]
    fn templated_string_rewrites_dns_names() {
        let meta = loaded_service();
        let dns = "my-operator-webhook-service.my-operator-system.svc";
        let templated = meta.templated_string(dns);
        assert_eq!(
            templated,
            "{{ include \"my-chart.fullname\" . }}-webhook-service.{{ include \"my-chart.fullname\" . }}-system.svc"
        );
    }

    #[test]
    fn captures_namespace() {
        let meta = loaded_service();
        assert_eq!(meta.namespace(), "my-operator-system");
    }

    #[test]
    fn prefix_cut_at_dash_boundary() {
        assert_eq!(common_prefix("my-operator-conf", "my-operator-core"), "my-operator-");
        assert_eq!(common_prefix("alpha", "beta"), "");
        assert_eq!(common_prefix("same", "same"), "same");
    }
}
