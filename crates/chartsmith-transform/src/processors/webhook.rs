//! Webhook machinery processors: cert-manager Certificate and Issuer plus
//! the admission webhook configurations that reference them

use chartsmith_core::cluster::{DEFAULT_DOMAIN, DOMAIN_KEY};
use chartsmith_core::{yamlfmt, MetaService, Values};
use serde_json::{Map, Value as JsonValue};

use crate::error::Result;
use crate::object::ManifestObject;
use crate::processors::{Fragment, Processor};

const WEBHOOK_HEADER: &str = "{{- if .Values.webhook.enabled }}";
const WEBHOOK_FOOTER: &str = "{{- end }}";
const INJECT_CA_ANNOTATION: &str = "cert-manager.io/inject-ca-from";

pub struct CertificateProcessor;

impl Processor for CertificateProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        if !obj.has_gvk("cert-manager.io", "v1", "Certificate") {
            return Ok(None);
        }
        let name = meta.trim_name(obj.name());
        let mut spec = obj
            .spec()
            .cloned()
            .unwrap_or_else(|| JsonValue::Object(Map::new()));

        if let Some(spec_obj) = spec.as_object_mut() {
            if let Some(JsonValue::Array(dns_names)) = spec_obj.get_mut("dnsNames") {
                for dns in dns_names {
                    if let Some(literal) = dns.as_str() {
                        *dns = JsonValue::String(rewrite_dns_name(meta, literal));
                    }
                }
            }
            if let Some(issuer) = spec_obj
                .get_mut("issuerRef")
                .and_then(JsonValue::as_object_mut)
            {
                if let Some(JsonValue::String(issuer_name)) = issuer.get("name") {
                    let templated = meta.templated_name(issuer_name);
                    issuer.insert("name".to_string(), JsonValue::String(templated));
                }
            }
        }

        // Sub-chart mode installs cert-manager alongside; the certificate
        // must wait for it via post-install hooks.
        let hook_annotations = if meta.config().cert_manager_as_subchart {
            "  annotations:\n    \"helm.sh/hook\": post-install,post-upgrade\n    \"helm.sh/hook-weight\": \"2\"\n"
        } else {
            ""
        };
        let mut body = format!(
            "apiVersion: cert-manager.io/v1\n\
             kind: Certificate\n\
             metadata:\n\
             \x20 name: {{{{ include \"{chart}.fullname\" . }}}}-{name}\n\
             {hook_annotations}\
             \x20 labels:\n\
             \x20 {{{{- include \"{chart}.labels\" . | nindent 4 }}}}\n\
             spec:\n\
             {spec}",
            chart = meta.chart_name(),
            spec = yamlfmt::marshal(&spec, 2)?,
        );

        let mut values = Values::new();
        if meta.config().add_webhook_option {
            values.add(true, &["webhook", "enabled"])?;
            body = format!("{WEBHOOK_HEADER}\n{body}\n{WEBHOOK_FOOTER}");
        }
        Ok(Some(Fragment::new(format!("{name}.yaml"), body, values)))
    }
}

pub struct IssuerProcessor;

impl Processor for IssuerProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        if !obj.has_gvk("cert-manager.io", "v1", "Issuer") {
            return Ok(None);
        }
        let name = meta.trim_name(obj.name());
        let spec = obj
            .spec()
            .cloned()
            .unwrap_or_else(|| JsonValue::Object(Map::new()));

        let hook_annotations = if meta.config().cert_manager_as_subchart {
            "  annotations:\n    \"helm.sh/hook\": post-install,post-upgrade\n    \"helm.sh/hook-weight\": \"1\"\n"
        } else {
            ""
        };
        let mut body = format!(
            "apiVersion: cert-manager.io/v1\n\
             kind: Issuer\n\
             metadata:\n\
             \x20 name: {{{{ include \"{chart}.fullname\" . }}}}-{name}\n\
             {hook_annotations}\
             \x20 labels:\n\
             \x20 {{{{- include \"{chart}.labels\" . | nindent 4 }}}}\n\
             spec:\n\
             {spec}",
            chart = meta.chart_name(),
            spec = yamlfmt::marshal(&spec, 2)?,
        );

        let mut values = Values::new();
        if meta.config().add_webhook_option {
            values.add(true, &["webhook", "enabled"])?;
            body = format!("{WEBHOOK_HEADER}\n{body}\n{WEBHOOK_FOOTER}");
        }
        Ok(Some(Fragment::new(format!("{name}.yaml"), body, values)))
    }
}

pub struct ValidatingWebhookProcessor;

impl Processor for ValidatingWebhookProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        if !obj.has_gvk(
            "admissionregistration.k8s.io",
            "v1",
            "ValidatingWebhookConfiguration",
        ) {
            return Ok(None);
        }
        admission_config(meta, obj, "ValidatingWebhookConfiguration").map(Some)
    }
}

pub struct MutatingWebhookProcessor;

impl Processor for MutatingWebhookProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        if !obj.has_gvk(
            "admissionregistration.k8s.io",
            "v1",
            "MutatingWebhookConfiguration",
        ) {
            return Ok(None);
        }
        admission_config(meta, obj, "MutatingWebhookConfiguration").map(Some)
    }
}

fn admission_config(meta: &MetaService, obj: &ManifestObject, kind: &str) -> Result<Fragment> {
    let name = meta.trim_name(obj.name());

    let mut annotations_block = String::new();
    let mut annotations = obj.annotations();
    if let Some(inject) = annotations.get(INJECT_CA_ANNOTATION) {
        // Value is "<namespace>/<certificate name>".
        if let Some((_, cert_name)) = inject.split_once('/') {
            let rewritten = format!(
                "{{{{ .Release.Namespace }}}}/{}",
                meta.templated_name(cert_name)
            );
            annotations.insert(INJECT_CA_ANNOTATION.to_string(), rewritten);
        }
    }
    if !annotations.is_empty() {
        let mut wrapper = Map::new();
        wrapper.insert(
            "annotations".to_string(),
            serde_json::to_value(&annotations)?,
        );
        annotations_block = format!("{}\n", yamlfmt::marshal(&wrapper, 2)?);
    }

    let mut webhooks = obj
        .body()
        .get("webhooks")
        .cloned()
        .unwrap_or_else(|| JsonValue::Array(Vec::new()));
    if let Some(list) = webhooks.as_array_mut() {
        for webhook in list {
            let Some(service) = webhook
                .pointer_mut("/clientConfig/service")
                .and_then(JsonValue::as_object_mut)
            else {
                continue;
            };
            if let Some(JsonValue::String(svc_name)) = service.get("name") {
                let templated = meta.templated_name(svc_name);
                service.insert("name".to_string(), JsonValue::String(templated));
            }
            service.insert(
                "namespace".to_string(),
                JsonValue::String("{{ .Release.Namespace }}".to_string()),
            );
        }
    }

    let mut body = format!(
        "apiVersion: admissionregistration.k8s.io/v1\n\
         kind: {kind}\n\
         metadata:\n\
         \x20 name: {{{{ include \"{chart}.fullname\" . }}}}-{name}\n\
         {annotations_block}\
         \x20 labels:\n\
         \x20 {{{{- include \"{chart}.labels\" . | nindent 4 }}}}\n\
         webhooks:\n\
         {webhooks}",
        chart = meta.chart_name(),
        webhooks = yamlfmt::marshal(&webhooks, 0)?,
    );

    let mut values = Values::new();
    if meta.config().add_webhook_option {
        values.add(true, &["webhook", "enabled"])?;
        body = format!("{WEBHOOK_HEADER}\n{body}\n{WEBHOOK_FOOTER}");
    }
    Ok(Fragment::new(format!("{name}.yaml"), body, values))
}

// DNS names carry "<service>.<namespace>.svc.<domain>" forms; each part
// follows its render-time counterpart.
fn rewrite_dns_name(meta: &MetaService, dns: &str) -> String {
    let mut rewritten = meta.templated_string(dns);
    let namespace = meta.namespace();
    if !namespace.is_empty() {
        rewritten = rewritten.replace(namespace, "{{ .Release.Namespace }}");
    }
    rewritten.replace(DEFAULT_DOMAIN, &format!("{{{{ .Values.{DOMAIN_KEY} }}}}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartsmith_core::Config;

    const CERTIFICATE: &str = r#"
apiVersion: cert-manager.io/v1
kind: Certificate
metadata:
  name: my-operator-serving-cert
  namespace: my-operator-system
spec:
  dnsNames:
  - my-operator-webhook-service.my-operator-system.svc
  - my-operator-webhook-service.my-operator-system.svc.cluster.local
  issuerRef:
    kind: Issuer
    name: my-operator-selfsigned-issuer
  secretName: webhook-server-cert
"#;

    const ISSUER: &str = r#"
apiVersion: cert-manager.io/v1
kind: Issuer
metadata:
  name: my-operator-selfsigned-issuer
  namespace: my-operator-system
spec:
  selfSigned: {}
"#;

    fn service(conf: Config) -> MetaService {
        let mut meta = MetaService::new(conf);
        meta.load("my-operator-serving-cert", Some("my-operator-system"));
        meta.load("my-operator-selfsigned-issuer", None);
        meta.load("my-operator-webhook-service", None);
        meta
    }

    #[test]
    fn rewrites_dns_names_and_issuer_ref() {
        let meta = service(Config::new("my-chart"));
        let obj = ManifestObject::from_yaml(CERTIFICATE).unwrap();
        let fragment = CertificateProcessor.process(&meta, &obj).unwrap().unwrap();

        assert_eq!(fragment.filename, "serving-cert.yaml");
        assert!(fragment.body.contains(
            "name: {{ include \"my-chart.fullname\" . }}-serving-cert"
        ));
        assert!(fragment.body.contains(
            "- {{ include \"my-chart.fullname\" . }}-webhook-service.{{ include \"my-chart.fullname\" . }}-system.svc\n"
        ));
        assert!(fragment
            .body
            .contains(".svc.{{ .Values.kubernetesClusterDomain }}\n"));
        assert!(fragment.body.contains(
            "name: {{ include \"my-chart.fullname\" . }}-selfsigned-issuer"
        ));
        assert!(!fragment.body.contains("helm.sh/hook"));
        assert!(fragment.values.is_empty());
    }

    #[test]
    fn subchart_mode_adds_hooks_and_webhook_option_wraps() {
        let mut conf = Config::new("my-chart");
        conf.cert_manager_as_subchart = true;
        conf.add_webhook_option = true;
        let meta = service(conf);

        let obj = ManifestObject::from_yaml(CERTIFICATE).unwrap();
        let fragment = CertificateProcessor.process(&meta, &obj).unwrap().unwrap();

        assert!(fragment.body.starts_with("{{- if .Values.webhook.enabled }}\n"));
        assert!(fragment.body.ends_with("\n{{- end }}"));
        assert!(fragment.body.contains("\"helm.sh/hook\": post-install,post-upgrade"));
        assert!(fragment.body.contains("\"helm.sh/hook-weight\": \"2\""));
        assert_eq!(fragment.values.get("webhook.enabled").unwrap(), true);
    }

    #[test]
    fn issuer_is_templated() {
        let meta = service(Config::new("my-chart"));
        let obj = ManifestObject::from_yaml(ISSUER).unwrap();
        let fragment = IssuerProcessor.process(&meta, &obj).unwrap().unwrap();

        assert_eq!(fragment.filename, "selfsigned-issuer.yaml");
        assert!(fragment.body.contains(
            "name: {{ include \"my-chart.fullname\" . }}-selfsigned-issuer"
        ));
        assert!(fragment.body.contains("selfSigned: {}"));
    }

    const VALIDATING: &str = r#"
apiVersion: admissionregistration.k8s.io/v1
kind: ValidatingWebhookConfiguration
metadata:
  name: my-operator-validating-webhook-configuration
  annotations:
    cert-manager.io/inject-ca-from: my-operator-system/my-operator-serving-cert
webhooks:
- admissionReviewVersions:
  - v1
  clientConfig:
    service:
      name: my-operator-webhook-service
      namespace: my-operator-system
      path: /validate-widget
  failurePolicy: Fail
  name: vwidget.kb.io
  sideEffects: None
"#;

    #[test]
    fn validating_config_templates_service_and_ca_injection() {
        let meta = service(Config::new("my-chart"));
        let obj = ManifestObject::from_yaml(VALIDATING).unwrap();
        let fragment = ValidatingWebhookProcessor
            .process(&meta, &obj)
            .unwrap()
            .unwrap();

        assert_eq!(fragment.filename, "validating-webhook-configuration.yaml");
        assert!(fragment.body.contains(
            "name: {{ include \"my-chart.fullname\" . }}-validating-webhook-configuration"
        ));
        assert!(fragment.body.contains(
            "cert-manager.io/inject-ca-from: {{ .Release.Namespace }}/{{ include \"my-chart.fullname\" . }}-serving-cert"
        ));
        assert!(fragment.body.contains(
            "name: {{ include \"my-chart.fullname\" . }}-webhook-service"
        ));
        assert!(fragment.body.contains("namespace: {{ .Release.Namespace }}"));
        assert!(fragment.body.contains("path: /validate-widget"));
        assert!(!fragment.body.contains("{{- if .Values.webhook.enabled }}"));
    }

    #[test]
    fn webhook_option_wraps_admission_config() {
        let mut conf = Config::new("my-chart");
        conf.add_webhook_option = true;
        let meta = service(conf);

        let doc = VALIDATING
            .replace("ValidatingWebhookConfiguration", "MutatingWebhookConfiguration")
            .replace("validating-webhook", "mutating-webhook");
        let obj = ManifestObject::from_yaml(&doc).unwrap();
        let fragment = MutatingWebhookProcessor
            .process(&meta, &obj)
            .unwrap()
            .unwrap();

        assert_eq!(fragment.filename, "mutating-webhook-configuration.yaml");
        assert!(fragment.body.starts_with("{{- if .Values.webhook.enabled }}\n"));
        assert!(fragment.body.ends_with("\n{{- end }}"));
        assert_eq!(fragment.values.get("webhook.enabled").unwrap(), true);
    }
}
