//! Service and Ingress processors

use chartsmith_core::{to_lower_camel, yamlfmt, MetaService, Values};
use k8s_openapi::api::core::v1::ServiceSpec;
use k8s_openapi::api::networking::v1::{IngressBackend, IngressSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde_json::{json, Map, Value as JsonValue};

use crate::error::Result;
use crate::meta::object_meta;
use crate::object::ManifestObject;
use crate::processors::{cast_spec, Fragment, Processor};

pub struct ServiceProcessor;

impl Processor for ServiceProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        if !obj.has_gvk("", "v1", "Service") {
            return Ok(None);
        }
        let spec: ServiceSpec = cast_spec(obj)?;
        let header = object_meta(meta, obj)?;

        let name = meta.trim_name(obj.name());
        let short_name = name
            .strip_prefix("controller-manager-")
            .unwrap_or(&name)
            .to_string();
        let short = to_lower_camel(&short_name);

        let mut values = Values::new();
        let svc_type = spec
            .type_
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "ClusterIP".to_string());
        values.set(svc_type, &[&short, "type"])?;

        let ports: Vec<JsonValue> = spec
            .ports
            .iter()
            .flatten()
            .map(|p| {
                let mut port = Map::new();
                port.insert("port".to_string(), json!(p.port));
                if let Some(name) = &p.name {
                    if !name.is_empty() {
                        port.insert("name".to_string(), json!(name));
                    }
                }
                if let Some(node_port) = p.node_port {
                    if node_port != 0 {
                        port.insert("nodePort".to_string(), json!(node_port));
                    }
                }
                if let Some(protocol) = &p.protocol {
                    if !protocol.is_empty() {
                        port.insert("protocol".to_string(), json!(protocol));
                    }
                }
                let target = match &p.target_port {
                    Some(IntOrString::Int(i)) => json!(i),
                    Some(IntOrString::String(s)) => json!(s),
                    None => json!(0),
                };
                port.insert("targetPort".to_string(), target);
                JsonValue::Object(port)
            })
            .collect();
        values.set(ports, &[&short, "ports"])?;

        let selector = spec.selector.clone().unwrap_or_default();
        let selector_block = yamlfmt::marshal(&selector, 4)?;

        let mut body = format!(
            "{header}\n\
             spec:\n\
             \x20 type: {{{{ .Values.{short}.type }}}}\n\
             \x20 selector:\n\
             {selector_block}\n\
             \x20   {{{{- include \"{chart}.selectorLabels\" . | nindent 4 }}}}\n\
             \x20 ports:\n\
             \x20 {{{{- .Values.{short}.ports | toYaml | nindent 2 }}}}",
            chart = meta.chart_name(),
        );

        if let Some(ranges) = &spec.load_balancer_source_ranges {
            if !ranges.is_empty() {
                values.set(ranges, &[&short, "loadBalancerSourceRanges"])?;
                body.push_str(&format!(
                    "\n  loadBalancerSourceRanges:\n  {{{{- .Values.{short}.loadBalancerSourceRanges | toYaml | nindent 2 }}}}"
                ));
            }
        }

        if short == "webhookService" && meta.config().add_webhook_option {
            body = format!("{{{{- if .Values.webhook.enabled }}}}\n{body}\n{{{{- end }}}}");
        }

        Ok(Some(Fragment::new(
            format!("{short_name}.yaml"),
            body,
            values,
        )))
    }
}

pub struct IngressProcessor;

impl Processor for IngressProcessor {
    fn process(&self, meta: &MetaService, obj: &ManifestObject) -> Result<Option<Fragment>> {
        if !obj.has_gvk("networking.k8s.io", "v1", "Ingress") {
            return Ok(None);
        }
        let mut spec: IngressSpec = cast_spec(obj)?;
        let header = object_meta(meta, obj)?;

        if let Some(backend) = &mut spec.default_backend {
            rewrite_backend(meta, backend);
        }
        if let Some(rules) = &mut spec.rules {
            for rule in rules {
                if let Some(http) = &mut rule.http {
                    for path in &mut http.paths {
                        rewrite_backend(meta, &mut path.backend);
                    }
                }
            }
        }
        if let Some(tls) = &mut spec.tls {
            for entry in tls {
                if let Some(secret) = &mut entry.secret_name {
                    *secret = meta.templated_name(secret);
                }
            }
        }

        let spec_text = yamlfmt::marshal(&spec, 2)?;
        let body = format!("{header}\nspec:\n{spec_text}");
        Ok(Some(Fragment::new(
            format!("{}.yaml", meta.trim_name(obj.name())),
            body,
            Values::new(),
        )))
    }
}

fn rewrite_backend(meta: &MetaService, backend: &mut IngressBackend) {
    if let Some(service) = &mut backend.service {
        service.name = meta.templated_name(&service.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartsmith_core::Config;

    const SERVICE: &str = r#"
apiVersion: v1
kind: Service
metadata:
  name: my-operator-controller-manager-metrics-service
spec:
  selector:
    control-plane: controller-manager
  ports:
  - name: https
    port: 8443
    protocol: TCP
    targetPort: https
"#;

    const WEBHOOK_SERVICE: &str = r#"
apiVersion: v1
kind: Service
metadata:
  name: my-operator-webhook-service
spec:
  type: NodePort
  selector:
    control-plane: controller-manager
  ports:
  - port: 443
    targetPort: 9443
    nodePort: 30443
  loadBalancerSourceRanges:
  - 10.0.0.0/8
"#;

    fn service_meta() -> MetaService {
        let mut meta = MetaService::new(Config::new("my-chart"));
        meta.load("my-operator-controller-manager-metrics-service", None);
        meta.load("my-operator-webhook-service", None);
        meta
    }

    #[test]
    fn strips_controller_manager_prefix_and_defaults_type() {
        let obj = ManifestObject::from_yaml(SERVICE).unwrap();
        let fragment = ServiceProcessor.process(&service_meta(), &obj).unwrap().unwrap();

        assert_eq!(fragment.filename, "metrics-service.yaml");
        assert!(fragment
            .body
            .contains("type: {{ .Values.metricsService.type }}"));
        assert!(fragment
            .body
            .contains("    control-plane: controller-manager\n    {{- include \"my-chart.selectorLabels\" . | nindent 4 }}"));
        assert_eq!(fragment.values.get("metricsService.type").unwrap(), "ClusterIP");

        let port = &fragment.values.get("metricsService.ports").unwrap()[0];
        assert_eq!(port["port"], 8443);
        assert_eq!(port["name"], "https");
        assert_eq!(port["protocol"], "TCP");
        assert_eq!(port["targetPort"], "https");
        assert!(port.get("nodePort").is_none());
    }

    #[test]
    fn wraps_webhook_service_and_lifts_source_ranges() {
        let mut conf = Config::new("my-chart");
        conf.add_webhook_option = true;
        let mut meta = MetaService::new(conf);
        meta.load("my-operator-controller-manager", None);
        meta.load("my-operator-webhook-service", None);

        let obj = ManifestObject::from_yaml(WEBHOOK_SERVICE).unwrap();
        let fragment = ServiceProcessor.process(&meta, &obj).unwrap().unwrap();

        assert_eq!(fragment.filename, "webhook-service.yaml");
        assert!(fragment.body.starts_with("{{- if .Values.webhook.enabled }}\n"));
        assert!(fragment.body.ends_with("\n{{- end }}"));
        assert!(fragment.body.contains("loadBalancerSourceRanges:"));
        assert_eq!(fragment.values.get("webhookService.type").unwrap(), "NodePort");

        let port = &fragment.values.get("webhookService.ports").unwrap()[0];
        assert_eq!(port["nodePort"], 30443);
        assert_eq!(port["targetPort"], 9443);
        assert_eq!(
            fragment
                .values
                .get("webhookService.loadBalancerSourceRanges")
                .unwrap()[0],
            "10.0.0.0/8"
        );
    }

    const INGRESS: &str = r#"
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: my-operator-api-ingress
spec:
  ingressClassName: nginx
  defaultBackend:
    service:
      name: my-operator-fallback
      port:
        number: 80
  tls:
  - hosts:
    - api.example.com
    secretName: my-operator-api-tls
  rules:
  - host: api.example.com
    http:
      paths:
      - path: /
        pathType: Prefix
        backend:
          service:
            name: my-operator-api-service
            port:
              number: 8080
"#;

    #[test]
    fn ingress_templates_backend_services_and_tls_secret() {
        let mut meta = MetaService::new(Config::new("my-chart"));
        meta.load("my-operator-api-ingress", None);
        meta.load("my-operator-api-service", None);
        meta.load("my-operator-fallback", None);
        meta.load("my-operator-api-tls", None);

        let obj = ManifestObject::from_yaml(INGRESS).unwrap();
        let fragment = IngressProcessor.process(&meta, &obj).unwrap().unwrap();

        assert_eq!(fragment.filename, "api-ingress.yaml");
        assert!(fragment.body.contains("ingressClassName: nginx"));
        assert!(fragment.body.contains(
            "name: {{ include \"my-chart.fullname\" . }}-api-service"
        ));
        assert!(fragment.body.contains(
            "name: {{ include \"my-chart.fullname\" . }}-fallback"
        ));
        assert!(fragment.body.contains(
            "secretName: {{ include \"my-chart.fullname\" . }}-api-tls"
        ));
        assert!(fragment.body.contains("host: api.example.com"));
        assert!(fragment.values.is_empty());
    }
}
