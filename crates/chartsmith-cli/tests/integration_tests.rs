//! End-to-end tests for the chartsmith binary

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

const MANIFESTS: &str = r#"apiVersion: v1
kind: Namespace
metadata:
  name: my-operator-system
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: my-operator-controller-manager
  namespace: my-operator-system
spec:
  replicas: 1
  selector:
    matchLabels:
      control-plane: controller-manager
  template:
    metadata:
      labels:
        control-plane: controller-manager
    spec:
      containers:
      - name: manager
        image: controller:v0.5.0
        env:
        - name: LOG_LEVEL
          value: info
---
apiVersion: v1
kind: Service
metadata:
  name: my-operator-metrics-service
  namespace: my-operator-system
spec:
  selector:
    control-plane: controller-manager
  ports:
  - port: 8443
    targetPort: https
---
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: widgets.example.com
spec:
  group: example.com
  names:
    kind: Widget
    plural: widgets
  scope: Namespaced
  versions:
  - name: v1
    served: true
    storage: true
"#;

/// Run chartsmith with the given args, feeding the manifests on stdin.
fn chartsmith(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_chartsmith"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn chartsmith");
    child
        .stdin
        .take()
        .expect("stdin handle")
        .write_all(stdin.as_bytes())
        .expect("Failed to write stdin");
    child.wait_with_output().expect("Failed to wait for chartsmith")
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

#[test]
fn generates_chart_from_stdin() {
    let out_dir = TempDir::new().expect("tempdir");
    let dest = out_dir.path().to_str().expect("utf-8 path");

    let output = chartsmith(&["my-operator", "-d", dest], MANIFESTS);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let chart = out_dir.path().join("my-operator");
    assert!(chart.join("Chart.yaml").is_file());
    assert!(chart.join(".helmignore").is_file());
    assert!(chart.join("templates/_helpers.tpl").is_file());

    let deployment = read(&chart.join("templates/deployment.yaml"));
    assert!(deployment.contains("name: {{ include \"my-operator.fullname\" . }}-controller-manager"));
    assert!(deployment.contains(
        "image: {{ .Values.controllerManager.manager.image.repository }}:{{ .Values.controllerManager.manager.image.tag | default .Chart.AppVersion }}"
    ));
    assert!(deployment.contains("KUBERNETES_CLUSTER_DOMAIN"));

    let service = read(&chart.join("templates/metrics-service.yaml"));
    assert!(service.contains("{{ .Values.metricsService.type }}"));

    let values = read(&chart.join("values.yaml"));
    assert!(values.contains("kubernetesClusterDomain: cluster.local"));
    assert!(values.contains("logLevel: info"));
    // Top-level keys come out sorted.
    let top_keys: Vec<&str> = values
        .lines()
        .filter(|l| !l.starts_with([' ', '#']) && l.contains(':'))
        .collect();
    let mut sorted = top_keys.clone();
    sorted.sort();
    assert_eq!(top_keys, sorted);
}

#[test]
fn reads_manifests_from_files() {
    let in_dir = TempDir::new().expect("tempdir");
    let out_dir = TempDir::new().expect("tempdir");
    fs::write(in_dir.path().join("all.yaml"), MANIFESTS).expect("write manifests");

    let output = chartsmith(
        &[
            "my-operator",
            "-f",
            in_dir.path().to_str().expect("utf-8 path"),
            "-d",
            out_dir.path().to_str().expect("utf-8 path"),
        ],
        "",
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(out_dir
        .path()
        .join("my-operator/templates/deployment.yaml")
        .is_file());
}

#[test]
fn crd_dir_routes_crds() {
    let out_dir = TempDir::new().expect("tempdir");
    let dest = out_dir.path().to_str().expect("utf-8 path");

    let output = chartsmith(&["my-operator", "-d", dest, "--crd-dir"], MANIFESTS);
    assert!(output.status.success());

    let chart = out_dir.path().join("my-operator");
    assert!(chart.join("crds/crd-widgets.yaml").is_file());
    assert!(!chart.join("templates/crd-widgets.yaml").exists());
}

#[test]
fn rerun_is_byte_identical() {
    let out_dir = TempDir::new().expect("tempdir");
    let dest = out_dir.path().to_str().expect("utf-8 path");

    assert!(chartsmith(&["my-operator", "-d", dest], MANIFESTS).status.success());
    let chart = out_dir.path().join("my-operator");
    let first = (
        read(&chart.join("values.yaml")),
        read(&chart.join("templates/deployment.yaml")),
        read(&chart.join("templates/metrics-service.yaml")),
    );

    assert!(chartsmith(&["my-operator", "-d", dest], MANIFESTS).status.success());
    let second = (
        read(&chart.join("values.yaml")),
        read(&chart.join("templates/deployment.yaml")),
        read(&chart.join("templates/metrics-service.yaml")),
    );
    assert_eq!(first, second);
}

#[test]
fn rejects_invalid_chart_name() {
    let output = chartsmith(&["Not-A-Dns-Label"], "");
    assert!(!output.status.success());
}

#[test]
fn subchart_flag_adds_dependency_and_values() {
    let out_dir = TempDir::new().expect("tempdir");
    let dest = out_dir.path().to_str().expect("utf-8 path");

    let output = chartsmith(
        &["my-operator", "-d", dest, "--cert-manager-as-subchart"],
        MANIFESTS,
    );
    assert!(output.status.success());

    let chart = out_dir.path().join("my-operator");
    let manifest = read(&chart.join("Chart.yaml"));
    assert!(manifest.contains("- name: cert-manager"));
    assert!(manifest.contains("condition: certmanager.enabled"));

    let values = read(&chart.join("values.yaml"));
    assert!(values.contains("certmanager:"));
    assert!(values.contains("enabled: true"));
    assert!(values.contains("installCRDs: true"));
}
