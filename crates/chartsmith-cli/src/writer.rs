//! Chart writer
//!
//! Lays the rendered bundle out on disk:
//!
//! ```text
//! <chart name>/
//!   .helmignore
//!   Chart.yaml
//!   values.yaml
//!   templates/
//!     _helpers.tpl
//!     <grouped template files>
//!   crds/            (only with --crd-dir)
//! ```
//!
//! Every file is overwritten on rerun so the chart stays in sync with the
//! input manifests.

use std::fs;
use std::path::Path;

use miette::{IntoDiagnostic, Result, WrapErr};
use tracing::info;

use chartsmith_core::Config;
use chartsmith_transform::Chart;

const HELMIGNORE: &str = "\
# Patterns to ignore when building packages.
# This supports shell glob matching, relative path matching, and
# negation (prefixed with !). Only one pattern per line.
.DS_Store
# Common VCS dirs
.git/
.gitignore
.bzr/
.bzrignore
.hg/
.hgignore
.svn/
# Common backup files
*.swp
*.bak
*.tmp
*.orig
*~
# Various IDEs
.project
.idea/
*.tmproj
.vscode/
";

// Standard helm-create partials; <CHART> is replaced with the chart name.
const HELPERS_TPL: &str = r#"{{/*
Expand the name of the chart.
*/}}
{{- define "<CHART>.name" -}}
{{- default .Chart.Name .Values.nameOverride | trunc 63 | trimSuffix "-" }}
{{- end }}

{{/*
Create a default fully qualified app name.
We truncate at 63 chars because some Kubernetes name fields are limited to this (by the DNS naming spec).
If release name contains chart name it will be used as a full name.
*/}}
{{- define "<CHART>.fullname" -}}
{{- if .Values.fullnameOverride }}
{{- .Values.fullnameOverride | trunc 63 | trimSuffix "-" }}
{{- else }}
{{- $name := default .Chart.Name .Values.nameOverride }}
{{- if contains $name .Release.Name }}
{{- .Release.Name | trunc 63 | trimSuffix "-" }}
{{- else }}
{{- printf "%s-%s" .Release.Name $name | trunc 63 | trimSuffix "-" }}
{{- end }}
{{- end }}
{{- end }}

{{/*
Create chart name and version as used by the chart label.
*/}}
{{- define "<CHART>.chart" -}}
{{- printf "%s-%s" .Chart.Name .Chart.Version | replace "+" "_" | trunc 63 | trimSuffix "-" }}
{{- end }}

{{/*
Common labels
*/}}
{{- define "<CHART>.labels" -}}
helm.sh/chart: {{ include "<CHART>.chart" . }}
{{ include "<CHART>.selectorLabels" . }}
{{- if .Chart.AppVersion }}
app.kubernetes.io/version: {{ .Chart.AppVersion | quote }}
{{- end }}
app.kubernetes.io/managed-by: {{ .Release.Service }}
{{- end }}

{{/*
Selector labels
*/}}
{{- define "<CHART>.selectorLabels" -}}
app.kubernetes.io/name: {{ include "<CHART>.name" . }}
app.kubernetes.io/instance: {{ .Release.Name }}
{{- end }}
"#;

/// Write the whole chart under `destination/<chart name>/`.
pub fn write(chart: &Chart, conf: &Config, destination: &Path) -> Result<()> {
    let chart_dir = destination.join(&conf.chart_name);
    fs::create_dir_all(chart_dir.join("templates"))
        .into_diagnostic()
        .wrap_err_with(|| format!("unable to create {}", chart_dir.display()))?;

    overwrite(&chart_dir.join("Chart.yaml"), &chart_yaml(conf))?;
    overwrite(&chart_dir.join(".helmignore"), HELMIGNORE)?;
    overwrite(
        &chart_dir.join("templates/_helpers.tpl"),
        &HELPERS_TPL.replace("<CHART>", &conf.chart_name),
    )?;

    for (filename, body) in &chart.files {
        let subdir = if conf.crd_dir && filename.contains("crd") {
            "crds"
        } else {
            "templates"
        };
        let dir = chart_dir.join(subdir);
        fs::create_dir_all(&dir)
            .into_diagnostic()
            .wrap_err_with(|| format!("unable to create {}", dir.display()))?;
        overwrite(&dir.join(filename), body)?;
    }

    let values = chart.values.to_yaml().into_diagnostic()?;
    overwrite(&chart_dir.join("values.yaml"), &values)?;
    Ok(())
}

fn chart_yaml(conf: &Config) -> String {
    let mut out = format!(
        "apiVersion: v2\n\
         name: {}\n\
         description: A Helm chart for Kubernetes\n\
         type: application\n\
         version: 0.1.0\n\
         appVersion: \"0.1.0\"\n",
        conf.chart_name
    );
    if conf.cert_manager_as_subchart {
        out.push_str(&format!(
            "dependencies:\n\
             - name: cert-manager\n\
             \x20 version: {}\n\
             \x20 repository: https://charts.jetstack.io\n\
             \x20 alias: certmanager\n\
             \x20 condition: certmanager.enabled\n",
            conf.cert_manager_version
        ));
    }
    out
}

fn overwrite(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content)
        .into_diagnostic()
        .wrap_err_with(|| format!("unable to write {}", path.display()))?;
    info!(file = %path.display(), "overwritten");
    Ok(())
}
