//! Pod template parameterization shared by all workload processors
//!
//! Runs in two passes. The typed pass mutates a [`PodSpec`]: images split
//! into repository/tag values, env vars lifted, referenced secret and config
//! map names templated. The untyped pass then works on the serialized
//! mapping and swaps whole blocks (volumes, resources, args, security
//! contexts) for `toYaml` dereferences, which has no typed equivalent
//! because the replacement is a string where a mapping used to be.

use chartsmith_core::cluster::{DOMAIN_ENV, DOMAIN_KEY};
use chartsmith_core::{to_lower_camel, MetaService, Values};
use k8s_openapi::api::core::v1::{Container, EnvVar, PodSpec, Volume};
use serde_json::{Map, Value as JsonValue};

use crate::error::{Result, TransformError};

const PULL_SECRETS_TEMPLATE: &str = "{{ .Values.imagePullSecrets | default list | toJson }}";

/// Parameterize one pod spec. Returns the templated spec as an untyped
/// mapping together with the values it lifted out. `obj_name` is the
/// camel-cased workload name all value paths hang under.
pub fn process_spec(
    obj_name: &str,
    meta: &MetaService,
    mut spec: PodSpec,
) -> Result<(Map<String, JsonValue>, Values)> {
    let mut values = Values::new();

    for c in &mut spec.containers {
        process_container(obj_name, meta, c, &mut values)?;
    }
    if let Some(init) = &mut spec.init_containers {
        for c in init {
            process_container(obj_name, meta, c, &mut values)?;
        }
    }

    if let Some(volumes) = &mut spec.volumes {
        rewrite_volume_refs(meta, volumes);
    }
    if let Some(sa) = &mut spec.service_account_name {
        *sa = meta.templated_name(sa);
    }
    if let Some(secrets) = &mut spec.image_pull_secrets {
        for s in secrets {
            s.name = meta.templated_name(&s.name);
        }
    }

    let JsonValue::Object(mut spec_map) = serde_json::to_value(&spec)? else {
        return Err(TransformError::InvalidObject {
            reason: "pod spec did not serialize to a mapping".to_string(),
        });
    };

    lift_volumes(&mut spec_map, obj_name, &mut values)?;
    lift_container_blocks(&mut spec_map, obj_name, &mut values, "containers")?;
    lift_container_blocks(&mut spec_map, obj_name, &mut values, "initContainers")?;

    if meta.config().image_pull_secrets && !spec_map.contains_key("imagePullSecrets") {
        spec_map.insert(
            "imagePullSecrets".to_string(),
            JsonValue::String(PULL_SECRETS_TEMPLATE.to_string()),
        );
        values.set(Vec::<String>::new(), &["imagePullSecrets"])?;
    }

    lift_container_security_contexts(&mut spec_map, obj_name, &mut values)?;

    if let Some(ctx) = spec_map.remove("securityContext") {
        if ctx.as_object().is_some_and(|m| !m.is_empty()) {
            values.set(ctx, &[obj_name, "podSecurityContext"])?;
            spec_map.insert(
                "securityContext".to_string(),
                JsonValue::String(format!(
                    "{{{{- toYaml .Values.{obj_name}.podSecurityContext | nindent 8 }}}}"
                )),
            );
        } else {
            spec_map.insert("securityContext".to_string(), ctx);
        }
    }

    if let Some(selector) = spec_map.remove("nodeSelector") {
        values.set(selector, &[obj_name, "nodeSelector"])?;
        spec_map.insert(
            "nodeSelector".to_string(),
            JsonValue::String(format!(
                "{{{{- toYaml .Values.{obj_name}.nodeSelector | nindent 8 }}}}"
            )),
        );
    }

    if let Some(tolerations) = spec_map.remove("tolerations") {
        values.set(tolerations, &[obj_name, "tolerations"])?;
        spec_map.insert(
            "tolerations".to_string(),
            JsonValue::String(format!(
                "{{{{- toYaml .Values.{obj_name}.tolerations | nindent 8 }}}}"
            )),
        );
    }

    Ok((spec_map, values))
}

/// Split an image reference into repository and tag on the last `:`, unless
/// the reference carries a digest, in which case the digest stays part of
/// the tag and the split happens before it.
fn split_image(image: &str) -> Result<(&str, &str)> {
    let mut index = image.rfind(':');
    if image.contains('@') && image.matches(':').count() >= 2 {
        if let Some(last) = image.rfind(':') {
            index = image[..last].rfind(':');
        }
    }
    match index {
        Some(idx) => Ok((&image[..idx], &image[idx + 1..])),
        None => Err(TransformError::ImageFormat {
            image: image.to_string(),
        }),
    }
}

fn process_container(
    obj_name: &str,
    meta: &MetaService,
    c: &mut Container,
    values: &mut Values,
) -> Result<()> {
    let container_name = to_lower_camel(&c.name);
    let image = c.image.as_deref().unwrap_or("");
    let (repo, tag) = split_image(image)?;
    values.set(repo, &[obj_name, &container_name, "image", "repository"])?;
    values.set(tag, &[obj_name, &container_name, "image", "tag"])?;
    c.image = Some(format!(
        "{{{{ .Values.{obj_name}.{container_name}.image.repository }}}}:{{{{ .Values.{obj_name}.{container_name}.image.tag | default .Chart.AppVersion }}}}"
    ));

    process_env(obj_name, meta, &container_name, c, values)?;

    if let Some(env_from) = &mut c.env_from {
        for e in env_from {
            if let Some(r) = &mut e.secret_ref {
                r.name = meta.templated_name(&r.name);
            }
            if let Some(r) = &mut e.config_map_ref {
                r.name = meta.templated_name(&r.name);
            }
        }
    }

    c.env.get_or_insert_with(Vec::new).push(EnvVar {
        name: DOMAIN_ENV.to_string(),
        value: Some(format!("{{{{ quote .Values.{DOMAIN_KEY} }}}}")),
        value_from: None,
    });

    if let Some(resources) = &c.resources {
        if let Some(requests) = &resources.requests {
            for (k, v) in requests {
                values.set(
                    v.0.as_str(),
                    &[obj_name, &container_name, "resources", "requests", k],
                )?;
            }
        }
        if let Some(limits) = &resources.limits {
            for (k, v) in limits {
                values.set(
                    v.0.as_str(),
                    &[obj_name, &container_name, "resources", "limits", k],
                )?;
            }
        }
    }

    if let Some(policy) = c.image_pull_policy.take() {
        if !policy.is_empty() {
            values.set(policy, &[obj_name, &container_name, "imagePullPolicy"])?;
            c.image_pull_policy = Some(format!(
                "{{{{ .Values.{obj_name}.{container_name}.imagePullPolicy }}}}"
            ));
        }
    }

    Ok(())
}

fn process_env(
    obj_name: &str,
    meta: &MetaService,
    container_name: &str,
    c: &mut Container,
    values: &mut Values,
) -> Result<()> {
    let Some(env) = &mut c.env else {
        return Ok(());
    };
    for var in env {
        if let Some(source) = &mut var.value_from {
            // Key refs point at resources the chart renames; field refs and
            // resource field refs stay as they are.
            if let Some(r) = &mut source.secret_key_ref {
                r.name = meta.templated_name(&r.name);
            } else if let Some(r) = &mut source.config_map_key_ref {
                r.name = meta.templated_name(&r.name);
            }
            continue;
        }
        let key = to_lower_camel(&var.name.to_lowercase());
        values.set(
            var.value.as_deref().unwrap_or_default(),
            &[obj_name, container_name, "env", &key],
        )?;
        var.value = Some(format!(
            "{{{{ quote .Values.{obj_name}.{container_name}.env.{key} }}}}"
        ));
    }
    Ok(())
}

fn rewrite_volume_refs(meta: &MetaService, volumes: &mut [Volume]) {
    for vol in volumes {
        if let Some(pvc) = &mut vol.persistent_volume_claim {
            pvc.claim_name = meta.templated_name(&pvc.claim_name);
        }
        if let Some(cm) = &mut vol.config_map {
            cm.name = meta.templated_name(&cm.name);
        }
        if let Some(sec) = &mut vol.secret {
            if let Some(name) = &mut sec.secret_name {
                *name = meta.templated_name(name);
            }
        }
        if let Some(projected) = &mut vol.projected {
            if let Some(sources) = &mut projected.sources {
                for source in sources {
                    if let Some(cm) = &mut source.config_map {
                        cm.name = meta.templated_name(&cm.name);
                    }
                    if let Some(sec) = &mut source.secret {
                        sec.name = meta.templated_name(&sec.name);
                    }
                }
            }
        }
    }
}

fn lift_volumes(
    spec_map: &mut Map<String, JsonValue>,
    obj_name: &str,
    values: &mut Values,
) -> Result<()> {
    let Some(JsonValue::Array(volumes)) = spec_map.get_mut("volumes") else {
        return Ok(());
    };
    for vol in volumes {
        let name = vol
            .get("name")
            .and_then(JsonValue::as_str)
            .unwrap_or_default();
        let key = to_lower_camel(name);
        let lifted = std::mem::replace(
            vol,
            JsonValue::String(format!(
                "{{{{- toYaml .Values.{obj_name}.volumes.{key} | nindent 8 }}}}"
            )),
        );
        values.set(lifted, &[obj_name, "volumes", &key])?;
    }
    Ok(())
}

fn lift_container_blocks(
    spec_map: &mut Map<String, JsonValue>,
    obj_name: &str,
    values: &mut Values,
    container_key: &str,
) -> Result<()> {
    let Some(JsonValue::Array(containers)) = spec_map.get_mut(container_key) else {
        return Ok(());
    };
    for container in containers {
        let Some(container) = container.as_object_mut() else {
            continue;
        };
        let container_name = to_lower_camel(
            container
                .get("name")
                .and_then(JsonValue::as_str)
                .unwrap_or_default(),
        );

        if let Some(JsonValue::Array(mounts)) = container.get_mut("volumeMounts") {
            for mount in mounts {
                let name = mount
                    .get("name")
                    .and_then(JsonValue::as_str)
                    .unwrap_or_default();
                let key = to_lower_camel(name);
                let lifted = std::mem::replace(
                    mount,
                    JsonValue::String(format!(
                        "{{{{- toYaml .Values.{obj_name}.{container_name}.volumeMounts.{key} | nindent 10 }}}}"
                    )),
                );
                values.set(lifted, &[obj_name, &container_name, "volumeMounts", &key])?;
            }
        }

        // Resource values were lifted in the typed pass; only swap in the
        // dereference when something actually got lifted.
        let lifted_resources = values
            .get(&format!("{obj_name}.{container_name}.resources"))
            .and_then(JsonValue::as_object)
            .is_some_and(|m| !m.is_empty());
        if lifted_resources {
            container.insert(
                "resources".to_string(),
                JsonValue::String(format!(
                    "{{{{- toYaml .Values.{obj_name}.{container_name}.resources | nindent 10 }}}}"
                )),
            );
        }

        if let Some(args) = container.remove("args") {
            if args.as_array().is_some_and(|a| !a.is_empty()) {
                values.set(args, &[obj_name, &container_name, "args"])?;
                container.insert(
                    "args".to_string(),
                    JsonValue::String(format!(
                        "{{{{- toYaml .Values.{obj_name}.{container_name}.args | nindent 8 }}}}"
                    )),
                );
            } else {
                container.insert("args".to_string(), args);
            }
        }
    }
    Ok(())
}

fn lift_container_security_contexts(
    spec_map: &mut Map<String, JsonValue>,
    obj_name: &str,
    values: &mut Values,
) -> Result<()> {
    let Some(JsonValue::Array(containers)) = spec_map.get_mut("containers") else {
        return Ok(());
    };
    for container in containers {
        let Some(container) = container.as_object_mut() else {
            continue;
        };
        let container_name = to_lower_camel(
            container
                .get("name")
                .and_then(JsonValue::as_str)
                .unwrap_or_default(),
        );
        if let Some(ctx) = container.remove("securityContext") {
            values.set(ctx, &[obj_name, &container_name, "containerSecurityContext"])?;
            container.insert(
                "securityContext".to_string(),
                JsonValue::String(format!(
                    "{{{{- toYaml .Values.{obj_name}.{container_name}.containerSecurityContext | nindent 10 }}}}"
                )),
            );
        }
    }
    Ok(())
}
