//! Manifest input
//!
//! Reads multi-document YAML from stdin or from the files and directories
//! given on the command line, in the order they were given.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};
use walkdir::WalkDir;

use chartsmith_transform::ManifestObject;

/// Decode all input documents. With no files the whole of stdin is one
/// multi-document stream.
pub fn load(files: &[PathBuf], recursive: bool) -> Result<Vec<ManifestObject>> {
    let mut objects = Vec::new();
    if files.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .into_diagnostic()
            .wrap_err("unable to read stdin")?;
        decode_stream(&text, "stdin", &mut objects)?;
        return Ok(objects);
    }
    for path in expand(files, recursive)? {
        let text = fs::read_to_string(&path)
            .into_diagnostic()
            .wrap_err_with(|| format!("unable to read {}", path.display()))?;
        decode_stream(&text, &path.display().to_string(), &mut objects)?;
    }
    Ok(objects)
}

/// Resolve the -f arguments into a flat file list. Directories contribute
/// their .yaml/.yml entries in name order; nested directories only with
/// the recursive flag.
fn expand(files: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut resolved = Vec::new();
    for path in files {
        if path.is_dir() {
            let depth = if recursive { usize::MAX } else { 1 };
            let walker = WalkDir::new(path)
                .max_depth(depth)
                .sort_by_file_name();
            for entry in walker {
                let entry = entry
                    .into_diagnostic()
                    .wrap_err_with(|| format!("unable to walk {}", path.display()))?;
                if entry.file_type().is_file() && is_yaml(entry.path()) {
                    resolved.push(entry.into_path());
                }
            }
        } else {
            resolved.push(path.clone());
        }
    }
    Ok(resolved)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn decode_stream(text: &str, source: &str, objects: &mut Vec<ManifestObject>) -> Result<()> {
    for doc in serde_yaml::Deserializer::from_str(text) {
        let value = JsonValue::deserialize(doc)
            .into_diagnostic()
            .wrap_err_with(|| format!("invalid YAML document in {source}"))?;
        if value.is_null() {
            continue;
        }
        match ManifestObject::new(value) {
            Ok(obj) => {
                debug!(source, kind = obj.kind(), name = obj.name(), "decoded");
                objects.push(obj);
            }
            Err(err) => {
                warn!(source, %err, "skipping document");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const STREAM: &str = "\
apiVersion: v1
kind: ConfigMap
metadata:
  name: a
---
# comment-only document
---
apiVersion: v1
kind: Service
metadata:
  name: b
";

    #[test]
    fn decodes_multi_document_stream_and_skips_empty_docs() {
        let mut objects = Vec::new();
        decode_stream(STREAM, "test", &mut objects).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].kind(), "ConfigMap");
        assert_eq!(objects[1].kind(), "Service");
    }

    #[test]
    fn skips_documents_without_kind() {
        let mut objects = Vec::new();
        decode_stream("metadata:\n  name: x\n", "test", &mut objects).unwrap();
        assert!(objects.is_empty());
    }

    #[test]
    fn expands_directories_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.yaml", "a.yml", "ignored.txt"] {
            let mut f = fs::File::create(dir.path().join(name)).unwrap();
            writeln!(f, "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: x").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("nested/c.yaml"),
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: y\n",
        )
        .unwrap();

        let flat = expand(&[dir.path().to_path_buf()], false).unwrap();
        let names: Vec<_> = flat
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a.yml", "b.yaml"]);

        let deep = expand(&[dir.path().to_path_buf()], true).unwrap();
        assert_eq!(deep.len(), 3);
    }
}
