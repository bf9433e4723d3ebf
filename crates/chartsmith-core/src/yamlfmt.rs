//! YAML emission that keeps template expressions intact
//!
//! Structured values are serialized through a generic YAML emitter that is
//! not template-aware: a string like `{{ .Values.x }}` comes back wrapped in
//! single quotes because it starts with a flow indicator. This module is the
//! text-to-text pass that strips exactly that wrapping while leaving
//! legitimate single quotes (inside unrelated scalars) alone.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::Result;

// A quoted template expression: opening quote immediately followed by `{{`,
// a closing `}}` on the same line, optional trailing text, closing quote.
// Unbalanced or multi-line-open expressions fall through untouched.
static QUOTED_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'(\{\{.*\}\}[^']*)'").expect("template quote pattern compiles")
});

/// Strip serializer-introduced single quotes around `{{ ... }}` expressions.
pub fn strip_template_quotes(content: &str) -> String {
    QUOTED_TEMPLATE.replace_all(content, "$1").into_owned()
}

/// Indent every non-empty line of `content` by `n` spaces.
pub fn indent(content: &str, n: usize) -> String {
    if n == 0 {
        return content.to_string();
    }
    let pad = " ".repeat(n);
    content
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize `value` to YAML at the given indentation, with template
/// expressions unquoted and trailing whitespace trimmed.
pub fn marshal<T: Serialize>(value: &T, n: usize) -> Result<String> {
    let text = serde_yaml::to_string(value)?;
    let text = strip_template_quotes(&text);
    let text = indent(&text, n);
    Ok(text.trim_end_matches([' ', '\n']).to_string())
}
