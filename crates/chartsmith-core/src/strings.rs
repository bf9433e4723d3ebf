//! Case conversion for values keys

/// Convert a name to lowerCamelCase.
///
/// Splits on `-`, `_`, `.` and spaces, capitalizes the first letter of every
/// word after the first and lowercases the very first letter. Already-camel
/// input passes through unchanged, so the conversion is idempotent:
/// `host-data` -> `hostData`, `hostData` -> `hostData`.
pub fn to_lower_camel(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for ch in s.chars() {
        if matches!(ch, '-' | '_' | '.' | ' ') {
            upper_next = !out.is_empty();
            continue;
        }
        if out.is_empty() {
            out.extend(ch.to_lowercase());
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}
