//! Escaping helpers for the SQL compiler.

/// Escape SQL LIKE meta-characters so user input is matched literally.
pub(super) fn escape_like_pattern(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' | '%' | '_' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Quote a possibly table-qualified identifier: `h.host_status` ->
/// `"h"."host_status"`.
pub(super) fn quote_ident(ident: &str) -> String {
    ident
        .split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}
