//! `{{key}}` placeholder substitution for statement templates.
//!
//! Substitution is a single left-to-right pass over the template: every
//! `{{key}}` token whose key is known is replaced by its value, unknown tokens
//! are left verbatim, and substituted values are never scanned again. The
//! result therefore does not depend on the order of the key/value pairs, and a
//! value that itself contains `{{...}}` is emitted literally.
//!
//! No quoting or escaping is applied; templates must quote placeholders
//! themselves (`'{{password}}'`, `"{{name}}"`).

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Render `template`, replacing `{{key}}` tokens with the matching value.
pub fn render(template: &str, data: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];

        let Some(end) = after_open.find(CLOSE) else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = &after_open[..end];
        match data.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => {
                out.push_str(value);
                rest = &after_open[end + CLOSE.len()..];
            }
            None => {
                // Unknown key: keep the opening braces and continue scanning
                // right after them so `{{{{name}}` still resolves the inner token.
                out.push_str(OPEN);
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Split a template into its `;`-separated statements, dropping blanks.
pub fn split_statements(template: &str) -> impl Iterator<Item = &str> {
    template.split(';').map(str::trim).filter(|s| !s.is_empty())
}
