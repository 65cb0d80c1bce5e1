//! Log sanitization utilities
//!
//! Rendered statements carry the generated password in clear text. Everything
//! that logs a statement goes through [`sanitize_statement`] first.

/// Maximum number of bytes kept in log output.
const TRUNCATE_LIMIT: usize = 256;

/// Replacement for secret values.
const MASK: &str = "******";

/// Mask every occurrence of each non-empty secret, then truncate for logging.
pub fn sanitize_statement(statement: &str, secrets: &[&str]) -> String {
    let mut masked = statement.to_string();
    for secret in secrets.iter().filter(|s| !s.is_empty()) {
        masked = masked.replace(secret, MASK);
    }
    truncate_for_log(&masked)
}

/// Cut `s` to at most `TRUNCATE_LIMIT` bytes on a char boundary.
pub fn truncate_for_log(s: &str) -> String {
    if s.len() <= TRUNCATE_LIMIT {
        return s.to_string();
    }
    let cut = s
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|i| *i <= TRUNCATE_LIMIT)
        .last()
        .unwrap_or(0);
    format!("{}... [truncated, total {} bytes]", &s[..cut], s.len())
}
