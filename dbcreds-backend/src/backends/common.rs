//! Backend 公共工具函数

use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;

use crate::error::{BackendError, Result};

/// Expiration layout understood by SQL `VALID UNTIL` clauses.
pub const SQL_EXPIRATION_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

/// Prefix that makes generated passwords satisfy common complexity rules.
const PASSWORD_PREFIX: &str = "A1a-";
const PASSWORD_RANDOM_LEN: usize = 20;
const USERNAME_RANDOM_LEN: usize = 20;

// ============ 凭证生成 ============

/// Credential formatting rules shared by SQL backends.
///
/// Usernames look like `v-<display name>-<random>-<unix ts>`; the display
/// name is cut to `display_name_len` bytes and the whole name to
/// `username_len` bytes (PostgreSQL identifiers max out at 63 bytes). Cuts
/// never split a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlCredentialsProducer {
    pub display_name_len: usize,
    pub username_len: usize,
}

impl SqlCredentialsProducer {
    pub fn generate_username(&self, display_name: &str) -> String {
        let display = truncate_bytes(display_name, self.display_name_len);
        let username = format!(
            "v-{display}-{}-{}",
            random_alphanumeric(USERNAME_RANDOM_LEN),
            Utc::now().timestamp()
        );
        truncate_bytes(&username, self.username_len).to_string()
    }

    pub fn generate_password(&self) -> String {
        format!("{PASSWORD_PREFIX}{}", random_alphanumeric(PASSWORD_RANDOM_LEN))
    }

    pub fn generate_expiration(&self, backend: &str, ttl: Duration) -> Result<String> {
        expiration_after(backend, ttl, SQL_EXPIRATION_FORMAT)
    }
}

/// Format `now + ttl` with the given `chrono` layout.
pub fn expiration_after(backend: &str, ttl: Duration, format: &str) -> Result<String> {
    let ttl = chrono::Duration::from_std(ttl).map_err(|e| BackendError::InvalidParameter {
        backend: backend.to_string(),
        param: "ttl".to_string(),
        detail: e.to_string(),
    })?;
    let at = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| BackendError::InvalidParameter {
            backend: backend.to_string(),
            param: "ttl".to_string(),
            detail: "expiration overflows the calendar".to_string(),
        })?;
    Ok(at.format(format).to_string())
}

/// Longest prefix of `s` that fits in `max` bytes.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
