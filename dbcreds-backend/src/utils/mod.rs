//! Utility modules.

/// Serde helpers for TTL-like durations stored as whole seconds.
pub mod ttl;

/// Log sanitization utilities to keep generated passwords out of logs.
pub mod log_sanitizer;
