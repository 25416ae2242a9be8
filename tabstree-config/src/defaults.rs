//! Default value functions for configuration.
//!
//! Each function is used as a `#[serde(default = "crate::defaults::...")]`
//! attribute on a `Config` field.

// ── Primitive helpers ──────────────────────────────────────────────────────

pub fn bool_true() -> bool {
    true
}

// ── Storage ────────────────────────────────────────────────────────────────

/// Key under which the whole collection is persisted.
pub fn storage_key() -> String {
    "tabstruct".to_string()
}

// ── Notifications ──────────────────────────────────────────────────────────

/// Buffered change events per subscriber before it is considered lagged.
pub fn notification_capacity() -> usize {
    256
}
