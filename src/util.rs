//! Small helpers shared across modules

/// Current time as Unix epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub const HANDLE_MIN_LEN: usize = 4;
pub const HANDLE_MAX_LEN: usize = 32;

/// Normalize a Telegram handle: strip an optional leading `@`, lowercase,
/// then validate against `[a-z0-9_]{4,32}`. Returns `None` when invalid.
pub fn normalize_handle(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix('@').unwrap_or(trimmed);
    let handle = stripped.to_lowercase();

    if handle.len() < HANDLE_MIN_LEN || handle.len() > HANDLE_MAX_LEN {
        return None;
    }
    if !handle
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return None;
    }
    Some(handle)
}

/// Normalize a TON address for comparison: trim + lowercase.
///
/// TonAPI returns addresses in raw form; we store whatever form the operator
/// configured, so both sides go through the same normalization before the
/// recipient check.
pub fn normalize_address(addr: &str) -> String {
    addr.trim().to_lowercase()
}
