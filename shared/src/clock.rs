use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Render a second count as `m:ss`; unknown time renders as `--:--`.
pub fn format_clock(seconds: Option<u32>) -> String {
    match seconds {
        None => "--:--".to_string(),
        Some(s) => format!("{}:{:02}", s / 60, s % 60),
    }
}
