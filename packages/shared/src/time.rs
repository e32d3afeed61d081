use chrono::{DateTime, Local, Utc};

/// Wire format used for `created_at` fields.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current time in UTC.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp as server local time, e.g. `2024-05-01 12:30:00`.
pub fn format_created_at(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format(CREATED_AT_FORMAT).to_string()
}
