use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Display;

/// Render minutes as `H:MM`. Missing or negative input renders as `0:00`.
pub fn format_duration(minutes: Option<i64>) -> String {
    match minutes {
        Some(mins) if mins >= 0 => format!("{}:{:02}", mins / 60, mins % 60),
        _ => "0:00".to_string(),
    }
}

/// 12-hour clock time in `tz`, e.g. `9:05:03 PM`.
pub fn format_time<Tz>(timestamp: Option<DateTime<Utc>>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match timestamp {
        Some(ts) => ts.with_timezone(tz).format("%-I:%M:%S %p").to_string(),
        None => "N/A".to_string(),
    }
}

/// Calendar date in `tz`, e.g. `10/19/2026`.
pub fn format_date<Tz>(timestamp: Option<DateTime<Utc>>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match timestamp {
        Some(ts) => ts.with_timezone(tz).format("%-m/%-d/%Y").to_string(),
        None => "N/A".to_string(),
    }
}
