use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// Parse a calendar date from either `yyyy-MM-dd` or a full timestamp
/// such as `2024-01-03T09:12:00.000Z`. Only the date part is kept.
pub fn parse_lenient_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Serde helper for optional dates coming from clients that may send
/// timestamps, empty strings or garbage. Anything unparseable becomes `None`.
pub fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => {
            let parsed = parse_lenient_date(&s);
            if parsed.is_none() && !s.is_empty() {
                tracing::debug!(value = %s, "dropping unparseable date");
            }
            parsed
        }
        _ => None,
    })
}
