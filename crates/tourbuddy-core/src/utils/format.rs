use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Currency symbol shown in front of every amount
const CURRENCY_SYMBOL: &str = "₹";

/// Accepted layouts for a local date/time typed by the user
const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];

/// Round to whole cents, halves away from zero. Never returns -0.0.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0 + 0.0
}

/// Format an amount with the currency symbol and two decimals
pub fn format_amount(amount: f64) -> String {
    let amount = round_cents(amount);
    if amount < 0.0 {
        format!("-{}{:.2}", CURRENCY_SYMBOL, -amount)
    } else {
        format!("{}{:.2}", CURRENCY_SYMBOL, amount)
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a timestamp in local time, e.g. "Oct 19, 2026 14:30"
pub fn format_datetime(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%b %d, %Y %H:%M").to_string()
}

/// Parse a date/time typed on the command line.
///
/// Accepts RFC 3339, a local "YYYY-MM-DD HH:MM", or a bare local date
/// (midnight). Returns None when nothing matches.
pub fn parse_datetime(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
