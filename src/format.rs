//! Display formatting for currency and timestamps.

use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

/// `1073` → `"$10.73"`, `-250` → `"-$2.50"`.
#[must_use]
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

const TIME_12H: &[BorrowedFormatItem<'static>] = format_description!("[hour repr:12]:[minute] [period]");
const DATE_LONG: &[BorrowedFormatItem<'static>] = format_description!("[month repr:short] [day padding:none], [year]");
const DATE_SHORT: &[BorrowedFormatItem<'static>] = format_description!("[month repr:short] [day padding:none]");

/// Twelve-hour clock with zero padding: `"08:30 AM"`, `"12:05 PM"`.
#[must_use]
pub fn format_time(ts: OffsetDateTime) -> String {
    ts.format(TIME_12H).unwrap_or_default()
}

/// `"Aug 18, 2025"`.
#[must_use]
pub fn format_date(ts: OffsetDateTime) -> String {
    ts.format(DATE_LONG).unwrap_or_default()
}

/// `"Aug 18"`.
#[must_use]
pub fn format_short_date(ts: OffsetDateTime) -> String {
    ts.format(DATE_SHORT).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn cents_format_with_two_decimals() {
        assert_eq!(format_cents(1073), "$10.73");
        assert_eq!(format_cents(5), "$0.05");
        assert_eq!(format_cents(0), "$0.00");
        assert_eq!(format_cents(-250), "-$2.50");
    }

    #[test]
    fn time_uses_twelve_hour_clock() {
        assert_eq!(format_time(datetime!(2025-08-18 08:30 UTC)), "08:30 AM");
        assert_eq!(format_time(datetime!(2025-08-18 00:05 UTC)), "12:05 AM");
        assert_eq!(format_time(datetime!(2025-08-18 12:00 UTC)), "12:00 PM");
        assert_eq!(format_time(datetime!(2025-08-18 21:45 UTC)), "09:45 PM");
    }

    #[test]
    fn dates_use_short_month_names() {
        let ts = datetime!(2025-08-18 08:30 UTC);
        assert_eq!(format_date(ts), "Aug 18, 2025");
        assert_eq!(format_short_date(ts), "Aug 18");
        assert_eq!(format_date(datetime!(2026-01-05 23:59 UTC)), "Jan 5, 2026");
    }
}
