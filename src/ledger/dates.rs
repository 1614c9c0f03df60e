use chrono::{Datelike, NaiveDate};

const LONG_FORMAT: &str = "%A, %B %-d, %Y";

/// Parse a due date as written by portals.
///
/// Accepts `2025-11-14`, `Friday, November 14, 2025`, `November 14, 2025`,
/// `11/14/2025` and `11/14` (resolved against `today`'s year).
pub fn parse_due_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for format in ["%Y-%m-%d", "%A, %B %d, %Y", "%B %d, %Y", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }

    // "11/14" and "11/14 5:00 PM"
    let head = raw.split_whitespace().next()?;
    let (month, day) = head.split_once('/')?;
    if day.contains('/') {
        let full = NaiveDate::parse_from_str(head, "%m/%d/%Y").ok();
        return full;
    }
    NaiveDate::from_ymd_opt(today.year(), month.parse().ok()?, day.parse().ok()?)
}

/// Render a due date the way the report shows it.
pub fn format_due_date(date: NaiveDate) -> String {
    date.format(LONG_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_formats() {
        let today = d(2025, 1, 10);
        assert_eq!(parse_due_date("2025-01-05", today), Some(d(2025, 1, 5)));
        assert_eq!(
            parse_due_date("Friday, November 14, 2025", today),
            Some(d(2025, 11, 14))
        );
        assert_eq!(parse_due_date("November 14, 2025", today), Some(d(2025, 11, 14)));
        assert_eq!(parse_due_date("11/14/2025", today), Some(d(2025, 11, 14)));
        assert_eq!(parse_due_date("11/14", today), Some(d(2025, 11, 14)));
        assert_eq!(parse_due_date("11/14 5:00 PM", today), Some(d(2025, 11, 14)));
        assert_eq!(parse_due_date("11/14/2026 5:00 PM", today), Some(d(2026, 11, 14)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let today = d(2025, 1, 10);
        assert_eq!(parse_due_date("", today), None);
        assert_eq!(parse_due_date("ASAP", today), None);
        assert_eq!(parse_due_date("13/45", today), None);
    }

    #[test]
    fn test_format_round_trips() {
        let date = d(2025, 1, 5);
        assert_eq!(format_due_date(date), "Sunday, January 5, 2025");
        assert_eq!(parse_due_date(&format_due_date(date), date), Some(date));
    }
}
