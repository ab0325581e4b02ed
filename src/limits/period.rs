//! Period-key helpers for the rolling spend counters.
//!
//! Kept as pure functions of the supplied clock so the rollover edge cases
//! are testable without touching storage or wall-clock time.

use chrono::{ DateTime, Utc };

use super::SpendRecord;

/// UTC calendar-day key, e.g. `2026-08-28`.
pub fn day_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// UTC calendar-month key, e.g. `2026-08`.
pub fn month_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

/// Reset any counter whose period key no longer matches the current period.
/// Within a period the counters only ever grow.
pub fn rolled_over(record: SpendRecord, now: DateTime<Utc>) -> SpendRecord {
    let day = day_key(now);
    let month = month_key(now);

    let (day_key, day_spent) = if record.day_key == day {
        (record.day_key, record.day_spent)
    } else {
        (day, 0.0)
    };

    let (month_key, month_spent) = if record.month_key == month {
        (record.month_key, record.month_spent)
    } else {
        (month, 0.0)
    };

    SpendRecord {
        day_key,
        day_spent,
        month_key,
        month_spent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn formats_day_and_month_keys() {
        let now = at(2026, 8, 28);
        assert_eq!(day_key(now), "2026-08-28");
        assert_eq!(month_key(now), "2026-08");
    }

    #[test]
    fn same_period_keeps_counters() {
        let record = SpendRecord {
            day_key: "2026-08-28".to_string(),
            day_spent: 600.0,
            month_key: "2026-08".to_string(),
            month_spent: 900.0,
        };
        let rolled = rolled_over(record, at(2026, 8, 28));
        assert_eq!(rolled.day_spent, 600.0);
        assert_eq!(rolled.month_spent, 900.0);
    }

    #[test]
    fn day_boundary_resets_only_the_day_counter() {
        let record = SpendRecord {
            day_key: "2026-08-28".to_string(),
            day_spent: 600.0,
            month_key: "2026-08".to_string(),
            month_spent: 900.0,
        };
        let rolled = rolled_over(record, at(2026, 8, 29));
        assert_eq!(rolled.day_key, "2026-08-29");
        assert_eq!(rolled.day_spent, 0.0);
        assert_eq!(rolled.month_spent, 900.0);
    }

    #[test]
    fn month_boundary_resets_both_counters() {
        let record = SpendRecord {
            day_key: "2026-08-31".to_string(),
            day_spent: 600.0,
            month_key: "2026-08".to_string(),
            month_spent: 900.0,
        };
        let rolled = rolled_over(record, at(2026, 9, 1));
        assert_eq!(rolled.day_key, "2026-09-01");
        assert_eq!(rolled.day_spent, 0.0);
        assert_eq!(rolled.month_key, "2026-09");
        assert_eq!(rolled.month_spent, 0.0);
    }
}
