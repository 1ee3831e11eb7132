use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// The Monday strictly after `today`.
pub fn next_monday(today: NaiveDate) -> NaiveDate {
    let days_ahead = 7 - i64::from(today.weekday().num_days_from_monday());
    today + Duration::days(days_ahead)
}

/// `today` if it is a Monday, else the Monday before it.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

pub fn is_week_start(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Mon
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_next_monday() {
        // 2024-06-10 is a Monday.
        assert_eq!(next_monday(date(10)), date(17));
        assert_eq!(next_monday(date(12)), date(17));
        assert_eq!(next_monday(date(16)), date(17));
    }

    #[test]
    fn test_week_start_of() {
        assert_eq!(week_start_of(date(10)), date(10));
        assert_eq!(week_start_of(date(16)), date(10));
        assert!(is_week_start(week_start_of(date(19))));
        assert!(!is_week_start(date(19)));
    }
}
