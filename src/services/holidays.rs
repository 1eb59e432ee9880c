use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Answers whether a date is a recognized holiday.
pub trait HolidayCalendar: Send + Sync {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

/// US federal holidays, including their weekend-observed weekdays.
#[derive(Debug, Default, Clone, Copy)]
pub struct UsFederalHolidays;

impl UsFederalHolidays {
    /// Actual holiday dates for `year`, before weekend observance.
    pub fn holidays_in(year: i32) -> Vec<NaiveDate> {
        [
            NaiveDate::from_ymd_opt(year, 1, 1),
            nth_weekday(year, 1, Weekday::Mon, 3),
            nth_weekday(year, 2, Weekday::Mon, 3),
            last_weekday(year, 5, Weekday::Mon),
            NaiveDate::from_ymd_opt(year, 6, 19),
            NaiveDate::from_ymd_opt(year, 7, 4),
            nth_weekday(year, 9, Weekday::Mon, 1),
            nth_weekday(year, 11, Weekday::Thu, 4),
            NaiveDate::from_ymd_opt(year, 12, 25),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

impl HolidayCalendar for UsFederalHolidays {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        // Dec 31 can be the observed New Year of the following year
        [date.year(), date.year() + 1]
            .into_iter()
            .flat_map(Self::holidays_in)
            .any(|holiday| holiday == date || observed(holiday) == date)
    }
}

/// Saturday holidays are observed Friday, Sunday holidays on Monday.
fn observed(holiday: NaiveDate) -> NaiveDate {
    match holiday.weekday() {
        Weekday::Sat => holiday - Duration::days(1),
        Weekday::Sun => holiday + Duration::days(1),
        _ => holiday,
    }
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    (1..=5u8)
        .rev()
        .find_map(|n| NaiveDate::from_weekday_of_month_opt(year, month, weekday, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_floating_holidays_2025() {
        let cal = UsFederalHolidays;
        assert!(cal.is_holiday(d(2025, 1, 20))); // MLK
        assert!(cal.is_holiday(d(2025, 2, 17))); // Presidents
        assert!(cal.is_holiday(d(2025, 5, 26))); // Memorial
        assert!(cal.is_holiday(d(2025, 9, 1))); // Labor
        assert!(cal.is_holiday(d(2025, 11, 27))); // Thanksgiving
        assert!(!cal.is_holiday(d(2025, 11, 28)));
    }

    #[test]
    fn test_observed_dates() {
        let cal = UsFederalHolidays;
        // July 4 2026 is a Saturday
        assert!(cal.is_holiday(d(2026, 7, 3)));
        assert!(cal.is_holiday(d(2026, 7, 4)));
        // Juneteenth 2027 is a Saturday, Christmas 2022 a Sunday
        assert!(cal.is_holiday(d(2027, 6, 18)));
        assert!(cal.is_holiday(d(2022, 12, 26)));
        // New Year 2022 was a Saturday, observed Dec 31 2021
        assert!(cal.is_holiday(d(2021, 12, 31)));
    }

    #[test]
    fn test_ordinary_day() {
        assert!(!UsFederalHolidays.is_holiday(d(2025, 3, 12)));
    }
}
