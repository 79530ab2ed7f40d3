//! Calendar-day helpers and month grid generation.
//!
//! # Responsibility
//! - Reduce timestamps to calendar days so time-of-day never matters.
//! - Compute month bounds and the Sunday-first month grid.
//!
//! # Invariants
//! - All functions are pure.
//! - All functions are total over `NaiveDate::MIN..=NaiveDate::MAX`.
//! - `month_view_days` output is contiguous and ascending. It is a multiple of
//!   7 long except where the grid is clamped at the representable date limits.

use crate::model::weekday::weekday_to_index;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, TimeZone};

/// Anything that names a calendar day.
///
/// Implementations drop the time-of-day component. `DateTime<Tz>` uses the
/// day in its own time zone.
pub trait CalendarDay {
    fn calendar_day(&self) -> NaiveDate;
}

impl CalendarDay for NaiveDate {
    fn calendar_day(&self) -> NaiveDate {
        *self
    }
}

impl CalendarDay for NaiveDateTime {
    fn calendar_day(&self) -> NaiveDate {
        self.date()
    }
}

impl<Tz: TimeZone> CalendarDay for DateTime<Tz> {
    fn calendar_day(&self) -> NaiveDate {
        self.date_naive()
    }
}

impl<T: CalendarDay + ?Sized> CalendarDay for &T {
    fn calendar_day(&self) -> NaiveDate {
        (**self).calendar_day()
    }
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DayRange {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Every day in the range, ascending.
    pub fn days(&self) -> Vec<NaiveDate> {
        // `iter_days` stops one short of `NaiveDate::MAX`.
        let mut days = Vec::new();
        let mut next = Some(self.start);
        while let Some(day) = next.filter(|day| *day <= self.end) {
            days.push(day);
            next = day.succ_opt();
        }
        days
    }

    /// The calendar month containing `date`.
    pub fn month_of(date: impl CalendarDay) -> Self {
        let day = date.calendar_day();
        Self {
            start: month_start(day),
            end: month_end(day),
        }
    }

    /// The Sunday-first grid covering the month containing `date`.
    pub fn month_grid_of(date: impl CalendarDay) -> Self {
        let month = Self::month_of(date);
        Self {
            start: week_start(month.start),
            end: week_end(month.end),
        }
    }
}

/// Sunday-based weekday index (`0..=6`).
pub fn weekday_index(date: impl CalendarDay) -> u8 {
    weekday_to_index(date.calendar_day().weekday())
}

pub fn month_start(date: impl CalendarDay) -> NaiveDate {
    let day = date.calendar_day();
    day.with_day(1).unwrap_or(day)
}

/// Last day of the month containing `date`.
pub fn month_end(date: impl CalendarDay) -> NaiveDate {
    month_start(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Sunday on or before `date`, clamped to `NaiveDate::MIN`.
pub fn week_start(date: impl CalendarDay) -> NaiveDate {
    let day = date.calendar_day();
    day.checked_sub_days(Days::new(u64::from(weekday_to_index(day.weekday()))))
        .unwrap_or(NaiveDate::MIN)
}

/// Saturday on or after `date`, clamped to `NaiveDate::MAX`.
pub fn week_end(date: impl CalendarDay) -> NaiveDate {
    week_start(date)
        .checked_add_days(Days::new(6))
        .unwrap_or(NaiveDate::MAX)
}

/// Days to render in a month view, padded to whole Sunday-first weeks.
pub fn month_view_days(date: impl CalendarDay) -> Vec<NaiveDate> {
    DayRange::month_grid_of(date).days()
}

/// Same day in the following month, clamped to the month length.
pub fn next_month(date: impl CalendarDay) -> NaiveDate {
    let day = date.calendar_day();
    day.checked_add_months(Months::new(1)).unwrap_or(day)
}

/// Same day in the preceding month, clamped to the month length.
pub fn previous_month(date: impl CalendarDay) -> NaiveDate {
    let day = date.calendar_day();
    day.checked_sub_months(Months::new(1)).unwrap_or(day)
}

pub fn is_same_month(a: impl CalendarDay, b: impl CalendarDay) -> bool {
    let (a, b) = (a.calendar_day(), b.calendar_day());
    a.year() == b.year() && a.month() == b.month()
}

/// Month heading such as `March 2024`.
pub fn month_year_label(date: impl CalendarDay) -> String {
    date.calendar_day().format("%B %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::{
        is_same_month, month_end, month_start, month_view_days, month_year_label, next_month,
        previous_month, week_end, week_start, weekday_index, DayRange,
    };
    use chrono::{Datelike, NaiveDate, TimeZone, Utc, Weekday};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_bounds_handle_leap_february() {
        assert_eq!(month_start(day(2024, 2, 17)), day(2024, 2, 1));
        assert_eq!(month_end(day(2024, 2, 17)), day(2024, 2, 29));
        assert_eq!(month_end(day(2023, 2, 1)), day(2023, 2, 28));
        assert_eq!(month_end(day(2023, 12, 31)), day(2023, 12, 31));
    }

    #[test]
    fn grid_for_month_starting_wednesday_begins_on_previous_sunday() {
        // May 2024 starts on a Wednesday.
        assert_eq!(day(2024, 5, 1).weekday(), Weekday::Wed);
        let days = month_view_days(day(2024, 5, 20));
        assert_eq!(days.first().copied(), Some(day(2024, 4, 28)));
        assert_eq!(days.last().copied(), Some(day(2024, 6, 1)));
        assert_eq!(days.len() % 7, 0);
        assert_eq!(days.len(), 35);
    }

    #[test]
    fn grid_is_contiguous_for_every_month_of_a_year() {
        for month in 1..=12 {
            let days = month_view_days(day(2025, month, 1));
            assert_eq!(days.len() % 7, 0, "month {month}");
            assert_eq!(days[0].weekday(), Weekday::Sun);
            for pair in days.windows(2) {
                assert_eq!(pair[0].succ_opt(), Some(pair[1]));
            }
        }
    }

    #[test]
    fn february_2015_fits_exactly_four_weeks() {
        let days = month_view_days(day(2015, 2, 10));
        assert_eq!(days.len(), 28);
        assert_eq!(days[0], day(2015, 2, 1));
    }

    #[test]
    fn month_navigation_clamps_day() {
        assert_eq!(next_month(day(2024, 1, 31)), day(2024, 2, 29));
        assert_eq!(previous_month(day(2024, 3, 31)), day(2024, 2, 29));
        assert_eq!(next_month(day(2024, 12, 15)), day(2025, 1, 15));
    }

    #[test]
    fn labels_and_month_comparison() {
        assert_eq!(month_year_label(day(2024, 3, 15)), "March 2024");
        assert!(is_same_month(day(2024, 3, 1), day(2024, 3, 31)));
        assert!(!is_same_month(day(2024, 3, 1), day(2023, 3, 1)));
    }

    #[test]
    fn helpers_are_total_at_date_limits() {
        assert_eq!(month_end(NaiveDate::MAX), NaiveDate::MAX);
        assert_eq!(week_end(NaiveDate::MAX), NaiveDate::MAX);
        assert_eq!(week_start(NaiveDate::MIN), NaiveDate::MIN);
        assert_eq!(month_start(NaiveDate::MIN), NaiveDate::MIN);

        let first = month_view_days(NaiveDate::MIN);
        assert_eq!(first.first().copied(), Some(NaiveDate::MIN));
        let last = month_view_days(NaiveDate::MAX);
        assert_eq!(last.last().copied(), Some(NaiveDate::MAX));
        assert!(last.windows(2).all(|pair| pair[0].succ_opt() == Some(pair[1])));
        assert_eq!(next_month(NaiveDate::MAX), NaiveDate::MAX);
        assert_eq!(previous_month(NaiveDate::MIN), NaiveDate::MIN);
    }

    #[test]
    fn timestamps_reduce_to_their_calendar_day() {
        let late = Utc.with_ymd_and_hms(2024, 1, 4, 23, 59, 59).unwrap();
        assert_eq!(weekday_index(late), 4);
        assert!(DayRange::month_of(late).contains(day(2024, 1, 4)));
        assert_eq!(weekday_index(late.naive_utc()), 4);
    }
}
