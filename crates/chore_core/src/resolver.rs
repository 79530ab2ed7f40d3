//! Chore occurrence resolver.
//!
//! # Responsibility
//! - Answer "does chore C occur on day D" for one-time and weekly chores.
//! - Filter chore lists by day, by month, and by month grid.
//!
//! # Invariants
//! - Every function is pure and never mutates its input.
//! - Filters are stable: output keeps the input's relative order.
//! - The coarse range filter may over-include but never drops a chore that
//!   occurs on some day of the range.
//! - Input chores are assumed well-formed; no re-validation happens here.

use crate::calendar::{weekday_index, CalendarDay, DayRange};
use crate::model::chore::{Chore, Schedule};
use chrono::NaiveDate;

/// Whether `chore` is active on the calendar day of `date`.
pub fn occurs_on(chore: &Chore, date: impl CalendarDay) -> bool {
    let day = date.calendar_day();
    match chore.schedule() {
        Schedule::OneTime { date } => *date == day,
        Schedule::Recurring { recurrence } => {
            recurrence.window_contains(day)
                && recurrence.days_of_week().contains_index(weekday_index(day))
        }
    }
}

/// Chores active on `date`, in input order.
pub fn chores_for_date(chores: &[Chore], date: impl CalendarDay) -> Vec<&Chore> {
    let day = date.calendar_day();
    chores.iter().filter(|chore| occurs_on(chore, day)).collect()
}

/// Chores that may occur somewhere in the month containing `date`.
///
/// Recurring chores are kept when their window overlaps the month, without
/// checking weekday alignment. Apply `occurs_on` for exact day membership.
pub fn chores_for_month(chores: &[Chore], date: impl CalendarDay) -> Vec<&Chore> {
    chores_in_range(chores, DayRange::month_of(date))
}

/// Coarse window-overlap filter over an inclusive day range.
pub fn chores_in_range(chores: &[Chore], range: DayRange) -> Vec<&Chore> {
    chores
        .iter()
        .filter(|chore| may_occur_in(chore, range))
        .collect()
}

/// Window-overlap test behind `chores_in_range`.
pub fn may_occur_in(chore: &Chore, range: DayRange) -> bool {
    match chore.schedule() {
        Schedule::OneTime { date } => range.contains(*date),
        Schedule::Recurring { recurrence } => {
            if recurrence.start_date() > range.end {
                return false;
            }
            !matches!(recurrence.end_date(), Some(end) if end < range.start)
        }
    }
}

/// One rendered day of a month view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayAgenda<'a> {
    pub day: NaiveDate,
    /// `false` for padding days from the neighbouring months.
    pub in_month: bool,
    pub chores: Vec<&'a Chore>,
}

/// Per-day chores for the whole Sunday-first grid of the month containing `date`.
///
/// Candidates are narrowed with the coarse filter over the grid range first,
/// then each day applies `occurs_on`.
pub fn month_agenda(chores: &[Chore], date: impl CalendarDay) -> Vec<DayAgenda<'_>> {
    let anchor = date.calendar_day();
    let month = DayRange::month_of(anchor);
    let grid = DayRange::month_grid_of(anchor);
    let candidates = chores_in_range(chores, grid);

    grid.days()
        .into_iter()
        .map(|day| DayAgenda {
            day,
            in_month: month.contains(day),
            chores: candidates
                .iter()
                .copied()
                .filter(|chore| occurs_on(chore, day))
                .collect(),
        })
        .collect()
}
