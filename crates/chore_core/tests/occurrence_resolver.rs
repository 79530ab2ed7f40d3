use chore_core::{
    chores_for_date, chores_for_month, month_agenda, month_view_days, occurs_on, Chore,
    ChoreDraft, RecurrencePattern, WeekdaySet,
};
use chrono::{Duration, NaiveDate, TimeZone, Utc};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn weekly(title: &str, days: &[u8], start: NaiveDate, end: Option<NaiveDate>) -> Chore {
    let days = WeekdaySet::from_indices(days.iter().copied()).unwrap();
    let pattern = RecurrencePattern::weekly(days, start, end).unwrap();
    Chore::from_draft(ChoreDraft::recurring(title, pattern)).unwrap()
}

fn one_time(title: &str, date: NaiveDate) -> Chore {
    Chore::from_draft(ChoreDraft::one_time(title, date)).unwrap()
}

#[test]
fn trash_on_monday_and_thursday_scenario() {
    // 2024-01-01 is a Monday.
    let trash = weekly("Trash", &[1, 4], day(2024, 1, 1), None);

    assert!(occurs_on(&trash, day(2024, 1, 1)));
    assert!(!occurs_on(&trash, day(2024, 1, 2)));
    assert!(occurs_on(&trash, day(2024, 1, 4)));
    assert!(!occurs_on(&trash, day(2023, 12, 28)));
}

#[test]
fn birthday_lunch_scenario() {
    let lunch = one_time("Birthday lunch", day(2024, 3, 15));
    let chores = vec![lunch.clone()];

    assert_eq!(chores_for_date(&chores, day(2024, 3, 15)), vec![&lunch]);
    assert!(chores_for_date(&chores, day(2024, 3, 16)).is_empty());
}

#[test]
fn one_time_match_ignores_time_of_day() {
    let lunch = one_time("Birthday lunch", day(2024, 3, 15));

    let early = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
    let late = Utc.with_ymd_and_hms(2024, 3, 15, 23, 59, 59).unwrap();
    let next_midnight = Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap();

    assert!(occurs_on(&lunch, early));
    assert!(occurs_on(&lunch, late));
    assert!(occurs_on(&lunch, late.naive_utc()));
    assert!(!occurs_on(&lunch, next_midnight));
}

#[test]
fn recurring_without_end_matches_weekdays_from_start_onwards() {
    let start = day(2024, 2, 14);
    let chore = weekly("Water plants", &[0, 3], start, None);

    for offset in -60..400 {
        let d = start + Duration::days(offset);
        let weekday_selected = matches!(chore_core::calendar::weekday_index(d), 0 | 3);
        assert_eq!(
            occurs_on(&chore, d),
            d >= start && weekday_selected,
            "day {d}"
        );
    }
}

#[test]
fn recurring_with_end_never_occurs_after_end() {
    let end = day(2024, 6, 30);
    let chore = weekly("Mow lawn", &[0, 1, 2, 3, 4, 5, 6], day(2024, 4, 1), Some(end));

    assert!(occurs_on(&chore, end));
    for offset in 1..120 {
        assert!(!occurs_on(&chore, end + Duration::days(offset)));
    }
}

#[test]
fn for_date_preserves_input_order() {
    let chores = vec![
        one_time("Zeta", day(2024, 1, 1)),
        weekly("Alpha", &[1], day(2023, 1, 1), None),
        one_time("Other day", day(2024, 1, 2)),
        one_time("Mid", day(2024, 1, 1)),
    ];

    let titles: Vec<&str> = chores_for_date(&chores, day(2024, 1, 1))
        .into_iter()
        .map(Chore::title)
        .collect();
    assert_eq!(titles, vec!["Zeta", "Alpha", "Mid"]);
}

#[test]
fn month_filter_is_sound_for_every_day_of_a_year() {
    let chores = vec![
        weekly("Trash", &[1, 4], day(2024, 1, 1), None),
        weekly("Short burst", &[2], day(2024, 5, 27), Some(day(2024, 6, 4))),
        weekly("Weekend", &[0, 6], day(2024, 8, 31), Some(day(2024, 9, 1))),
        one_time("Dentist", day(2024, 2, 29)),
        one_time("New year", day(2025, 1, 1)),
    ];

    let mut d = day(2024, 1, 1);
    while d <= day(2024, 12, 31) {
        let coarse = chores_for_month(&chores, d);
        for chore in chores_for_date(&chores, d) {
            assert!(
                coarse.iter().any(|candidate| candidate.id() == chore.id()),
                "{} occurs on {d} but is missing from its month",
                chore.title()
            );
        }
        d = d.succ_opt().unwrap();
    }
}

#[test]
fn month_filter_bounds_one_time_chores_to_the_month() {
    let chores = vec![
        one_time("Last of Feb", day(2024, 2, 29)),
        one_time("First of Mar", day(2024, 3, 1)),
        one_time("Last of Mar", day(2024, 3, 31)),
        one_time("First of Apr", day(2024, 4, 1)),
    ];

    let titles: Vec<&str> = chores_for_month(&chores, day(2024, 3, 17))
        .into_iter()
        .map(Chore::title)
        .collect();
    assert_eq!(titles, vec!["First of Mar", "Last of Mar"]);
}

#[test]
fn queries_are_pure_and_repeatable() {
    let chores = vec![
        weekly("Trash", &[1, 4], day(2024, 1, 1), None),
        one_time("Birthday lunch", day(2024, 3, 15)),
    ];
    let before = chores.clone();

    let first_day = chores_for_date(&chores, day(2024, 3, 14));
    let second_day = chores_for_date(&chores, day(2024, 3, 14));
    assert_eq!(first_day, second_day);

    let first_month = chores_for_month(&chores, day(2024, 3, 1));
    let second_month = chores_for_month(&chores, day(2024, 3, 1));
    assert_eq!(first_month, second_month);

    assert_eq!(chores, before);
}

#[test]
fn month_view_for_wednesday_start_begins_on_sunday() {
    // 2024-05-01 is a Wednesday.
    let days = month_view_days(day(2024, 5, 1));
    assert_eq!(days[0], day(2024, 4, 28));
    assert_eq!(days.len() % 7, 0);
}

#[test]
fn queries_stay_total_at_representable_date_limits() {
    assert!(chores_for_month(&[], NaiveDate::MAX).is_empty());
    assert_eq!(month_view_days(NaiveDate::MIN)[0], NaiveDate::MIN);
    assert!(!month_agenda(&[], NaiveDate::MIN).is_empty());

    let last_day = one_time("End of time", NaiveDate::MAX);
    let forever = weekly("Forever", &[0, 1, 2, 3, 4, 5, 6], NaiveDate::MIN, None);
    let chores = vec![last_day, forever];

    assert_eq!(chores_for_month(&chores, NaiveDate::MAX).len(), 2);
    let agenda = month_agenda(&chores, NaiveDate::MAX);
    let final_cell = agenda.last().unwrap();
    assert_eq!(final_cell.day, NaiveDate::MAX);
    assert_eq!(final_cell.chores.len(), 2);
    assert_eq!(month_agenda(&chores, NaiveDate::MIN)[0].chores.len(), 1);
}
