//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose member, chore and calendar use-cases to Dart via FRB.
//! - Translate between string/primitive wire values and core types.
//!
//! # Invariants
//! - Exported functions never panic across the FFI boundary.
//! - Every call reads the latest persisted snapshot before acting, so the
//!   UI never queries stale state after another process wrote.
//! - Calls within one process are serialized; writes from other processes
//!   are detected by revision and retried.

use chore_core::db::open_db;
use chore_core::{
    core_version as core_version_inner, init_logging as init_logging_inner,
    month_year_label, ping as ping_inner, AppStore, Assignee, Chore, ChoreDraft, ChorePatch,
    RecurrencePattern, RepoError, Schedule, SqliteSnapshotRepository, StoreError, WeekdaySet,
};
use chrono::{Datelike, NaiveDate};
use log::warn;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use uuid::Uuid;

const DB_FILE_NAME: &str = "chore_app.sqlite3";
const DB_PATH_ENV: &str = "CHORE_DB_PATH";
const DATE_FORMAT: &str = "%Y-%m-%d";
const MAX_VISIBLE_BADGES: usize = 3;
const MAX_CONFLICT_RETRIES: usize = 3;
const MIN_INPUT_YEAR: i32 = 1;
const MAX_INPUT_YEAR: i32 = 9999;

static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static STORE_LOCK: Mutex<()> = Mutex::new(());

type SqliteStore<'conn> = AppStore<SqliteSnapshotRepository<'conn>>;

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Core crate version.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Idempotent for the same `level + log_dir`.
/// - Returns empty string on success and an error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Result envelope for mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Id of the created or affected entity.
    pub id: Option<String>,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: impl ToString) -> Self {
        Self {
            ok: true,
            id: Some(id.to_string()),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberItem {
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembersResponse {
    pub items: Vec<MemberItem>,
    pub message: String,
}

/// Chore projection for list display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoreItem {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Option<String>,
    pub assignee_name: Option<String>,
    /// Assignee color, gray when unassigned.
    pub color: String,
    /// `YYYY-MM-DD` for one-time chores.
    pub date: Option<String>,
    /// `Repeats weekly on ...` for recurring chores.
    pub recurrence_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoresResponse {
    pub items: Vec<ChoreItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoreBadge {
    pub chore_id: String,
    pub title: String,
    pub color: String,
}

/// One cell of the month grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCellItem {
    pub date: String,
    pub day_of_month: u32,
    pub in_month: bool,
    /// At most three badges, in chore list order.
    pub badges: Vec<ChoreBadge>,
    /// Chores beyond the visible badges.
    pub remaining_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthViewResponse {
    pub ok: bool,
    /// `March 2024` style heading.
    pub label: String,
    /// Anchor date of the month in view.
    pub month: String,
    pub cells: Vec<DayCellItem>,
    pub message: String,
}

/// Adds a team member with an auto-assigned color.
#[flutter_rust_bridge::frb(sync)]
pub fn member_add(name: String) -> ActionResponse {
    match with_store(|store| store.add_member(&name)) {
        Ok(member) => ActionResponse::success("Member added.", member.id()),
        Err(err) => ActionResponse::failure(format!("member_add failed: {err}")),
    }
}

/// Removes a member and unassigns their chores.
#[flutter_rust_bridge::frb(sync)]
pub fn member_remove(member_id: String) -> ActionResponse {
    let id = match parse_id(&member_id, "member_id") {
        Ok(id) => id,
        Err(err) => return ActionResponse::failure(format!("member_remove failed: {err}")),
    };
    match with_store(|store| store.remove_member(id)) {
        Ok(removal) => ActionResponse::success(
            format!(
                "Member removed; {} chore(s) unassigned.",
                removal.unassigned_chores.len()
            ),
            id,
        ),
        Err(err) => ActionResponse::failure(format!("member_remove failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn members_list() -> MembersResponse {
    match with_store(|store| {
        Ok(store
            .team_members()
            .iter()
            .map(|member| MemberItem {
                id: member.id().to_string(),
                name: member.name().to_string(),
                color: member.color().to_string(),
            })
            .collect::<Vec<_>>())
    }) {
        Ok(items) => MembersResponse {
            message: format!("{} member(s).", items.len()),
            items,
        },
        Err(err) => MembersResponse {
            items: Vec::new(),
            message: format!("members_list failed: {err}"),
        },
    }
}

/// Adds a one-time chore on `date` (`YYYY-MM-DD`).
#[flutter_rust_bridge::frb(sync)]
pub fn chore_add_one_time(
    title: String,
    description: Option<String>,
    assigned_to: Option<String>,
    date: String,
) -> ActionResponse {
    let draft = parse_date(&date, "date").and_then(|date| {
        Ok(ChoreDraft {
            title,
            description,
            assigned_to: parse_assignee(assigned_to.as_deref())?,
            schedule: Schedule::one_time(date),
        })
    });
    add_chore("chore_add_one_time", draft)
}

/// Adds a weekly chore on `days_of_week` (0 = Sunday).
#[flutter_rust_bridge::frb(sync)]
pub fn chore_add_weekly(
    title: String,
    description: Option<String>,
    assigned_to: Option<String>,
    days_of_week: Vec<u8>,
    start_date: String,
    end_date: Option<String>,
) -> ActionResponse {
    let draft = (|| -> Result<ChoreDraft, String> {
        let days = WeekdaySet::from_indices(days_of_week).map_err(|err| err.to_string())?;
        let start = parse_date(&start_date, "start_date")?;
        let end = end_date
            .as_deref()
            .map(|value| parse_date(value, "end_date"))
            .transpose()?;
        let pattern = RecurrencePattern::weekly(days, start, end).map_err(|err| err.to_string())?;
        Ok(ChoreDraft {
            title,
            description,
            assigned_to: parse_assignee(assigned_to.as_deref())?,
            schedule: Schedule::recurring(pattern),
        })
    })();
    add_chore("chore_add_weekly", draft)
}

/// Reassigns a chore; `member_id = None` unassigns it.
#[flutter_rust_bridge::frb(sync)]
pub fn chore_assign(chore_id: String, member_id: Option<String>) -> ActionResponse {
    let parsed = parse_id(&chore_id, "chore_id")
        .and_then(|id| Ok((id, parse_assignee(member_id.as_deref())?)));
    let (id, assignee) = match parsed {
        Ok(parsed) => parsed,
        Err(err) => return ActionResponse::failure(format!("chore_assign failed: {err}")),
    };
    let patch = ChorePatch {
        assigned_to: Some(assignee),
        ..ChorePatch::default()
    };
    match with_store(|store| store.update_chore(id, &patch)) {
        Ok(chore) => ActionResponse::success("Chore updated.", chore.id()),
        Err(err) => ActionResponse::failure(format!("chore_assign failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn chore_remove(chore_id: String) -> ActionResponse {
    let id = match parse_id(&chore_id, "chore_id") {
        Ok(id) => id,
        Err(err) => return ActionResponse::failure(format!("chore_remove failed: {err}")),
    };
    match with_store(|store| store.remove_chore(id)) {
        Ok(chore) => ActionResponse::success("Chore removed.", chore.id()),
        Err(err) => ActionResponse::failure(format!("chore_remove failed: {err}")),
    }
}

/// Chores occurring on `date` (`YYYY-MM-DD`), in creation order.
#[flutter_rust_bridge::frb(sync)]
pub fn chores_for_date(date: String) -> ChoresResponse {
    let day = match parse_date(&date, "date") {
        Ok(day) => day,
        Err(err) => {
            return ChoresResponse {
                items: Vec::new(),
                message: format!("chores_for_date failed: {err}"),
            }
        }
    };
    match with_store(|store| {
        Ok(store
            .chores_for_date(day)
            .into_iter()
            .map(|chore| to_chore_item(store, chore))
            .collect::<Vec<_>>())
    }) {
        Ok(items) => ChoresResponse {
            message: if items.is_empty() {
                "No chores.".to_string()
            } else {
                format!("{} chore(s).", items.len())
            },
            items,
        },
        Err(err) => ChoresResponse {
            items: Vec::new(),
            message: format!("chores_for_date failed: {err}"),
        },
    }
}

/// Month grid for `date`, or for the stored month in view when `None`.
///
/// Passing a date also moves the stored month in view.
#[flutter_rust_bridge::frb(sync)]
pub fn month_view(date: Option<String>) -> MonthViewResponse {
    let anchor = match date.as_deref().map(|value| parse_date(value, "date")).transpose() {
        Ok(anchor) => anchor,
        Err(err) => return month_view_failure(format!("month_view failed: {err}")),
    };
    month_view_with(|store| {
        if let Some(anchor) = anchor {
            store.set_current_month(anchor)?;
        }
        Ok(())
    })
}

/// Moves the month in view one month forward (`forward = true`) or back.
#[flutter_rust_bridge::frb(sync)]
pub fn month_shift(forward: bool) -> MonthViewResponse {
    month_view_with(|store| {
        if forward {
            store.next_month()?;
        } else {
            store.previous_month()?;
        }
        Ok(())
    })
}

fn month_view_with(
    mut navigate: impl FnMut(&mut SqliteStore<'_>) -> Result<(), StoreError>,
) -> MonthViewResponse {
    let result = with_store(|store| {
        navigate(store)?;
        let month = store.current_month();
        let cells = store
            .month_agenda()
            .into_iter()
            .map(|cell| DayCellItem {
                date: cell.day.format(DATE_FORMAT).to_string(),
                day_of_month: cell.day.day(),
                in_month: cell.in_month,
                remaining_count: cell.chores.len().saturating_sub(MAX_VISIBLE_BADGES) as u32,
                badges: cell
                    .chores
                    .iter()
                    .take(MAX_VISIBLE_BADGES)
                    .map(|chore| ChoreBadge {
                        chore_id: chore.id().to_string(),
                        title: chore.title().to_string(),
                        color: store.assignee_color(chore.assigned_to()).to_string(),
                    })
                    .collect(),
            })
            .collect::<Vec<_>>();
        Ok((month, cells))
    });

    match result {
        Ok((month, cells)) => MonthViewResponse {
            ok: true,
            label: month_year_label(month),
            month: month.format(DATE_FORMAT).to_string(),
            cells,
            message: String::new(),
        },
        Err(err) => month_view_failure(format!("month_view failed: {err}")),
    }
}

fn month_view_failure(message: String) -> MonthViewResponse {
    MonthViewResponse {
        ok: false,
        label: String::new(),
        month: String::new(),
        cells: Vec::new(),
        message,
    }
}

fn add_chore(operation: &str, draft: Result<ChoreDraft, String>) -> ActionResponse {
    let draft = match draft {
        Ok(draft) => draft,
        Err(err) => return ActionResponse::failure(format!("{operation} failed: {err}")),
    };
    match with_store(|store| store.add_chore(draft.clone())) {
        Ok(chore) => ActionResponse::success("Chore added.", chore.id()),
        Err(err) => ActionResponse::failure(format!("{operation} failed: {err}")),
    }
}

fn to_chore_item(store: &SqliteStore<'_>, chore: &Chore) -> ChoreItem {
    let (date, recurrence_text) = match chore.schedule() {
        Schedule::OneTime { date } => (Some(date.format(DATE_FORMAT).to_string()), None),
        Schedule::Recurring { recurrence } => (None, Some(recurrence.summary())),
    };
    ChoreItem {
        id: chore.id().to_string(),
        title: chore.title().to_string(),
        description: chore.description().map(str::to_string),
        assignee_id: chore.assigned_to().member_id().map(|id| id.to_string()),
        assignee_name: store.assignee_name(chore.assigned_to()).map(str::to_string),
        color: store.assignee_color(chore.assigned_to()).to_string(),
        date,
        recurrence_text,
    }
}

/// Parses a `YYYY-MM-DD` date with a year in `1..=9999`.
fn parse_date(value: &str, field: &str) -> Result<NaiveDate, String> {
    let trimmed = value.trim();
    let date = NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|err| format!("{field} must be YYYY-MM-DD, got `{trimmed}`: {err}"))?;
    if !(MIN_INPUT_YEAR..=MAX_INPUT_YEAR).contains(&date.year()) {
        return Err(format!(
            "{field} year must be within {MIN_INPUT_YEAR}..={MAX_INPUT_YEAR}, got `{trimmed}`"
        ));
    }
    Ok(date)
}

fn parse_id(value: &str, field: &str) -> Result<Uuid, String> {
    Uuid::parse_str(value.trim()).map_err(|_| format!("{field} is not a valid id: `{value}`"))
}

fn parse_assignee(value: Option<&str>) -> Result<Assignee, String> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(raw) => parse_id(raw, "assigned_to").map(Assignee::Member),
        None => Ok(Assignee::Unassigned),
    }
}

/// Runs `f` against a store freshly loaded from the database.
///
/// Retries when another process wrote between load and save.
fn with_store<T>(
    mut f: impl FnMut(&mut SqliteStore<'_>) -> Result<T, StoreError>,
) -> Result<T, String> {
    let _guard = STORE_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let db_path = resolve_db_path();
    let conn = open_db(&db_path).map_err(|err| format!("DB open failed: {err}"))?;

    let mut attempt = 0;
    loop {
        attempt += 1;
        let repo = SqliteSnapshotRepository::try_new(&conn)
            .map_err(|err| format!("snapshot repo init failed: {err}"))?;
        let mut store = AppStore::open(repo).map_err(|err| err.to_string())?;
        match f(&mut store) {
            Err(StoreError::Repo(RepoError::RevisionConflict { .. }))
                if attempt < MAX_CONFLICT_RETRIES =>
            {
                warn!("event=ffi_retry module=ffi status=conflict attempt={attempt}");
            }
            other => return other.map_err(|err| err.to_string()),
        }
    }
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::{
        chore_add_one_time, chore_add_weekly, chore_assign, chore_remove, chores_for_date,
        core_version, init_logging, member_add, member_remove, members_list, month_shift,
        month_view, ping, resolve_db_path, with_store, DB_PATH_ENV, MAX_CONFLICT_RETRIES,
    };
    use chore_core::db::open_db;
    use chore_core::{
        AppState, SnapshotRepository, SqliteSnapshotRepository, DEFAULT_SNAPSHOT_KEY,
    };
    use chrono::NaiveDate;
    use std::sync::Once;

    static TEST_DB: Once = Once::new();

    /// Points the API at a per-process database before first use.
    fn use_test_db() {
        TEST_DB.call_once(|| {
            let path = std::env::temp_dir()
                .join(format!("chore_ffi_test_{}.sqlite3", std::process::id()));
            std::env::set_var(DB_PATH_ENV, path);
        });
    }

    /// Saves the current snapshot again through a separate connection,
    /// bumping its revision behind the caller's back.
    fn write_from_other_connection() {
        let conn = open_db(resolve_db_path()).unwrap();
        let repo = SqliteSnapshotRepository::try_new(&conn).unwrap();
        match repo.load(DEFAULT_SNAPSHOT_KEY).unwrap() {
            Some(snapshot) => repo
                .save(DEFAULT_SNAPSHOT_KEY, &snapshot.state, Some(snapshot.revision))
                .unwrap(),
            None => {
                let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
                repo.save(DEFAULT_SNAPSHOT_KEY, &AppState::empty(today), None)
                    .unwrap()
            }
        };
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "/tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn member_add_and_remove_unassigns_chores() {
        use_test_db();
        let member = member_add("Ada".to_string());
        assert!(member.ok, "{}", member.message);
        let member_id = member.id.unwrap();

        let chore = chore_add_one_time(
            "Dentist".to_string(),
            None,
            Some(member_id.clone()),
            "2030-02-11".to_string(),
        );
        assert!(chore.ok, "{}", chore.message);
        let chore_id = chore.id.unwrap();

        let listed = members_list();
        assert!(listed.items.iter().any(|item| item.id == member_id));

        let removed = member_remove(member_id.clone());
        assert!(removed.ok, "{}", removed.message);
        assert_eq!(removed.message, "Member removed; 1 chore(s) unassigned.");

        let day = chores_for_date("2030-02-11".to_string());
        let item = day.items.iter().find(|item| item.id == chore_id).unwrap();
        assert_eq!(item.assignee_id, None);
        assert_eq!(item.color, "#999999");
        assert!(!members_list().items.iter().any(|item| item.id == member_id));
    }

    #[test]
    fn weekly_chore_shows_recurrence_text_and_can_be_reassigned() {
        use_test_db();
        let member = member_add("Grace".to_string());
        let member_id = member.id.unwrap();
        let chore = chore_add_weekly(
            "Trash".to_string(),
            Some("curbside".to_string()),
            None,
            vec![4, 1],
            "2032-01-01".to_string(),
            Some("2032-01-31".to_string()),
        );
        assert!(chore.ok, "{}", chore.message);
        let chore_id = chore.id.unwrap();

        // 2032-01-05 is a Monday.
        let monday = chores_for_date("2032-01-05".to_string());
        let item = monday.items.iter().find(|item| item.id == chore_id).unwrap();
        assert_eq!(item.recurrence_text.as_deref(), Some("Repeats weekly on Mon, Thu"));
        assert_eq!(item.description.as_deref(), Some("curbside"));

        let assigned = chore_assign(chore_id.clone(), Some(member_id.clone()));
        assert!(assigned.ok, "{}", assigned.message);
        let monday = chores_for_date("2032-01-05".to_string());
        let item = monday.items.iter().find(|item| item.id == chore_id).unwrap();
        assert_eq!(item.assignee_id.as_deref(), Some(member_id.as_str()));
        assert_eq!(item.assignee_name.as_deref(), Some("Grace"));

        let removed = chore_remove(chore_id.clone());
        assert!(removed.ok, "{}", removed.message);
        let monday = chores_for_date("2032-01-05".to_string());
        assert!(!monday.items.iter().any(|item| item.id == chore_id));
    }

    #[test]
    fn invalid_input_is_reported_not_panicked() {
        use_test_db();
        let bad_date = chore_add_one_time("x".to_string(), None, None, "15/03/2024".to_string());
        assert!(!bad_date.ok);
        assert!(bad_date.message.contains("YYYY-MM-DD"));

        let no_days = chore_add_weekly(
            "x".to_string(),
            None,
            None,
            Vec::new(),
            "2024-01-01".to_string(),
            None,
        );
        assert!(!no_days.ok);
        assert!(no_days.message.contains("weekday"));

        let bad_range = chore_add_weekly(
            "x".to_string(),
            None,
            None,
            vec![1],
            "2024-02-01".to_string(),
            Some("2024-01-01".to_string()),
        );
        assert!(!bad_range.ok);
        assert!(bad_range.message.contains("end_date"));

        let ghost = chore_add_one_time(
            "x".to_string(),
            None,
            Some("11111111-2222-4333-8444-555555555555".to_string()),
            "2024-01-01".to_string(),
        );
        assert!(!ghost.ok);
        assert!(ghost.message.contains("unknown member"));

        assert!(!member_remove("not-an-id".to_string()).ok);
        assert!(!chores_for_date("tomorrow".to_string()).message.is_empty());
    }

    #[test]
    fn month_view_caps_badges_and_navigates() {
        use_test_db();
        for title in ["A", "B", "C", "D", "E"] {
            let response =
                chore_add_one_time(title.to_string(), None, None, "2031-07-04".to_string());
            assert!(response.ok, "{}", response.message);
        }

        let view = month_view(Some("2031-07-20".to_string()));
        assert!(view.ok, "{}", view.message);
        assert_eq!(view.label, "July 2031");
        assert_eq!(view.cells.len() % 7, 0);
        let cell = view.cells.iter().find(|cell| cell.date == "2031-07-04").unwrap();
        assert!(cell.in_month);
        assert_eq!(cell.badges.len(), 3);
        assert!(cell.remaining_count >= 2);

        let next = month_shift(true);
        assert!(next.ok, "{}", next.message);
        assert!(!next.label.is_empty());
        assert!(!month_view(None).cells.is_empty());
    }

    #[test]
    fn out_of_range_years_are_rejected_before_anything_is_saved() {
        use_test_db();
        let far = month_view(Some("+262142-12-31".to_string()));
        assert!(!far.ok);
        assert!(far.message.contains("year"));
        assert!(month_view(None).ok);

        let edge = month_view(Some("9999-12-15".to_string()));
        assert!(edge.ok, "{}", edge.message);
        assert_eq!(edge.label, "December 9999");
        assert!(month_shift(true).ok);
        assert!(month_shift(false).ok);
    }

    #[test]
    fn store_call_retries_after_a_concurrent_write() {
        use_test_db();
        let mut attempts = 0;
        let member = with_store(|store| {
            attempts += 1;
            if attempts == 1 {
                write_from_other_connection();
            }
            store.add_member("Retry")
        })
        .unwrap();

        assert_eq!(attempts, 2);
        assert!(members_list()
            .items
            .iter()
            .any(|item| item.id == member.id().to_string()));
    }

    #[test]
    fn store_call_gives_up_after_repeated_conflicts() {
        use_test_db();
        let mut attempts = 0;
        let err = with_store(|store| {
            attempts += 1;
            write_from_other_connection();
            store.add_member("Never")
        })
        .unwrap_err();

        assert_eq!(attempts, MAX_CONFLICT_RETRIES);
        assert!(err.contains("revision conflict"), "{err}");
        assert!(!members_list().items.iter().any(|item| item.name == "Never"));
    }
}
