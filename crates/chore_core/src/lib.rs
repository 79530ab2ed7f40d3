//! Core domain logic for the chore scheduler.
//! This crate is the single source of truth for chore and member invariants
//! and for occurrence resolution.

pub mod calendar;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod resolver;
pub mod service;
pub mod sync;

pub use calendar::{
    is_same_month, month_end, month_start, month_view_days, month_year_label, next_month,
    previous_month, CalendarDay, DayRange,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::chore::{
    Assignee, Chore, ChoreDraft, ChoreId, ChorePatch, ChoreValidationError, RecurrenceKind,
    RecurrencePattern, Schedule,
};
pub use model::member::{MemberId, MemberValidationError, TeamMember, UNASSIGNED_COLOR};
pub use model::state::{AppState, StateConsistencyError};
pub use model::weekday::WeekdaySet;
pub use repo::snapshot_repo::{
    InMemorySnapshotRepository, PersistedSnapshot, RepoError, RepoResult, SnapshotRepository,
    SqliteSnapshotRepository, DEFAULT_SNAPSHOT_KEY,
};
pub use resolver::{chores_for_date, chores_for_month, month_agenda, occurs_on, DayAgenda};
pub use service::app_store::{AppStore, MemberRemoval, StoreError, StoreResult};
pub use sync::hub::{RehydrateSignal, SyncEvent, SyncHub, SyncListener};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
