//! Chore domain model.
//!
//! # Responsibility
//! - Define the chore record and its two occurrence modes.
//! - Normalize and validate user input at the construction boundary.
//!
//! # Invariants
//! - A chore is either one-time (a single calendar day) or recurring (a
//!   weekly pattern), never both and never neither.
//! - Recurring patterns have at least one weekday and `end_date >= start_date`.
//! - `id` and `created_at` never change after construction.
//! - Deserialization re-runs validation, so persisted blobs cannot carry
//!   malformed chores.

use super::member::MemberId;
use super::weekday::WeekdaySet;
use super::generate_id;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable chore identifier.
pub type ChoreId = Uuid;

pub const CHORE_TITLE_MAX_CHARS: usize = 100;
pub const CHORE_DESCRIPTION_MAX_CHARS: usize = 500;

/// Validation failures for chore construction and updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoreValidationError {
    NilId,
    EmptyTitle,
    TitleTooLong { chars: usize },
    DescriptionTooLong { chars: usize },
    EmptyDaysOfWeek,
    InvalidWeekday(u8),
    DuplicateWeekday(u8),
    InvalidRecurrenceWindow { start: NaiveDate, end: NaiveDate },
}

impl Display for ChoreValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "chore id must not be nil"),
            Self::EmptyTitle => write!(f, "chore title must not be empty"),
            Self::TitleTooLong { chars } => write!(
                f,
                "chore title has {chars} characters; limit is {CHORE_TITLE_MAX_CHARS}"
            ),
            Self::DescriptionTooLong { chars } => write!(
                f,
                "chore description has {chars} characters; limit is {CHORE_DESCRIPTION_MAX_CHARS}"
            ),
            Self::EmptyDaysOfWeek => {
                write!(f, "recurring chore must select at least one weekday")
            }
            Self::InvalidWeekday(index) => {
                write!(f, "weekday index {index} is out of range 0..=6")
            }
            Self::DuplicateWeekday(index) => {
                write!(f, "weekday index {index} appears more than once")
            }
            Self::InvalidRecurrenceWindow { start, end } => write!(
                f,
                "recurrence end_date ({end}) must be >= start_date ({start})"
            ),
        }
    }
}

impl Error for ChoreValidationError {}

/// Recurrence kinds. Weekly is the only supported kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceKind {
    #[default]
    Weekly,
}

/// Weekly recurrence definition with an inclusive active window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecurrencePatternRecord")]
pub struct RecurrencePattern {
    #[serde(rename = "type")]
    kind: RecurrenceKind,
    days_of_week: WeekdaySet,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct RecurrencePatternRecord {
    #[serde(rename = "type", default)]
    kind: RecurrenceKind,
    days_of_week: WeekdaySet,
    start_date: NaiveDate,
    #[serde(default)]
    end_date: Option<NaiveDate>,
}

impl TryFrom<RecurrencePatternRecord> for RecurrencePattern {
    type Error = ChoreValidationError;

    fn try_from(value: RecurrencePatternRecord) -> Result<Self, Self::Error> {
        let pattern = Self {
            kind: value.kind,
            days_of_week: value.days_of_week,
            start_date: value.start_date,
            end_date: value.end_date,
        };
        pattern.validate()?;
        Ok(pattern)
    }
}

impl RecurrencePattern {
    /// Creates a weekly pattern.
    ///
    /// # Errors
    /// - `EmptyDaysOfWeek` when `days_of_week` is empty.
    /// - `InvalidRecurrenceWindow` when `end_date < start_date`.
    pub fn weekly(
        days_of_week: WeekdaySet,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<Self, ChoreValidationError> {
        let pattern = Self {
            kind: RecurrenceKind::Weekly,
            days_of_week,
            start_date,
            end_date,
        };
        pattern.validate()?;
        Ok(pattern)
    }

    pub fn validate(&self) -> Result<(), ChoreValidationError> {
        if self.days_of_week.is_empty() {
            return Err(ChoreValidationError::EmptyDaysOfWeek);
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(ChoreValidationError::InvalidRecurrenceWindow {
                    start: self.start_date,
                    end,
                });
            }
        }
        Ok(())
    }

    pub fn kind(&self) -> RecurrenceKind {
        self.kind
    }

    pub fn days_of_week(&self) -> WeekdaySet {
        self.days_of_week
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    /// Whether `day` lies inside the inclusive recurrence window.
    pub fn window_contains(&self, day: NaiveDate) -> bool {
        day >= self.start_date && self.end_date.map_or(true, |end| day <= end)
    }

    /// Display text such as `Repeats weekly on Mon, Thu`.
    pub fn summary(&self) -> String {
        format!(
            "Repeats weekly on {}",
            self.days_of_week.short_names().join(", ")
        )
    }
}

/// Occurrence mode of a chore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Schedule {
    /// Active on exactly one calendar day.
    OneTime { date: NaiveDate },
    /// Active on matching weekdays inside the recurrence window.
    Recurring { recurrence: RecurrencePattern },
}

impl Schedule {
    pub fn one_time(date: NaiveDate) -> Self {
        Self::OneTime { date }
    }

    pub fn recurring(recurrence: RecurrencePattern) -> Self {
        Self::Recurring { recurrence }
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self, Self::Recurring { .. })
    }

    pub fn validate(&self) -> Result<(), ChoreValidationError> {
        match self {
            Self::OneTime { .. } => Ok(()),
            Self::Recurring { recurrence } => recurrence.validate(),
        }
    }
}

/// Assignment target of a chore.
///
/// Serialized as the member id or `null`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<MemberId>", into = "Option<MemberId>")]
pub enum Assignee {
    #[default]
    Unassigned,
    Member(MemberId),
}

impl Assignee {
    pub fn member_id(&self) -> Option<MemberId> {
        match self {
            Self::Unassigned => None,
            Self::Member(id) => Some(*id),
        }
    }

    pub fn is_member(&self, id: MemberId) -> bool {
        *self == Self::Member(id)
    }
}

impl From<Option<MemberId>> for Assignee {
    fn from(value: Option<MemberId>) -> Self {
        value.map_or(Self::Unassigned, Self::Member)
    }
}

impl From<Assignee> for Option<MemberId> {
    fn from(value: Assignee) -> Self {
        value.member_id()
    }
}

/// Canonical chore record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ChoreRecord")]
pub struct Chore {
    id: ChoreId,
    title: String,
    description: Option<String>,
    assigned_to: Assignee,
    schedule: Schedule,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ChoreRecord {
    id: ChoreId,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    assigned_to: Assignee,
    schedule: Schedule,
    created_at: DateTime<Utc>,
}

impl TryFrom<ChoreRecord> for Chore {
    type Error = ChoreValidationError;

    fn try_from(value: ChoreRecord) -> Result<Self, Self::Error> {
        let draft = ChoreDraft {
            title: value.title,
            description: value.description,
            assigned_to: value.assigned_to,
            schedule: value.schedule,
        };
        Self::with_id(value.id, draft, value.created_at)
    }
}

impl Chore {
    /// Creates a chore from validated input with a fresh id and `created_at = now`.
    pub fn from_draft(draft: ChoreDraft) -> Result<Self, ChoreValidationError> {
        Self::with_id(generate_id(), draft, Utc::now())
    }

    /// Creates a chore with caller-provided identity.
    ///
    /// Used by import/rehydrate paths where identity already exists.
    pub fn with_id(
        id: ChoreId,
        draft: ChoreDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ChoreValidationError> {
        if id.is_nil() {
            return Err(ChoreValidationError::NilId);
        }
        let title = normalize_title(&draft.title)?;
        let description = normalize_description(draft.description.as_deref())?;
        draft.schedule.validate()?;

        Ok(Self {
            id,
            title,
            description,
            assigned_to: draft.assigned_to,
            schedule: draft.schedule,
            created_at,
        })
    }

    pub fn id(&self) -> ChoreId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn assigned_to(&self) -> Assignee {
        self.assigned_to
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_recurring(&self) -> bool {
        self.schedule.is_recurring()
    }

    /// Returns a copy with the patch applied; `self` is left untouched.
    pub fn patched(&self, patch: &ChorePatch) -> Result<Self, ChoreValidationError> {
        let draft = ChoreDraft {
            title: patch.title.clone().unwrap_or_else(|| self.title.clone()),
            description: match &patch.description {
                Some(value) => value.clone(),
                None => self.description.clone(),
            },
            assigned_to: patch.assigned_to.unwrap_or(self.assigned_to),
            schedule: patch
                .schedule
                .clone()
                .unwrap_or_else(|| self.schedule.clone()),
        };
        Self::with_id(self.id, draft, self.created_at)
    }

    /// Returns a copy assigned to nobody.
    pub(crate) fn unassigned(&self) -> Self {
        Self {
            assigned_to: Assignee::Unassigned,
            ..self.clone()
        }
    }
}

/// User input for creating a chore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoreDraft {
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Assignee,
    pub schedule: Schedule,
}

impl ChoreDraft {
    pub fn one_time(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            description: None,
            assigned_to: Assignee::Unassigned,
            schedule: Schedule::one_time(date),
        }
    }

    pub fn recurring(title: impl Into<String>, recurrence: RecurrencePattern) -> Self {
        Self {
            title: title.into(),
            description: None,
            assigned_to: Assignee::Unassigned,
            schedule: Schedule::recurring(recurrence),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn assigned_to(mut self, member_id: MemberId) -> Self {
        self.assigned_to = Assignee::Member(member_id);
        self
    }
}

/// Partial chore update. `None` keeps the current value.
///
/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChorePatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub assigned_to: Option<Assignee>,
    pub schedule: Option<Schedule>,
}

impl ChorePatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn normalize_title(raw: &str) -> Result<String, ChoreValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ChoreValidationError::EmptyTitle);
    }
    let chars = trimmed.chars().count();
    if chars > CHORE_TITLE_MAX_CHARS {
        return Err(ChoreValidationError::TitleTooLong { chars });
    }
    Ok(trimmed.to_string())
}

fn normalize_description(raw: Option<&str>) -> Result<Option<String>, ChoreValidationError> {
    let Some(trimmed) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    let chars = trimmed.chars().count();
    if chars > CHORE_DESCRIPTION_MAX_CHARS {
        return Err(ChoreValidationError::DescriptionTooLong { chars });
    }
    Ok(Some(trimmed.to_string()))
}
