//! Application state store.
//!
//! # Responsibility
//! - Own the canonical member and chore collections plus calendar view state.
//! - Apply every mutation as one atomic step and persist it as one snapshot.
//! - Delegate occurrence queries to the resolver.
//! - Publish change notices and rehydrate from persisted state on demand.
//!
//! # Invariants
//! - A mutation computes the complete next state, persists it, and only then
//!   replaces the in-memory state. On any error the state is unchanged.
//! - Removing a member unassigns every chore that referenced it in the same
//!   state transition.
//! - Chores entering the store never reference a missing member.

use crate::calendar::{self, CalendarDay};
use crate::model::chore::{Assignee, Chore, ChoreDraft, ChoreId, ChorePatch, ChoreValidationError};
use crate::model::member::{MemberId, MemberValidationError, TeamMember, UNASSIGNED_COLOR};
use crate::model::state::AppState;
use crate::repo::snapshot_repo::{RepoError, SnapshotRepository, DEFAULT_SNAPSHOT_KEY};
use crate::resolver::{self, DayAgenda};
use crate::sync::hub::{OriginId, SyncEvent, SyncEventKind, SyncHub};
use chrono::{Local, NaiveDate, Utc};
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level error for mutations and rehydration.
#[derive(Debug)]
pub enum StoreError {
    MemberValidation(MemberValidationError),
    ChoreValidation(ChoreValidationError),
    MemberNotFound(MemberId),
    ChoreNotFound(ChoreId),
    /// Chore input references a member that is not in the store.
    UnknownMember(MemberId),
    Repo(RepoError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemberValidation(err) => write!(f, "{err}"),
            Self::ChoreValidation(err) => write!(f, "{err}"),
            Self::MemberNotFound(id) => write!(f, "member not found: {id}"),
            Self::ChoreNotFound(id) => write!(f, "chore not found: {id}"),
            Self::UnknownMember(id) => write!(f, "chore references unknown member: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MemberValidation(err) => Some(err),
            Self::ChoreValidation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MemberValidationError> for StoreError {
    fn from(value: MemberValidationError) -> Self {
        Self::MemberValidation(value)
    }
}

impl From<ChoreValidationError> for StoreError {
    fn from(value: ChoreValidationError) -> Self {
        Self::ChoreValidation(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Outcome of removing a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRemoval {
    pub member: TeamMember,
    /// Chores that moved to `Unassigned`, in list order.
    pub unassigned_chores: Vec<ChoreId>,
}

/// Canonical state owner backed by a snapshot repository.
pub struct AppStore<R: SnapshotRepository> {
    repo: R,
    key: String,
    state: AppState,
    revision: Option<i64>,
    origin: OriginId,
    hub: Option<Arc<SyncHub>>,
}

impl<R: SnapshotRepository> AppStore<R> {
    /// Opens the default snapshot key, starting empty on today's month when
    /// nothing is persisted yet.
    pub fn open(repo: R) -> StoreResult<Self> {
        Self::open_with(repo, DEFAULT_SNAPSHOT_KEY, Local::now().date_naive())
    }

    /// Opens `key`, using `today` for the initial view when nothing is persisted.
    pub fn open_with(repo: R, key: impl Into<String>, today: NaiveDate) -> StoreResult<Self> {
        let key = key.into();
        let (state, revision) = match repo.load(&key)? {
            Some(snapshot) => (snapshot.state, Some(snapshot.revision)),
            None => (AppState::empty(today), None),
        };
        info!(
            "event=store_open module=store status=ok members={} chores={} revision={}",
            state.team_members.len(),
            state.chores.len(),
            revision.unwrap_or(0)
        );

        Ok(Self {
            repo,
            key,
            state,
            revision,
            origin: Uuid::new_v4(),
            hub: None,
        })
    }

    /// Publishes future changes to `hub` under this store's origin.
    pub fn attach_hub(&mut self, hub: Arc<SyncHub>) {
        self.hub = Some(hub);
    }

    pub fn origin(&self) -> OriginId {
        self.origin
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn team_members(&self) -> &[TeamMember] {
        &self.state.team_members
    }

    pub fn chores(&self) -> &[Chore] {
        &self.state.chores
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.state.selected_date
    }

    pub fn current_month(&self) -> NaiveDate {
        self.state.current_month
    }

    /// Revision of the snapshot this store last read or wrote.
    pub fn revision(&self) -> Option<i64> {
        self.revision
    }

    pub fn member(&self, id: MemberId) -> Option<&TeamMember> {
        self.state.member(id)
    }

    pub fn chore(&self, id: ChoreId) -> Option<&Chore> {
        self.state.chore(id)
    }

    // --- member mutations ---

    pub fn add_member(&mut self, name: &str) -> StoreResult<TeamMember> {
        let member = TeamMember::new(name)?;
        let mut next = self.state.clone();
        next.team_members.push(member.clone());
        self.commit(next, "member_add")?;
        Ok(member)
    }

    /// Removes a member and unassigns its chores in one transition.
    pub fn remove_member(&mut self, id: MemberId) -> StoreResult<MemberRemoval> {
        let member = self
            .state
            .member(id)
            .cloned()
            .ok_or(StoreError::MemberNotFound(id))?;

        let mut unassigned_chores = Vec::new();
        let mut next = self.state.clone();
        next.team_members.retain(|candidate| candidate.id() != id);
        next.chores = next
            .chores
            .iter()
            .map(|chore| {
                if chore.assigned_to().is_member(id) {
                    unassigned_chores.push(chore.id());
                    chore.unassigned()
                } else {
                    chore.clone()
                }
            })
            .collect();

        self.commit(next, "member_remove")?;
        info!(
            "event=member_remove module=store status=ok unassigned={}",
            unassigned_chores.len()
        );
        Ok(MemberRemoval {
            member,
            unassigned_chores,
        })
    }

    // --- chore mutations ---

    pub fn add_chore(&mut self, draft: ChoreDraft) -> StoreResult<Chore> {
        let chore = Chore::from_draft(draft)?;
        self.ensure_assignee_exists(chore.assigned_to())?;
        let mut next = self.state.clone();
        next.chores.push(chore.clone());
        self.commit(next, "chore_add")?;
        Ok(chore)
    }

    pub fn remove_chore(&mut self, id: ChoreId) -> StoreResult<Chore> {
        let removed = self
            .state
            .chore(id)
            .cloned()
            .ok_or(StoreError::ChoreNotFound(id))?;
        let mut next = self.state.clone();
        next.chores.retain(|chore| chore.id() != id);
        self.commit(next, "chore_remove")?;
        Ok(removed)
    }

    /// Applies a partial update; `id` and `created_at` are preserved.
    pub fn update_chore(&mut self, id: ChoreId, patch: &ChorePatch) -> StoreResult<Chore> {
        let current = self.state.chore(id).ok_or(StoreError::ChoreNotFound(id))?;
        let updated = current.patched(patch)?;
        self.ensure_assignee_exists(updated.assigned_to())?;

        let mut next = self.state.clone();
        for chore in next.chores.iter_mut() {
            if chore.id() == id {
                *chore = updated.clone();
            }
        }
        self.commit(next, "chore_update")?;
        Ok(updated)
    }

    // --- calendar view mutations ---

    pub fn set_selected_date(&mut self, date: Option<NaiveDate>) -> StoreResult<()> {
        let mut next = self.state.clone();
        next.selected_date = date;
        self.commit(next, "select_date")
    }

    pub fn set_current_month(&mut self, date: impl CalendarDay) -> StoreResult<()> {
        let mut next = self.state.clone();
        next.current_month = date.calendar_day();
        self.commit(next, "set_month")
    }

    pub fn next_month(&mut self) -> StoreResult<NaiveDate> {
        let month = calendar::next_month(self.state.current_month);
        self.set_current_month(month)?;
        Ok(month)
    }

    pub fn previous_month(&mut self) -> StoreResult<NaiveDate> {
        let month = calendar::previous_month(self.state.current_month);
        self.set_current_month(month)?;
        Ok(month)
    }

    // --- queries ---

    pub fn chores_for_date(&self, date: impl CalendarDay) -> Vec<&Chore> {
        resolver::chores_for_date(&self.state.chores, date)
    }

    pub fn chores_for_month(&self, date: impl CalendarDay) -> Vec<&Chore> {
        resolver::chores_for_month(&self.state.chores, date)
    }

    /// Per-day agenda for the month currently in view.
    pub fn month_agenda(&self) -> Vec<DayAgenda<'_>> {
        resolver::month_agenda(&self.state.chores, self.state.current_month)
    }

    /// Chores on the selected day, or an empty list when nothing is selected.
    pub fn selected_day_chores(&self) -> Vec<&Chore> {
        match self.state.selected_date {
            Some(date) => self.chores_for_date(date),
            None => Vec::new(),
        }
    }

    /// Display color for an assignee; gray for unassigned or unknown members.
    pub fn assignee_color(&self, assignee: Assignee) -> &str {
        assignee
            .member_id()
            .and_then(|id| self.state.member(id))
            .map_or(UNASSIGNED_COLOR, TeamMember::color)
    }

    pub fn assignee_name(&self, assignee: Assignee) -> Option<&str> {
        assignee
            .member_id()
            .and_then(|id| self.state.member(id))
            .map(TeamMember::name)
    }

    // --- freshness ---

    /// Replaces in-memory state with the persisted snapshot.
    ///
    /// When nothing is persisted the store resets to an empty state that keeps
    /// the current month in view.
    pub fn rehydrate(&mut self) -> StoreResult<()> {
        match self.repo.load(&self.key)? {
            Some(snapshot) => {
                self.state = snapshot.state;
                self.revision = Some(snapshot.revision);
            }
            None => {
                self.state = AppState::empty(self.state.current_month);
                self.revision = None;
            }
        }
        info!(
            "event=store_rehydrate module=store status=ok revision={}",
            self.revision.unwrap_or(0)
        );
        Ok(())
    }

    /// Rehydrates when the persisted revision differs from the last one seen.
    ///
    /// Returns whether a rehydrate happened.
    pub fn sync_if_stale(&mut self) -> StoreResult<bool> {
        let persisted = self.repo.revision(&self.key)?;
        if persisted == self.revision {
            return Ok(false);
        }
        debug!(
            "event=store_stale module=store status=ok seen={} persisted={}",
            self.revision.unwrap_or(0),
            persisted.unwrap_or(0)
        );
        self.rehydrate()?;
        Ok(true)
    }

    fn ensure_assignee_exists(&self, assignee: Assignee) -> StoreResult<()> {
        match assignee.member_id() {
            Some(id) if !self.state.has_member(id) => Err(StoreError::UnknownMember(id)),
            _ => Ok(()),
        }
    }

    fn commit(&mut self, next: AppState, event: &'static str) -> StoreResult<()> {
        let revision = match self.repo.save(&self.key, &next, self.revision) {
            Ok(revision) => revision,
            Err(err) => {
                error!("event={event} module=store status=error error={err}");
                return Err(err.into());
            }
        };

        self.state = next;
        self.revision = Some(revision);
        debug!("event={event} module=store status=ok revision={revision}");

        if let Some(hub) = &self.hub {
            hub.broadcast(&SyncEvent {
                kind: SyncEventKind::StateUpdated,
                origin: self.origin,
                key: self.key.clone(),
                revision,
                timestamp_ms: Utc::now().timestamp_millis(),
            });
        }
        Ok(())
    }
}
