//! Aggregate application state persisted as one snapshot.
//!
//! # Invariants
//! - Member ids and chore ids are unique within their lists.
//! - Every `Assignee::Member` references a member in `team_members`.

use super::chore::{Chore, ChoreId};
use super::member::{MemberId, TeamMember};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Referential consistency failures detected in a state snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateConsistencyError {
    DuplicateMemberId(MemberId),
    DuplicateChoreId(ChoreId),
    DanglingAssignee { chore: ChoreId, member: MemberId },
}

impl Display for StateConsistencyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateMemberId(id) => write!(f, "duplicate member id: {id}"),
            Self::DuplicateChoreId(id) => write!(f, "duplicate chore id: {id}"),
            Self::DanglingAssignee { chore, member } => {
                write!(f, "chore {chore} is assigned to missing member {member}")
            }
        }
    }
}

impl Error for StateConsistencyError {}

/// Canonical member/chore collections plus calendar view state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    pub team_members: Vec<TeamMember>,
    pub chores: Vec<Chore>,
    pub selected_date: Option<NaiveDate>,
    pub current_month: NaiveDate,
}

impl AppState {
    /// Empty state viewing the month containing `current_month`.
    pub fn empty(current_month: NaiveDate) -> Self {
        Self {
            team_members: Vec::new(),
            chores: Vec::new(),
            selected_date: None,
            current_month,
        }
    }

    pub fn member(&self, id: MemberId) -> Option<&TeamMember> {
        self.team_members.iter().find(|member| member.id() == id)
    }

    pub fn chore(&self, id: ChoreId) -> Option<&Chore> {
        self.chores.iter().find(|chore| chore.id() == id)
    }

    pub fn has_member(&self, id: MemberId) -> bool {
        self.member(id).is_some()
    }

    /// Verifies id uniqueness and assignee references.
    pub fn check_consistency(&self) -> Result<(), StateConsistencyError> {
        let mut member_ids = HashSet::with_capacity(self.team_members.len());
        for member in &self.team_members {
            if !member_ids.insert(member.id()) {
                return Err(StateConsistencyError::DuplicateMemberId(member.id()));
            }
        }

        let mut chore_ids = HashSet::with_capacity(self.chores.len());
        for chore in &self.chores {
            if !chore_ids.insert(chore.id()) {
                return Err(StateConsistencyError::DuplicateChoreId(chore.id()));
            }
            if let Some(member) = chore.assigned_to().member_id() {
                if !member_ids.contains(&member) {
                    return Err(StateConsistencyError::DanglingAssignee {
                        chore: chore.id(),
                        member,
                    });
                }
            }
        }

        Ok(())
    }
}
