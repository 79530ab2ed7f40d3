//! Team member domain model.
//!
//! # Invariants
//! - `id` is stable and never reused.
//! - `name` is trimmed, non-empty and at most 50 characters.
//! - `color` is a `#RRGGBB` tag picked at creation and never edited.

use super::generate_id;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable team member identifier.
pub type MemberId = Uuid;

pub const MEMBER_NAME_MAX_CHARS: usize = 50;

/// Color shown for chores without an assignee.
pub const UNASSIGNED_COLOR: &str = "#999999";

/// Palette used when assigning colors to new members.
pub const MEMBER_PALETTE: [&str; 12] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E2",
    "#F8B739", "#52B788", "#F06595", "#748FFC",
];

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid hex color regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberValidationError {
    NilId,
    EmptyName,
    NameTooLong { chars: usize },
    InvalidColor(String),
}

impl Display for MemberValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "member id must not be nil"),
            Self::EmptyName => write!(f, "member name must not be empty"),
            Self::NameTooLong { chars } => write!(
                f,
                "member name has {chars} characters; limit is {MEMBER_NAME_MAX_CHARS}"
            ),
            Self::InvalidColor(value) => write!(f, "invalid member color `{value}`"),
        }
    }
}

impl Error for MemberValidationError {}

/// A person chores can be assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TeamMemberRecord")]
pub struct TeamMember {
    id: MemberId,
    name: String,
    color: String,
}

#[derive(Deserialize)]
struct TeamMemberRecord {
    id: MemberId,
    name: String,
    color: String,
}

impl TryFrom<TeamMemberRecord> for TeamMember {
    type Error = MemberValidationError;

    fn try_from(value: TeamMemberRecord) -> Result<Self, Self::Error> {
        Self::with_id(value.id, &value.name, value.color)
    }
}

impl TeamMember {
    /// Creates a member with a fresh id and a palette color.
    pub fn new(name: &str) -> Result<Self, MemberValidationError> {
        let color = MEMBER_PALETTE
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(MEMBER_PALETTE[0]);
        Self::with_id(generate_id(), name, color)
    }

    /// Creates a member with caller-provided identity and color.
    pub fn with_id(
        id: MemberId,
        name: &str,
        color: impl Into<String>,
    ) -> Result<Self, MemberValidationError> {
        if id.is_nil() {
            return Err(MemberValidationError::NilId);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(MemberValidationError::EmptyName);
        }
        let chars = name.chars().count();
        if chars > MEMBER_NAME_MAX_CHARS {
            return Err(MemberValidationError::NameTooLong { chars });
        }
        let color = color.into();
        if !HEX_COLOR_RE.is_match(&color) {
            return Err(MemberValidationError::InvalidColor(color));
        }

        Ok(Self {
            id,
            name: name.to_string(),
            color,
        })
    }

    pub fn id(&self) -> MemberId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }
}
