//! Weekday set used by weekly recurrence patterns.
//!
//! # Invariants
//! - Indices follow `0 = Sunday .. 6 = Saturday`.
//! - Each weekday appears at most once; iteration is always ascending.
//! - Wire shape is a sorted integer array (`[1, 4]`).

use super::chore::ChoreValidationError;
use chrono::Weekday;
use serde::{Deserialize, Serialize};

const SHORT_DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Set of weekdays stored as a 7-bit mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// Returns an empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Builds a set from Sunday-based indices.
    ///
    /// # Errors
    /// - `InvalidWeekday` when an index is greater than 6.
    /// - `DuplicateWeekday` when an index is repeated.
    pub fn from_indices(
        indices: impl IntoIterator<Item = u8>,
    ) -> Result<Self, ChoreValidationError> {
        let mut set = Self::empty();
        for index in indices {
            if index > 6 {
                return Err(ChoreValidationError::InvalidWeekday(index));
            }
            if !set.insert_index(index) {
                return Err(ChoreValidationError::DuplicateWeekday(index));
            }
        }
        Ok(set)
    }

    /// Builds a set from chrono weekdays, ignoring repeats.
    pub fn from_weekdays(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut set = Self::empty();
        for day in days {
            set.insert(day);
        }
        set
    }

    /// Inserts one weekday. Returns `false` when it was already present.
    pub fn insert(&mut self, day: Weekday) -> bool {
        self.insert_index(weekday_to_index(day))
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.contains_index(weekday_to_index(day))
    }

    pub fn contains_index(&self, index: u8) -> bool {
        index <= 6 && self.0 & (1 << index) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Sunday-based indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = u8> + '_ {
        (0..7u8).filter(move |index| self.contains_index(*index))
    }

    /// Abbreviated day names in ascending order (`Mon, Thu`).
    pub fn short_names(&self) -> Vec<&'static str> {
        self.indices()
            .map(|index| SHORT_DAY_NAMES[usize::from(index)])
            .collect()
    }

    fn insert_index(&mut self, index: u8) -> bool {
        let bit = 1 << index;
        let was_absent = self.0 & bit == 0;
        self.0 |= bit;
        was_absent
    }
}

impl TryFrom<Vec<u8>> for WeekdaySet {
    type Error = ChoreValidationError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_indices(value)
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(value: WeekdaySet) -> Self {
        value.indices().collect()
    }
}

/// Sunday-based index (`0..=6`) for a chrono weekday.
pub fn weekday_to_index(day: Weekday) -> u8 {
    // num_days_from_sunday is always < 7
    day.num_days_from_sunday() as u8
}
