//! Snapshot repository contracts and implementations.
//!
//! # Responsibility
//! - Persist the whole `AppState` as one JSON blob per key.
//! - Track a per-key revision so readers can tell when a blob changed.
//!
//! # Invariants
//! - A save replaces the blob and bumps the revision in one statement.
//! - Saves are compare-and-swap on the revision the writer last saw; a
//!   concurrent writer produces `RevisionConflict` instead of a lost update.
//! - Loads reject blobs that fail model validation or referential checks.

use crate::db::DbError;
use crate::model::state::{AppState, StateConsistencyError};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage key used when callers do not pick one.
pub const DEFAULT_SNAPSHOT_KEY: &str = "chore-app-storage";

/// Snapshot format version written by this binary.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Serialization(serde_json::Error),
    UnsupportedSnapshotVersion { found: u32, latest_supported: u32 },
    InvalidData(String),
    RevisionConflict { expected: Option<i64>, actual: Option<i64> },
    SchemaNotReady,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "snapshot serialization failed: {err}"),
            Self::UnsupportedSnapshotVersion {
                found,
                latest_supported,
            } => write!(
                f,
                "snapshot version {found} is newer than supported {latest_supported}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted snapshot: {message}"),
            Self::RevisionConflict { expected, actual } => write!(
                f,
                "snapshot revision conflict: expected {}, found {}",
                revision_label(*expected),
                revision_label(*actual)
            ),
            Self::SchemaNotReady => write!(f, "snapshots table is missing; run migrations first"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

impl From<StateConsistencyError> for RepoError {
    fn from(value: StateConsistencyError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

fn revision_label(revision: Option<i64>) -> String {
    revision.map_or_else(|| "none".to_string(), |value| value.to_string())
}

/// Loaded state together with the revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSnapshot {
    pub state: AppState,
    pub revision: i64,
}

/// Repository interface for whole-state snapshots.
pub trait SnapshotRepository {
    /// Loads the snapshot stored under `key`, if any.
    fn load(&self, key: &str) -> RepoResult<Option<PersistedSnapshot>>;

    /// Replaces the snapshot under `key` when its current revision equals
    /// `expected_revision` (`None` = key must be absent). Returns the new revision.
    fn save(&self, key: &str, state: &AppState, expected_revision: Option<i64>)
        -> RepoResult<i64>;

    /// Current revision under `key` without decoding the payload.
    fn revision(&self, key: &str) -> RepoResult<Option<i64>>;

    /// Removes the snapshot under `key`. Missing keys are a no-op.
    fn clear(&self, key: &str) -> RepoResult<()>;
}

impl<R: SnapshotRepository + ?Sized> SnapshotRepository for &R {
    fn load(&self, key: &str) -> RepoResult<Option<PersistedSnapshot>> {
        (**self).load(key)
    }

    fn save(
        &self,
        key: &str,
        state: &AppState,
        expected_revision: Option<i64>,
    ) -> RepoResult<i64> {
        (**self).save(key, state, expected_revision)
    }

    fn revision(&self, key: &str) -> RepoResult<Option<i64>> {
        (**self).revision(key)
    }

    fn clear(&self, key: &str) -> RepoResult<()> {
        (**self).clear(key)
    }
}

#[derive(Serialize)]
struct SnapshotEnvelopeRef<'a> {
    version: u32,
    state: &'a AppState,
}

#[derive(Deserialize)]
struct SnapshotEnvelope {
    state: AppState,
}

#[derive(Deserialize)]
struct SnapshotHeader {
    version: u32,
}

/// Encodes state into the versioned JSON envelope.
pub fn encode_snapshot(state: &AppState) -> RepoResult<String> {
    let envelope = SnapshotEnvelopeRef {
        version: SNAPSHOT_FORMAT_VERSION,
        state,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Decodes and validates a versioned JSON envelope.
pub fn decode_snapshot(payload: &str) -> RepoResult<AppState> {
    let header: SnapshotHeader = serde_json::from_str(payload)?;
    if header.version > SNAPSHOT_FORMAT_VERSION {
        return Err(RepoError::UnsupportedSnapshotVersion {
            found: header.version,
            latest_supported: SNAPSHOT_FORMAT_VERSION,
        });
    }
    let envelope: SnapshotEnvelope = serde_json::from_str(payload)?;
    envelope.state.check_consistency()?;
    Ok(envelope.state)
}

/// SQLite-backed snapshot repository.
pub struct SqliteSnapshotRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSnapshotRepository<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `SchemaNotReady` when the `snapshots` table does not exist.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'snapshots'
            );",
            [],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::SchemaNotReady);
        }
        Ok(Self { conn })
    }
}

impl SnapshotRepository for SqliteSnapshotRepository<'_> {
    fn load(&self, key: &str) -> RepoResult<Option<PersistedSnapshot>> {
        let row = self
            .conn
            .query_row(
                "SELECT payload, revision FROM snapshots WHERE key = ?1;",
                [key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        match row {
            Some((payload, revision)) => Ok(Some(PersistedSnapshot {
                state: decode_snapshot(&payload)?,
                revision,
            })),
            None => Ok(None),
        }
    }

    fn save(
        &self,
        key: &str,
        state: &AppState,
        expected_revision: Option<i64>,
    ) -> RepoResult<i64> {
        state.check_consistency()?;
        let payload = encode_snapshot(state)?;
        let now_ms = Utc::now().timestamp_millis();

        let written = match expected_revision {
            None => self
                .conn
                .query_row(
                    "INSERT INTO snapshots (key, version, payload, revision, updated_at)
                     VALUES (?1, ?2, ?3, 1, ?4)
                     ON CONFLICT(key) DO NOTHING
                     RETURNING revision;",
                    params![key, SNAPSHOT_FORMAT_VERSION, payload, now_ms],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?,
            Some(expected) => self
                .conn
                .query_row(
                    "UPDATE snapshots
                     SET version = ?2, payload = ?3, revision = revision + 1, updated_at = ?4
                     WHERE key = ?1 AND revision = ?5
                     RETURNING revision;",
                    params![key, SNAPSHOT_FORMAT_VERSION, payload, now_ms, expected],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?,
        };

        match written {
            Some(revision) => Ok(revision),
            None => Err(RepoError::RevisionConflict {
                expected: expected_revision,
                actual: self.revision(key)?,
            }),
        }
    }

    fn revision(&self, key: &str) -> RepoResult<Option<i64>> {
        let revision = self
            .conn
            .query_row(
                "SELECT revision FROM snapshots WHERE key = ?1;",
                [key],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(revision)
    }

    fn clear(&self, key: &str) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM snapshots WHERE key = ?1;", [key])?;
        Ok(())
    }
}

/// Process-local snapshot repository.
///
/// Still round-trips through the JSON envelope, so it exercises the same
/// validation as the SQLite implementation.
#[derive(Debug, Default)]
pub struct InMemorySnapshotRepository {
    entries: RefCell<BTreeMap<String, (String, i64)>>,
}

impl InMemorySnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotRepository for InMemorySnapshotRepository {
    fn load(&self, key: &str) -> RepoResult<Option<PersistedSnapshot>> {
        let entries = self.entries.borrow();
        match entries.get(key) {
            Some((payload, revision)) => Ok(Some(PersistedSnapshot {
                state: decode_snapshot(payload)?,
                revision: *revision,
            })),
            None => Ok(None),
        }
    }

    fn save(
        &self,
        key: &str,
        state: &AppState,
        expected_revision: Option<i64>,
    ) -> RepoResult<i64> {
        state.check_consistency()?;
        let payload = encode_snapshot(state)?;
        let mut entries = self.entries.borrow_mut();
        let actual = entries.get(key).map(|(_, revision)| *revision);
        if actual != expected_revision {
            return Err(RepoError::RevisionConflict {
                expected: expected_revision,
                actual,
            });
        }
        let next = actual.map_or(1, |revision| revision + 1);
        entries.insert(key.to_string(), (payload, next));
        Ok(next)
    }

    fn revision(&self, key: &str) -> RepoResult<Option<i64>> {
        Ok(self.entries.borrow().get(key).map(|(_, revision)| *revision))
    }

    fn clear(&self, key: &str) -> RepoResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decode_snapshot, InMemorySnapshotRepository, RepoError, SnapshotRepository,
        DEFAULT_SNAPSHOT_KEY,
    };
    use crate::model::state::AppState;
    use chrono::NaiveDate;

    fn empty_state() -> AppState {
        AppState::empty(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[test]
    fn in_memory_save_is_compare_and_swap() {
        let repo = InMemorySnapshotRepository::new();
        let first = repo.save(DEFAULT_SNAPSHOT_KEY, &empty_state(), None).unwrap();
        assert_eq!(first, 1);

        let stale = repo
            .save(DEFAULT_SNAPSHOT_KEY, &empty_state(), None)
            .unwrap_err();
        assert!(matches!(
            stale,
            RepoError::RevisionConflict {
                expected: None,
                actual: Some(1)
            }
        ));

        let second = repo
            .save(DEFAULT_SNAPSHOT_KEY, &empty_state(), Some(1))
            .unwrap();
        assert_eq!(second, 2);
    }

    #[test]
    fn decode_rejects_newer_format_version() {
        let payload = r#"{"version": 99, "state": {}}"#;
        let err = decode_snapshot(payload).unwrap_err();
        assert!(matches!(
            err,
            RepoError::UnsupportedSnapshotVersion { found: 99, .. }
        ));
    }
}
