//! Persisted selection preference.
//!
//! # Responsibility
//! - Persist the "currently selected container" across reloads.
//! - Keep selection state an explicit context object, loaded once at
//!   startup and written on every change.
//!
//! # Invariants
//! - No reorder path touches the selection; only explicit selection changes
//!   write here.
//! - Read paths reject invalid persisted values instead of masking them.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::entity::EntityId;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Preference key for the currently selected domain.
pub const SELECTED_DOMAIN_KEY: &str = "selected_domain";

pub type PrefsResult<T> = Result<T, PrefsError>;

/// Errors from preference storage operations.
#[derive(Debug)]
pub enum PrefsError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted value cannot be parsed back.
    InvalidValue { key: String, value: String },
}

impl Display for PrefsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "preference storage requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidValue { key, value } => {
                write!(f, "invalid preference value `{value}` for key `{key}`")
            }
        }
    }
}

impl Error for PrefsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. } | Self::InvalidValue { .. } => None,
        }
    }
}

impl From<DbError> for PrefsError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PrefsError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage contract for string preferences.
pub trait SelectionStore {
    /// Loads one preference value.
    fn load(&self, key: &str) -> PrefsResult<Option<String>>;
    /// Saves one preference value, replacing any prior value.
    fn save(&self, key: &str, value: &str) -> PrefsResult<()>;
    /// Removes one preference value.
    fn clear(&self, key: &str) -> PrefsResult<()>;
}

/// SQLite-backed preference storage.
#[derive(Debug)]
pub struct SqliteSelectionStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSelectionStore<'conn> {
    /// Creates storage from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> PrefsResult<Self> {
        let expected_version = latest_version();
        let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version != expected_version {
            return Err(PrefsError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl SelectionStore for SqliteSelectionStore<'_> {
    fn load(&self, key: &str) -> PrefsResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn save(&self, key: &str, value: &str) -> PrefsResult<()> {
        self.conn.execute(
            "INSERT INTO preferences (key, value)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }

    fn clear(&self, key: &str) -> PrefsResult<()> {
        self.conn
            .execute("DELETE FROM preferences WHERE key = ?1;", [key])?;
        Ok(())
    }
}

/// Explicit selection state passed to views.
///
/// Loaded once at startup; every selection change writes through to the
/// store before updating the in-memory value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionContext {
    selected_domain: Option<EntityId>,
}

impl SelectionContext {
    /// Loads the persisted selection once at startup.
    pub fn load<S: SelectionStore>(prefs: &S) -> PrefsResult<Self> {
        let selected_domain = match prefs.load(SELECTED_DOMAIN_KEY)? {
            None => None,
            Some(value) => {
                Some(
                    Uuid::parse_str(&value).map_err(|_| PrefsError::InvalidValue {
                        key: SELECTED_DOMAIN_KEY.to_string(),
                        value,
                    })?,
                )
            }
        };
        Ok(Self { selected_domain })
    }

    /// Currently selected domain, if any.
    pub fn selected_domain(&self) -> Option<EntityId> {
        self.selected_domain
    }

    /// Selects one domain and persists the choice.
    pub fn select_domain<S: SelectionStore>(
        &mut self,
        prefs: &S,
        domain_id: EntityId,
    ) -> PrefsResult<()> {
        prefs.save(SELECTED_DOMAIN_KEY, &domain_id.to_string())?;
        self.selected_domain = Some(domain_id);
        Ok(())
    }

    /// Clears the selection and removes the persisted value.
    pub fn clear_selection<S: SelectionStore>(&mut self, prefs: &S) -> PrefsResult<()> {
        prefs.clear(SELECTED_DOMAIN_KEY)?;
        self.selected_domain = None;
        Ok(())
    }
}
