//! Last-visited cell persistence.
//!
//! One row per user; recording a visit replaces the previous one. Deleting
//! the visited cell (or its board) clears the row through FK cascade.

use crate::db::DbError;
use crate::model::board::UserId;
use crate::model::cell::CellId;
use crate::repo::{ensure_connection_ready, parse_uuid_column, SchemaError};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type VisitRepoResult<T> = Result<T, VisitRepoError>;

#[derive(Debug)]
pub enum VisitRepoError {
    Db(DbError),
    Schema(SchemaError),
    InvalidData(String),
}

impl Display for VisitRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Schema(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid visit data: {message}"),
        }
    }
}

impl Error for VisitRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Schema(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<rusqlite::Error> for VisitRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage for the most recently visited cell per user.
pub trait VisitRepository {
    fn record_visit(&self, owner_id: UserId, cell_id: CellId) -> VisitRepoResult<()>;
    fn last_visited(&self, owner_id: UserId) -> VisitRepoResult<Option<CellId>>;
}

pub struct SqliteVisitRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVisitRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> VisitRepoResult<Self> {
        ensure_connection_ready(conn, "recent_visits", &["owner_uuid", "cell_uuid", "visited_at"])?
            .map_err(VisitRepoError::Schema)?;
        Ok(Self { conn })
    }
}

impl VisitRepository for SqliteVisitRepository<'_> {
    fn record_visit(&self, owner_id: UserId, cell_id: CellId) -> VisitRepoResult<()> {
        self.conn.execute(
            "INSERT INTO recent_visits (owner_uuid, cell_uuid)
             VALUES (?1, ?2)
             ON CONFLICT (owner_uuid) DO UPDATE SET
                cell_uuid = excluded.cell_uuid,
                visited_at = (strftime('%s', 'now') * 1000);",
            params![owner_id.to_string(), cell_id.to_string()],
        )?;
        Ok(())
    }

    fn last_visited(&self, owner_id: UserId) -> VisitRepoResult<Option<CellId>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT cell_uuid FROM recent_visits WHERE owner_uuid = ?1;",
                [owner_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|text| parse_uuid_column(&text, "recent_visits.cell_uuid"))
            .transpose()
            .map_err(VisitRepoError::InvalidData)
    }
}
