//! Board repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Create boards together with their root cell.
//! - List, rename and delete boards for one owner.
//!
//! # Invariants
//! - A board row and its root cell row are written in one transaction.
//! - Deleting a board removes every cell of the board (FK cascade).
//! - Listing is deterministic: `updated_at DESC, board_uuid ASC`.

use crate::db::DbError;
use crate::model::board::{BoardId, Mandalart, UserId};
use crate::model::cell::{Cell, CellId};
use crate::repo::cell_repo::insert_cell_row;
use crate::repo::{ensure_connection_ready, parse_uuid_column, SchemaError};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const BOARD_SELECT_SQL: &str = "SELECT
    board_uuid,
    owner_uuid,
    title,
    root_cell_uuid,
    created_at,
    updated_at
FROM boards";

const BOARD_COLUMNS: &[&str] = &[
    "board_uuid",
    "owner_uuid",
    "title",
    "root_cell_uuid",
    "created_at",
    "updated_at",
];

pub type BoardRepoResult<T> = Result<T, BoardRepoError>;

/// Errors from board repository operations.
#[derive(Debug)]
pub enum BoardRepoError {
    Db(DbError),
    BoardNotFound(BoardId),
    Schema(SchemaError),
    InvalidData(String),
}

impl Display for BoardRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::BoardNotFound(id) => write!(f, "board not found: {id}"),
            Self::Schema(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid board data: {message}"),
        }
    }
}

impl Error for BoardRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Schema(err) => Some(err),
            Self::BoardNotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for BoardRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for BoardRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for board operations.
pub trait BoardRepository {
    /// Creates one board and its root cell. Returns both stored records.
    fn create_board(
        &self,
        owner_id: UserId,
        title: &str,
        root_topic: &str,
    ) -> BoardRepoResult<(Mandalart, Cell)>;
    /// Loads one board by id.
    fn get_board(&self, board_id: BoardId) -> BoardRepoResult<Option<Mandalart>>;
    /// Lists boards of one owner, most recently updated first.
    fn list_boards(&self, owner_id: UserId) -> BoardRepoResult<Vec<Mandalart>>;
    /// Renames one board.
    fn rename_board(&self, board_id: BoardId, title: &str) -> BoardRepoResult<()>;
    /// Deletes one board and all of its cells. Returns the removed cell ids.
    fn delete_board(&self, board_id: BoardId) -> BoardRepoResult<Vec<CellId>>;
}

/// SQLite-backed board repository.
pub struct SqliteBoardRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBoardRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> BoardRepoResult<Self> {
        ensure_connection_ready(conn, "boards", BOARD_COLUMNS)?.map_err(BoardRepoError::Schema)?;
        Ok(Self { conn })
    }
}

impl BoardRepository for SqliteBoardRepository<'_> {
    fn create_board(
        &self,
        owner_id: UserId,
        title: &str,
        root_topic: &str,
    ) -> BoardRepoResult<(Mandalart, Cell)> {
        let board_id = Uuid::new_v4();
        let root = Cell::new_root(board_id, root_topic);

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO boards (
                board_uuid,
                owner_uuid,
                title,
                root_cell_uuid
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                board_id.to_string(),
                owner_id.to_string(),
                title,
                root.id.to_string(),
            ],
        )?;
        insert_cell_row(&tx, &root)?;

        let board = load_board(&tx, board_id)?.ok_or(BoardRepoError::BoardNotFound(board_id))?;
        let (created_at, updated_at): (i64, i64) = tx.query_row(
            "SELECT created_at, updated_at FROM cells WHERE cell_uuid = ?1;",
            [root.id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        tx.commit()?;

        Ok((
            board,
            Cell {
                created_at,
                updated_at,
                ..root
            },
        ))
    }

    fn get_board(&self, board_id: BoardId) -> BoardRepoResult<Option<Mandalart>> {
        load_board(self.conn, board_id)
    }

    fn list_boards(&self, owner_id: UserId) -> BoardRepoResult<Vec<Mandalart>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BOARD_SELECT_SQL}
             WHERE owner_uuid = ?1
             ORDER BY updated_at DESC, board_uuid ASC;"
        ))?;
        let mut rows = stmt.query([owner_id.to_string()])?;
        let mut boards = Vec::new();
        while let Some(row) = rows.next()? {
            boards.push(parse_board_row(row)?);
        }
        Ok(boards)
    }

    fn rename_board(&self, board_id: BoardId, title: &str) -> BoardRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE boards
             SET title = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE board_uuid = ?1;",
            params![board_id.to_string(), title],
        )?;
        if changed == 0 {
            return Err(BoardRepoError::BoardNotFound(board_id));
        }
        Ok(())
    }

    fn delete_board(&self, board_id: BoardId) -> BoardRepoResult<Vec<CellId>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let cell_ids = {
            let mut stmt = tx.prepare("SELECT cell_uuid FROM cells WHERE board_uuid = ?1;")?;
            let mut rows = stmt.query([board_id.to_string()])?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                let text: String = row.get(0)?;
                ids.push(
                    parse_uuid_column(&text, "cells.cell_uuid")
                        .map_err(BoardRepoError::InvalidData)?,
                );
            }
            ids
        };
        let changed = tx.execute(
            "DELETE FROM boards WHERE board_uuid = ?1;",
            [board_id.to_string()],
        )?;
        if changed == 0 {
            return Err(BoardRepoError::BoardNotFound(board_id));
        }
        tx.commit()?;
        Ok(cell_ids)
    }
}

fn load_board(conn: &Connection, board_id: BoardId) -> BoardRepoResult<Option<Mandalart>> {
    let mut stmt = conn.prepare(&format!("{BOARD_SELECT_SQL} WHERE board_uuid = ?1;"))?;
    let mut rows = stmt.query([board_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_board_row(row)?));
    }
    Ok(None)
}

fn parse_board_row(row: &Row<'_>) -> BoardRepoResult<Mandalart> {
    let parse = |column: &'static str, qualified: &'static str| -> BoardRepoResult<Uuid> {
        let text: String = row.get(column)?;
        parse_uuid_column(&text, qualified).map_err(BoardRepoError::InvalidData)
    };

    Ok(Mandalart {
        id: parse("board_uuid", "boards.board_uuid")?,
        owner_id: parse("owner_uuid", "boards.owner_uuid")?,
        root_cell_id: parse("root_cell_uuid", "boards.root_cell_uuid")?,
        title: row.get("title")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
