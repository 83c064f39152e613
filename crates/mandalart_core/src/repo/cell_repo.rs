//! Cell repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide persistence APIs for the goal-cell tree of each board.
//! - Keep SQL details and ordering behavior inside repository boundary.
//!
//! # Invariants
//! - Child listing is deterministic: `position ASC`.
//! - Inserted children get `depth = parent.depth + 1` and the parent's board.
//! - At most one child per `(parent, position)`; positions are `0..8`.
//! - Every write bumps the owning board's `updated_at`.

use crate::db::DbError;
use crate::model::board::BoardId;
use crate::model::cell::{Cell, CellContent, CellId, CellValidationError};
use crate::repo::{
    bool_to_int, ensure_connection_ready, int_to_bool, parse_uuid_column, SchemaError,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CELL_SELECT_SQL: &str = "SELECT
    cell_uuid,
    board_uuid,
    parent_uuid,
    depth,
    position,
    topic,
    memo,
    color,
    is_completed,
    created_at,
    updated_at
FROM cells";

const CELL_COLUMNS: &[&str] = &[
    "cell_uuid",
    "board_uuid",
    "parent_uuid",
    "depth",
    "position",
    "topic",
    "memo",
    "color",
    "is_completed",
    "created_at",
    "updated_at",
];

/// Result type used by cell repository operations.
pub type CellRepoResult<T> = Result<T, CellRepoError>;

/// Errors from cell repository operations.
#[derive(Debug)]
pub enum CellRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Record violates per-cell invariants.
    Validation(CellValidationError),
    /// Target cell does not exist.
    CellNotFound(CellId),
    /// Parent cell does not exist.
    ParentNotFound(CellId),
    /// Another child already occupies the slot.
    PositionOccupied { parent_id: CellId, position: u8 },
    /// Root cells can only be removed together with their board.
    RootCellNotDeletable(CellId),
    /// Child insertion was given a cell without parent.
    MissingParent(CellId),
    /// Child record disagrees with its parent (depth or board).
    InconsistentChild { cell_id: CellId, parent_id: CellId },
    /// Connection is not ready for cell queries.
    Schema(SchemaError),
    /// Persisted data cannot be converted to a valid cell.
    InvalidData(String),
}

impl Display for CellRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::CellNotFound(id) => write!(f, "cell not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent cell not found: {id}"),
            Self::PositionOccupied {
                parent_id,
                position,
            } => write!(f, "position {position} under cell {parent_id} is occupied"),
            Self::RootCellNotDeletable(id) => {
                write!(f, "root cell {id} can only be deleted with its board")
            }
            Self::MissingParent(id) => write!(f, "cell {id} has no parent to insert under"),
            Self::InconsistentChild { cell_id, parent_id } => write!(
                f,
                "cell {cell_id} does not match depth/board of parent {parent_id}"
            ),
            Self::Schema(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid cell data: {message}"),
        }
    }
}

impl Error for CellRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Schema(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for CellRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CellRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<CellValidationError> for CellRepoError {
    fn from(value: CellValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Repository interface for goal-cell operations.
pub trait CellRepository {
    /// Loads one cell by id.
    fn get_cell(&self, cell_id: CellId) -> CellRepoResult<Option<Cell>>;
    /// Lists direct children of one cell ordered by position.
    fn list_children(&self, parent_id: CellId) -> CellRepoResult<Vec<Cell>>;
    /// Lists every cell of one board ordered by depth, then position.
    fn list_board_cells(&self, board_id: BoardId) -> CellRepoResult<Vec<Cell>>;
    /// Inserts a new child cell into a free slot.
    fn insert_child(&self, cell: &Cell) -> CellRepoResult<Cell>;
    /// Replaces topic/memo/color of one cell.
    fn update_content(&self, cell_id: CellId, content: &CellContent) -> CellRepoResult<Cell>;
    /// Sets completion flag of one cell.
    fn set_completed(&self, cell_id: CellId, is_completed: bool) -> CellRepoResult<Cell>;
    /// Writes content into the slot `position` under `parent_id`, creating the
    /// child when the slot is empty.
    fn upsert_child(
        &self,
        parent_id: CellId,
        position: u8,
        content: &CellContent,
    ) -> CellRepoResult<Cell>;
    /// Deletes one non-root cell and its whole subtree. Returns removed count.
    fn delete_subtree(&self, cell_id: CellId) -> CellRepoResult<usize>;
}

/// SQLite-backed cell repository.
pub struct SqliteCellRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCellRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> CellRepoResult<Self> {
        ensure_connection_ready(conn, "cells", CELL_COLUMNS)?.map_err(CellRepoError::Schema)?;
        Ok(Self { conn })
    }
}

impl CellRepository for SqliteCellRepository<'_> {
    fn get_cell(&self, cell_id: CellId) -> CellRepoResult<Option<Cell>> {
        load_cell(self.conn, cell_id)
    }

    fn list_children(&self, parent_id: CellId) -> CellRepoResult<Vec<Cell>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CELL_SELECT_SQL}
             WHERE parent_uuid = ?1
             ORDER BY position ASC;"
        ))?;
        let mut rows = stmt.query([parent_id.to_string()])?;
        let mut cells = Vec::new();
        while let Some(row) = rows.next()? {
            cells.push(parse_cell_row(row)?);
        }
        Ok(cells)
    }

    fn list_board_cells(&self, board_id: BoardId) -> CellRepoResult<Vec<Cell>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CELL_SELECT_SQL}
             WHERE board_uuid = ?1
             ORDER BY depth ASC, position ASC, cell_uuid ASC;"
        ))?;
        let mut rows = stmt.query([board_id.to_string()])?;
        let mut cells = Vec::new();
        while let Some(row) = rows.next()? {
            cells.push(parse_cell_row(row)?);
        }
        Ok(cells)
    }

    fn insert_child(&self, cell: &Cell) -> CellRepoResult<Cell> {
        cell.validate()?;
        let parent_id = cell.parent_id.ok_or(CellRepoError::MissingParent(cell.id))?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let parent = load_cell(&tx, parent_id)?.ok_or(CellRepoError::ParentNotFound(parent_id))?;
        if parent.board_id != cell.board_id || parent.depth + 1 != cell.depth {
            return Err(CellRepoError::InconsistentChild {
                cell_id: cell.id,
                parent_id,
            });
        }
        if child_at(&tx, parent_id, cell.position)?.is_some() {
            return Err(CellRepoError::PositionOccupied {
                parent_id,
                position: cell.position,
            });
        }

        insert_cell_row(&tx, cell)?;
        touch_board(&tx, cell.board_id)?;
        let stored = load_required_cell(&tx, cell.id)?;
        tx.commit()?;
        Ok(stored)
    }

    fn update_content(&self, cell_id: CellId, content: &CellContent) -> CellRepoResult<Cell> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut cell = load_required_cell(&tx, cell_id)?;
        content.apply_to(&mut cell);
        cell.validate()?;

        tx.execute(
            "UPDATE cells
             SET topic = ?2,
                 memo = ?3,
                 color = ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE cell_uuid = ?1;",
            params![
                cell_id.to_string(),
                cell.topic.as_str(),
                cell.memo.as_deref(),
                cell.color.as_deref(),
            ],
        )?;
        touch_board(&tx, cell.board_id)?;
        let stored = load_required_cell(&tx, cell_id)?;
        tx.commit()?;
        Ok(stored)
    }

    fn set_completed(&self, cell_id: CellId, is_completed: bool) -> CellRepoResult<Cell> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let cell = load_required_cell(&tx, cell_id)?;
        tx.execute(
            "UPDATE cells
             SET is_completed = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE cell_uuid = ?1;",
            params![cell_id.to_string(), bool_to_int(is_completed)],
        )?;
        touch_board(&tx, cell.board_id)?;
        let stored = load_required_cell(&tx, cell_id)?;
        tx.commit()?;
        Ok(stored)
    }

    fn upsert_child(
        &self,
        parent_id: CellId,
        position: u8,
        content: &CellContent,
    ) -> CellRepoResult<Cell> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let parent = load_cell(&tx, parent_id)?.ok_or(CellRepoError::ParentNotFound(parent_id))?;

        let stored = match child_at(&tx, parent_id, position)? {
            Some(mut existing) => {
                content.apply_to(&mut existing);
                existing.validate()?;
                tx.execute(
                    "UPDATE cells
                     SET topic = ?2,
                         memo = ?3,
                         color = ?4,
                         updated_at = (strftime('%s', 'now') * 1000)
                     WHERE cell_uuid = ?1;",
                    params![
                        existing.id.to_string(),
                        existing.topic.as_str(),
                        existing.memo.as_deref(),
                        existing.color.as_deref(),
                    ],
                )?;
                load_required_cell(&tx, existing.id)?
            }
            None => {
                let mut cell = Cell::new_child(&parent, position, String::new());
                content.apply_to(&mut cell);
                cell.validate()?;
                insert_cell_row(&tx, &cell)?;
                load_required_cell(&tx, cell.id)?
            }
        };

        touch_board(&tx, parent.board_id)?;
        tx.commit()?;
        Ok(stored)
    }

    fn delete_subtree(&self, cell_id: CellId) -> CellRepoResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let cell = load_required_cell(&tx, cell_id)?;
        if cell.is_root() {
            return Err(CellRepoError::RootCellNotDeletable(cell_id));
        }

        let subtree_size: i64 = tx.query_row(
            "WITH RECURSIVE subtree(cell_uuid) AS (
                SELECT cell_uuid FROM cells WHERE cell_uuid = ?1
                UNION ALL
                SELECT child.cell_uuid
                FROM cells child
                INNER JOIN subtree parent ON child.parent_uuid = parent.cell_uuid
            )
            SELECT COUNT(*) FROM subtree;",
            [cell_id.to_string()],
            |row| row.get(0),
        )?;

        // Descendants go through ON DELETE CASCADE.
        tx.execute(
            "DELETE FROM cells WHERE cell_uuid = ?1;",
            [cell_id.to_string()],
        )?;
        touch_board(&tx, cell.board_id)?;
        tx.commit()?;
        Ok(subtree_size as usize)
    }
}

pub(crate) fn insert_cell_row(conn: &Connection, cell: &Cell) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO cells (
            cell_uuid,
            board_uuid,
            parent_uuid,
            depth,
            position,
            topic,
            memo,
            color,
            is_completed
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        params![
            cell.id.to_string(),
            cell.board_id.to_string(),
            cell.parent_id.map(|value| value.to_string()),
            i64::from(cell.depth),
            i64::from(cell.position),
            cell.topic.as_str(),
            cell.memo.as_deref(),
            cell.color.as_deref(),
            bool_to_int(cell.is_completed),
        ],
    )?;
    Ok(())
}

pub(crate) fn load_cell(conn: &Connection, cell_id: CellId) -> CellRepoResult<Option<Cell>> {
    let mut stmt = conn.prepare(&format!("{CELL_SELECT_SQL} WHERE cell_uuid = ?1;"))?;
    let mut rows = stmt.query([cell_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_cell_row(row)?));
    }
    Ok(None)
}

fn load_required_cell(conn: &Connection, cell_id: CellId) -> CellRepoResult<Cell> {
    load_cell(conn, cell_id)?.ok_or(CellRepoError::CellNotFound(cell_id))
}

fn child_at(conn: &Connection, parent_id: CellId, position: u8) -> CellRepoResult<Option<Cell>> {
    let child_id: Option<String> = conn
        .query_row(
            "SELECT cell_uuid
             FROM cells
             WHERE parent_uuid = ?1
               AND position = ?2;",
            params![parent_id.to_string(), i64::from(position)],
            |row| row.get(0),
        )
        .optional()?;

    match child_id {
        Some(value) => {
            let id = parse_uuid_column(&value, "cells.cell_uuid")
                .map_err(CellRepoError::InvalidData)?;
            load_cell(conn, id)
        }
        None => Ok(None),
    }
}

fn touch_board(conn: &Connection, board_id: BoardId) -> CellRepoResult<()> {
    conn.execute(
        "UPDATE boards
         SET updated_at = (strftime('%s', 'now') * 1000)
         WHERE board_uuid = ?1;",
        [board_id.to_string()],
    )?;
    Ok(())
}

fn parse_cell_row(row: &Row<'_>) -> CellRepoResult<Cell> {
    let id_text: String = row.get("cell_uuid")?;
    let id = parse_uuid_column(&id_text, "cells.cell_uuid").map_err(CellRepoError::InvalidData)?;

    let board_text: String = row.get("board_uuid")?;
    let board_id =
        parse_uuid_column(&board_text, "cells.board_uuid").map_err(CellRepoError::InvalidData)?;

    let parent_id = row
        .get::<_, Option<String>>("parent_uuid")?
        .map(|value| parse_uuid_column(&value, "cells.parent_uuid"))
        .transpose()
        .map_err(CellRepoError::InvalidData)?;

    let depth_raw: i64 = row.get("depth")?;
    let depth = u32::try_from(depth_raw).map_err(|_| {
        CellRepoError::InvalidData(format!("invalid depth `{depth_raw}` in cells.depth"))
    })?;

    let position_raw: i64 = row.get("position")?;
    let position = u8::try_from(position_raw).map_err(|_| {
        CellRepoError::InvalidData(format!(
            "invalid position `{position_raw}` in cells.position"
        ))
    })?;

    let is_completed = int_to_bool(row.get("is_completed")?, "cells.is_completed")
        .map_err(CellRepoError::InvalidData)?;

    let cell = Cell {
        id,
        board_id,
        parent_id,
        depth,
        position,
        topic: row.get("topic")?,
        memo: row.get("memo")?,
        color: row.get("color")?,
        is_completed,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    cell.validate()
        .map_err(|err| CellRepoError::InvalidData(format!("cell {id}: {err}")))?;
    Ok(cell)
}
