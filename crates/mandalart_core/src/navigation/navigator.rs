//! Per-board navigation state.
//!
//! # Responsibility
//! - Track the root-to-current path while a user moves through one board.
//! - Resume at the user's last visited cell when it belongs to the board.
//! - Persist every move as the user's last visited cell.
//!
//! # Invariants
//! - The path always starts at the board root.
//! - Each path element is a direct child of the previous one.

use crate::model::board::{BoardId, Mandalart, UserId};
use crate::model::cell::{Cell, CellId};
use crate::navigation::padding::is_placeholder_key;
use crate::repo::cell_repo::CellRepository;
use crate::repo::visit_repo::{VisitRepoError, VisitRepository};
use crate::service::cell_service::{CellGrid, CellService, CellServiceError};
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Navigation failures.
#[derive(Debug)]
pub enum NavigatorError {
    /// Cell lookup or load failed.
    Cell(CellServiceError),
    /// Last-visit bookkeeping failed.
    Visit(VisitRepoError),
    /// `child_id` is not a direct child of the current cell.
    NotAChild { parent_id: CellId, child_id: CellId },
    /// Breadcrumb index past the end of the path.
    IndexOutOfRange { index: usize, len: usize },
    /// Slot key names a placeholder; there is no cell to enter.
    PlaceholderSlot(String),
    /// Slot key is neither a placeholder key nor a cell id.
    InvalidSlotKey(String),
}

impl Display for NavigatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cell(err) => write!(f, "{err}"),
            Self::Visit(err) => write!(f, "{err}"),
            Self::NotAChild {
                parent_id,
                child_id,
            } => write!(f, "cell {child_id} is not a child of {parent_id}"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "breadcrumb index {index} out of range for path of {len}")
            }
            Self::PlaceholderSlot(key) => write!(f, "slot `{key}` has no goal yet"),
            Self::InvalidSlotKey(key) => write!(f, "invalid slot key `{key}`"),
        }
    }
}

impl Error for NavigatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Cell(err) => Some(err),
            Self::Visit(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CellServiceError> for NavigatorError {
    fn from(value: CellServiceError) -> Self {
        Self::Cell(value)
    }
}

impl From<VisitRepoError> for NavigatorError {
    fn from(value: VisitRepoError) -> Self {
        Self::Visit(value)
    }
}

/// Current position of one user inside one board.
pub struct Navigator<C: CellRepository, V: VisitRepository> {
    cells: CellService<C>,
    visits: V,
    owner_id: UserId,
    board_id: BoardId,
    root: Cell,
    trail: Vec<Cell>,
}

impl<C: CellRepository, V: VisitRepository> Navigator<C, V> {
    /// Opens `board` at the last visited cell, or at its root.
    pub fn open(
        cells: CellService<C>,
        visits: V,
        owner_id: UserId,
        board: &Mandalart,
    ) -> Result<Self, NavigatorError> {
        let root = cells.get_cell(board.root_cell_id)?;
        let resumed = match visits.last_visited(owner_id)? {
            Some(cell_id) => resume_path(&cells, board.id, cell_id)?,
            None => Vec::new(),
        };

        let trail = match resumed.split_first() {
            Some((first, rest)) if first.id == root.id => rest.to_vec(),
            _ => Vec::new(),
        };
        let navigator = Self {
            cells,
            visits,
            owner_id,
            board_id: board.id,
            root,
            trail,
        };
        navigator.record_visit()?;
        debug!(
            "event=nav_open module=navigation status=ok board={} depth={}",
            navigator.board_id,
            navigator.trail.len()
        );
        Ok(navigator)
    }

    pub fn board_id(&self) -> BoardId {
        self.board_id
    }

    /// Service used for reads and writes on this board.
    pub fn cells(&self) -> &CellService<C> {
        &self.cells
    }

    pub fn current(&self) -> &Cell {
        self.trail.last().unwrap_or(&self.root)
    }

    /// Root-to-current path.
    pub fn path(&self) -> Vec<&Cell> {
        std::iter::once(&self.root).chain(self.trail.iter()).collect()
    }

    pub fn is_at_root(&self) -> bool {
        self.trail.is_empty()
    }

    /// Padded grid around the current cell.
    pub fn grid(&self) -> Result<CellGrid, NavigatorError> {
        self.cells.grid(self.current().id).map_err(Into::into)
    }

    /// Descends into a real child of the current cell.
    pub fn enter(&mut self, child_id: CellId) -> Result<&Cell, NavigatorError> {
        let parent_id = self.current().id;
        let (_, children) = self.cells.load_with_children(parent_id)?;
        let child = children
            .into_iter()
            .find(|child| child.id == child_id)
            .ok_or(NavigatorError::NotAChild {
                parent_id,
                child_id,
            })?;

        self.trail.push(child);
        self.record_visit()?;
        Ok(self.current())
    }

    /// Enters the grid slot identified by `key` as returned by `GridSlot::key`.
    pub fn enter_key(&mut self, key: &str) -> Result<&Cell, NavigatorError> {
        if is_placeholder_key(key) {
            return Err(NavigatorError::PlaceholderSlot(key.to_string()));
        }
        let child_id = Uuid::parse_str(key)
            .map_err(|_| NavigatorError::InvalidSlotKey(key.to_string()))?;
        self.enter(child_id)
    }

    /// Moves to the parent of the current cell. No-op at the root.
    pub fn go_up(&mut self) -> Result<&Cell, NavigatorError> {
        if self.trail.pop().is_some() {
            self.record_visit()?;
        }
        Ok(self.current())
    }

    /// Truncates the path so that breadcrumb `index` becomes current.
    pub fn jump_to(&mut self, index: usize) -> Result<&Cell, NavigatorError> {
        let len = self.trail.len() + 1;
        if index >= len {
            return Err(NavigatorError::IndexOutOfRange { index, len });
        }
        if index + 1 < len {
            self.trail.truncate(index);
            self.record_visit()?;
        }
        Ok(self.current())
    }

    /// Reloads every path cell from storage after edits.
    ///
    /// Cells deleted in the meantime cut the path at their parent.
    pub fn refresh(&mut self) -> Result<&Cell, NavigatorError> {
        self.root = self.cells.get_cell(self.root.id)?;
        let mut refreshed = Vec::with_capacity(self.trail.len());
        for cell in &self.trail {
            match self.cells.get_cell(cell.id) {
                Ok(fresh) => refreshed.push(fresh),
                Err(CellServiceError::CellNotFound(_)) => break,
                Err(err) => return Err(err.into()),
            }
        }
        let moved = refreshed.len() != self.trail.len();
        self.trail = refreshed;
        if moved {
            self.record_visit()?;
        }
        Ok(self.current())
    }

    fn record_visit(&self) -> Result<(), NavigatorError> {
        self.visits
            .record_visit(self.owner_id, self.current().id)
            .map_err(Into::into)
    }
}

fn resume_path<C: CellRepository>(
    cells: &CellService<C>,
    board_id: BoardId,
    cell_id: CellId,
) -> Result<Vec<Cell>, NavigatorError> {
    let cell = match cells.get_cell(cell_id) {
        Ok(cell) => cell,
        Err(CellServiceError::CellNotFound(_)) => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    if cell.board_id != board_id {
        return Ok(Vec::new());
    }

    match cells.breadcrumb(cell_id) {
        Ok(path) => Ok(path),
        Err(err @ CellServiceError::CycleDetected(_)) => {
            warn!("event=nav_open module=navigation status=fallback reason=broken_path error={err}");
            Ok(Vec::new())
        }
        Err(err) => Err(err.into()),
    }
}
