//! Cell use-case service.
//!
//! # Responsibility
//! - Serve cell views (cell + children, padded grid, breadcrumb, progress).
//! - Apply content, completion, upsert and delete writes.
//! - Keep the optional shared `CellCache` coherent with writes.
//!
//! # Invariants
//! - Reads consult the cache first and fill it on a miss.
//! - Every write invalidates the written cell and its parent.
//! - Positions outside `0..CELL_FAN_OUT` are rejected before storage.

use crate::cache::cell_cache::CellCache;
use crate::model::board::BoardId;
use crate::model::cell::{Cell, CellContent, CellId, CellValidationError, CELL_FAN_OUT};
use crate::navigation::padding::{pad_children, GridSlot};
use crate::navigation::tree::{resolve_path_or_root, CellNode, Progress, TreeBuildError};
use crate::repo::cell_repo::{CellRepoError, CellRepository};
use log::{debug, info};
use serde::Serialize;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Errors from cell service operations.
#[derive(Debug)]
pub enum CellServiceError {
    /// Target cell does not exist.
    CellNotFound(CellId),
    /// Parent cell does not exist.
    ParentNotFound(CellId),
    /// Requested slot is outside the grid.
    PositionOutOfRange(u8),
    /// Slot is already taken by another child.
    PositionOccupied { parent_id: CellId, position: u8 },
    /// Board root cells are only removed with their board.
    RootCellNotDeletable(CellId),
    /// Content failed per-record validation.
    Validation(CellValidationError),
    /// Parent links of the stored tree loop back on themselves.
    CycleDetected(CellId),
    /// Stored board cells do not form a valid tree.
    Tree(TreeBuildError),
    /// Repository-level failure.
    Repo(CellRepoError),
}

impl Display for CellServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CellNotFound(id) => write!(f, "cell not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent cell not found: {id}"),
            Self::PositionOutOfRange(position) => write!(
                f,
                "cell position {position} is out of range 0..{CELL_FAN_OUT}"
            ),
            Self::PositionOccupied {
                parent_id,
                position,
            } => write!(
                f,
                "position {position} under cell {parent_id} is already occupied"
            ),
            Self::RootCellNotDeletable(id) => write!(f, "root cell cannot be deleted: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::CycleDetected(id) => write!(f, "parent cycle detected at cell {id}"),
            Self::Tree(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CellServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Tree(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CellRepoError> for CellServiceError {
    fn from(value: CellRepoError) -> Self {
        match value {
            CellRepoError::CellNotFound(id) => Self::CellNotFound(id),
            CellRepoError::ParentNotFound(id) => Self::ParentNotFound(id),
            CellRepoError::PositionOccupied {
                parent_id,
                position,
            } => Self::PositionOccupied {
                parent_id,
                position,
            },
            CellRepoError::RootCellNotDeletable(id) => Self::RootCellNotDeletable(id),
            CellRepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<TreeBuildError> for CellServiceError {
    fn from(value: TreeBuildError) -> Self {
        Self::Tree(value)
    }
}

/// Centre cell plus its eight padded slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellGrid {
    pub centre: Cell,
    pub slots: Vec<GridSlot>,
}

impl CellGrid {
    /// Real children shown in the grid.
    pub fn filled(&self) -> impl Iterator<Item = &Cell> {
        self.slots.iter().filter_map(GridSlot::cell)
    }
}

/// Cell service facade.
pub struct CellService<R: CellRepository> {
    repo: R,
    cache: Option<Arc<CellCache>>,
}

impl<R: CellRepository> CellService<R> {
    /// Creates an uncached service.
    pub fn new(repo: R) -> Self {
        Self { repo, cache: None }
    }

    /// Creates a service that reads through and invalidates `cache`.
    pub fn with_cache(repo: R, cache: Arc<CellCache>) -> Self {
        Self {
            repo,
            cache: Some(cache),
        }
    }

    pub fn cache(&self) -> Option<&Arc<CellCache>> {
        self.cache.as_ref()
    }

    pub fn get_cell(&self, cell_id: CellId) -> Result<Cell, CellServiceError> {
        if let Some((cell, _)) = self.cache.as_ref().and_then(|cache| cache.get(cell_id)) {
            return Ok(cell);
        }
        self.repo
            .get_cell(cell_id)?
            .ok_or(CellServiceError::CellNotFound(cell_id))
    }

    /// Loads one cell with its direct children, ordered by position.
    pub fn load_with_children(
        &self,
        cell_id: CellId,
    ) -> Result<(Cell, Vec<Cell>), CellServiceError> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(cell_id) {
                debug!("event=cell_load module=service status=cache_hit cell={cell_id}");
                return Ok(hit);
            }
        }

        let cell = self
            .repo
            .get_cell(cell_id)?
            .ok_or(CellServiceError::CellNotFound(cell_id))?;
        let children = self.repo.list_children(cell_id)?;
        if let Some(cache) = &self.cache {
            cache.set(cell_id, cell.clone(), children.clone());
        }
        Ok((cell, children))
    }

    /// Builds the 3x3 grid view around `cell_id`.
    pub fn grid(&self, cell_id: CellId) -> Result<CellGrid, CellServiceError> {
        let (centre, children) = self.load_with_children(cell_id)?;
        let slots = pad_children(Some(centre.id), centre.depth, children);
        Ok(CellGrid { centre, slots })
    }

    /// Root-to-cell path, walking parent links upward from `cell_id`.
    pub fn breadcrumb(&self, cell_id: CellId) -> Result<Vec<Cell>, CellServiceError> {
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        let mut cursor = Some(cell_id);

        while let Some(current) = cursor {
            if !visited.insert(current) {
                return Err(CellServiceError::CycleDetected(current));
            }
            let cell = match self.get_cell(current) {
                Ok(cell) => cell,
                Err(CellServiceError::CellNotFound(id)) if id != cell_id => {
                    return Err(CellServiceError::ParentNotFound(id));
                }
                Err(err) => return Err(err),
            };
            cursor = cell.parent_id;
            path.push(cell);
        }

        path.reverse();
        Ok(path)
    }

    /// Assembles every cell of `board_id` into a checked tree.
    pub fn board_tree(&self, board_id: BoardId) -> Result<CellNode, CellServiceError> {
        let cells = self.repo.list_board_cells(board_id)?;
        CellNode::build(cells).map_err(Into::into)
    }

    /// Root-to-target path found by searching the whole board tree.
    ///
    /// Falls back to the root alone when `target` is not on the board.
    pub fn resolve_path(
        &self,
        board_id: BoardId,
        target: CellId,
    ) -> Result<Vec<Cell>, CellServiceError> {
        let tree = self.board_tree(board_id)?;
        Ok(resolve_path_or_root(&tree, target)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Completion counts below `cell_id`.
    pub fn progress(&self, board_id: BoardId, cell_id: CellId) -> Result<Progress, CellServiceError> {
        let tree = self.board_tree(board_id)?;
        tree.find(cell_id)
            .map(CellNode::progress)
            .ok_or(CellServiceError::CellNotFound(cell_id))
    }

    /// Replaces topic, memo and color of one cell.
    pub fn update_content(
        &self,
        cell_id: CellId,
        content: CellContent,
    ) -> Result<Cell, CellServiceError> {
        let stored = self.repo.update_content(cell_id, &content.normalized())?;
        self.invalidate(&stored);
        info!("event=cell_update module=service status=ok cell={cell_id}");
        Ok(stored)
    }

    pub fn set_completed(
        &self,
        cell_id: CellId,
        is_completed: bool,
    ) -> Result<Cell, CellServiceError> {
        let stored = self.repo.set_completed(cell_id, is_completed)?;
        self.invalidate(&stored);
        info!(
            "event=cell_complete module=service status=ok cell={cell_id} completed={is_completed}"
        );
        Ok(stored)
    }

    /// Flips the completion flag and returns the stored cell.
    pub fn toggle_completion(&self, cell_id: CellId) -> Result<Cell, CellServiceError> {
        let current = self
            .repo
            .get_cell(cell_id)?
            .ok_or(CellServiceError::CellNotFound(cell_id))?;
        self.set_completed(cell_id, !current.is_completed)
    }

    /// Writes `content` into slot `position` of `parent_id`.
    ///
    /// Fills the slot when it only shows a placeholder; otherwise updates the
    /// child already there.
    pub fn upsert_child(
        &self,
        parent_id: CellId,
        position: u8,
        content: CellContent,
    ) -> Result<Cell, CellServiceError> {
        if usize::from(position) >= CELL_FAN_OUT {
            return Err(CellServiceError::PositionOutOfRange(position));
        }
        let stored = self
            .repo
            .upsert_child(parent_id, position, &content.normalized())?;
        self.invalidate(&stored);
        info!(
            "event=cell_upsert module=service status=ok parent={parent_id} position={position} cell={}",
            stored.id
        );
        Ok(stored)
    }

    /// Deletes one non-root cell and its subtree. Returns removed count.
    pub fn delete_cell(&self, cell_id: CellId) -> Result<usize, CellServiceError> {
        let cell = self
            .repo
            .get_cell(cell_id)?
            .ok_or(CellServiceError::CellNotFound(cell_id))?;
        if cell.is_root() {
            return Err(CellServiceError::RootCellNotDeletable(cell_id));
        }

        let descendants = match &self.cache {
            Some(_) => self.subtree_ids(&cell)?,
            None => Vec::new(),
        };
        let removed = self.repo.delete_subtree(cell_id)?;

        self.invalidate(&cell);
        if let Some(cache) = &self.cache {
            for id in descendants {
                cache.remove(id);
            }
        }
        info!("event=cell_delete module=service status=ok cell={cell_id} removed={removed}");
        Ok(removed)
    }

    fn subtree_ids(&self, cell: &Cell) -> Result<Vec<CellId>, CellServiceError> {
        let tree = self.board_tree(cell.board_id)?;
        let mut ids = Vec::new();
        if let Some(node) = tree.find(cell.id) {
            collect_ids(node, &mut ids);
        }
        Ok(ids)
    }

    fn invalidate(&self, cell: &Cell) {
        if let Some(cache) = &self.cache {
            cache.remove(cell.id);
            if let Some(parent_id) = cell.parent_id {
                cache.remove(parent_id);
            }
        }
    }
}

fn collect_ids(node: &CellNode, ids: &mut Vec<CellId>) {
    ids.push(node.cell.id);
    for child in &node.children {
        collect_ids(child, ids);
    }
}
