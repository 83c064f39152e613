//! Board use-case service.
//!
//! # Responsibility
//! - Create, list, rename and delete mandalart boards.
//! - Normalize titles and centre topics before they reach storage.
//!
//! # Invariants
//! - Every board is created together with its root cell.
//! - Board list order is `updated_at DESC, board_uuid ASC`.
//! - Deleting a board evicts every one of its cells from the shared cache.

use crate::auth::validation::{normalize_board_title, ValidationError};
use crate::cache::cell_cache::CellCache;
use crate::model::board::{BoardId, Mandalart, UserId};
use crate::model::cell::{Cell, MAX_TOPIC_CHARS};
use crate::repo::board_repo::{BoardRepoError, BoardRepository};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Errors from board service operations.
#[derive(Debug)]
pub enum BoardServiceError {
    /// Title or centre topic failed form validation.
    Validation(ValidationError),
    /// Centre topic is longer than a cell topic may be.
    TopicTooLong { max_chars: usize },
    /// Target board does not exist.
    BoardNotFound(BoardId),
    /// Repository-level failure.
    Repo(BoardRepoError),
}

impl Display for BoardServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TopicTooLong { max_chars } => {
                write!(f, "centre topic exceeds {max_chars} characters")
            }
            Self::BoardNotFound(id) => write!(f, "board not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BoardServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BoardRepoError> for BoardServiceError {
    fn from(value: BoardRepoError) -> Self {
        match value {
            BoardRepoError::BoardNotFound(board_id) => Self::BoardNotFound(board_id),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for BoardServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Board service facade.
pub struct BoardService<R: BoardRepository> {
    repo: R,
    cache: Option<Arc<CellCache>>,
}

impl<R: BoardRepository> BoardService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo, cache: None }
    }

    /// Creates service that keeps `cache` consistent with board deletes.
    pub fn with_cache(repo: R, cache: Arc<CellCache>) -> Self {
        Self {
            repo,
            cache: Some(cache),
        }
    }

    /// Creates a board with its root cell.
    ///
    /// The root topic defaults to the title when `centre_topic` is `None`
    /// or blank.
    pub fn create_board(
        &self,
        owner_id: UserId,
        title: &str,
        centre_topic: Option<&str>,
    ) -> Result<(Mandalart, Cell), BoardServiceError> {
        let title = normalize_board_title(title)?;
        let root_topic = centre_topic
            .map(str::trim)
            .filter(|topic| !topic.is_empty())
            .unwrap_or(title.as_str())
            .to_string();
        if root_topic.chars().count() > MAX_TOPIC_CHARS {
            return Err(BoardServiceError::TopicTooLong {
                max_chars: MAX_TOPIC_CHARS,
            });
        }

        let (board, root) = self.repo.create_board(owner_id, &title, &root_topic)?;
        info!(
            "event=board_create module=service status=ok board={} root={}",
            board.id, root.id
        );
        Ok((board, root))
    }

    pub fn get_board(&self, board_id: BoardId) -> Result<Mandalart, BoardServiceError> {
        self.repo
            .get_board(board_id)?
            .ok_or(BoardServiceError::BoardNotFound(board_id))
    }

    /// Lists boards of `owner_id`, most recently updated first.
    pub fn list_boards(&self, owner_id: UserId) -> Result<Vec<Mandalart>, BoardServiceError> {
        self.repo.list_boards(owner_id).map_err(Into::into)
    }

    /// Renames one board and returns the stored record.
    pub fn rename_board(
        &self,
        board_id: BoardId,
        title: &str,
    ) -> Result<Mandalart, BoardServiceError> {
        let title = normalize_board_title(title)?;
        self.repo.rename_board(board_id, &title)?;
        info!("event=board_rename module=service status=ok board={board_id}");
        self.get_board(board_id)
    }

    /// Deletes one board together with every cell of it.
    pub fn delete_board(&self, board_id: BoardId) -> Result<(), BoardServiceError> {
        let cell_ids = self.repo.delete_board(board_id)?;
        if let Some(cache) = &self.cache {
            for cell_id in &cell_ids {
                cache.remove(*cell_id);
            }
        }
        info!(
            "event=board_delete module=service status=ok board={board_id} cells={}",
            cell_ids.len()
        );
        Ok(())
    }
}
