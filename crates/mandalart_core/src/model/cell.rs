//! Cell domain model.
//!
//! # Responsibility
//! - Define the goal-tree node shared by grid, breadcrumb and cache views.
//! - Provide validation for tree-shape invariants that hold per record.
//!
//! # Invariants
//! - `position` is in `0..CELL_FAN_OUT`.
//! - Root cells have `depth == 0` and no parent; other cells have
//!   `depth >= 1` and a parent.
//! - `color`, when set, is a `#RRGGBB` hex string.
//!
//! Cross-record invariants (child depth = parent depth + 1, unique sibling
//! positions) are enforced by the repository and tree assembly.

use super::board::BoardId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one goal cell.
pub type CellId = Uuid;

/// Maximum number of children under one cell (the 3x3 grid minus centre).
pub const CELL_FAN_OUT: usize = 8;

/// Maximum number of characters accepted for a cell topic.
pub const MAX_TOPIC_CHARS: usize = 200;

static COLOR_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("color tag pattern is valid"));

/// One node in a mandalart goal tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    /// Board that owns this cell; deleting the board removes the cell.
    pub board_id: BoardId,
    /// `None` only for the board's root cell.
    pub parent_id: Option<CellId>,
    pub depth: u32,
    /// Slot index among siblings, `0..8`.
    pub position: u8,
    pub topic: String,
    pub memo: Option<String>,
    pub color: Option<String>,
    pub is_completed: bool,
    /// Epoch ms.
    pub created_at: i64,
    /// Epoch ms.
    pub updated_at: i64,
}

impl Cell {
    /// Creates the root cell for a board.
    pub fn new_root(board_id: BoardId, topic: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            board_id,
            parent_id: None,
            depth: 0,
            position: 0,
            topic: topic.into(),
            memo: None,
            color: None,
            is_completed: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Creates a child of `parent` at `position`.
    ///
    /// Depth is derived from the parent so the depth invariant holds by
    /// construction.
    pub fn new_child(parent: &Cell, position: u8, topic: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            board_id: parent.board_id,
            parent_id: Some(parent.id),
            depth: parent.depth + 1,
            position,
            topic: topic.into(),
            memo: None,
            color: None,
            is_completed: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Validates per-record invariants.
    pub fn validate(&self) -> Result<(), CellValidationError> {
        if usize::from(self.position) >= CELL_FAN_OUT {
            return Err(CellValidationError::PositionOutOfRange(self.position));
        }
        match (self.parent_id, self.depth) {
            (None, 0) => {}
            (None, depth) => return Err(CellValidationError::RootWithDepth(depth)),
            (Some(_), 0) => return Err(CellValidationError::ChildAtRootDepth),
            (Some(_), _) => {}
        }
        if self.topic.chars().count() > MAX_TOPIC_CHARS {
            return Err(CellValidationError::TopicTooLong {
                max_chars: MAX_TOPIC_CHARS,
            });
        }
        if let Some(color) = self.color.as_deref() {
            if !is_valid_color_tag(color) {
                return Err(CellValidationError::InvalidColor(color.to_string()));
            }
        }
        Ok(())
    }
}

/// User-editable fields of a cell.
///
/// Shared by update and upsert paths so both apply the same validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellContent {
    pub topic: String,
    pub memo: Option<String>,
    pub color: Option<String>,
}

impl CellContent {
    pub fn with_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    /// Trims text fields and folds blank optionals to `None`.
    pub fn normalized(self) -> Self {
        let fold = |value: Option<String>| {
            value
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
        };
        Self {
            topic: self.topic.trim().to_string(),
            memo: fold(self.memo),
            color: fold(self.color),
        }
    }

    /// Copies the content onto `cell`.
    pub fn apply_to(&self, cell: &mut Cell) {
        cell.topic = self.topic.clone();
        cell.memo = self.memo.clone();
        cell.color = self.color.clone();
    }
}

/// Returns whether `value` is a `#RRGGBB` color tag.
pub fn is_valid_color_tag(value: &str) -> bool {
    COLOR_TAG_PATTERN.is_match(value)
}

/// Per-record cell invariant violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValidationError {
    PositionOutOfRange(u8),
    RootWithDepth(u32),
    ChildAtRootDepth,
    TopicTooLong { max_chars: usize },
    InvalidColor(String),
}

impl Display for CellValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PositionOutOfRange(position) => write!(
                f,
                "cell position {position} is out of range 0..{CELL_FAN_OUT}"
            ),
            Self::RootWithDepth(depth) => {
                write!(f, "root cell must have depth 0, got {depth}")
            }
            Self::ChildAtRootDepth => write!(f, "non-root cell cannot have depth 0"),
            Self::TopicTooLong { max_chars } => {
                write!(f, "cell topic exceeds {max_chars} characters")
            }
            Self::InvalidColor(value) => {
                write!(f, "cell color `{value}` is not a #RRGGBB tag")
            }
        }
    }
}

impl Error for CellValidationError {}
